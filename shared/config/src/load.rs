use std::borrow::Cow;
use std::path::Path;

use common::*;

use crate::config::Config;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    Parsing(#[from] ron::de::Error),

    #[error("Path is not a file")]
    NotAFile,
}

type ConfigResult<T> = std::result::Result<T, ConfigError>;

pub enum ConfigType<'a> {
    String(&'a str),
    File(&'a Path),
}

/// Missing fields take their default values
pub fn load(cfg: ConfigType) -> ConfigResult<Config> {
    let contents = match cfg {
        ConfigType::String(s) => Cow::Borrowed(s),
        ConfigType::File(path) => {
            if !path.is_file() {
                return Err(ConfigError::NotAFile);
            }

            debug!("loading config from file"; "path" => %path.display());
            let contents = std::fs::read_to_string(path).map_err(ConfigError::Io)?;
            Cow::Owned(contents)
        }
    };

    ron::de::from_str(&contents).map_err(ConfigError::Parsing)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn defaults() {
        let cfg = load(ConfigType::String("()")).unwrap();
        assert_eq!(cfg, Config::default());
        assert!(cfg.gl.debug_output);
        assert!(cfg.gl.validate_on_link);
        assert_eq!(cfg.gl.context_version, (4, 1));
        assert_eq!(cfg.shaders.root_dir, PathBuf::from("shaders"));
    }

    #[test]
    fn partial() {
        let cfg = load(ConfigType::String(
            r#"(
                gl: (trace_notifications: true, context_version: (3, 3)),
                shaders: (root_dir: "assets/glsl"),
            )"#,
        ))
        .unwrap();

        assert!(cfg.gl.trace_notifications);
        assert!(cfg.gl.log_diagnostics);
        assert_eq!(cfg.gl.context_version, (3, 3));
        assert_eq!(cfg.shaders.root_dir, PathBuf::from("assets/glsl"));
    }

    #[test]
    fn bad_input() {
        assert!(matches!(
            load(ConfigType::String("(gl: (debug_output: 5))")),
            Err(ConfigError::Parsing(_))
        ));

        assert!(matches!(
            load(ConfigType::File(Path::new("/definitely/not/here.ron"))),
            Err(ConfigError::NotAFile)
        ));
    }
}
