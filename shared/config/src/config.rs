use serde::Deserialize;
use std::path::PathBuf;

#[derive(Deserialize, Debug, Default, Clone, PartialEq)]
#[serde(default)]
pub struct Config {
    pub gl: Gl,
    pub shaders: Shaders,
}

#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct Gl {
    /// Enable `GL_DEBUG_OUTPUT` and forward driver messages to the logger
    pub debug_output: bool,
    /// Also forward `GL_DEBUG_SEVERITY_NOTIFICATION` messages
    pub trace_notifications: bool,
    /// Validate after an implicit link from `add_shader`
    pub validate_on_link: bool,
    /// Log compile/link/validate failures as warnings
    pub log_diagnostics: bool,
    /// (major, minor)
    pub context_version: (u8, u8),
}

#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct Shaders {
    /// Searched for `<name>.<stage ext>` files
    pub root_dir: PathBuf,
}

impl Default for Gl {
    fn default() -> Self {
        Self {
            debug_output: true,
            trace_notifications: false,
            validate_on_link: true,
            log_diagnostics: true,
            context_version: (4, 1),
        }
    }
}

impl Default for Shaders {
    fn default() -> Self {
        Self {
            root_dir: PathBuf::from("shaders"),
        }
    }
}
