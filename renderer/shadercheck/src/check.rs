use std::path::Path;

use common::*;
use glo::{Gl, GlError, Program, ShaderType, UniformInfo};
use resources::{recurse, ResourceContainer, Shaders};

#[derive(Copy, Clone, Debug)]
pub struct CheckOptions {
    pub validate: bool,
    pub uniforms: bool,
}

/// Everything the driver said about one program
pub struct Report {
    pub name: String,
    /// Compile log per stage found on disk
    pub stages: Vec<(ShaderType, String)>,
    pub link_log: String,
    pub validate_log: String,
    pub uniforms: Vec<UniformInfo>,
    pub errors: Vec<GlError>,
}

/// Program names under the directory, i.e. shader file paths relative to it without the stage
/// extension. Sorted and deduplicated.
pub fn discover(shaders: &Shaders) -> Vec<String> {
    let mut names = ShaderType::ALL
        .iter()
        .flat_map(|stage| recurse(shaders, stage.extension()))
        .filter_map(|file| {
            let relative = file.file_path().strip_prefix(shaders.path()).ok()?;
            program_name(relative)
        })
        .collect::<Vec<_>>();

    names.sort();
    names.dedup();
    names
}

fn program_name(relative: &Path) -> Option<String> {
    let name = relative.with_extension("");
    let name = name.to_str()?;
    // forward slashes on every platform, to match `get_file`
    Some(name.replace('\\', "/"))
}

/// Compiles every stage that has a `<name>.<ext>` file, continuing past compile failures so
/// all logs are collected, then links if everything compiled
pub fn check(gl: &Gl, shaders: &Shaders, name: &str, opts: CheckOptions) -> Report {
    let mut report = Report {
        name: name.to_owned(),
        stages: Vec::new(),
        link_log: String::new(),
        validate_log: String::new(),
        uniforms: Vec::new(),
        errors: Vec::new(),
    };

    let mut program = Program::deferred(gl);
    for stage in ShaderType::ALL {
        let file = format!("{}.{}", name, stage.extension());
        let path = match shaders.get_file(&*file) {
            Ok(path) => path,
            Err(_) => continue,
        };

        debug!("compiling"; "program" => name, "stage" => stage, "file" => %path);
        if let Err(e) = program.add_shader_file(path.file_path(), stage, false) {
            report.errors.push(e);
        }
        report
            .stages
            .push((stage, program.log_error(stage).to_owned()));
    }

    if report.stages.is_empty() {
        let vertex = format!("{}.{}", name, ShaderType::Vertex.extension());
        if let Err(e) = shaders.get_file(&*vertex) {
            report.errors.push(e.into());
        }
        return report;
    }

    if !report.errors.is_empty() {
        return report;
    }

    let linked = program.link(opts.validate);
    report.link_log = program.link_log().to_owned();
    report.validate_log = program.validate_log().to_owned();
    if let Err(e) = linked {
        report.errors.push(e);
    }

    if opts.uniforms && program.link_success() {
        match program.active_uniforms() {
            Ok(uniforms) => report.uniforms = uniforms,
            Err(e) => report.errors.push(e),
        }
    }

    report
}

impl Report {
    pub fn passed(&self) -> bool {
        self.errors.is_empty()
    }
}

fn write_log(f: &mut Formatter, label: &str, log: &str) -> std::fmt::Result {
    let log = log.trim_end();
    if log.is_empty() {
        return Ok(());
    }

    writeln!(f, "  {}:", label)?;
    for line in log.lines() {
        writeln!(f, "    {}", line)?;
    }
    Ok(())
}

impl Display for Report {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        writeln!(
            f,
            "{}: {}",
            self.name,
            if self.passed() { "ok" } else { "FAILED" }
        )?;

        for (stage, log) in &self.stages {
            write_log(f, stage.as_str(), log)?;
        }
        write_log(f, "link", &self.link_log)?;
        write_log(f, "validate", &self.validate_log)?;

        if !self.uniforms.is_empty() {
            writeln!(f, "  uniforms:")?;
            for uniform in &self.uniforms {
                writeln!(f, "    {}", uniform)?;
            }
        }

        for err in &self.errors {
            writeln!(f, "  error: {}", err)?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glo::{GlOptions, MockDriver};
    use std::path::PathBuf;

    const OPTS: CheckOptions = CheckOptions {
        validate: true,
        uniforms: true,
    };

    fn fixture(name: &str, files: &[(&str, &str)]) -> (PathBuf, Shaders) {
        let dir = std::env::temp_dir().join(format!("shadercheck-{}-{}", name, std::process::id()));
        let _ = std::fs::remove_dir_all(&dir);
        for (file, src) in files {
            let path = dir.join(file);
            std::fs::create_dir_all(path.parent().unwrap()).unwrap();
            std::fs::write(path, src).unwrap();
        }

        let shaders = Shaders::standalone(&dir).unwrap();
        (dir, shaders)
    }

    fn gl() -> (MockDriver, Gl) {
        common::logging::for_tests();
        let mock = MockDriver::new();
        let gl = Gl::with_driver(mock.clone(), GlOptions::default());
        (mock, gl)
    }

    #[test]
    fn discovers_program_names() {
        let (_dir, shaders) = fixture(
            "discover",
            &[
                ("flat.vert", ""),
                ("flat.frag", ""),
                ("post/blur.frag", ""),
                ("notes.txt", ""),
                ("terrain.tese", ""),
            ],
        );

        assert_eq!(discover(&shaders), vec!["flat", "post/blur", "terrain"]);
    }

    #[test]
    fn passing_program() {
        let (mock, gl) = gl();
        let (_dir, shaders) = fixture(
            "pass",
            &[
                ("flat.vert", "uniform mat4 mvp;\nvoid main() {}"),
                ("flat.frag", "uniform vec4 tint;\nvoid main() {}"),
            ],
        );

        let report = check(&gl, &shaders, "flat", OPTS);
        assert!(report.passed());
        assert_eq!(
            report.stages.iter().map(|(s, _)| *s).collect::<Vec<_>>(),
            vec![ShaderType::Vertex, ShaderType::Fragment]
        );
        let names = report.uniforms.iter().map(|u| u.name.as_str()).collect::<Vec<_>>();
        assert_eq!(names, vec!["mvp", "tint"]);

        let out = report.to_string();
        assert!(out.starts_with("flat: ok\n"));
        assert!(out.contains("    mat4 mvp\n"));

        // everything is freed once the report is made
        assert_eq!(mock.live_programs(), 0);
        assert_eq!(mock.live_shaders(), 0);
    }

    #[test]
    fn collects_every_compile_log() {
        let (mock, gl) = gl();
        let (_dir, shaders) = fixture(
            "compile",
            &[
                ("bad.vert", "#error no position"),
                ("bad.geom", "void main() {}"),
                ("bad.frag", "\n#error no colour"),
            ],
        );

        let report = check(&gl, &shaders, "bad", OPTS);
        assert!(!report.passed());
        assert_eq!(report.errors.len(), 2);
        assert_eq!(
            report.stages,
            vec![
                (ShaderType::Vertex, "0:1: error: no position".to_owned()),
                (ShaderType::Geometry, String::new()),
                (ShaderType::Fragment, "0:2: error: no colour".to_owned()),
            ]
        );

        // never linked
        assert!(!mock.calls().iter().any(|c| c.starts_with("LinkProgram")));

        let out = report.to_string();
        assert!(out.starts_with("bad: FAILED\n"));
        assert!(out.contains("  VERTEX:\n    0:1: error: no position\n"));
        assert!(!out.contains("GEOMETRY"));
    }

    #[test]
    fn link_failure() {
        let (mock, gl) = gl();
        let (_dir, shaders) = fixture("link", &[("a.vert", "void main() {}")]);

        mock.fail_next_link("error: too many varyings");
        let report = check(&gl, &shaders, "a", OPTS);
        assert!(!report.passed());
        assert_eq!(report.link_log, "error: too many varyings");
        assert!(matches!(report.errors[..], [GlError::LinkingProgram(_)]));
        assert!(report.uniforms.is_empty());
        assert!(report.to_string().contains("  link:\n    error: too many varyings\n"));
    }

    #[test]
    fn missing_program() {
        let (_, gl) = gl();
        let (_dir, shaders) = fixture("missing", &[("a.vert", "")]);

        let report = check(&gl, &shaders, "b", OPTS);
        assert!(report.stages.is_empty());
        assert!(matches!(report.errors[..], [GlError::LoadingShader(_)]));
    }

    #[test]
    fn skips_validation_and_uniforms() {
        let (mock, gl) = gl();
        let (_dir, shaders) = fixture("opts", &[("a.vert", "uniform float t;")]);

        let report = check(
            &gl,
            &shaders,
            "a",
            CheckOptions {
                validate: false,
                uniforms: false,
            },
        );
        assert!(report.passed());
        assert!(report.uniforms.is_empty());
        assert!(!mock.calls().iter().any(|c| c.starts_with("ValidateProgram")));
    }
}
