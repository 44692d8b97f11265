use std::cell::RefCell;
use std::path::Path;

use common::*;
use gl::types::*;
use resources::{ReadResource, ResourceContainer, ResourcePath, Shaders};

use crate::context::Gl;
use crate::errchk;
use crate::error::{GlError, GlResult};
use crate::resource::{Bindable, Resource};
use crate::shader::ShaderType;
use crate::uniform::UniformCache;

/// A GLSL program and the shaders attached to it.
///
/// Compile, link and validation logs are kept after failures, and sources are kept after
/// [release](Resource::release), so a program can be inspected or rebuilt.
pub struct Program {
    gl: Gl,
    object: GLuint,
    stages: [ShaderRecord; ShaderType::COUNT],
    link_success: bool,
    link_log: String,
    validate_log: String,
    uniforms: RefCell<UniformCache>,
}

#[derive(Default)]
struct ShaderRecord {
    source: String,
    object: GLuint,
    log: String,
}

impl Program {
    /// Creates the program object
    pub fn new(gl: &Gl) -> GlResult<Self> {
        let mut program = Self::deferred(gl);
        program.create()?;
        Ok(program)
    }

    /// Doesn't create a program object until [create](Self::create) or the first
    /// [add_shader](Self::add_shader)
    pub fn deferred(gl: &Gl) -> Self {
        Self {
            gl: gl.clone(),
            object: 0,
            stages: Default::default(),
            link_success: false,
            link_log: String::new(),
            validate_log: String::new(),
            uniforms: RefCell::new(UniformCache::default()),
        }
    }

    /// Loads `<name>.<ext>` for every stage that has a file in the directory (see
    /// [ShaderType::extension]), then links
    pub fn load(gl: &Gl, res: &Shaders, name: &str) -> GlResult<Self> {
        let stages = ShaderType::ALL
            .iter()
            .copied()
            .filter(|stage| res.get_file(&*file_name(name, *stage)).is_ok())
            .collect::<ArrayVec<_, { ShaderType::COUNT }>>();

        if stages.is_empty() {
            // report the missing vertex shader
            res.get_file(&*file_name(name, ShaderType::Vertex))?;
        }

        Self::load_stages(gl, res, name, &stages)
    }

    /// Loads `<name>.<ext>` for each of the given stages, then links
    pub fn load_stages(
        gl: &Gl,
        res: &Shaders,
        name: &str,
        stages: &[ShaderType],
    ) -> GlResult<Self> {
        let mut program = Self::new(gl)?;
        for stage in stages {
            let path = res.get_file(&*file_name(name, *stage))?;
            debug!("loading shader from file"; "file" => %path, "stage" => *stage);
            program.add_shader_from(&path, *stage, false)?;
        }

        let validate = program.gl.options().validate_on_link;
        program.link(validate)?;
        Ok(program)
    }

    /// Creates the program object if it doesn't exist yet
    pub fn create(&mut self) -> GlResult<GLuint> {
        if self.object == 0 {
            let object = errchk!(self.gl, self.gl.create_program())?;
            if object == 0 {
                return Err(GlError::NoProgram);
            }

            trace!("created program"; "program" => object);
            self.object = object;
        }

        Ok(self.object)
    }

    /// Replaces the shader for `shader_type`, compiling and attaching the new source. The
    /// compile log is kept either way; see [log_error](Self::log_error).
    ///
    /// With `link_program`, links afterwards, validating if
    /// [validate_on_link](crate::GlOptions::validate_on_link) is set.
    pub fn add_shader(
        &mut self,
        source: impl Into<String>,
        shader_type: ShaderType,
        link_program: bool,
    ) -> GlResult<()> {
        let program = self.create()?;
        self.discard_shader(shader_type);

        let gl = &self.gl;
        let record = &mut self.stages[shader_type.index()];
        record.source = source.into();
        record.log.clear();

        let shader = errchk!(gl, gl.create_shader(shader_type.gl_enum()))?;
        if shader == 0 {
            return Err(GlError::Gl(gl::INVALID_OPERATION));
        }

        gl.shader_source(shader, &record.source);
        gl.compile_shader(shader);
        let compiled = gl.shader_iv(shader, gl::COMPILE_STATUS) != gl::FALSE as GLint;
        record.log = gl.shader_info_log(shader);

        if !compiled {
            gl.delete_shader(shader);
            if gl.options().log_diagnostics {
                warn!("failed to compile shader"; "program" => program, "stage" => shader_type, "log" => &record.log);
            }

            return Err(GlError::CompilingShader {
                stage: shader_type,
                log: record.log.clone(),
            });
        }

        gl.attach_shader(program, shader);
        if let Err(e) = gl.check() {
            gl.delete_shader(shader);
            return Err(e);
        }

        record.object = shader;
        self.link_success = false;
        debug!("compiled shader"; "program" => program, "shader" => shader, "stage" => shader_type);

        if link_program {
            let validate = self.gl.options().validate_on_link;
            self.link(validate)?;
        }

        Ok(())
    }

    /// Reads the source from a file, then as [add_shader](Self::add_shader)
    pub fn add_shader_file(
        &mut self,
        path: impl AsRef<Path>,
        shader_type: ShaderType,
        link_program: bool,
    ) -> GlResult<()> {
        let path = ResourcePath::new(path.as_ref())?;
        self.add_shader_from(&path, shader_type, link_program)
    }

    fn add_shader_from(
        &mut self,
        path: &ResourcePath,
        shader_type: ShaderType,
        link_program: bool,
    ) -> GlResult<()> {
        let src = String::read_resource(path)?;
        self.add_shader(src, shader_type, link_program)
    }

    /// Detaches and deletes the compiled shader for this stage, keeping its source
    fn discard_shader(&mut self, shader_type: ShaderType) {
        let record = &mut self.stages[shader_type.index()];
        if record.object != 0 {
            if self.object != 0 {
                self.gl.detach_shader(self.object, record.object);
            }
            self.gl.delete_shader(record.object);
            record.object = 0;
        }
    }

    /// Links the attached shaders, then validates if `do_validation`
    pub fn link(&mut self, do_validation: bool) -> GlResult<()> {
        let program = self.checked_object()?;

        self.gl.link_program(program);
        self.gl.check()?;

        self.link_success = self.gl.program_iv(program, gl::LINK_STATUS) != gl::FALSE as GLint;
        self.link_log = self.gl.program_info_log(program);
        self.validate_log.clear();
        self.uniforms.borrow_mut().clear();

        if !self.link_success {
            if self.gl.options().log_diagnostics {
                warn!("failed to link program"; "program" => program, "log" => &self.link_log);
            }
            return Err(GlError::LinkingProgram(self.link_log.clone()));
        }

        debug!("linked program"; "program" => program);

        if do_validation {
            self.validate()?;
        }

        Ok(())
    }

    /// Checks the program can execute given the current GL state
    pub fn validate(&mut self) -> GlResult<()> {
        let program = self.checked_object()?;

        self.gl.validate_program(program);
        self.gl.check()?;

        let valid = self.gl.program_iv(program, gl::VALIDATE_STATUS) != gl::FALSE as GLint;
        self.validate_log = self.gl.program_info_log(program);

        if valid {
            Ok(())
        } else {
            if self.gl.options().log_diagnostics {
                warn!("failed to validate program"; "program" => program, "log" => &self.validate_log);
            }
            Err(GlError::ValidatingProgram(self.validate_log.clone()))
        }
    }

    /// Installs the program as part of the current rendering state
    pub fn use_program(&self) {
        self.gl.use_program(self.object);
    }

    pub fn is_in_use(&self) -> bool {
        self.object != 0 && self.gl.current_program() == self.object
    }

    /// Driver name of the compiled shader for this stage, 0 if none
    pub fn shader_object(&self, shader_type: ShaderType) -> GLuint {
        self.stages[shader_type.index()].object
    }

    pub fn shader_code(&self, shader_type: ShaderType) -> &str {
        &self.stages[shader_type.index()].source
    }

    /// Only stores the source; [add_shader](Self::add_shader) compiles
    pub fn set_shader_code(&mut self, shader_type: ShaderType, code: impl Into<String>) {
        self.stages[shader_type.index()].source = code.into();
    }

    /// Compile log of the last [add_shader](Self::add_shader) for this stage
    pub fn log_error(&self, shader_type: ShaderType) -> &str {
        &self.stages[shader_type.index()].log
    }

    pub fn set_log_error(&mut self, shader_type: ShaderType, log: impl Into<String>) {
        self.stages[shader_type.index()].log = log.into();
    }

    /// Recompiles all stages from their stored sources, then links. Stages with empty
    /// sources are skipped.
    pub fn rebuild(&mut self) -> GlResult<()> {
        for stage in ShaderType::ALL {
            let source = self.shader_code(stage);
            if source.is_empty() {
                self.discard_shader(stage);
            } else {
                let source = source.to_owned();
                self.add_shader(source, stage, false)?;
            }
        }

        let validate = self.gl.options().validate_on_link;
        self.link(validate)
    }

    /// Stages with a compiled shader attached
    pub fn attached_stages(&self) -> impl Iterator<Item = ShaderType> + '_ {
        ShaderType::ALL
            .into_iter()
            .filter(move |s| self.shader_object(*s) != 0)
    }

    pub fn link_success(&self) -> bool {
        self.link_success
    }

    pub fn link_log(&self) -> &str {
        &self.link_log
    }

    pub fn validate_log(&self) -> &str {
        &self.validate_log
    }

    pub fn gl(&self) -> &Gl {
        &self.gl
    }

    pub(crate) fn checked_object(&self) -> GlResult<GLuint> {
        match self.object {
            0 => Err(GlError::NoProgram),
            o => Ok(o),
        }
    }

    pub(crate) fn uniform_cache(&self) -> &RefCell<UniformCache> {
        &self.uniforms
    }
}

fn file_name(name: &str, stage: ShaderType) -> String {
    format!("{}.{}", name, stage.extension())
}

impl Resource for Program {
    fn object(&self) -> GLuint {
        self.object
    }

    fn release(&mut self) {
        for stage in ShaderType::ALL {
            self.discard_shader(stage);
        }

        if self.object != 0 {
            self.gl.delete_program(self.object);
            trace!("released program"; "program" => self.object);
            self.object = 0;
        }

        self.link_success = false;
        self.uniforms.borrow_mut().clear();
    }
}

impl Drop for Program {
    fn drop(&mut self) {
        self.release();
    }
}

impl Bindable for Program {
    fn bind(&self) {
        self.use_program();
    }

    fn unbind(&self) {
        self.gl.use_fixed_paths();
    }
}

impl Debug for Program {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Program")
            .field("object", &self.object)
            .field("stages", &self.attached_stages().collect::<Vec<_>>())
            .field("link_success", &self.link_success)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::GlOptions;
    use crate::mock::MockDriver;
    use crate::resource::ScopedBindable;
    use resources::ResourceErrorKind;

    const VERTEX: &str = "#version 410\nuniform mat4 mvp;\nvoid main() {}";
    const FRAGMENT: &str = "#version 410\nout vec4 colour;\nvoid main() {}";
    const BROKEN: &str = "#version 410\n#error missing semicolon\nvoid main() {}";

    fn gl() -> (MockDriver, Gl) {
        common::logging::for_tests();
        let mock = MockDriver::new();
        let gl = Gl::with_driver(mock.clone(), GlOptions::default());
        (mock, gl)
    }

    #[test]
    fn compile_and_link() {
        let (mock, gl) = gl();
        let mut program = Program::new(&gl).unwrap();
        assert!(program.is_allocated());

        program.add_shader(VERTEX, ShaderType::Vertex, false).unwrap();
        assert!(!program.link_success());

        program
            .add_shader(FRAGMENT, ShaderType::Fragment, true)
            .unwrap();
        assert!(program.link_success());
        assert!(program.link_log().is_empty());
        assert!(program.validate_log().is_empty());

        let vs = program.shader_object(ShaderType::Vertex);
        let fs = program.shader_object(ShaderType::Fragment);
        assert_ne!(vs, 0);
        assert_ne!(fs, 0);
        assert_eq!(program.shader_object(ShaderType::Geometry), 0);
        assert_eq!(mock.attached(program.object()), vec![vs, fs]);
        assert_eq!(
            program.attached_stages().collect::<Vec<_>>(),
            vec![ShaderType::Vertex, ShaderType::Fragment]
        );
        assert_eq!(program.shader_code(ShaderType::Vertex), VERTEX);
    }

    #[test]
    fn compile_failure_keeps_log() {
        let (mock, gl) = gl();
        let mut program = Program::new(&gl).unwrap();

        let err = program
            .add_shader(BROKEN, ShaderType::Fragment, true)
            .unwrap_err();
        match err {
            GlError::CompilingShader { stage, log } => {
                assert_eq!(stage, ShaderType::Fragment);
                assert_eq!(log, "0:2: error: missing semicolon");
            }
            e => panic!("unexpected error {:?}", e),
        }

        assert_eq!(
            program.log_error(ShaderType::Fragment),
            "0:2: error: missing semicolon"
        );
        assert_eq!(program.shader_code(ShaderType::Fragment), BROKEN);
        assert_eq!(program.shader_object(ShaderType::Fragment), 0);
        assert_eq!(mock.live_shaders(), 0);
        assert!(!program.link_success());
    }

    #[test]
    fn replacing_a_stage_discards_the_old_shader() {
        let (mock, gl) = gl();
        let mut program = Program::new(&gl).unwrap();

        program.add_shader(VERTEX, ShaderType::Vertex, false).unwrap();
        let old = program.shader_object(ShaderType::Vertex);

        mock.clear_calls();
        program.add_shader(VERTEX, ShaderType::Vertex, false).unwrap();
        let new = program.shader_object(ShaderType::Vertex);

        assert_ne!(old, new);
        let calls = mock.calls();
        let p = program.object();
        assert_eq!(calls[0], format!("DetachShader({}, {})", p, old));
        assert_eq!(calls[1], format!("DeleteShader({})", old));
        assert_eq!(mock.attached(p), vec![new]);
        assert_eq!(mock.live_shaders(), 1);

        // a failed replacement still discards the old one
        let _ = program.add_shader(BROKEN, ShaderType::Vertex, false);
        assert_eq!(program.shader_object(ShaderType::Vertex), 0);
        assert!(mock.attached(p).is_empty());
    }

    #[test]
    fn link_failures() {
        let (mock, gl) = gl();
        let mut program = Program::new(&gl).unwrap();

        match program.link(true) {
            Err(GlError::LinkingProgram(log)) => assert!(log.contains("no shaders attached")),
            other => panic!("unexpected {:?}", other),
        }
        assert!(!program.link_success());
        assert!(program.link_log().contains("no shaders attached"));

        program.add_shader(VERTEX, ShaderType::Vertex, false).unwrap();
        mock.fail_next_link("error: varying colour not written");
        assert!(matches!(
            program.link(false),
            Err(GlError::LinkingProgram(ref log)) if log == "error: varying colour not written"
        ));

        program.link(false).unwrap();
        assert!(program.link_success());
        assert!(program.link_log().is_empty());
    }

    #[test]
    fn validation() {
        let (mock, gl) = gl();
        let mut program = Program::new(&gl).unwrap();

        assert!(matches!(
            program.validate(),
            Err(GlError::ValidatingProgram(ref log)) if log.contains("not successfully linked")
        ));
        assert!(program.validate_log().contains("not successfully linked"));

        program.add_shader(VERTEX, ShaderType::Vertex, false).unwrap();
        program.link(true).unwrap();
        assert!(program.validate_log().is_empty());
        assert!(mock.calls().iter().any(|c| c.starts_with("ValidateProgram")));
    }

    #[test]
    fn validate_on_link_option() {
        common::logging::for_tests();
        let mock = MockDriver::new();
        let gl = Gl::with_driver(
            mock.clone(),
            GlOptions {
                validate_on_link: false,
                log_diagnostics: false,
                ..GlOptions::default()
            },
        );

        let mut program = Program::new(&gl).unwrap();
        program.add_shader(VERTEX, ShaderType::Vertex, true).unwrap();
        assert!(program.link_success());
        assert!(!mock.calls().iter().any(|c| c.starts_with("ValidateProgram")));
    }

    #[test]
    fn deferred_creation() {
        let (mock, gl) = gl();
        let mut program = Program::deferred(&gl);
        assert!(!program.is_allocated());
        assert_eq!(mock.live_programs(), 0);

        assert!(matches!(program.link(true), Err(GlError::NoProgram)));
        assert!(matches!(program.validate(), Err(GlError::NoProgram)));
        assert!(matches!(
            program.active_uniforms(),
            Err(GlError::NoProgram)
        ));

        program.add_shader(VERTEX, ShaderType::Vertex, true).unwrap();
        assert!(program.is_allocated());
        assert_eq!(mock.live_programs(), 1);

        let object = program.object();
        assert_eq!(program.create().unwrap(), object);
    }

    #[test]
    fn release_and_drop() {
        let (mock, gl) = gl();
        let mut program = Program::new(&gl).unwrap();
        program.add_shader(VERTEX, ShaderType::Vertex, false).unwrap();
        program
            .add_shader(FRAGMENT, ShaderType::Fragment, true)
            .unwrap();
        assert_eq!(mock.live_shaders(), 2);

        program.release();
        assert!(!program.is_allocated());
        assert!(!program.link_success());
        assert_eq!(program.shader_object(ShaderType::Vertex), 0);
        assert_eq!(mock.live_programs(), 0);
        assert_eq!(mock.live_shaders(), 0);

        // sources survive
        assert_eq!(program.shader_code(ShaderType::Fragment), FRAGMENT);

        mock.clear_calls();
        program.release();
        assert!(mock.calls().is_empty());
        assert!(gl.check().is_ok());

        // and can be rebuilt
        program.rebuild().unwrap();
        assert!(program.link_success());
        assert_eq!(mock.live_shaders(), 2);

        drop(program);
        assert_eq!(mock.live_programs(), 0);
        assert_eq!(mock.live_shaders(), 0);
    }

    #[test]
    fn stored_code_and_logs() {
        let (_, gl) = gl();
        let mut program = Program::deferred(&gl);

        program.set_shader_code(ShaderType::Geometry, "layout(points) in;");
        program.set_log_error(ShaderType::Geometry, "edited");
        assert_eq!(program.shader_code(ShaderType::Geometry), "layout(points) in;");
        assert_eq!(program.log_error(ShaderType::Geometry), "edited");
        assert_eq!(program.shader_object(ShaderType::Geometry), 0);
        assert!(!program.is_allocated());
    }

    #[test]
    fn in_use() {
        let (_, gl) = gl();
        let mut program = Program::new(&gl).unwrap();
        program.add_shader(VERTEX, ShaderType::Vertex, true).unwrap();
        assert!(!program.is_in_use());

        {
            let bound = program.scoped_bind();
            assert!(bound.is_in_use());
            assert_eq!(gl.current_program(), program.object());
        }
        assert!(!program.is_in_use());
        assert_eq!(gl.current_program(), 0);

        program.use_program();
        assert!(program.is_in_use());
        gl.use_fixed_paths();
        assert!(!program.is_in_use());

        // a released program is never in use
        program.release();
        assert!(!program.is_in_use());
    }

    fn shader_dir(name: &str) -> std::path::PathBuf {
        let dir = std::env::temp_dir().join(format!("glo-program-{}-{}", name, std::process::id()));
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn load_from_directory() {
        let (mock, gl) = gl();
        let dir = shader_dir("load");
        std::fs::write(dir.join("sky.vert"), VERTEX).unwrap();
        std::fs::write(dir.join("sky.frag"), FRAGMENT).unwrap();
        std::fs::write(dir.join("broken.frag"), BROKEN).unwrap();

        let shaders = Shaders::standalone(&dir).unwrap();
        let program = Program::load(&gl, &shaders, "sky").unwrap();
        assert!(program.link_success());
        assert_eq!(
            program.attached_stages().collect::<Vec<_>>(),
            vec![ShaderType::Vertex, ShaderType::Fragment]
        );
        assert_eq!(mock.attached(program.object()).len(), 2);

        assert!(matches!(
            Program::load(&gl, &shaders, "broken"),
            Err(GlError::CompilingShader {
                stage: ShaderType::Fragment,
                ..
            })
        ));

        match Program::load(&gl, &shaders, "missing") {
            Err(GlError::LoadingShader(e)) => {
                assert!(matches!(e.1, ResourceErrorKind::FileNotFound));
                assert!(e.0.ends_with("missing.vert"));
            }
            other => panic!("unexpected {:?}", other),
        }

        assert!(matches!(
            Program::load_stages(&gl, &shaders, "sky", &[ShaderType::Geometry]),
            Err(GlError::LoadingShader(_))
        ));

        // nothing leaks from the failed loads
        drop(program);
        assert_eq!(mock.live_programs(), 0);
        assert_eq!(mock.live_shaders(), 0);
    }

    #[test]
    fn add_shader_file() {
        let (_, gl) = gl();
        let dir = shader_dir("file");
        std::fs::write(dir.join("a.vert"), VERTEX).unwrap();

        let mut program = Program::new(&gl).unwrap();
        program
            .add_shader_file(dir.join("a.vert"), ShaderType::Vertex, true)
            .unwrap();
        assert_eq!(program.shader_code(ShaderType::Vertex), VERTEX);

        assert!(matches!(
            program.add_shader_file(dir.join("b.vert"), ShaderType::Vertex, false),
            Err(GlError::LoadingShader(_))
        ));
        // the stage is untouched when the file can't be read
        assert_ne!(program.shader_object(ShaderType::Vertex), 0);
    }

    #[test]
    fn debug_format() {
        let (_, gl) = gl();
        let mut program = Program::new(&gl).unwrap();
        program.add_shader(VERTEX, ShaderType::Vertex, true).unwrap();

        let s = format!("{:?}", program);
        assert!(s.contains("Vertex"));
        assert!(s.contains("link_success: true"));
    }
}
