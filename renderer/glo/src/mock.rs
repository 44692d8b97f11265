//! A [Driver] that keeps GL-like object state in memory, for exercising the wrappers without a
//! context.
//!
//! Compiles fail when the source contains `#error`, with the rest of that line as the log. Links
//! fail with no attached shaders, with an uncompiled shader attached, or when requested via
//! [MockDriver::fail_next_link]. `uniform <type> <name>[N];` declarations in attached sources
//! become active uniforms on link, with locations assigned in declaration order.

use std::cell::{Ref, RefCell};
use std::collections::{HashMap, VecDeque};
use std::ffi::CStr;
use std::rc::Rc;

use gl::types::*;

use crate::driver::{image_data_len, Driver, UniformValue};
use crate::uniform::UniformInfo;

#[derive(Clone, Default)]
pub struct MockDriver(Rc<RefCell<MockState>>);

#[derive(Default)]
pub struct MockState {
    next_name: GLuint,
    errors: VecDeque<GLenum>,
    calls: Vec<String>,
    current_program: GLuint,
    active_unit: GLenum,
    bindings: HashMap<(GLenum, GLenum), GLuint>,
    fail_next_link: Option<String>,

    pub programs: HashMap<GLuint, MockProgram>,
    pub shaders: HashMap<GLuint, MockShader>,
    pub textures: HashMap<GLuint, MockTexture>,
    pub uploads: Vec<MockUpload>,
}

#[derive(Default, Debug)]
pub struct MockProgram {
    pub attached: Vec<GLuint>,
    pub linked: bool,
    pub validated: bool,
    pub log: String,
    pub uniforms: Vec<UniformInfo>,
}

#[derive(Debug)]
pub struct MockShader {
    pub kind: GLenum,
    pub source: String,
    pub compiled: bool,
    pub log: String,
}

#[derive(Default, Debug)]
pub struct MockTexture {
    pub target: Option<GLenum>,
    pub params: HashMap<GLenum, GLint>,
    /// (image target, level) -> (width, height)
    pub images: HashMap<(GLenum, GLint), (GLsizei, GLsizei)>,
    pub mipmaps_generated: bool,
}

/// An owned copy of an uploaded [UniformValue]
#[derive(Debug, Clone, PartialEq)]
pub enum MockValue {
    Int(u8, Vec<GLint>),
    UInt(u8, Vec<GLuint>),
    Float(u8, Vec<GLfloat>),
    Matrix(u8, u8, bool, Vec<GLfloat>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct MockUpload {
    pub program: GLuint,
    pub location: GLint,
    pub count: GLsizei,
    pub value: MockValue,
}

impl MockDriver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> Ref<MockState> {
        self.0.borrow()
    }

    /// Queued for the next `glGetError`
    pub fn push_error(&self, err: GLenum) {
        self.0.borrow_mut().errors.push_back(err);
    }

    pub fn fail_next_link(&self, log: &str) {
        self.0.borrow_mut().fail_next_link = Some(log.to_owned());
    }

    /// Every driver call in order, e.g. `"AttachShader(1, 2)"`
    pub fn calls(&self) -> Vec<String> {
        self.0.borrow().calls.clone()
    }

    pub fn clear_calls(&self) {
        self.0.borrow_mut().calls.clear();
    }

    pub fn uploads(&self) -> Vec<MockUpload> {
        self.0.borrow().uploads.clone()
    }

    pub fn live_programs(&self) -> usize {
        self.0.borrow().programs.len()
    }

    pub fn live_shaders(&self) -> usize {
        self.0.borrow().shaders.len()
    }

    pub fn live_textures(&self) -> usize {
        self.0.borrow().textures.len()
    }

    pub fn attached(&self, program: GLuint) -> Vec<GLuint> {
        self.0
            .borrow()
            .programs
            .get(&program)
            .map(|p| p.attached.clone())
            .unwrap_or_default()
    }

    pub fn texture_param(&self, texture: GLuint, pname: GLenum) -> Option<GLint> {
        self.0
            .borrow()
            .textures
            .get(&texture)
            .and_then(|t| t.params.get(&pname).copied())
    }

    /// Texture bound to `target` on the active unit
    pub fn bound_texture(&self, target: GLenum) -> GLuint {
        let state = self.0.borrow();
        state.binding(target)
    }

    fn record(&self, call: String) {
        self.0.borrow_mut().calls.push(call);
    }

    fn with<R>(&self, f: impl FnOnce(&mut MockState) -> R) -> R {
        f(&mut self.0.borrow_mut())
    }
}

impl MockState {
    fn gen(&mut self) -> GLuint {
        self.next_name += 1;
        self.next_name
    }

    fn error(&mut self, err: GLenum) {
        self.errors.push_back(err);
    }

    fn binding(&self, target: GLenum) -> GLuint {
        self.bindings
            .get(&(self.active_unit, binding_target(target)))
            .copied()
            .unwrap_or(0)
    }

    fn bound_texture_mut(&mut self, target: GLenum) -> Option<&mut MockTexture> {
        let name = self.binding(target);
        if name == 0 {
            self.error(gl::INVALID_OPERATION);
            return None;
        }
        self.textures.get_mut(&name)
    }

    fn link(&mut self, program: GLuint) {
        let fail = self.fail_next_link.take();
        let prog = match self.programs.get(&program) {
            Some(p) => p,
            None => return self.error(gl::INVALID_VALUE),
        };

        let attached = prog.attached.clone();
        let result = if let Some(log) = fail {
            Err(log)
        } else if attached.is_empty() {
            Err("error: no shaders attached to the program".to_owned())
        } else if let Some(bad) = attached
            .iter()
            .find(|s| !self.shaders.get(*s).map(|s| s.compiled).unwrap_or(false))
        {
            Err(format!("error: shader {} has not been compiled", bad))
        } else {
            Ok(attached
                .iter()
                .filter_map(|s| self.shaders.get(s))
                .flat_map(|s| parse_uniforms(&s.source))
                .fold(Vec::<UniformInfo>::new(), |mut acc, u| {
                    if !acc.iter().any(|a| a.name == u.name) {
                        acc.push(u);
                    }
                    acc
                }))
        };

        let Some(prog) = self.programs.get_mut(&program) else {
            return;
        };
        match result {
            Ok(uniforms) => {
                prog.linked = true;
                prog.log = String::new();
                prog.uniforms = uniforms;
            }
            Err(log) => {
                prog.linked = false;
                prog.log = log;
                prog.uniforms.clear();
            }
        }
        prog.validated = false;
    }

    fn upload(&mut self, program: GLuint, location: GLint, count: GLsizei, value: UniformValue) {
        if !value.holds(count) {
            return self.error(gl::INVALID_VALUE);
        }
        if location == -1 {
            // silently ignored, as GL does
            return;
        }

        let valid = self
            .programs
            .get(&program)
            .map(|p| p.linked && (location as usize) < p.uniforms.len())
            .unwrap_or(false);
        if !valid {
            return self.error(gl::INVALID_OPERATION);
        }

        let value = match value {
            UniformValue::Int { components, data } => MockValue::Int(components, data.to_vec()),
            UniformValue::UInt { components, data } => MockValue::UInt(components, data.to_vec()),
            UniformValue::Float { components, data } => {
                MockValue::Float(components, data.to_vec())
            }
            UniformValue::Matrix {
                columns,
                rows,
                transpose,
                data,
            } => MockValue::Matrix(columns, rows, transpose, data.to_vec()),
        };

        self.uploads.push(MockUpload {
            program,
            location,
            count,
            value,
        });
    }
}

fn binding_target(target: GLenum) -> GLenum {
    match target {
        gl::TEXTURE_CUBE_MAP_POSITIVE_X..=gl::TEXTURE_CUBE_MAP_NEGATIVE_Z => gl::TEXTURE_CUBE_MAP,
        t => t,
    }
}

fn glsl_type(name: &str) -> Option<GLenum> {
    Some(match name {
        "float" => gl::FLOAT,
        "vec2" => gl::FLOAT_VEC2,
        "vec3" => gl::FLOAT_VEC3,
        "vec4" => gl::FLOAT_VEC4,
        "int" => gl::INT,
        "ivec2" => gl::INT_VEC2,
        "ivec3" => gl::INT_VEC3,
        "ivec4" => gl::INT_VEC4,
        "uint" => gl::UNSIGNED_INT,
        "uvec2" => gl::UNSIGNED_INT_VEC2,
        "uvec3" => gl::UNSIGNED_INT_VEC3,
        "uvec4" => gl::UNSIGNED_INT_VEC4,
        "bool" => gl::BOOL,
        "mat2" => gl::FLOAT_MAT2,
        "mat3" => gl::FLOAT_MAT3,
        "mat4" => gl::FLOAT_MAT4,
        "mat2x3" => gl::FLOAT_MAT2x3,
        "mat3x2" => gl::FLOAT_MAT3x2,
        "mat2x4" => gl::FLOAT_MAT2x4,
        "mat4x2" => gl::FLOAT_MAT4x2,
        "mat3x4" => gl::FLOAT_MAT3x4,
        "mat4x3" => gl::FLOAT_MAT4x3,
        "sampler2D" => gl::SAMPLER_2D,
        "sampler3D" => gl::SAMPLER_3D,
        "samplerCube" => gl::SAMPLER_CUBE,
        _ => return None,
    })
}

/// `uniform <type> <name>;` or `uniform <type> <name>[N];`, one per line
fn parse_uniforms(source: &str) -> Vec<UniformInfo> {
    source
        .lines()
        .filter_map(|line| {
            let decl = line.trim().strip_prefix("uniform ")?;
            let decl = decl.trim_end().strip_suffix(';')?;
            let mut parts = decl.split_whitespace();
            let ty = glsl_type(parts.next()?)?;
            let name = parts.next()?;

            let (name, size) = match name.split_once('[') {
                Some((name, rest)) => {
                    let size = rest.strip_suffix(']')?.parse().ok()?;
                    (format!("{}[0]", name), size)
                }
                None => (name.to_owned(), 1),
            };

            Some(UniformInfo { name, ty, size })
        })
        .collect()
}

impl Driver for MockDriver {
    fn get_error(&self) -> GLenum {
        self.with(|s| s.errors.pop_front().unwrap_or(gl::NO_ERROR))
    }

    fn get_integer(&self, pname: GLenum) -> GLint {
        self.with(|s| match pname {
            gl::CURRENT_PROGRAM => s.current_program as GLint,
            gl::ACTIVE_TEXTURE => s.active_unit as GLint,
            gl::TEXTURE_BINDING_2D => s.binding(gl::TEXTURE_2D) as GLint,
            gl::TEXTURE_BINDING_CUBE_MAP => s.binding(gl::TEXTURE_CUBE_MAP) as GLint,
            _ => {
                s.error(gl::INVALID_ENUM);
                0
            }
        })
    }

    fn create_program(&self) -> GLuint {
        let name = self.with(|s| {
            let name = s.gen();
            s.programs.insert(name, MockProgram::default());
            name
        });
        self.record(format!("CreateProgram() = {}", name));
        name
    }

    fn delete_program(&self, program: GLuint) {
        self.record(format!("DeleteProgram({})", program));
        self.with(|s| {
            if program != 0 && s.programs.remove(&program).is_none() {
                s.error(gl::INVALID_VALUE);
            }
            if s.current_program == program {
                s.current_program = 0;
            }
        })
    }

    fn attach_shader(&self, program: GLuint, shader: GLuint) {
        self.record(format!("AttachShader({}, {})", program, shader));
        self.with(|s| {
            if !s.shaders.contains_key(&shader) {
                return s.error(gl::INVALID_VALUE);
            }
            match s.programs.get_mut(&program) {
                Some(p) if p.attached.contains(&shader) => s.error(gl::INVALID_OPERATION),
                Some(p) => p.attached.push(shader),
                None => s.error(gl::INVALID_VALUE),
            }
        })
    }

    fn detach_shader(&self, program: GLuint, shader: GLuint) {
        self.record(format!("DetachShader({}, {})", program, shader));
        self.with(|s| match s.programs.get_mut(&program) {
            Some(p) => match p.attached.iter().position(|a| *a == shader) {
                Some(i) => {
                    p.attached.remove(i);
                }
                None => s.error(gl::INVALID_OPERATION),
            },
            None => s.error(gl::INVALID_VALUE),
        })
    }

    fn link_program(&self, program: GLuint) {
        self.record(format!("LinkProgram({})", program));
        self.with(|s| s.link(program))
    }

    fn validate_program(&self, program: GLuint) {
        self.record(format!("ValidateProgram({})", program));
        self.with(|s| match s.programs.get_mut(&program) {
            Some(p) => {
                p.validated = p.linked;
                p.log = if p.linked {
                    String::new()
                } else {
                    "error: program is not successfully linked".to_owned()
                };
            }
            None => s.error(gl::INVALID_VALUE),
        })
    }

    fn use_program(&self, program: GLuint) {
        self.record(format!("UseProgram({})", program));
        self.with(|s| {
            if program == 0 || s.programs.contains_key(&program) {
                s.current_program = program;
            } else {
                s.error(gl::INVALID_VALUE);
            }
        })
    }

    fn program_iv(&self, program: GLuint, pname: GLenum) -> GLint {
        self.with(|s| {
            let p = match s.programs.get(&program) {
                Some(p) => p,
                None => {
                    s.error(gl::INVALID_VALUE);
                    return 0;
                }
            };

            match pname {
                gl::LINK_STATUS => p.linked as GLint,
                gl::VALIDATE_STATUS => p.validated as GLint,
                gl::ATTACHED_SHADERS => p.attached.len() as GLint,
                gl::ACTIVE_UNIFORMS => p.uniforms.len() as GLint,
                gl::ACTIVE_UNIFORM_MAX_LENGTH => p
                    .uniforms
                    .iter()
                    .map(|u| u.name.len() as GLint + 1)
                    .max()
                    .unwrap_or(0),
                gl::INFO_LOG_LENGTH if p.log.is_empty() => 0,
                gl::INFO_LOG_LENGTH => p.log.len() as GLint + 1,
                _ => {
                    s.error(gl::INVALID_ENUM);
                    0
                }
            }
        })
    }

    fn program_info_log(&self, program: GLuint) -> String {
        self.with(|s| match s.programs.get(&program) {
            Some(p) => p.log.clone(),
            None => {
                s.error(gl::INVALID_VALUE);
                String::new()
            }
        })
    }

    fn create_shader(&self, kind: GLenum) -> GLuint {
        let name = self.with(|s| match kind {
            gl::VERTEX_SHADER
            | gl::TESS_CONTROL_SHADER
            | gl::TESS_EVALUATION_SHADER
            | gl::GEOMETRY_SHADER
            | gl::FRAGMENT_SHADER => {
                let name = s.gen();
                s.shaders.insert(
                    name,
                    MockShader {
                        kind,
                        source: String::new(),
                        compiled: false,
                        log: String::new(),
                    },
                );
                name
            }
            _ => {
                s.error(gl::INVALID_ENUM);
                0
            }
        });
        self.record(format!("CreateShader({:#x}) = {}", kind, name));
        name
    }

    fn delete_shader(&self, shader: GLuint) {
        self.record(format!("DeleteShader({})", shader));
        self.with(|s| {
            if shader != 0 && s.shaders.remove(&shader).is_none() {
                s.error(gl::INVALID_VALUE);
            }
        })
    }

    fn shader_source(&self, shader: GLuint, source: &str) {
        self.record(format!("ShaderSource({})", shader));
        self.with(|s| match s.shaders.get_mut(&shader) {
            Some(sh) => sh.source = source.to_owned(),
            None => s.error(gl::INVALID_VALUE),
        })
    }

    fn compile_shader(&self, shader: GLuint) {
        self.record(format!("CompileShader({})", shader));
        self.with(|s| match s.shaders.get_mut(&shader) {
            Some(sh) => {
                let error = sh.source.lines().enumerate().find_map(|(i, line)| {
                    line.trim()
                        .strip_prefix("#error")
                        .map(|msg| format!("0:{}: error: {}", i + 1, msg.trim()))
                });
                sh.compiled = error.is_none();
                sh.log = error.unwrap_or_default();
            }
            None => s.error(gl::INVALID_VALUE),
        })
    }

    fn shader_iv(&self, shader: GLuint, pname: GLenum) -> GLint {
        self.with(|s| {
            let sh = match s.shaders.get(&shader) {
                Some(sh) => sh,
                None => {
                    s.error(gl::INVALID_VALUE);
                    return 0;
                }
            };

            match pname {
                gl::COMPILE_STATUS => sh.compiled as GLint,
                gl::SHADER_TYPE => sh.kind as GLint,
                gl::INFO_LOG_LENGTH if sh.log.is_empty() => 0,
                gl::INFO_LOG_LENGTH => sh.log.len() as GLint + 1,
                _ => {
                    s.error(gl::INVALID_ENUM);
                    0
                }
            }
        })
    }

    fn shader_info_log(&self, shader: GLuint) -> String {
        self.with(|s| match s.shaders.get(&shader) {
            Some(sh) => sh.log.clone(),
            None => {
                s.error(gl::INVALID_VALUE);
                String::new()
            }
        })
    }

    fn uniform_location(&self, program: GLuint, name: &CStr) -> GLint {
        let name = name.to_string_lossy();
        self.record(format!("GetUniformLocation({}, {:?})", program, name));
        self.with(|s| match s.programs.get(&program) {
            Some(p) if p.linked => p
                .uniforms
                .iter()
                .position(|u| {
                    u.name == name || u.name.strip_suffix("[0]").map(|n| n == name).unwrap_or(false)
                })
                .map(|i| i as GLint)
                .unwrap_or(-1),
            Some(_) => {
                s.error(gl::INVALID_OPERATION);
                -1
            }
            None => {
                s.error(gl::INVALID_VALUE);
                -1
            }
        })
    }

    fn active_uniform(&self, program: GLuint, index: GLuint, max_name_len: GLint) -> UniformInfo {
        self.with(|s| {
            match s
                .programs
                .get(&program)
                .and_then(|p| p.uniforms.get(index as usize))
            {
                Some(u) => {
                    let mut u = u.clone();
                    u.name.truncate((max_name_len - 1).max(0) as usize);
                    u
                }
                None => {
                    s.error(gl::INVALID_VALUE);
                    UniformInfo {
                        name: String::new(),
                        ty: 0,
                        size: 0,
                    }
                }
            }
        })
    }

    fn uniform(&self, location: GLint, count: GLsizei, value: UniformValue) {
        self.record(format!("Uniform({}, {})", location, count));
        self.with(|s| {
            let program = s.current_program;
            if program == 0 {
                return s.error(gl::INVALID_OPERATION);
            }
            s.upload(program, location, count, value)
        })
    }

    fn program_uniform(&self, program: GLuint, location: GLint, count: GLsizei, value: UniformValue) {
        self.record(format!("ProgramUniform({}, {}, {})", program, location, count));
        self.with(|s| s.upload(program, location, count, value))
    }

    fn gen_texture(&self) -> GLuint {
        let name = self.with(|s| {
            let name = s.gen();
            s.textures.insert(name, MockTexture::default());
            name
        });
        self.record(format!("GenTextures() = {}", name));
        name
    }

    fn delete_texture(&self, texture: GLuint) {
        self.record(format!("DeleteTextures({})", texture));
        self.with(|s| {
            s.textures.remove(&texture);
            s.bindings.retain(|_, bound| *bound != texture);
        })
    }

    fn bind_texture(&self, target: GLenum, texture: GLuint) {
        self.record(format!("BindTexture({:#x}, {})", target, texture));
        self.with(|s| {
            if texture != 0 {
                match s.textures.get_mut(&texture) {
                    Some(t) => match t.target {
                        Some(existing) if existing != target => {
                            return s.error(gl::INVALID_OPERATION)
                        }
                        _ => t.target = Some(target),
                    },
                    None => return s.error(gl::INVALID_VALUE),
                }
            }
            let unit = s.active_unit;
            s.bindings.insert((unit, target), texture);
        })
    }

    fn active_texture(&self, unit: GLenum) {
        self.record(format!("ActiveTexture({:#x})", unit));
        self.with(|s| {
            if unit < gl::TEXTURE0 {
                s.error(gl::INVALID_ENUM)
            } else {
                s.active_unit = unit
            }
        })
    }

    fn tex_parameter_i(&self, target: GLenum, pname: GLenum, param: GLint) {
        self.record(format!("TexParameteri({:#x}, {:#x}, {:#x})", target, pname, param));
        self.with(|s| {
            if let Some(t) = s.bound_texture_mut(target) {
                t.params.insert(pname, param);
            }
        })
    }

    fn tex_image_2d(
        &self,
        target: GLenum,
        level: GLint,
        _internal_format: GLint,
        width: GLsizei,
        height: GLsizei,
        format: GLenum,
        ty: GLenum,
        data: Option<&[u8]>,
    ) {
        self.record(format!("TexImage2D({:#x}, {}, {}x{})", target, level, width, height));
        self.with(|s| {
            if width < 0 || height < 0 || level < 0 {
                return s.error(gl::INVALID_VALUE);
            }
            if let Some(data) = data {
                match image_data_len(width, height, format, ty) {
                    Some(needed) if data.len() >= needed => {}
                    _ => return s.error(gl::INVALID_VALUE),
                }
            }
            if let Some(t) = s.bound_texture_mut(target) {
                t.images.insert((target, level), (width, height));
            }
        })
    }

    fn tex_level_parameter_i(&self, target: GLenum, level: GLint, pname: GLenum) -> GLint {
        self.with(|s| {
            let size = s
                .bindings
                .get(&(s.active_unit, binding_target(target)))
                .and_then(|name| s.textures.get(name))
                .and_then(|t| t.images.get(&(target, level)).copied());

            match (pname, size) {
                (gl::TEXTURE_WIDTH, Some((w, _))) => w,
                (gl::TEXTURE_HEIGHT, Some((_, h))) => h,
                (gl::TEXTURE_DEPTH, Some(_)) => 1,
                (gl::TEXTURE_WIDTH | gl::TEXTURE_HEIGHT | gl::TEXTURE_DEPTH, None) => 0,
                _ => {
                    s.error(gl::INVALID_ENUM);
                    0
                }
            }
        })
    }

    fn generate_mipmap(&self, target: GLenum) {
        self.record(format!("GenerateMipmap({:#x})", target));
        self.with(|s| {
            if let Some(t) = s.bound_texture_mut(target) {
                t.mipmaps_generated = true;
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uniform_declarations() {
        let uniforms = parse_uniforms(
            "#version 410\n\
             uniform mat4 mvp;\n\
             uniform vec3 lights[4];\n\
             uniform sampler2D tex ;\n\
             uniform weird thing;\n\
             // uniform float commented;\n\
             void main() {}",
        );

        let names = uniforms.iter().map(|u| u.name.as_str()).collect::<Vec<_>>();
        assert_eq!(names, vec!["mvp", "lights[0]", "tex"]);
        assert_eq!(uniforms[0].ty, gl::FLOAT_MAT4);
        assert_eq!(uniforms[1].size, 4);
        assert_eq!(uniforms[2].ty, gl::SAMPLER_2D);
    }

    #[test]
    fn invalid_names_raise_errors() {
        let mock = MockDriver::new();
        mock.attach_shader(1, 2);
        assert_eq!(mock.get_error(), gl::INVALID_VALUE);
        assert_eq!(mock.get_error(), gl::NO_ERROR);

        mock.use_program(99);
        assert_eq!(mock.get_error(), gl::INVALID_VALUE);
    }

    #[test]
    fn short_data_raises_errors() {
        let mock = MockDriver::new();
        let data = [1.0, 2.0];
        mock.program_uniform(1, 0, 2, UniformValue::Float { components: 2, data: &data });
        assert_eq!(mock.get_error(), gl::INVALID_VALUE);
        assert!(mock.uploads().is_empty());

        let pixels = [0u8; 15];
        mock.tex_image_2d(gl::TEXTURE_2D, 0, gl::RGBA8 as GLint, 2, 2, gl::RGBA, gl::UNSIGNED_BYTE, Some(&pixels));
        assert_eq!(mock.get_error(), gl::INVALID_VALUE);
        mock.tex_image_2d(gl::TEXTURE_2D, 0, gl::RGB8 as GLint, 2, 2, gl::RGB, gl::UNSIGNED_BYTE, Some(&pixels));
        assert_eq!(mock.get_error(), gl::NO_ERROR);
    }
}
