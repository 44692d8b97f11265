use std::cell::Cell;
use std::ffi::CStr;
use std::ptr::null;

use common::*;
use gl::types::*;

use crate::driver::{image_data_len, Driver, UniformValue};
use crate::uniform::UniformInfo;

/// Forwards to the function pointers loaded by [gl::load_with]. Only constructed by
/// [Gl::load_with](crate::Gl::load_with), so a context is current whenever one exists.
///
/// Calls whose arguments would have GL read past the end of a slice are rejected here instead,
/// and report `INVALID_VALUE` through the next [get_error](Driver::get_error).
pub struct GlDriver {
    rejected: Cell<GLenum>,
}

impl GlDriver {
    pub(crate) fn new() -> Self {
        Self {
            rejected: Cell::new(gl::NO_ERROR),
        }
    }

    fn reject(&self) {
        warn!("rejected GL call that would read out of bounds");
        // like GL, the first error sticks until queried
        if self.rejected.get() == gl::NO_ERROR {
            self.rejected.set(gl::INVALID_VALUE);
        }
    }
}

fn read_log(len: GLint, read: impl FnOnce(GLsizei, *mut GLsizei, *mut GLchar)) -> String {
    if len <= 0 {
        return String::new();
    }

    let mut buf = Vec::<u8>::with_capacity(len as usize);
    let mut written: GLsizei = 0;
    read(len, &mut written, buf.as_mut_ptr() as *mut _);

    // safety: driver wrote `written` bytes, excluding the null terminator
    unsafe { buf.set_len((written.max(0) as usize).min(len as usize)) };
    String::from_utf8_lossy(&buf).into_owned()
}

impl Driver for GlDriver {
    fn get_error(&self) -> GLenum {
        match self.rejected.replace(gl::NO_ERROR) {
            gl::NO_ERROR => unsafe { gl::GetError() },
            err => err,
        }
    }

    fn get_integer(&self, pname: GLenum) -> GLint {
        let mut value = 0;
        unsafe { gl::GetIntegerv(pname, &mut value) };
        value
    }

    fn create_program(&self) -> GLuint {
        unsafe { gl::CreateProgram() }
    }

    fn delete_program(&self, program: GLuint) {
        unsafe { gl::DeleteProgram(program) }
    }

    fn attach_shader(&self, program: GLuint, shader: GLuint) {
        unsafe { gl::AttachShader(program, shader) }
    }

    fn detach_shader(&self, program: GLuint, shader: GLuint) {
        unsafe { gl::DetachShader(program, shader) }
    }

    fn link_program(&self, program: GLuint) {
        unsafe { gl::LinkProgram(program) }
    }

    fn validate_program(&self, program: GLuint) {
        unsafe { gl::ValidateProgram(program) }
    }

    fn use_program(&self, program: GLuint) {
        unsafe { gl::UseProgram(program) }
    }

    fn program_iv(&self, program: GLuint, pname: GLenum) -> GLint {
        let mut value = 0;
        unsafe { gl::GetProgramiv(program, pname, &mut value) };
        value
    }

    fn program_info_log(&self, program: GLuint) -> String {
        let len = self.program_iv(program, gl::INFO_LOG_LENGTH);
        read_log(len, |len, written, buf| unsafe {
            gl::GetProgramInfoLog(program, len, written, buf)
        })
    }

    fn create_shader(&self, kind: GLenum) -> GLuint {
        unsafe { gl::CreateShader(kind) }
    }

    fn delete_shader(&self, shader: GLuint) {
        unsafe { gl::DeleteShader(shader) }
    }

    fn shader_source(&self, shader: GLuint, source: &str) {
        let len = source.len() as GLint;
        let src = source.as_ptr() as *const GLchar;
        unsafe { gl::ShaderSource(shader, 1, &src, &len) }
    }

    fn compile_shader(&self, shader: GLuint) {
        unsafe { gl::CompileShader(shader) }
    }

    fn shader_iv(&self, shader: GLuint, pname: GLenum) -> GLint {
        let mut value = 0;
        unsafe { gl::GetShaderiv(shader, pname, &mut value) };
        value
    }

    fn shader_info_log(&self, shader: GLuint) -> String {
        let len = self.shader_iv(shader, gl::INFO_LOG_LENGTH);
        read_log(len, |len, written, buf| unsafe {
            gl::GetShaderInfoLog(shader, len, written, buf)
        })
    }

    fn uniform_location(&self, program: GLuint, name: &CStr) -> GLint {
        unsafe { gl::GetUniformLocation(program, name.as_ptr()) }
    }

    fn active_uniform(&self, program: GLuint, index: GLuint, max_name_len: GLint) -> UniformInfo {
        let mut size = 0;
        let mut ty = 0;
        let name = read_log(max_name_len, |len, written, buf| unsafe {
            gl::GetActiveUniform(program, index, len, written, &mut size, &mut ty, buf)
        });

        UniformInfo { name, ty, size }
    }

    fn uniform(&self, location: GLint, count: GLsizei, value: UniformValue) {
        if !value.holds(count) {
            return self.reject();
        }

        unsafe {
            match value {
                UniformValue::Int { components, data } => {
                    let ptr = data.as_ptr();
                    match components {
                        1 => gl::Uniform1iv(location, count, ptr),
                        2 => gl::Uniform2iv(location, count, ptr),
                        3 => gl::Uniform3iv(location, count, ptr),
                        4 => gl::Uniform4iv(location, count, ptr),
                        _ => unreachable!(),
                    }
                }
                UniformValue::UInt { components, data } => {
                    let ptr = data.as_ptr();
                    match components {
                        1 => gl::Uniform1uiv(location, count, ptr),
                        2 => gl::Uniform2uiv(location, count, ptr),
                        3 => gl::Uniform3uiv(location, count, ptr),
                        4 => gl::Uniform4uiv(location, count, ptr),
                        _ => unreachable!(),
                    }
                }
                UniformValue::Float { components, data } => {
                    let ptr = data.as_ptr();
                    match components {
                        1 => gl::Uniform1fv(location, count, ptr),
                        2 => gl::Uniform2fv(location, count, ptr),
                        3 => gl::Uniform3fv(location, count, ptr),
                        4 => gl::Uniform4fv(location, count, ptr),
                        _ => unreachable!(),
                    }
                }
                UniformValue::Matrix {
                    columns,
                    rows,
                    transpose,
                    data,
                } => {
                    let transpose = if transpose { gl::TRUE } else { gl::FALSE };
                    let ptr = data.as_ptr();
                    match (columns, rows) {
                        (2, 2) => gl::UniformMatrix2fv(location, count, transpose, ptr),
                        (3, 3) => gl::UniformMatrix3fv(location, count, transpose, ptr),
                        (2, 3) => gl::UniformMatrix2x3fv(location, count, transpose, ptr),
                        (3, 2) => gl::UniformMatrix3x2fv(location, count, transpose, ptr),
                        (2, 4) => gl::UniformMatrix2x4fv(location, count, transpose, ptr),
                        (4, 2) => gl::UniformMatrix4x2fv(location, count, transpose, ptr),
                        (3, 4) => gl::UniformMatrix3x4fv(location, count, transpose, ptr),
                        (4, 3) => gl::UniformMatrix4x3fv(location, count, transpose, ptr),
                        (4, 4) => gl::UniformMatrix4fv(location, count, transpose, ptr),
                        _ => unreachable!(),
                    }
                }
            }
        }
    }

    fn program_uniform(&self, program: GLuint, location: GLint, count: GLsizei, value: UniformValue) {
        if !value.holds(count) {
            return self.reject();
        }

        let p = program;
        unsafe {
            match value {
                UniformValue::Int { components, data } => {
                    let ptr = data.as_ptr();
                    match components {
                        1 => gl::ProgramUniform1iv(p, location, count, ptr),
                        2 => gl::ProgramUniform2iv(p, location, count, ptr),
                        3 => gl::ProgramUniform3iv(p, location, count, ptr),
                        4 => gl::ProgramUniform4iv(p, location, count, ptr),
                        _ => unreachable!(),
                    }
                }
                UniformValue::UInt { components, data } => {
                    let ptr = data.as_ptr();
                    match components {
                        1 => gl::ProgramUniform1uiv(p, location, count, ptr),
                        2 => gl::ProgramUniform2uiv(p, location, count, ptr),
                        3 => gl::ProgramUniform3uiv(p, location, count, ptr),
                        4 => gl::ProgramUniform4uiv(p, location, count, ptr),
                        _ => unreachable!(),
                    }
                }
                UniformValue::Float { components, data } => {
                    let ptr = data.as_ptr();
                    match components {
                        1 => gl::ProgramUniform1fv(p, location, count, ptr),
                        2 => gl::ProgramUniform2fv(p, location, count, ptr),
                        3 => gl::ProgramUniform3fv(p, location, count, ptr),
                        4 => gl::ProgramUniform4fv(p, location, count, ptr),
                        _ => unreachable!(),
                    }
                }
                UniformValue::Matrix {
                    columns,
                    rows,
                    transpose,
                    data,
                } => {
                    let t = if transpose { gl::TRUE } else { gl::FALSE };
                    let ptr = data.as_ptr();
                    match (columns, rows) {
                        (2, 2) => gl::ProgramUniformMatrix2fv(p, location, count, t, ptr),
                        (3, 3) => gl::ProgramUniformMatrix3fv(p, location, count, t, ptr),
                        (2, 3) => gl::ProgramUniformMatrix2x3fv(p, location, count, t, ptr),
                        (3, 2) => gl::ProgramUniformMatrix3x2fv(p, location, count, t, ptr),
                        (2, 4) => gl::ProgramUniformMatrix2x4fv(p, location, count, t, ptr),
                        (4, 2) => gl::ProgramUniformMatrix4x2fv(p, location, count, t, ptr),
                        (3, 4) => gl::ProgramUniformMatrix3x4fv(p, location, count, t, ptr),
                        (4, 3) => gl::ProgramUniformMatrix4x3fv(p, location, count, t, ptr),
                        (4, 4) => gl::ProgramUniformMatrix4fv(p, location, count, t, ptr),
                        _ => unreachable!(),
                    }
                }
            }
        }
    }

    fn gen_texture(&self) -> GLuint {
        let mut name = 0;
        unsafe { gl::GenTextures(1, &mut name) };
        name
    }

    fn delete_texture(&self, texture: GLuint) {
        unsafe { gl::DeleteTextures(1, &texture) }
    }

    fn bind_texture(&self, target: GLenum, texture: GLuint) {
        unsafe { gl::BindTexture(target, texture) }
    }

    fn active_texture(&self, unit: GLenum) {
        unsafe { gl::ActiveTexture(unit) }
    }

    fn tex_parameter_i(&self, target: GLenum, pname: GLenum, param: GLint) {
        unsafe { gl::TexParameteri(target, pname, param) }
    }

    fn tex_image_2d(
        &self,
        target: GLenum,
        level: GLint,
        internal_format: GLint,
        width: GLsizei,
        height: GLsizei,
        format: GLenum,
        ty: GLenum,
        data: Option<&[u8]>,
    ) {
        if let Some(data) = data {
            match image_data_len(width, height, format, ty) {
                Some(needed) if data.len() >= needed => {}
                _ => return self.reject(),
            }
        }

        let ptr = data.map(|d| d.as_ptr()).unwrap_or(null());
        unsafe {
            gl::PixelStorei(gl::UNPACK_ALIGNMENT, 1);
            gl::TexImage2D(
                target,
                level,
                internal_format,
                width,
                height,
                0, // border
                format,
                ty,
                ptr as *const _,
            )
        }
    }

    fn tex_level_parameter_i(&self, target: GLenum, level: GLint, pname: GLenum) -> GLint {
        let mut value = 0;
        unsafe { gl::GetTexLevelParameteriv(target, level, pname, &mut value) };
        value
    }

    fn generate_mipmap(&self, target: GLenum) {
        unsafe { gl::GenerateMipmap(target) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Writes `text` like a driver would, null terminated and clamped to the buffer
    fn fake_log(text: &'static str, reported: Option<GLsizei>) -> impl FnOnce(GLsizei, *mut GLsizei, *mut GLchar) {
        move |len, written, buf| {
            let n = text.len().min(len as usize - 1);
            unsafe {
                std::ptr::copy_nonoverlapping(text.as_ptr(), buf as *mut u8, n);
                *buf.add(n) = 0;
                *written = reported.unwrap_or(n as GLsizei);
            }
        }
    }

    #[test]
    fn read_log_with_no_length() {
        for len in [0, -1, GLint::MIN] {
            let log = read_log(len, |_, _, _| panic!("read with length {}", len));
            assert!(log.is_empty());
        }
    }

    #[test]
    fn read_log_contents() {
        let log = read_log(32, fake_log("0:1: error: oops", None));
        assert_eq!(log, "0:1: error: oops");

        // truncated to the buffer
        let log = read_log(5, fake_log("0:1: error: oops", None));
        assert_eq!(log, "0:1:");
    }

    #[test]
    fn read_log_clamps_written() {
        // a driver claiming more than the buffer
        let log = read_log(4, fake_log("abcdef", Some(100)));
        assert_eq!(log.len(), 4);
        assert!(log.starts_with("abc"));

        let log = read_log(8, fake_log("abc", Some(-3)));
        assert!(log.is_empty());
    }

    #[test]
    fn out_of_bounds_calls_rejected() {
        common::logging::for_tests();
        let driver = GlDriver::new();
        let data = [0.0; 4];

        // none of these reach a GL function pointer
        driver.uniform(0, 3, UniformValue::Float { components: 2, data: &data });
        assert_eq!(driver.rejected.get(), gl::INVALID_VALUE);
        driver.rejected.set(gl::NO_ERROR);

        let bad_shape = UniformValue::Float { components: 7, data: &data };
        driver.program_uniform(1, 0, 1, bad_shape);
        assert_eq!(driver.rejected.get(), gl::INVALID_VALUE);
        driver.rejected.set(gl::NO_ERROR);

        let matrix = UniformValue::Matrix {
            columns: 4,
            rows: 4,
            transpose: false,
            data: &data,
        };
        driver.uniform(0, 1, matrix);
        driver.program_uniform(1, 0, -1, matrix);

        let pixels = [0u8; 16];
        driver.tex_image_2d(gl::TEXTURE_2D, 0, gl::RGBA as GLint, 4, 4, gl::RGBA, gl::UNSIGNED_BYTE, Some(&pixels));
        driver.tex_image_2d(gl::TEXTURE_2D, 0, gl::RGBA as GLint, 2, 2, gl::RGBA, gl::DOUBLE, Some(&pixels));
        driver.tex_image_2d(gl::TEXTURE_2D, 0, gl::RGBA as GLint, -2, 2, gl::RGBA, gl::UNSIGNED_BYTE, Some(&pixels));

        // reported once, without asking GL
        assert_eq!(driver.get_error(), gl::INVALID_VALUE);
        assert_eq!(driver.rejected.get(), gl::NO_ERROR);
    }
}
