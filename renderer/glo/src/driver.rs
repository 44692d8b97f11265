use std::ffi::CStr;

use gl::types::*;

use crate::error::{GlError, GlResult};
use crate::uniform::UniformInfo;

/// The driver entry points used by this crate.
///
/// [GlDriver] forwards to the loaded OpenGL function pointers. Everything above this trait only
/// does bookkeeping, which lets it run against [MockDriver](crate::MockDriver) in tests.
///
/// All methods must be called on the thread that owns the context.
pub trait Driver {
    fn get_error(&self) -> GLenum;
    fn get_integer(&self, pname: GLenum) -> GLint;

    fn create_program(&self) -> GLuint;
    fn delete_program(&self, program: GLuint);
    fn attach_shader(&self, program: GLuint, shader: GLuint);
    fn detach_shader(&self, program: GLuint, shader: GLuint);
    fn link_program(&self, program: GLuint);
    fn validate_program(&self, program: GLuint);
    fn use_program(&self, program: GLuint);
    fn program_iv(&self, program: GLuint, pname: GLenum) -> GLint;
    fn program_info_log(&self, program: GLuint) -> String;

    fn create_shader(&self, kind: GLenum) -> GLuint;
    fn delete_shader(&self, shader: GLuint);
    fn shader_source(&self, shader: GLuint, source: &str);
    fn compile_shader(&self, shader: GLuint);
    fn shader_iv(&self, shader: GLuint, pname: GLenum) -> GLint;
    fn shader_info_log(&self, shader: GLuint) -> String;

    /// -1 if not an active uniform
    fn uniform_location(&self, program: GLuint, name: &CStr) -> GLint;
    fn active_uniform(&self, program: GLuint, index: GLuint, max_name_len: GLint) -> UniformInfo;
    /// Uploads to the program currently in use
    fn uniform(&self, location: GLint, count: GLsizei, value: UniformValue);
    fn program_uniform(&self, program: GLuint, location: GLint, count: GLsizei, value: UniformValue);

    fn gen_texture(&self) -> GLuint;
    fn delete_texture(&self, texture: GLuint);
    fn bind_texture(&self, target: GLenum, texture: GLuint);
    fn active_texture(&self, unit: GLenum);
    fn tex_parameter_i(&self, target: GLenum, pname: GLenum, param: GLint);
    #[allow(clippy::too_many_arguments)]
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
    );
    fn tex_level_parameter_i(&self, target: GLenum, level: GLint, pname: GLenum) -> GLint;
    fn generate_mipmap(&self, target: GLenum);
}

/// A borrowed uniform upload, one variant per `glUniform*` family
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum UniformValue<'a> {
    /// `glUniform{1,2,3,4}iv`
    Int { components: u8, data: &'a [GLint] },
    /// `glUniform{1,2,3,4}uiv`
    UInt { components: u8, data: &'a [GLuint] },
    /// `glUniform{1,2,3,4}fv`
    Float { components: u8, data: &'a [GLfloat] },
    /// `glUniformMatrix{C}x{R}fv`, column-major unless `transpose`
    Matrix {
        columns: u8,
        rows: u8,
        transpose: bool,
        data: &'a [GLfloat],
    },
}

impl<'a> UniformValue<'a> {
    /// Number of scalars in one uniform element
    pub fn element_len(&self) -> usize {
        match *self {
            UniformValue::Int { components, .. }
            | UniformValue::UInt { components, .. }
            | UniformValue::Float { components, .. } => components as usize,
            UniformValue::Matrix { columns, rows, .. } => columns as usize * rows as usize,
        }
    }

    pub fn data_len(&self) -> usize {
        match self {
            UniformValue::Int { data, .. } => data.len(),
            UniformValue::UInt { data, .. } => data.len(),
            UniformValue::Float { data, .. } | UniformValue::Matrix { data, .. } => data.len(),
        }
    }

    /// Array element count to pass to the driver. The data must hold a whole, non-zero number of
    /// elements and the shape must be one GL has an entry point for.
    pub fn count(&self) -> GlResult<GLsizei> {
        let shape_ok = match *self {
            UniformValue::Int { components, .. }
            | UniformValue::UInt { components, .. }
            | UniformValue::Float { components, .. } => (1..=4).contains(&components),
            UniformValue::Matrix { columns, rows, .. } => {
                (2..=4).contains(&columns) && (2..=4).contains(&rows)
            }
        };
        if !shape_ok {
            return Err(GlError::Gl(gl::INVALID_VALUE));
        }

        let element = self.element_len();
        let len = self.data_len();
        if len == 0 || len % element != 0 {
            let requested_len = (len / element + 1) * element;
            return Err(GlError::BufferTooSmall {
                real_len: len,
                requested_len,
            });
        }

        Ok((len / element) as GLsizei)
    }

    /// Whether `count` elements can be read from the data without running off the end
    pub fn holds(&self, count: GLsizei) -> bool {
        matches!(self.count(), Ok(n) if (0..=n).contains(&count))
    }
}

/// Bytes needed for a tightly packed (`UNPACK_ALIGNMENT` 1) `width`x`height` image, or None for
/// negative sizes and unknown format/type pairs
pub fn image_data_len(width: GLsizei, height: GLsizei, format: GLenum, ty: GLenum) -> Option<usize> {
    let width = usize::try_from(width).ok()?;
    let height = usize::try_from(height).ok()?;
    width.checked_mul(height)?.checked_mul(pixel_len(format, ty)?)
}

fn pixel_len(format: GLenum, ty: GLenum) -> Option<usize> {
    // packed types hold the whole pixel
    let packed = match ty {
        gl::UNSIGNED_BYTE_3_3_2 | gl::UNSIGNED_BYTE_2_3_3_REV => Some(1),
        gl::UNSIGNED_SHORT_5_6_5
        | gl::UNSIGNED_SHORT_5_6_5_REV
        | gl::UNSIGNED_SHORT_4_4_4_4
        | gl::UNSIGNED_SHORT_4_4_4_4_REV
        | gl::UNSIGNED_SHORT_5_5_5_1
        | gl::UNSIGNED_SHORT_1_5_5_5_REV => Some(2),
        gl::UNSIGNED_INT_8_8_8_8
        | gl::UNSIGNED_INT_8_8_8_8_REV
        | gl::UNSIGNED_INT_10_10_10_2
        | gl::UNSIGNED_INT_2_10_10_10_REV
        | gl::UNSIGNED_INT_24_8
        | gl::UNSIGNED_INT_10F_11F_11F_REV
        | gl::UNSIGNED_INT_5_9_9_9_REV => Some(4),
        _ => None,
    };
    if packed.is_some() {
        return packed;
    }

    let components = match format {
        gl::RED | gl::RED_INTEGER | gl::DEPTH_COMPONENT | gl::STENCIL_INDEX => 1,
        gl::RG | gl::RG_INTEGER | gl::DEPTH_STENCIL => 2,
        gl::RGB | gl::BGR | gl::RGB_INTEGER | gl::BGR_INTEGER => 3,
        gl::RGBA | gl::BGRA | gl::RGBA_INTEGER | gl::BGRA_INTEGER => 4,
        _ => return None,
    };
    let size = match ty {
        gl::BYTE | gl::UNSIGNED_BYTE => 1,
        gl::SHORT | gl::UNSIGNED_SHORT | gl::HALF_FLOAT => 2,
        gl::INT | gl::UNSIGNED_INT | gl::FLOAT => 4,
        _ => return None,
    };
    Some(components * size)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts() {
        let v = UniformValue::Float {
            components: 3,
            data: &[0.0; 6],
        };
        assert_eq!(v.element_len(), 3);
        assert_eq!(v.count().unwrap(), 2);

        let m = UniformValue::Matrix {
            columns: 2,
            rows: 3,
            transpose: false,
            data: &[0.0; 6],
        };
        assert_eq!(m.element_len(), 6);
        assert_eq!(m.count().unwrap(), 1);
    }

    #[test]
    fn partial_element() {
        let v = UniformValue::Int {
            components: 4,
            data: &[1, 2, 3, 4, 5],
        };
        assert!(matches!(
            v.count(),
            Err(GlError::BufferTooSmall {
                real_len: 5,
                requested_len: 8
            })
        ));

        let empty = UniformValue::UInt {
            components: 2,
            data: &[],
        };
        assert!(matches!(
            empty.count(),
            Err(GlError::BufferTooSmall {
                real_len: 0,
                requested_len: 2
            })
        ));
    }

    #[test]
    fn holds() {
        let v = UniformValue::Float {
            components: 2,
            data: &[0.0; 4],
        };
        assert!(v.holds(0));
        assert!(v.holds(2));
        assert!(!v.holds(3));
        assert!(!v.holds(-1));

        let bad = UniformValue::Int {
            components: 0,
            data: &[1],
        };
        assert!(!bad.holds(1));
    }

    #[test]
    fn image_sizes() {
        assert_eq!(image_data_len(64, 32, gl::RGBA, gl::UNSIGNED_BYTE), Some(64 * 32 * 4));
        assert_eq!(image_data_len(3, 3, gl::RGB, gl::FLOAT), Some(3 * 3 * 12));
        assert_eq!(image_data_len(10, 1, gl::RG, gl::HALF_FLOAT), Some(40));
        assert_eq!(
            image_data_len(8, 8, gl::RGB, gl::UNSIGNED_SHORT_5_6_5),
            Some(128)
        );
        assert_eq!(
            image_data_len(4, 4, gl::DEPTH_STENCIL, gl::UNSIGNED_INT_24_8),
            Some(64)
        );
        assert_eq!(image_data_len(0, 100, gl::RGBA, gl::UNSIGNED_BYTE), Some(0));

        assert_eq!(image_data_len(-1, 4, gl::RGBA, gl::UNSIGNED_BYTE), None);
        assert_eq!(image_data_len(4, 4, gl::RGBA, gl::DOUBLE), None);
        assert_eq!(image_data_len(4, 4, gl::TEXTURE_2D, gl::UNSIGNED_BYTE), None);
    }

    #[test]
    fn bad_shape() {
        let v = UniformValue::Float {
            components: 5,
            data: &[0.0; 5],
        };
        assert!(matches!(v.count(), Err(GlError::Gl(gl::INVALID_VALUE))));

        let m = UniformValue::Matrix {
            columns: 1,
            rows: 4,
            transpose: true,
            data: &[0.0; 4],
        };
        assert!(matches!(m.count(), Err(GlError::Gl(gl::INVALID_VALUE))));
    }
}
