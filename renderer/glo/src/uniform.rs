use std::borrow::Cow;
use std::ffi::CString;

use common::*;
use gl::types::*;

use crate::driver::UniformValue;
use crate::error::{GlError, GlResult};
use crate::program::Program;
use crate::resource::Resource;

/// An active uniform as reported by the driver
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UniformInfo {
    /// Arrays are reported as `name[0]`
    pub name: String,
    pub ty: GLenum,
    /// Array length, 1 for non-arrays
    pub size: GLint,
}

/// Anything that can be uploaded with one `glUniform*` call
pub trait AsUniform {
    fn as_uniform(&self) -> UniformValue<'_>;
}

const CACHE_SIZE: usize = 16;

/// Recently resolved locations, cleared on every link
#[derive(Default)]
pub(crate) struct UniformCache(ArrayVec<(String, GLint), CACHE_SIZE>);

impl UniformCache {
    pub(crate) fn resolve(
        &mut self,
        name: &str,
        lookup: impl FnOnce(&CString) -> GLint,
    ) -> GlResult<GLint> {
        if let Some((_, i)) = self.0.iter().find(|(s, _)| *s == name) {
            return Ok(*i);
        }

        let c_name = CString::new(name).map_err(|_| GlError::InvalidName(name.to_owned()))?;
        let location = lookup(&c_name);
        if location == -1 {
            Err(GlError::UnknownUniform(name.to_owned()))
        } else {
            if self.0.is_full() {
                // oldest first
                self.0.remove(0);
            }
            self.0.push((name.to_owned(), location));
            Ok(location)
        }
    }

    pub(crate) fn clear(&mut self) {
        self.0.clear();
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.0.len()
    }
}

impl Program {
    /// Location of an active uniform in the last successful link
    pub fn uniform_location(&self, name: &str) -> GlResult<GLint> {
        let program = self.checked_object()?;
        let gl = self.gl();
        let location = self
            .uniform_cache()
            .borrow_mut()
            .resolve(name, |c_name| gl.uniform_location(program, c_name))?;
        gl.check()?;
        Ok(location)
    }

    /// Uploads to the program currently in use, which should be this one (see
    /// [scoped_bind](crate::ScopedBindable::scoped_bind))
    pub fn set_uniform(&self, name: &str, value: impl AsUniform) -> GlResult<()> {
        self.set_uniform_value(name, value.as_uniform())
    }

    pub fn set_uniform_value(&self, name: &str, value: UniformValue) -> GlResult<()> {
        let count = value.count()?;
        let location = self.uniform_location(name)?;
        let gl = self.gl();
        gl.uniform(location, count, value);
        gl.check().map_err(|e| self.upload_failed(name, e))
    }

    /// `glUniform{components}iv`
    pub fn set_uniform_iv(&self, name: &str, components: u8, data: &[GLint]) -> GlResult<()> {
        self.set_uniform_value(name, UniformValue::Int { components, data })
    }

    /// `glUniform{components}uiv`
    pub fn set_uniform_uiv(&self, name: &str, components: u8, data: &[GLuint]) -> GlResult<()> {
        self.set_uniform_value(name, UniformValue::UInt { components, data })
    }

    /// `glUniform{components}fv`
    pub fn set_uniform_fv(&self, name: &str, components: u8, data: &[GLfloat]) -> GlResult<()> {
        self.set_uniform_value(name, UniformValue::Float { components, data })
    }

    /// `glUniformMatrix{columns}x{rows}fv`
    pub fn set_uniform_matrix(
        &self,
        name: &str,
        columns: u8,
        rows: u8,
        transpose: bool,
        data: &[GLfloat],
    ) -> GlResult<()> {
        self.set_uniform_value(
            name,
            UniformValue::Matrix {
                columns,
                rows,
                transpose,
                data,
            },
        )
    }

    /// `glProgramUniform*`, doesn't need the program to be in use
    pub fn set_program_uniform(&self, name: &str, value: impl AsUniform) -> GlResult<()> {
        let value = value.as_uniform();
        let count = value.count()?;
        let location = self.uniform_location(name)?;
        let gl = self.gl();
        gl.program_uniform(self.object(), location, count, value);
        gl.check().map_err(|e| self.upload_failed(name, e))
    }

    pub fn active_uniforms(&self) -> GlResult<Vec<UniformInfo>> {
        let program = self.checked_object()?;
        let gl = self.gl();

        let count = gl.program_iv(program, gl::ACTIVE_UNIFORMS);
        let max_len = gl.program_iv(program, gl::ACTIVE_UNIFORM_MAX_LENGTH);
        gl.check()?;

        let uniforms = (0..count.max(0) as GLuint)
            .map(|i| gl.active_uniform(program, i, max_len))
            .collect();
        gl.check()?;
        Ok(uniforms)
    }

    /// One `type name` line per active uniform
    pub fn active_uniforms_str(&self) -> GlResult<String> {
        Ok(uniforms_to_string(&self.active_uniforms()?))
    }

    fn upload_failed(&self, name: &str, err: GlError) -> GlError {
        if self.gl().options().log_diagnostics {
            warn!("failed to set uniform"; "program" => self.object(), "uniform" => name, "error" => %err);
        }
        err
    }
}

pub fn uniforms_to_string(uniforms: &[UniformInfo]) -> String {
    uniforms
        .iter()
        .map(|u| format!("{}\n", u))
        .collect::<String>()
}

/// GLSL keyword for a uniform type, hex for anything unrecognised
pub fn uniform_type_name(ty: GLenum) -> Cow<'static, str> {
    let name = match ty {
        gl::FLOAT => "float",
        gl::FLOAT_VEC2 => "vec2",
        gl::FLOAT_VEC3 => "vec3",
        gl::FLOAT_VEC4 => "vec4",
        gl::DOUBLE => "double",
        gl::DOUBLE_VEC2 => "dvec2",
        gl::DOUBLE_VEC3 => "dvec3",
        gl::DOUBLE_VEC4 => "dvec4",
        gl::INT => "int",
        gl::INT_VEC2 => "ivec2",
        gl::INT_VEC3 => "ivec3",
        gl::INT_VEC4 => "ivec4",
        gl::UNSIGNED_INT => "uint",
        gl::UNSIGNED_INT_VEC2 => "uvec2",
        gl::UNSIGNED_INT_VEC3 => "uvec3",
        gl::UNSIGNED_INT_VEC4 => "uvec4",
        gl::BOOL => "bool",
        gl::BOOL_VEC2 => "bvec2",
        gl::BOOL_VEC3 => "bvec3",
        gl::BOOL_VEC4 => "bvec4",
        gl::FLOAT_MAT2 => "mat2",
        gl::FLOAT_MAT3 => "mat3",
        gl::FLOAT_MAT4 => "mat4",
        gl::FLOAT_MAT2x3 => "mat2x3",
        gl::FLOAT_MAT2x4 => "mat2x4",
        gl::FLOAT_MAT3x2 => "mat3x2",
        gl::FLOAT_MAT3x4 => "mat3x4",
        gl::FLOAT_MAT4x2 => "mat4x2",
        gl::FLOAT_MAT4x3 => "mat4x3",
        gl::SAMPLER_1D => "sampler1D",
        gl::SAMPLER_2D => "sampler2D",
        gl::SAMPLER_3D => "sampler3D",
        gl::SAMPLER_CUBE => "samplerCube",
        gl::SAMPLER_1D_SHADOW => "sampler1DShadow",
        gl::SAMPLER_2D_SHADOW => "sampler2DShadow",
        gl::SAMPLER_CUBE_SHADOW => "samplerCubeShadow",
        gl::SAMPLER_1D_ARRAY => "sampler1DArray",
        gl::SAMPLER_2D_ARRAY => "sampler2DArray",
        gl::SAMPLER_2D_RECT => "sampler2DRect",
        gl::SAMPLER_BUFFER => "samplerBuffer",
        gl::SAMPLER_2D_MULTISAMPLE => "sampler2DMS",
        gl::INT_SAMPLER_2D => "isampler2D",
        gl::INT_SAMPLER_3D => "isampler3D",
        gl::INT_SAMPLER_CUBE => "isamplerCube",
        gl::UNSIGNED_INT_SAMPLER_2D => "usampler2D",
        gl::UNSIGNED_INT_SAMPLER_3D => "usampler3D",
        gl::UNSIGNED_INT_SAMPLER_CUBE => "usamplerCube",
        other => return Cow::Owned(format!("{:#x}", other)),
    };

    Cow::Borrowed(name)
}

impl Display for UniformInfo {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", uniform_type_name(self.ty), self.name)?;
        if self.size > 1 {
            write!(f, " ({} elements)", self.size)?;
        }
        Ok(())
    }
}

macro_rules! scalar_uniform {
    (@vec $ty:ty, $variant:ident, $n:expr) => {
        impl AsUniform for [$ty; $n] {
            fn as_uniform(&self) -> UniformValue<'_> {
                UniformValue::$variant {
                    components: $n,
                    data: &self[..],
                }
            }
        }

        impl AsUniform for [[$ty; $n]] {
            fn as_uniform(&self) -> UniformValue<'_> {
                UniformValue::$variant {
                    components: $n,
                    data: self.as_flattened(),
                }
            }
        }
    };

    ($ty:ty, $variant:ident) => {
        impl AsUniform for $ty {
            fn as_uniform(&self) -> UniformValue<'_> {
                UniformValue::$variant {
                    components: 1,
                    data: std::slice::from_ref(self),
                }
            }
        }

        impl AsUniform for [$ty] {
            fn as_uniform(&self) -> UniformValue<'_> {
                UniformValue::$variant {
                    components: 1,
                    data: self,
                }
            }
        }

        scalar_uniform!(@vec $ty, $variant, 2);
        scalar_uniform!(@vec $ty, $variant, 3);
        scalar_uniform!(@vec $ty, $variant, 4);
    };
}

scalar_uniform!(GLint, Int);
scalar_uniform!(GLuint, UInt);
scalar_uniform!(GLfloat, Float);

/// Column-major `[[f32; rows]; columns]`, as cgmath lays out its matrices
macro_rules! matrix_uniform {
    ($columns:expr, $rows:expr) => {
        impl AsUniform for [[GLfloat; $rows]; $columns] {
            fn as_uniform(&self) -> UniformValue<'_> {
                UniformValue::Matrix {
                    columns: $columns,
                    rows: $rows,
                    transpose: false,
                    data: self.as_flattened(),
                }
            }
        }

        impl AsUniform for [[[GLfloat; $rows]; $columns]] {
            fn as_uniform(&self) -> UniformValue<'_> {
                UniformValue::Matrix {
                    columns: $columns,
                    rows: $rows,
                    transpose: false,
                    data: self.as_flattened().as_flattened(),
                }
            }
        }
    };
}

// square matrices are covered by [[f32; N]; N]
matrix_uniform!(2, 2);
matrix_uniform!(3, 3);
matrix_uniform!(4, 4);
matrix_uniform!(2, 3);
matrix_uniform!(3, 2);
matrix_uniform!(2, 4);
matrix_uniform!(4, 2);
matrix_uniform!(3, 4);
matrix_uniform!(4, 3);

macro_rules! cgmath_uniform {
    ($ty:ident, $repr:ty) => {
        impl AsUniform for cgmath::$ty<GLfloat> {
            fn as_uniform(&self) -> UniformValue<'_> {
                AsRef::<$repr>::as_ref(self).as_uniform()
            }
        }
    };
}

cgmath_uniform!(Vector2, [GLfloat; 2]);
cgmath_uniform!(Vector3, [GLfloat; 3]);
cgmath_uniform!(Vector4, [GLfloat; 4]);
cgmath_uniform!(Matrix2, [[GLfloat; 2]; 2]);
cgmath_uniform!(Matrix3, [[GLfloat; 3]; 3]);
cgmath_uniform!(Matrix4, [[GLfloat; 4]; 4]);

impl<T: AsUniform + ?Sized> AsUniform for &T {
    fn as_uniform(&self) -> UniformValue<'_> {
        (**self).as_uniform()
    }
}

impl<'a> AsUniform for UniformValue<'a> {
    fn as_uniform(&self) -> UniformValue<'_> {
        *self
    }
}
