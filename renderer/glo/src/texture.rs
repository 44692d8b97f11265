use std::ops::{Deref, DerefMut};

use common::*;
use gl::types::*;

use crate::context::Gl;
use crate::driver::image_data_len;
use crate::errchk;
use crate::error::{GlError, GlResult};
use crate::resource::{Bindable, Resource};

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum TextureTarget {
    Texture1D,
    Texture2D,
    Texture3D,
    Rectangle,
    CubeMap,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum CubeFace {
    PositiveX,
    NegativeX,
    PositiveY,
    NegativeY,
    PositiveZ,
    NegativeZ,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub struct TextureSize {
    pub width: GLint,
    pub height: GLint,
    pub depth: GLint,
}

/// A texture object of a fixed target. Nothing is allocated until [generate](Self::generate).
///
/// Most operations bind the texture to its target on the active unit and leave it bound.
pub struct Texture {
    gl: Gl,
    target: TextureTarget,
    object: GLuint,
}

/// A [Texture] with target `GL_TEXTURE_CUBE_MAP`, uploaded a face at a time
pub struct TextureCubeMap(Texture);

impl From<TextureTarget> for GLenum {
    fn from(target: TextureTarget) -> Self {
        match target {
            TextureTarget::Texture1D => gl::TEXTURE_1D,
            TextureTarget::Texture2D => gl::TEXTURE_2D,
            TextureTarget::Texture3D => gl::TEXTURE_3D,
            TextureTarget::Rectangle => gl::TEXTURE_RECTANGLE,
            TextureTarget::CubeMap => gl::TEXTURE_CUBE_MAP,
        }
    }
}

impl CubeFace {
    /// In `GL_TEXTURE_CUBE_MAP_POSITIVE_X + i` order
    pub const ALL: [CubeFace; 6] = [
        CubeFace::PositiveX,
        CubeFace::NegativeX,
        CubeFace::PositiveY,
        CubeFace::NegativeY,
        CubeFace::PositiveZ,
        CubeFace::NegativeZ,
    ];

    pub fn gl_enum(self) -> GLenum {
        gl::TEXTURE_CUBE_MAP_POSITIVE_X + self as GLenum
    }
}

impl Texture {
    pub fn new(gl: &Gl, target: TextureTarget) -> Self {
        Self {
            gl: gl.clone(),
            target,
            object: 0,
        }
    }

    /// Allocates the texture object if there isn't one already
    pub fn generate(&mut self) -> GlResult<GLuint> {
        if self.object == 0 {
            let object = errchk!(self.gl, self.gl.gen_texture())?;
            if object == 0 {
                return Err(GlError::NotAllocated);
            }

            trace!("generated texture"; "texture" => object, "target" => ?self.target);
            self.object = object;
        }

        Ok(self.object)
    }

    pub fn target(&self) -> TextureTarget {
        self.target
    }

    /// Binds to the target on the active unit. See also [ScopedBindable](crate::ScopedBindable)
    pub fn bind(&self) -> GlResult<()> {
        let object = self.checked_object()?;
        errchk!(self.gl, self.gl.bind_texture(self.target.into(), object))
    }

    /// Makes `GL_TEXTURE0 + unit` active, then binds
    pub fn bind_to_unit(&self, unit: u32) -> GlResult<()> {
        self.checked_object()?;
        let unit = gl::TEXTURE0
            .checked_add(unit)
            .ok_or(GlError::Gl(gl::INVALID_ENUM))?;
        errchk!(self.gl, self.gl.active_texture(unit))?;
        self.bind()
    }

    /// `glTexParameteri`
    pub fn set_parameter(&self, pname: GLenum, value: GLint) -> GlResult<()> {
        self.bind()?;
        errchk!(self.gl, self.gl.tex_parameter_i(self.target.into(), pname, value))
    }

    pub fn set_filters(&self, min: GLenum, mag: GLenum) -> GlResult<()> {
        self.set_parameter(gl::TEXTURE_MIN_FILTER, min as GLint)?;
        self.set_parameter(gl::TEXTURE_MAG_FILTER, mag as GLint)
    }

    pub fn set_wrap(&self, s: GLenum, t: GLenum, r: GLenum) -> GlResult<()> {
        self.set_parameter(gl::TEXTURE_WRAP_S, s as GLint)?;
        self.set_parameter(gl::TEXTURE_WRAP_T, t as GLint)?;
        self.set_parameter(gl::TEXTURE_WRAP_R, r as GLint)
    }

    /// `glTexImage2D` on this texture's target. `data` of `None` allocates storage only,
    /// otherwise it must hold at least `width * height` tightly packed pixels
    #[allow(clippy::too_many_arguments)]
    pub fn image_2d(
        &self,
        level: GLint,
        internal_format: GLenum,
        width: u32,
        height: u32,
        format: GLenum,
        ty: GLenum,
        data: Option<&[u8]>,
    ) -> GlResult<()> {
        self.upload(
            self.target.into(),
            level,
            internal_format,
            width,
            height,
            format,
            ty,
            data,
        )
    }

    pub fn generate_mipmap(&self) -> GlResult<()> {
        self.bind()?;
        errchk!(self.gl, self.gl.generate_mipmap(self.target.into()))
    }

    /// Dimensions of the given mip level as reported by the driver, zero if it has no image.
    /// A cube map reports its +X face.
    pub fn size(&self, level: GLint) -> GlResult<TextureSize> {
        let target = match self.target {
            TextureTarget::CubeMap => CubeFace::PositiveX.gl_enum(),
            t => t.into(),
        };

        self.level_size(target, level)
    }

    #[allow(clippy::too_many_arguments)]
    fn upload(
        &self,
        image_target: GLenum,
        level: GLint,
        internal_format: GLenum,
        width: u32,
        height: u32,
        format: GLenum,
        ty: GLenum,
        data: Option<&[u8]>,
    ) -> GlResult<()> {
        self.checked_object()?;
        let (width, height) = match (GLsizei::try_from(width), GLsizei::try_from(height)) {
            (Ok(w), Ok(h)) => (w, h),
            _ => return Err(GlError::Gl(gl::INVALID_VALUE)),
        };

        if let Some(data) = data {
            let needed =
                image_data_len(width, height, format, ty).ok_or(GlError::Gl(gl::INVALID_ENUM))?;
            if data.len() < needed {
                return Err(GlError::BufferTooSmall {
                    real_len: data.len(),
                    requested_len: needed,
                });
            }
        }

        self.bind()?;
        errchk!(
            self.gl,
            self.gl.tex_image_2d(
                image_target,
                level,
                internal_format as GLint,
                width,
                height,
                format,
                ty,
                data,
            )
        )?;

        trace!("uploaded texture image"; "texture" => self.object, "level" => level,
            "width" => width, "height" => height, "data" => data.map(|d| d.len()));
        Ok(())
    }

    fn level_size(&self, image_target: GLenum, level: GLint) -> GlResult<TextureSize> {
        self.bind()?;

        let query = |pname| self.gl.tex_level_parameter_i(image_target, level, pname);
        let size = TextureSize {
            width: query(gl::TEXTURE_WIDTH),
            height: query(gl::TEXTURE_HEIGHT),
            depth: if self.target == TextureTarget::CubeMap {
                1
            } else {
                query(gl::TEXTURE_DEPTH)
            },
        };

        self.gl.check().map(|_| size)
    }

    fn checked_object(&self) -> GlResult<GLuint> {
        match self.object {
            0 => Err(GlError::NotAllocated),
            o => Ok(o),
        }
    }
}

impl TextureCubeMap {
    pub fn new(gl: &Gl) -> Self {
        Self(Texture::new(gl, TextureTarget::CubeMap))
    }

    /// `glTexImage2D` on one face
    #[allow(clippy::too_many_arguments)]
    pub fn image_face(
        &self,
        face: CubeFace,
        level: GLint,
        internal_format: GLenum,
        width: u32,
        height: u32,
        format: GLenum,
        ty: GLenum,
        data: Option<&[u8]>,
    ) -> GlResult<()> {
        self.0.upload(
            face.gl_enum(),
            level,
            internal_format,
            width,
            height,
            format,
            ty,
            data,
        )
    }

    pub fn face_size(&self, face: CubeFace, level: GLint) -> GlResult<TextureSize> {
        self.0.level_size(face.gl_enum(), level)
    }
}

impl Deref for TextureCubeMap {
    type Target = Texture;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl DerefMut for TextureCubeMap {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.0
    }
}

impl Resource for Texture {
    fn object(&self) -> GLuint {
        self.object
    }

    fn release(&mut self) {
        if self.object != 0 {
            self.gl.delete_texture(self.object);
            trace!("released texture"; "texture" => self.object);
            self.object = 0;
        }
    }
}

impl Resource for TextureCubeMap {
    fn object(&self) -> GLuint {
        self.0.object
    }

    fn release(&mut self) {
        self.0.release()
    }
}

impl Drop for Texture {
    fn drop(&mut self) {
        self.release();
    }
}

/// Unbinding binds 0 to the target on the active unit
impl Bindable for Texture {
    fn bind(&self) {
        self.gl.bind_texture(self.target.into(), self.object);
    }

    fn unbind(&self) {
        self.gl.bind_texture(self.target.into(), 0);
    }
}

impl Debug for Texture {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Texture")
            .field("target", &self.target)
            .field("object", &self.object)
            .finish()
    }
}

impl Debug for TextureCubeMap {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("TextureCubeMap").field(&self.0.object).finish()
    }
}
