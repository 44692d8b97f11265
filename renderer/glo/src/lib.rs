//! Owning wrappers around OpenGL shader programs and textures.
//!
//! Everything goes through a [Gl] handle, created once the context is current with
//! [Gl::load_with]. Wrappers release their driver objects on drop.

mod context;
mod driver;
mod error;
mod gl_driver;
#[cfg(any(test, feature = "mock"))]
mod mock;
mod program;
mod resource;
mod shader;
mod texture;
mod uniform;

pub use context::{Gl, GlOptions};
pub use driver::{image_data_len, Driver, UniformValue};
pub use error::{GlError, GlResult};
pub use gl_driver::GlDriver;
#[cfg(any(test, feature = "mock"))]
pub use mock::{MockDriver, MockProgram, MockShader, MockState, MockTexture, MockUpload, MockValue};
pub use program::Program;
pub use resource::{Bindable, Resource, ScopedBind, ScopedBindable};
pub use shader::{ShaderType, UnknownShaderType};
pub use texture::{CubeFace, Texture, TextureCubeMap, TextureSize, TextureTarget};
pub use uniform::{uniform_type_name, uniforms_to_string, AsUniform, UniformInfo};

pub use gl;
