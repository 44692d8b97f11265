use common::*;
use gl::types::*;
use resources::ResourceError;

use crate::shader::ShaderType;

#[derive(Debug, Error)]
pub enum GlError {
    #[error("Failed to load shader: {0}")]
    LoadingShader(#[from] ResourceError),

    #[error("Failed to compile {stage} shader: {log}")]
    CompilingShader { stage: ShaderType, log: String },

    #[error("Failed to link program: {0}")]
    LinkingProgram(String),

    #[error("Failed to validate program: {0}")]
    ValidatingProgram(String),

    #[error("Program object has not been created")]
    NoProgram,

    #[error("No GL object has been allocated")]
    NotAllocated,

    #[error("Unknown uniform {0:?}")]
    UnknownUniform(String),

    #[error("Invalid name {0:?}")]
    InvalidName(String),

    #[error("GL error: {0:#x}")]
    Gl(GLenum),

    #[error("Buffer is too small, requested {requested_len} but size is {real_len}")]
    BufferTooSmall {
        real_len: usize,
        requested_len: usize,
    },
}

pub type GlResult<T> = Result<T, GlError>;

/// Evaluates the driver call then checks `glGetError`
#[macro_export]
macro_rules! errchk {
    ($gl:expr, $val:expr) => {{
        let val = $val;
        $gl.check().map(|_| val)
    }};
}
