use std::str::FromStr;

use common::*;
use gl::types::*;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ShaderType {
    Vertex,
    TessellationControl,
    TessellationEvaluation,
    Geometry,
    Fragment,
}

#[derive(Debug, Error)]
#[error("Unknown shader type {0:?}")]
pub struct UnknownShaderType(pub String);

impl ShaderType {
    pub const COUNT: usize = 5;

    /// In pipeline order
    pub const ALL: [ShaderType; Self::COUNT] = [
        ShaderType::Vertex,
        ShaderType::TessellationControl,
        ShaderType::TessellationEvaluation,
        ShaderType::Geometry,
        ShaderType::Fragment,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn gl_enum(self) -> GLenum {
        match self {
            ShaderType::Vertex => gl::VERTEX_SHADER,
            ShaderType::TessellationControl => gl::TESS_CONTROL_SHADER,
            ShaderType::TessellationEvaluation => gl::TESS_EVALUATION_SHADER,
            ShaderType::Geometry => gl::GEOMETRY_SHADER,
            ShaderType::Fragment => gl::FRAGMENT_SHADER,
        }
    }

    pub fn from_gl_enum(e: GLenum) -> Option<Self> {
        Self::ALL.iter().copied().find(|s| s.gl_enum() == e)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ShaderType::Vertex => "VERTEX",
            ShaderType::TessellationControl => "TESSELLATION_CONTROL",
            ShaderType::TessellationEvaluation => "TESSELLATION_EVALUATION",
            ShaderType::Geometry => "GEOMETRY",
            ShaderType::Fragment => "FRAGMENT",
        }
    }

    /// Conventional source file extension, as used by glslang
    pub fn extension(self) -> &'static str {
        match self {
            ShaderType::Vertex => "vert",
            ShaderType::TessellationControl => "tesc",
            ShaderType::TessellationEvaluation => "tese",
            ShaderType::Geometry => "geom",
            ShaderType::Fragment => "frag",
        }
    }

    pub fn from_extension(ext: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|s| s.extension() == ext)
    }
}

impl Display for ShaderType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ShaderType {
    type Err = UnknownShaderType;

    /// Accepts the display name (any case) or the file extension
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|ty| ty.as_str().eq_ignore_ascii_case(s))
            .or_else(|| Self::from_extension(s))
            .ok_or_else(|| UnknownShaderType(s.to_owned()))
    }
}

common::logging::slog_value_display!(ShaderType);
