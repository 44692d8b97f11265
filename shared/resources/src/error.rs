use common::derive_more::{Display, Error};

use std::path::PathBuf;
use std::sync::Arc;

#[derive(Debug, Display, Error, Clone)]
#[display(fmt = "Error loading resource from {:?}: {}", "_0", "_1")]
pub struct ResourceError(pub PathBuf, #[error(source)] pub ResourceErrorKind);

#[derive(Debug, Display, Error, Clone)]
pub enum ResourceErrorKind {
    #[display(fmt = "No such directory {:?}", "_0")]
    MissingDirectory(#[error(not(source))] String),

    #[display(fmt = "File not found")]
    FileNotFound,

    #[display(fmt = "Path is not a file")]
    NotAFile,

    #[display(fmt = "Failed to read resource")]
    Io(Arc<std::io::Error>),
}
