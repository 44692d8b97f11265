use crate::container::ResourceContainer;
use crate::error::{ResourceError, ResourceErrorKind};
use std::path::{Path, PathBuf};

/// A directory of shader sources
#[derive(Clone, Debug)]
pub struct Shaders(PathBuf);

impl ResourceContainer for Shaders {
    #[inline]
    fn path(&self) -> &Path {
        &self.0
    }
}

impl Shaders {
    /// `dir` must exist
    pub fn standalone<P: AsRef<Path>>(dir: P) -> Result<Self, ResourceError> {
        let dir = dir.as_ref();
        if dir.is_dir() {
            Ok(Self(dir.to_owned()))
        } else {
            Err(missing_dir(dir.parent().unwrap_or(dir), dir))
        }
    }
}

fn missing_dir(root: &Path, dir: &Path) -> ResourceError {
    ResourceError(
        root.to_owned(),
        ResourceErrorKind::MissingDirectory(dir.to_string_lossy().into_owned()),
    )
}
