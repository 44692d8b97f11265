use crate::error::{ResourceError, ResourceErrorKind};
use common::*;
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use walkdir::WalkDir;

/// Represents a directory
pub trait ResourceContainer {
    fn path(&self) -> &Path;

    fn get_file(&self, file: impl AsRef<ResourceFile>) -> Result<ResourcePath, ResourceError> {
        let file = self.path().join(&file.as_ref().0);
        if !file.exists() {
            Err(ResourceError(file, ResourceErrorKind::FileNotFound))
        } else if !file.is_file() {
            Err(ResourceError(file, ResourceErrorKind::NotAFile))
        } else {
            Ok(ResourcePath(file))
        }
    }
}

/// A method of reading a file
pub trait ReadResource: Sized {
    fn read_resource(path: impl AsRef<ResourcePath>) -> Result<Self, ResourceError>;
}

/// A path to an existing resource file
#[derive(Clone)]
pub struct ResourcePath(PathBuf);

/// A resource file name
#[repr(transparent)]
pub struct ResourceFile(OsStr);

impl ResourcePath {
    /// Checks the path points to an existing file
    pub fn new(path: impl Into<PathBuf>) -> Result<Self, ResourceError> {
        let path = path.into();
        if !path.exists() {
            Err(ResourceError(path, ResourceErrorKind::FileNotFound))
        } else if !path.is_file() {
            Err(ResourceError(path, ResourceErrorKind::NotAFile))
        } else {
            Ok(Self(path))
        }
    }

    pub fn file_path(&self) -> &Path {
        &self.0
    }
}

impl AsRef<ResourcePath> for ResourcePath {
    fn as_ref(&self) -> &ResourcePath {
        self
    }
}

impl AsRef<ResourceFile> for str {
    fn as_ref(&self) -> &ResourceFile {
        AsRef::<OsStr>::as_ref(self).as_ref()
    }
}

impl AsRef<ResourceFile> for OsStr {
    fn as_ref(&self) -> &ResourceFile {
        // safety: repr transparent
        unsafe { &*(self as *const _ as *const _) }
    }
}

impl Debug for ResourceFile {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", &self.0)
    }
}

impl Debug for ResourcePath {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self.0)
    }
}

impl Display for ResourcePath {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.display())
    }
}

/// All files under the container with the given extension, sorted by path
pub fn recurse<R: ResourceContainer>(container: &R, ext: &str) -> Vec<ResourcePath> {
    let ext = OsStr::new(ext);
    WalkDir::new(container.path())
        .sort_by_file_name()
        .into_iter()
        .filter_map(|e| match e {
            Err(e) => {
                warn!("failed to read resource file"; "error" => %e);
                None
            }
            Ok(e) => {
                if e.path().is_file()
                    && e.path()
                        .extension()
                        .map(|this_ext| this_ext == ext)
                        .unwrap_or(false)
                {
                    Some(ResourcePath(e.into_path()))
                } else {
                    None
                }
            }
        })
        .collect()
}

impl ReadResource for String {
    fn read_resource(path: impl AsRef<ResourcePath>) -> Result<Self, ResourceError> {
        let path = path.as_ref();
        std::fs::read_to_string(&path.0)
            .map_err(|e| ResourceError(path.0.to_path_buf(), ResourceErrorKind::Io(Arc::new(e))))
    }
}
