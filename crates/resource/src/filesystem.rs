//! Loads resources from a base directory on the local filesystem.
//!
//! Resolved paths must stay inside the base directory: absolute paths and
//! `..` components that escape it are rejected.

use crate::{ResourceError, ResourceLoader, SharedResourceData};
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

#[derive(Debug)]
pub struct FilesystemResourceLoader {
    base_dir: PathBuf,
    canonical_base: Option<PathBuf>,
}

impl FilesystemResourceLoader {
    /// Creates a loader resolving paths relative to `base_dir`.
    pub fn new<P: AsRef<Path>>(base_dir: P) -> Self {
        let base_dir = base_dir.as_ref().to_path_buf();
        // May fail if the directory doesn't exist yet.
        let canonical_base = base_dir.canonicalize().ok();
        Self {
            base_dir,
            canonical_base,
        }
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// Returns `None` if the path would escape the base directory.
    fn resolve(&self, path: &str) -> Option<PathBuf> {
        if Path::new(path).is_absolute() {
            return None;
        }

        let full_path = self.base_dir.join(path);
        if let Ok(canonical) = full_path.canonicalize()
            && let Some(base) = &self.canonical_base
        {
            return canonical.starts_with(base).then_some(canonical);
        }

        // Not on disk: fall back to rejecting any parent component.
        if Path::new(path)
            .components()
            .any(|c| matches!(c, Component::ParentDir))
        {
            return None;
        }
        Some(full_path)
    }
}

impl ResourceLoader for FilesystemResourceLoader {
    fn load(&self, path: &str) -> Result<SharedResourceData, ResourceError> {
        let full_path = self.resolve(path).ok_or_else(|| ResourceError::InvalidPath {
            path: path.to_string(),
            message: "path escapes the base directory".to_string(),
        })?;
        log::debug!("Reading {}", full_path.display());

        std::fs::read(&full_path).map(Arc::new).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                ResourceError::NotFound(path.to_string())
            } else {
                ResourceError::LoadFailed {
                    path: path.to_string(),
                    message: e.to_string(),
                }
            }
        })
    }

    fn exists(&self, path: &str) -> bool {
        self.resolve(path).is_some_and(|p| p.is_file())
    }

    fn base(&self) -> Option<&str> {
        self.base_dir.to_str()
    }

    fn name(&self) -> &'static str {
        "FilesystemResourceLoader"
    }
}
