//! Scoped staging directory
//!
//! A package is extracted into a directory owned by a [`StagingDir`]. The
//! directory is created (or reset, when a previous failed run left it
//! behind) on construction and removed when the value is dropped, on every
//! exit path.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::error::{PackageError, PackageResult};

/// Working directory that lives exactly as long as this value
#[derive(Debug)]
pub struct StagingDir {
    path: PathBuf,
}

impl StagingDir {
    /// Create `parent/name`, destroying any leftover directory first
    pub fn create(parent: &Path, name: &str) -> PackageResult<Self> {
        let path = parent.join(name);

        if path.exists() {
            debug!("Removing stale staging directory {:?}", path);
            fs::remove_dir_all(&path).map_err(|source| PackageError::Staging {
                path: path.clone(),
                source,
            })?;
        }

        fs::create_dir_all(&path).map_err(|source| PackageError::Staging {
            path: path.clone(),
            source,
        })?;

        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for StagingDir {
    fn drop(&mut self) {
        if self.path.exists() {
            match fs::remove_dir_all(&self.path) {
                Ok(()) => debug!("Removed staging directory {:?}", self.path),
                Err(e) => warn!("Failed to remove staging directory {:?}: {}", self.path, e),
            }
        }
    }
}
