//! Entity-tag sidecar files for conditional re-fetch.
//!
//! For a destination file `<dest>`, the last entity tag the server returned
//! is kept in `<dest>.etag`. A stored tag is only replayed when both the
//! destination and the sidecar exist.

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use super::constants::ETAG_SUFFIX;
use super::error::DownloadError;
use super::fs::FileSystem;

/// Sidecar path for a destination file.
#[must_use]
pub fn sidecar_path(destination: &Path) -> PathBuf {
    let mut name = destination
        .file_name()
        .map(OsString::from)
        .unwrap_or_default();
    name.push(".");
    name.push(ETAG_SUFFIX);
    destination.with_file_name(name)
}

/// Reads and writes the entity-tag sidecar of destination files.
pub struct EtagCache<'a> {
    fs: &'a dyn FileSystem,
}

impl<'a> EtagCache<'a> {
    /// Creates a cache over `fs`.
    #[must_use]
    pub fn new(fs: &'a dyn FileSystem) -> Self {
        Self { fs }
    }

    /// Stored tag for `destination`, if both the file and its sidecar exist.
    pub async fn load(&self, destination: &Path) -> Option<String> {
        let sidecar = sidecar_path(destination);
        if !self.fs.exists(destination).await || !self.fs.exists(&sidecar).await {
            return None;
        }
        match self.fs.read_to_string(&sidecar).await {
            Ok(tag) => {
                let tag = tag.trim();
                (!tag.is_empty()).then(|| tag.to_string())
            }
            Err(error) => {
                warn!(path = %sidecar.display(), %error, "failed to read entity tag sidecar");
                None
            }
        }
    }

    /// Persists `tag` as the sidecar of `destination`.
    ///
    /// # Errors
    ///
    /// Returns [`DownloadError::Io`] if the sidecar cannot be written.
    pub async fn store(&self, destination: &Path, tag: &str) -> Result<(), DownloadError> {
        let sidecar = sidecar_path(destination);
        self.fs
            .write(&sidecar, tag.as_bytes())
            .await
            .map_err(|e| DownloadError::io(sidecar.clone(), e))?;
        debug!(path = %sidecar.display(), etag = %tag, "stored entity tag");
        Ok(())
    }

    /// Removes the sidecar only. Best effort.
    pub async fn forget(&self, destination: &Path) {
        remove_best_effort(self.fs, &sidecar_path(destination)).await;
    }

    /// Removes both the destination and its sidecar. Best effort.
    pub async fn discard(&self, destination: &Path) {
        remove_best_effort(self.fs, destination).await;
        self.forget(destination).await;
    }
}

async fn remove_best_effort(fs: &dyn FileSystem, path: &Path) {
    if !fs.exists(path).await {
        return;
    }
    match fs.remove_file(path).await {
        Ok(()) => debug!(path = %path.display(), "removed file"),
        Err(error) => warn!(path = %path.display(), %error, "failed to remove file"),
    }
}
