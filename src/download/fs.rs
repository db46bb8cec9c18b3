//! File-system seam used by the downloader and manifest loaders.
//!
//! Everything that touches disk goes through [`FileSystem`] so tests can
//! observe or stub file operations. [`LocalFileSystem`] is the production
//! implementation on top of `tokio::fs`.

use std::io;
use std::path::Path;

use async_trait::async_trait;
use tokio::io::{AsyncRead, AsyncWrite};

/// Boxed async reader returned by [`FileSystem::open`].
pub type FileReader = Box<dyn AsyncRead + Send + Unpin>;

/// Boxed async writer returned by [`FileSystem::create`].
pub type FileWriter = Box<dyn AsyncWrite + Send + Unpin>;

/// File operations needed for artifact acquisition.
#[async_trait]
pub trait FileSystem: Send + Sync {
    /// Returns true if anything exists at `path`.
    async fn exists(&self, path: &Path) -> bool;

    /// Returns true if `path` is an existing regular file.
    async fn is_file(&self, path: &Path) -> bool;

    /// Creates `path` and any missing parents.
    async fn create_dir_all(&self, path: &Path) -> io::Result<()>;

    /// Reads a whole file as UTF-8.
    async fn read_to_string(&self, path: &Path) -> io::Result<String>;

    /// Creates or truncates `path` and writes `contents`.
    async fn write(&self, path: &Path, contents: &[u8]) -> io::Result<()>;

    /// Removes a file.
    async fn remove_file(&self, path: &Path) -> io::Result<()>;

    /// Opens a file for streaming reads.
    async fn open(&self, path: &Path) -> io::Result<FileReader>;

    /// Creates or truncates a file for streaming writes.
    async fn create(&self, path: &Path) -> io::Result<FileWriter>;

    /// Names of the directories directly under `path`.
    async fn list_dirs(&self, path: &Path) -> io::Result<Vec<String>>;
}

/// [`FileSystem`] backed by the local disk.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalFileSystem;

#[async_trait]
impl FileSystem for LocalFileSystem {
    async fn exists(&self, path: &Path) -> bool {
        tokio::fs::try_exists(path).await.unwrap_or(false)
    }

    async fn is_file(&self, path: &Path) -> bool {
        tokio::fs::metadata(path)
            .await
            .is_ok_and(|meta| meta.is_file())
    }

    async fn create_dir_all(&self, path: &Path) -> io::Result<()> {
        tokio::fs::create_dir_all(path).await
    }

    async fn read_to_string(&self, path: &Path) -> io::Result<String> {
        tokio::fs::read_to_string(path).await
    }

    async fn write(&self, path: &Path, contents: &[u8]) -> io::Result<()> {
        tokio::fs::write(path, contents).await
    }

    async fn remove_file(&self, path: &Path) -> io::Result<()> {
        tokio::fs::remove_file(path).await
    }

    async fn open(&self, path: &Path) -> io::Result<FileReader> {
        let file = tokio::fs::File::open(path).await?;
        Ok(Box::new(file))
    }

    async fn create(&self, path: &Path) -> io::Result<FileWriter> {
        let file = tokio::fs::File::create(path).await?;
        Ok(Box::new(file))
    }

    async fn list_dirs(&self, path: &Path) -> io::Result<Vec<String>> {
        let mut entries = tokio::fs::read_dir(path).await?;
        let mut names = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            if entry.file_type().await?.is_dir() {
                names.push(entry.file_name().to_string_lossy().into_owned());
            }
        }
        names.sort();
        Ok(names)
    }
}
