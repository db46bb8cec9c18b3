//! Artifact download engine with conditional re-fetch and verification.
//!
//! This module turns a [`DownloadRequest`] into a verified file on disk.
//!
//! # Features
//!
//! - Object-storage transport first for bucket URLs, HTTP fallback
//! - Conditional re-fetch through `.etag` sidecar files
//! - Backoff-driven retries, with HTTP 403 and certificate failures terminal
//! - Streaming writes (memory-efficient for large artifacts)
//! - SHA-256 / MD5 checksum verification
//! - Injected transports and file system for testing
//!
//! # Example
//!
//! ```no_run
//! use artifact_core::download::{ArtifactDownloader, DownloadRequest, DownloaderConfig};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let downloader = ArtifactDownloader::new(DownloaderConfig::default())?;
//! let result = downloader
//!     .download(&DownloadRequest::new("https://example.com/agent.zip"))
//!     .await?;
//! println!("Downloaded: {}", result.local_file_path.display());
//! # Ok(())
//! # }
//! ```

mod checksum;
pub(crate) mod client;
pub mod constants;
mod engine;
mod error;
pub mod etag;
pub mod fs;
mod retry;
pub(crate) mod transport;

pub use checksum::{ChecksumError, HashAlgorithm, Verification, compute_digest, verify_checksums};
pub use client::HttpClient;
pub use constants::{DEFAULT_MAX_RETRIES, DEFAULT_RETRY_INITIAL_INTERVAL};
pub use engine::{
    ArtifactDownloader, DownloadRequest, DownloadResult, DownloaderConfig, content_address,
    default_download_root,
};
pub use error::DownloadError;
pub use etag::{EtagCache, sidecar_path};
pub use fs::{FileSystem, LocalFileSystem};
pub use retry::{FailureClass, classify_error, retry_with_backoff};
pub use transport::{BodyStream, FetchResponse, HttpTransport};

