//! Artifact Fetch Core Library
//!
//! This library resolves package manifests to platform-specific artifacts
//! and downloads them reliably from object storage or plain HTTP(S).
//!
//! # Architecture
//!
//! The library is organized into the following modules:
//! - [`backoff`] - Retry schedule computation
//! - [`download`] - Conditional download engine with checksum verification
//! - [`storage`] - Object-storage URL recognition and transport
//! - [`manifest`] - Package/component manifests, version selection, host detection
//! - [`lock`] - Per-component action locks

// Clippy lints - strict for library code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod backoff;
pub mod download;
pub mod lock;
pub mod manifest;
pub mod storage;
pub(crate) mod user_agent;

#[cfg(test)]
pub(crate) mod test_support;

// Re-export commonly used types
pub use backoff::{BackoffError, BackoffPolicy, compute_schedule};
pub use download::{
    ArtifactDownloader, DownloadError, DownloadRequest, DownloadResult, DownloaderConfig,
    FailureClass, HttpClient, classify_error,
};
pub use lock::{ComponentLocks, LockError};
pub use manifest::{
    ComponentManifest, HostPlatform, ManifestError, PackageManifest, select_latest_version,
};
pub use storage::{AmazonS3Url, S3HttpClient, resolve_location};
