//! Error types for the download module.
//!
//! This module defines structured errors for all artifact download
//! operations, carrying the URL or path needed to diagnose a failure.

use std::path::PathBuf;

use thiserror::Error;

use super::checksum::ChecksumError;
use crate::backoff::BackoffError;

/// Errors that can occur while acquiring an artifact.
#[derive(Debug, Error)]
pub enum DownloadError {
    /// Network-level error (DNS resolution, connection refused, TLS errors, etc.)
    #[error("network error downloading {url}: {source}")]
    Network {
        /// The URL that failed to download.
        url: String,
        /// The underlying network error.
        #[source]
        source: reqwest::Error,
    },

    /// Request timed out before completion.
    #[error("timeout downloading {url}")]
    Timeout {
        /// The URL that timed out.
        url: String,
    },

    /// Non-success HTTP response other than "not modified".
    #[error("HTTP {status} downloading {url}")]
    HttpStatus {
        /// The URL that returned an error status.
        url: String,
        /// The HTTP status code.
        status: u16,
    },

    /// File system error (create directory, write, read, etc.)
    #[error("IO error at {path}: {source}")]
    Io {
        /// The file path where the error occurred.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// The source is neither an existing local file nor a valid URL.
    #[error("invalid URL: {url}")]
    InvalidUrl {
        /// The invalid URL string.
        url: String,
    },

    /// The HTTP client could not be constructed.
    #[error("failed to build HTTP client: {source}")]
    ClientBuild {
        /// The underlying builder error.
        #[source]
        source: reqwest::Error,
    },

    /// Retry schedule could not be computed from the configured values.
    #[error("invalid retry configuration: {0}")]
    Backoff(#[from] BackoffError),

    /// The artifact was fetched but failed checksum verification.
    ///
    /// The file is left on disk at `path` for diagnostics.
    #[error("checksum verification failed for {path}: {source}")]
    Verification {
        /// Local file that failed verification.
        path: PathBuf,
        /// The verification failure.
        #[source]
        source: ChecksumError,
    },
}

impl DownloadError {
    /// Creates a network error from a reqwest error.
    pub fn network(url: impl Into<String>, source: reqwest::Error) -> Self {
        Self::Network {
            url: url.into(),
            source,
        }
    }

    /// Creates an HTTP status error.
    pub fn http_status(url: impl Into<String>, status: u16) -> Self {
        Self::HttpStatus {
            url: url.into(),
            status,
        }
    }

    /// Creates a timeout error.
    pub fn timeout(url: impl Into<String>) -> Self {
        Self::Timeout { url: url.into() }
    }

    /// Creates an IO error.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Creates an invalid URL error.
    pub fn invalid_url(url: impl Into<String>) -> Self {
        Self::InvalidUrl { url: url.into() }
    }

    /// Creates a checksum verification error.
    pub fn verification(path: impl Into<PathBuf>, source: ChecksumError) -> Self {
        Self::Verification {
            path: path.into(),
            source,
        }
    }

    /// Returns the HTTP status carried by this error, if any.
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::HttpStatus { status, .. } => Some(*status),
            _ => None,
        }
    }
}

// Note on From trait implementations:
// `From<reqwest::Error>` and `From<std::io::Error>` are deliberately absent.
// Every variant needs the URL or path the source error lacks, so call sites
// go through the helper constructors above.
