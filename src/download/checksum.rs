//! Checksum verification for downloaded artifacts.
//!
//! Every recognized algorithm in the checksum map must match; unrecognized
//! algorithm names are skipped. A map that is empty, or that holds exactly
//! one entry with an empty algorithm name or digest, requests no
//! verification at all and no file I/O happens.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use md5::Md5;
use sha2::{Digest, Sha256};
use thiserror::Error;
use tokio::io::AsyncReadExt;
use tracing::{debug, instrument, warn};

use super::fs::FileSystem;

/// Read buffer size used while hashing.
const HASH_BUFFER_SIZE: usize = 64 * 1024;

/// Digest algorithms the verifier can compute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HashAlgorithm {
    /// SHA-256; also used when the algorithm name is empty.
    Sha256,
    /// MD5.
    Md5,
}

impl HashAlgorithm {
    /// Maps a checksum-map key to an algorithm. Empty means SHA-256.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "" | "sha256" => Some(Self::Sha256),
            "md5" => Some(Self::Md5),
            _ => None,
        }
    }

    /// Stable lowercase name.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Sha256 => "sha256",
            Self::Md5 => "md5",
        }
    }
}

/// Outcome of a successful verification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verification {
    /// No verification was requested.
    Skipped,
    /// Every recognized algorithm matched.
    Matched {
        /// Algorithms that were computed and compared.
        algorithms: Vec<HashAlgorithm>,
    },
}

impl Verification {
    /// Always true; a mismatch is reported as [`ChecksumError`] instead.
    #[must_use]
    pub fn is_matched(&self) -> bool {
        true
    }
}

/// Checksum verification failures.
#[derive(Debug, Error)]
pub enum ChecksumError {
    /// A recognized algorithm produced a different digest.
    #[error("{algorithm} mismatch: expected {expected}, computed {actual}")]
    Mismatch {
        /// Algorithm name.
        algorithm: &'static str,
        /// Digest from the checksum map.
        expected: String,
        /// Digest computed from the file.
        actual: String,
    },

    /// None of the supplied algorithm names is supported.
    #[error("no supported checksum algorithm provided")]
    NoSupportedAlgorithm,

    /// The file could not be read.
    #[error("failed to read {path}: {source}")]
    Io {
        /// File being hashed.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },
}

/// Verifies `path` against every recognized entry in `checksums`.
///
/// # Errors
///
/// - [`ChecksumError::Mismatch`] if any recognized algorithm disagrees, even
///   when another algorithm matched.
/// - [`ChecksumError::NoSupportedAlgorithm`] if no key is recognized.
/// - [`ChecksumError::Io`] if the file cannot be read.
#[instrument(skip(fs, checksums), fields(path = %path.display(), entries = checksums.len()))]
pub async fn verify_checksums(
    fs: &dyn FileSystem,
    checksums: &BTreeMap<String, String>,
    path: &Path,
) -> Result<Verification, ChecksumError> {
    if verification_skipped(checksums) {
        debug!("no checksum requested, skipping verification");
        return Ok(Verification::Skipped);
    }

    let mut algorithms = Vec::new();
    for (name, expected) in checksums {
        let Some(algorithm) = HashAlgorithm::from_name(name) else {
            debug!(algorithm = %name, "skipping unsupported checksum algorithm");
            continue;
        };

        let actual = compute_digest(fs, algorithm, path).await?;
        if !actual.eq_ignore_ascii_case(expected.trim()) {
            warn!(
                algorithm = algorithm.as_str(),
                expected = %expected,
                actual = %actual,
                "checksum mismatch"
            );
            return Err(ChecksumError::Mismatch {
                algorithm: algorithm.as_str(),
                expected: expected.clone(),
                actual,
            });
        }
        algorithms.push(algorithm);
    }

    if algorithms.is_empty() {
        return Err(ChecksumError::NoSupportedAlgorithm);
    }

    debug!(?algorithms, "checksums verified");
    Ok(Verification::Matched { algorithms })
}

/// Legacy "no verification" signals: an empty map, or a single entry whose
/// algorithm or digest is empty.
fn verification_skipped(checksums: &BTreeMap<String, String>) -> bool {
    if checksums.is_empty() {
        return true;
    }
    if checksums.len() == 1 {
        return checksums
            .iter()
            .next()
            .is_some_and(|(name, digest)| name.is_empty() || digest.is_empty());
    }
    false
}

/// Computes the lowercase hex digest of a file.
///
/// # Errors
///
/// Returns [`ChecksumError::Io`] if the file cannot be opened or read.
pub async fn compute_digest(
    fs: &dyn FileSystem,
    algorithm: HashAlgorithm,
    path: &Path,
) -> Result<String, ChecksumError> {
    let io_error = |source| ChecksumError::Io {
        path: path.to_path_buf(),
        source,
    };
    let mut reader = fs.open(path).await.map_err(io_error)?;
    let mut buffer = vec![0_u8; HASH_BUFFER_SIZE];

    match algorithm {
        HashAlgorithm::Sha256 => {
            let mut hasher = Sha256::new();
            loop {
                let read = reader.read(&mut buffer).await.map_err(io_error)?;
                if read == 0 {
                    break;
                }
                hasher.update(&buffer[..read]);
            }
            Ok(hex::encode(hasher.finalize()))
        }
        HashAlgorithm::Md5 => {
            let mut hasher = Md5::new();
            loop {
                let read = reader.read(&mut buffer).await.map_err(io_error)?;
                if read == 0 {
                    break;
                }
                hasher.update(&buffer[..read]);
            }
            Ok(hex::encode(hasher.finalize()))
        }
    }
}
