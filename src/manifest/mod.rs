//! Package manifests, version selection and host detection.
//!
//! - [`package`] - variant selection over `platform → OS version → arch`
//!   with `_any` wildcards, and manifest entry → download request
//! - [`version`] - `major.minor.build` parsing and latest-version selection
//! - [`component`] - the per-version component manifest file
//! - [`platform`] - host platform, OS version and architecture detection

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

pub mod component;
pub mod package;
pub mod platform;
pub mod version;

pub use component::ComponentManifest;
pub use package::{ANY_KEY, FileEntry, PackageManifest, PackageVariant, VariantSelection};
pub use platform::HostPlatform;
pub use version::{VersionTriple, latest_installed_version, select_latest_version};

/// One level of the package lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dimension {
    /// Platform name, e.g. `ubuntu`.
    Platform,
    /// Platform version, e.g. `22.04`.
    OsVersion,
    /// Architecture, e.g. `x86_64`.
    Arch,
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Platform => "platform",
            Self::OsVersion => "OS version",
            Self::Arch => "architecture",
        })
    }
}

/// Errors from manifest parsing, lookup and host detection.
#[derive(Debug, Error)]
pub enum ManifestError {
    /// The manifest is not valid JSON or has the wrong shape.
    #[error("invalid manifest JSON: {source}")]
    InvalidJson {
        /// The underlying parse error.
        #[source]
        source: serde_json::Error,
    },

    /// No exact or `_any` entry at one lookup level.
    #[error("no package matches {dimension} {value:?}")]
    NoMatch {
        /// The level that failed.
        dimension: Dimension,
        /// The value that was looked up.
        value: String,
    },

    /// A host property could not be determined.
    #[error("could not detect host {dimension}: {reason}")]
    Detection {
        /// The property that could not be detected.
        dimension: Dimension,
        /// Why detection failed.
        reason: String,
    },

    /// Not a `major.minor.build` version string.
    #[error("invalid version string {value:?}: expected major.minor.build")]
    InvalidVersion {
        /// The rejected string.
        value: String,
    },

    /// The selected variant names a file absent from `files`.
    #[error("file {file:?} is not listed in the manifest")]
    MissingFile {
        /// The file name.
        file: String,
    },

    /// Neither the file entry nor the caller supplied a location.
    #[error("no download location for {file:?}")]
    MissingLocation {
        /// The file name.
        file: String,
    },

    /// A component manifest failed validation.
    #[error("invalid component manifest: {reason}")]
    InvalidComponent {
        /// What was wrong.
        reason: String,
    },

    /// Reading a manifest or listing versions failed.
    #[error("IO error at {path}: {source}")]
    Io {
        /// The path involved.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },
}

impl ManifestError {
    /// Creates an IO error.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn invalid_component(reason: impl Into<String>) -> Self {
        Self::InvalidComponent {
            reason: reason.into(),
        }
    }
}

impl From<serde_json::Error> for ManifestError {
    fn from(source: serde_json::Error) -> Self {
        Self::InvalidJson { source }
    }
}
