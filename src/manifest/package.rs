//! Package manifest model and variant selection.
//!
//! A package manifest maps `platform → OS version → arch` to a variant and
//! lists the files variants refer to:
//!
//! ```json
//! {
//!   "name": "agent",
//!   "version": "1.2.0",
//!   "packages": {
//!     "ubuntu": { "_any": { "x86_64": { "file": "agent-amd64.zip" } } },
//!     "_any":   { "_any": { "_any":   { "file": "agent.zip" } } }
//!   },
//!   "files": {
//!     "agent-amd64.zip": {
//!       "downloadLocation": "s3://packages/agent/1.2.0/agent-amd64.zip",
//!       "checksums": { "sha256": "..." }
//!     }
//!   }
//! }
//! ```
//!
//! Each level resolves independently: the exact key wins, `_any` is the
//! fallback, and a miss at any level fails the whole lookup.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use super::{Dimension, ManifestError};
use crate::download::{DownloadRequest, FileSystem};
use crate::storage::resolve_location;

/// Wildcard key matching any value at its level.
pub const ANY_KEY: &str = "_any";

/// `arch → variant`.
pub type ArchMap = BTreeMap<String, PackageVariant>;
/// `OS version → arch → variant`.
pub type VersionMap = BTreeMap<String, ArchMap>;

/// Parsed package manifest.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PackageManifest {
    /// Package name.
    pub name: String,
    /// Package version.
    pub version: String,
    /// Manifest schema version, when declared.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema_version: Option<String>,
    /// Publisher, when declared.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub publisher: Option<String>,
    /// `platform → OS version → arch → variant`.
    #[serde(default)]
    pub packages: BTreeMap<String, VersionMap>,
    /// File name → location and checksums.
    #[serde(default)]
    pub files: BTreeMap<String, FileEntry>,
}

/// A platform-specific package entry.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PackageVariant {
    /// Key into [`PackageManifest::files`].
    pub file: String,
    /// Any other metadata carried by the entry.
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

/// Where a file lives and how to verify it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileEntry {
    /// URL or `s3://bucket/key` location.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub download_location: Option<String>,
    /// Algorithm name → expected digest.
    #[serde(default)]
    pub checksums: BTreeMap<String, String>,
}

/// A resolved variant and the keys that matched at each level.
///
/// A matched key is either the requested value or [`ANY_KEY`].
#[derive(Debug, Clone, PartialEq)]
pub struct VariantSelection<'a> {
    /// Platform key that matched.
    pub platform: &'a str,
    /// OS version key that matched.
    pub os_version: &'a str,
    /// Arch key that matched.
    pub arch: &'a str,
    /// The variant.
    pub variant: &'a PackageVariant,
}

impl PackageManifest {
    /// Parses a manifest from JSON.
    ///
    /// # Errors
    ///
    /// Returns [`ManifestError::InvalidJson`] on malformed input.
    pub fn parse(json: &str) -> Result<Self, ManifestError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Reads and parses a manifest file.
    ///
    /// # Errors
    ///
    /// Returns [`ManifestError::Io`] if the file cannot be read and
    /// [`ManifestError::InvalidJson`] if it does not parse.
    pub async fn load(fs: &dyn FileSystem, path: &Path) -> Result<Self, ManifestError> {
        let json = fs
            .read_to_string(path)
            .await
            .map_err(|e| ManifestError::io(path, e))?;
        Self::parse(&json)
    }

    /// Selects the variant for a host.
    ///
    /// # Errors
    ///
    /// Returns [`ManifestError::NoMatch`] naming the first level with neither
    /// the exact key nor [`ANY_KEY`].
    ///
    /// # Examples
    ///
    /// ```
    /// use artifact_core::manifest::PackageManifest;
    ///
    /// let manifest = PackageManifest::parse(
    ///     r#"{"name":"agent","version":"1.0.0",
    ///         "packages":{"_any":{"_any":{"_any":{"file":"agent.zip"}}}}}"#,
    /// ).unwrap();
    /// let selection = manifest.select_variant("windows", "10", "x86_64").unwrap();
    /// assert_eq!(selection.variant.file, "agent.zip");
    /// assert_eq!(selection.platform, "_any");
    /// ```
    #[instrument(skip(self), fields(package = %self.name))]
    pub fn select_variant(
        &self,
        platform: &str,
        os_version: &str,
        arch: &str,
    ) -> Result<VariantSelection<'_>, ManifestError> {
        let (platform_key, versions) = resolve_level(&self.packages, Dimension::Platform, platform)?;
        let (version_key, arches) = resolve_level(versions, Dimension::OsVersion, os_version)?;
        let (arch_key, variant) = resolve_level(arches, Dimension::Arch, arch)?;

        debug!(
            platform = platform_key,
            os_version = version_key,
            arch = arch_key,
            file = %variant.file,
            "selected package variant"
        );
        Ok(VariantSelection {
            platform: platform_key,
            os_version: version_key,
            arch: arch_key,
            variant,
        })
    }

    /// Builds the download request for a selected variant.
    ///
    /// The file's `downloadLocation` is used when present, otherwise
    /// `base_location/<file>`. `s3://` locations are rewritten to HTTPS in
    /// `region`.
    ///
    /// # Errors
    ///
    /// - [`ManifestError::MissingFile`] if the variant's file is not listed
    /// - [`ManifestError::MissingLocation`] if no location can be derived
    pub fn download_request(
        &self,
        selection: &VariantSelection<'_>,
        destination: Option<PathBuf>,
        base_location: Option<&str>,
        region: &str,
    ) -> Result<DownloadRequest, ManifestError> {
        let file = &selection.variant.file;
        let entry = self.files.get(file).ok_or_else(|| ManifestError::MissingFile {
            file: file.clone(),
        })?;

        let location = match (entry.download_location.as_deref(), base_location) {
            (Some(location), _) if !location.trim().is_empty() => location.trim().to_string(),
            (_, Some(base)) if !base.trim().is_empty() => {
                format!("{}/{file}", base.trim().trim_end_matches('/'))
            }
            _ => return Err(ManifestError::MissingLocation { file: file.clone() }),
        };

        Ok(DownloadRequest {
            source_url: resolve_location(&location, region),
            destination_dir: destination,
            checksums: entry.checksums.clone(),
        })
    }
}

/// Exact key if present, else [`ANY_KEY`] if present.
#[must_use]
pub fn lookup_level<'a, V>(map: &'a BTreeMap<String, V>, key: &str) -> Option<(&'a str, &'a V)> {
    map.get_key_value(key)
        .or_else(|| map.get_key_value(ANY_KEY))
        .map(|(k, v)| (k.as_str(), v))
}

fn resolve_level<'a, V>(
    map: &'a BTreeMap<String, V>,
    dimension: Dimension,
    value: &str,
) -> Result<(&'a str, &'a V), ManifestError> {
    lookup_level(map, value).ok_or_else(|| ManifestError::NoMatch {
        dimension,
        value: value.to_string(),
    })
}
