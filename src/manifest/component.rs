//! Component manifest stored with each installed version.
//!
//! Lives at `<package_root>/<name>/<version>/manifest.json`:
//!
//! ```json
//! { "name": "agent", "version": "1.2.0", "install": "install.sh", "reboot": "false" }
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::instrument;

use super::{ManifestError, VersionTriple};
use crate::download::FileSystem;

/// File name of a component manifest inside its version directory.
pub const COMPONENT_MANIFEST_FILE: &str = "manifest.json";

/// Install/uninstall description of one component version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComponentManifest {
    /// Component name.
    pub name: String,
    /// `major.minor.build`.
    pub version: String,
    /// Install command.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub install: Option<String>,
    /// Uninstall command.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uninstall: Option<String>,
    /// Launch command.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub launch: Option<String>,
    /// `"true"` or `"false"`.
    #[serde(default = "default_reboot")]
    pub reboot: String,
}

fn default_reboot() -> String {
    "false".to_string()
}

impl ComponentManifest {
    /// Parses and validates a component manifest.
    ///
    /// # Errors
    ///
    /// - [`ManifestError::InvalidJson`] on malformed JSON or missing fields
    /// - [`ManifestError::InvalidComponent`] if a field fails validation
    pub fn parse(json: &str) -> Result<Self, ManifestError> {
        let manifest: Self = serde_json::from_str(json)?;
        manifest.validate()?;
        Ok(manifest)
    }

    /// Checks the name, version and reboot flag.
    ///
    /// # Errors
    ///
    /// Returns [`ManifestError::InvalidComponent`] describing the first
    /// invalid field.
    pub fn validate(&self) -> Result<(), ManifestError> {
        if self.name.trim().is_empty() {
            return Err(ManifestError::invalid_component("name is empty"));
        }
        if self.version.parse::<VersionTriple>().is_err() {
            return Err(ManifestError::invalid_component(format!(
                "version {:?} is not major.minor.build",
                self.version
            )));
        }
        if parse_flag(&self.reboot).is_none() {
            return Err(ManifestError::invalid_component(format!(
                "reboot {:?} is not \"true\" or \"false\"",
                self.reboot
            )));
        }
        Ok(())
    }

    /// Whether installing requires a reboot.
    #[must_use]
    pub fn requires_reboot(&self) -> bool {
        parse_flag(&self.reboot).unwrap_or(false)
    }

    /// Path of the manifest for `name`/`version` under `package_root`.
    #[must_use]
    pub fn path(package_root: &Path, name: &str, version: &str) -> PathBuf {
        package_root
            .join(name)
            .join(version)
            .join(COMPONENT_MANIFEST_FILE)
    }

    /// Loads the manifest of an installed version and checks it describes
    /// that version.
    ///
    /// # Errors
    ///
    /// Returns [`ManifestError::Io`] if the file cannot be read, or a parse
    /// or validation error. A manifest whose name or version disagrees with
    /// its directory is [`ManifestError::InvalidComponent`].
    #[instrument(skip(fs))]
    pub async fn load(
        fs: &dyn FileSystem,
        package_root: &Path,
        name: &str,
        version: &str,
    ) -> Result<Self, ManifestError> {
        let path = Self::path(package_root, name, version);
        let json = fs
            .read_to_string(&path)
            .await
            .map_err(|e| ManifestError::io(&path, e))?;
        let manifest = Self::parse(&json)?;
        if manifest.name != name || manifest.version != version {
            return Err(ManifestError::invalid_component(format!(
                "{} describes {}@{}",
                path.display(),
                manifest.name,
                manifest.version
            )));
        }
        Ok(manifest)
    }
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" => Some(true),
        "false" => Some(false),
        _ => None,
    }
}
