//! Host platform detection for variant selection.
//!
//! On Linux the platform and its version come from `/etc/os-release`
//! (`ID`, `VERSION_ID`). Elsewhere the platform is named after the target OS
//! and the version must be supplied by the caller.

use std::collections::HashMap;
use std::path::Path;

use serde::Serialize;
use tracing::debug;

use super::{Dimension, ManifestError};
use crate::download::FileSystem;

const OS_RELEASE_PATH: &str = "/etc/os-release";

/// Host values used as manifest keys.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HostPlatform {
    /// Platform name, e.g. `ubuntu`.
    pub platform: String,
    /// Platform version, e.g. `22.04`.
    pub os_version: String,
    /// Manifest spelling of the architecture.
    pub arch: String,
}

impl HostPlatform {
    /// Detects the running host.
    ///
    /// # Errors
    ///
    /// Returns [`ManifestError::Detection`] naming the property that could
    /// not be determined.
    pub async fn detect(fs: &dyn FileSystem) -> Result<Self, ManifestError> {
        let arch = map_arch(std::env::consts::ARCH).ok_or_else(|| ManifestError::Detection {
            dimension: Dimension::Arch,
            reason: format!("unsupported architecture {}", std::env::consts::ARCH),
        })?;

        let (platform, os_version) = if cfg!(target_os = "linux") {
            let path = Path::new(OS_RELEASE_PATH);
            let content = fs
                .read_to_string(path)
                .await
                .map_err(|e| ManifestError::Detection {
                    dimension: Dimension::Platform,
                    reason: format!("cannot read {OS_RELEASE_PATH}: {e}"),
                })?;
            from_os_release(&content)?
        } else {
            return Err(ManifestError::Detection {
                dimension: Dimension::OsVersion,
                reason: format!("no version source for {}", platform_name(std::env::consts::OS)),
            });
        };

        let host = Self {
            platform,
            os_version,
            arch: arch.to_string(),
        };
        debug!(?host, "detected host platform");
        Ok(host)
    }
}

/// `ID` and `VERSION_ID` from os-release content.
fn from_os_release(content: &str) -> Result<(String, String), ManifestError> {
    let fields = parse_os_release(content);
    let platform = fields
        .get("ID")
        .filter(|v| !v.is_empty())
        .ok_or_else(|| ManifestError::Detection {
            dimension: Dimension::Platform,
            reason: "os-release has no ID".to_string(),
        })?;
    let version = fields
        .get("VERSION_ID")
        .filter(|v| !v.is_empty())
        .ok_or_else(|| ManifestError::Detection {
            dimension: Dimension::OsVersion,
            reason: "os-release has no VERSION_ID".to_string(),
        })?;
    Ok((platform.to_lowercase(), version.clone()))
}

/// Parses `KEY=value` lines, unquoting values. Comments and blank lines are
/// skipped.
#[must_use]
pub fn parse_os_release(content: &str) -> HashMap<String, String> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .filter_map(|line| line.split_once('='))
        .map(|(key, value)| (key.trim().to_string(), unquote(value.trim()).to_string()))
        .collect()
}

fn unquote(value: &str) -> &str {
    for quote in ['"', '\''] {
        if let Some(inner) = value
            .strip_prefix(quote)
            .and_then(|v| v.strip_suffix(quote))
        {
            return inner;
        }
    }
    value
}

/// Manifest spelling of a Rust target architecture.
#[must_use]
pub fn map_arch(arch: &str) -> Option<&'static str> {
    match arch {
        "x86_64" => Some("x86_64"),
        "x86" => Some("i386"),
        "aarch64" => Some("arm64"),
        "arm" => Some("arm"),
        _ => None,
    }
}

fn platform_name(os: &str) -> &str {
    match os {
        "macos" => "darwin",
        other => other,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const UBUNTU: &str = r#"
NAME="Ubuntu"
VERSION_ID="22.04"
# comment
ID=ubuntu
ID_LIKE=debian
PRETTY_NAME='Ubuntu 22.04.3 LTS'
"#;

    #[test]
    fn test_parse_os_release_unquotes() {
        let fields = parse_os_release(UBUNTU);
        assert_eq!(fields.get("ID").map(String::as_str), Some("ubuntu"));
        assert_eq!(fields.get("VERSION_ID").map(String::as_str), Some("22.04"));
        assert_eq!(
            fields.get("PRETTY_NAME").map(String::as_str),
            Some("Ubuntu 22.04.3 LTS")
        );
        assert!(!fields.contains_key("# comment"));
    }

    #[test]
    fn test_from_os_release() {
        assert_eq!(
            from_os_release(UBUNTU).unwrap(),
            ("ubuntu".to_string(), "22.04".to_string())
        );
    }

    #[test]
    fn test_from_os_release_missing_fields_name_dimension() {
        let err = from_os_release("VERSION_ID=9\n").unwrap_err();
        assert!(matches!(err, ManifestError::Detection { dimension: Dimension::Platform, .. }));

        let err = from_os_release("ID=arch\n").unwrap_err();
        assert!(matches!(err, ManifestError::Detection { dimension: Dimension::OsVersion, .. }));
    }

    #[test]
    fn test_map_arch() {
        assert_eq!(map_arch("x86_64"), Some("x86_64"));
        assert_eq!(map_arch("x86"), Some("i386"));
        assert_eq!(map_arch("aarch64"), Some("arm64"));
        assert_eq!(map_arch("arm"), Some("arm"));
        assert_eq!(map_arch("riscv64"), None);
    }

    #[test]
    fn test_platform_name() {
        assert_eq!(platform_name("macos"), "darwin");
        assert_eq!(platform_name("windows"), "windows");
    }
}
