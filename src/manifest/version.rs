//! `major.minor.build` versions and latest-version selection.

use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;
use tracing::{debug, trace};

use super::ManifestError;
use crate::download::FileSystem;

#[allow(clippy::expect_used)]
static VERSION_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\d+)\.(\d+)\.(\d+)$").expect("version regex is valid") // Static pattern, safe to panic
});

/// A parsed `major.minor.build` version. Ordering is numeric per component.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct VersionTriple {
    /// Major component.
    pub major: u64,
    /// Minor component.
    pub minor: u64,
    /// Build component.
    pub build: u64,
}

impl FromStr for VersionTriple {
    type Err = ManifestError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ManifestError::InvalidVersion {
            value: s.to_string(),
        };
        let captures = VERSION_PATTERN.captures(s).ok_or_else(invalid)?;
        let component = |i: usize| captures[i].parse::<u64>().map_err(|_| invalid());
        Ok(Self {
            major: component(1)?,
            minor: component(2)?,
            build: component(3)?,
        })
    }
}

impl fmt::Display for VersionTriple {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.build)
    }
}

/// Highest well-formed candidate other than `excluding`.
///
/// Candidates that are not exactly `major.minor.build` are ignored. Returns
/// `None` when nothing qualifies; on equal versions the first one wins.
///
/// # Examples
///
/// ```
/// use artifact_core::manifest::select_latest_version;
///
/// assert_eq!(select_latest_version(["1.0.0", "2.0.0", "10.0.0"], ""), Some("10.0.0".to_string()));
/// assert_eq!(select_latest_version(["1.0.0", "2.0.0"], "2.0.0"), Some("1.0.0".to_string()));
/// assert_eq!(select_latest_version(["Foo", "1.0", "1.0.0.0"], ""), None);
/// ```
pub fn select_latest_version<I, S>(candidates: I, excluding: &str) -> Option<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut best: Option<(VersionTriple, String)> = None;
    for candidate in candidates {
        let candidate = candidate.as_ref();
        if candidate == excluding {
            continue;
        }
        let Ok(version) = candidate.parse::<VersionTriple>() else {
            trace!(candidate, "ignoring malformed version");
            continue;
        };
        if best.as_ref().is_none_or(|(current, _)| version > *current) {
            best = Some((version, candidate.to_string()));
        }
    }
    best.map(|(_, raw)| raw)
}

/// Latest version directory under `<package_root>/<component>`.
///
/// A missing component directory means nothing is installed.
///
/// # Errors
///
/// Returns [`ManifestError::Io`] if the component directory cannot be listed.
pub async fn latest_installed_version(
    fs: &dyn FileSystem,
    package_root: &Path,
    component: &str,
    excluding: &str,
) -> Result<Option<String>, ManifestError> {
    let dir = package_root.join(component);
    if !fs.exists(&dir).await {
        debug!(path = %dir.display(), "component not installed");
        return Ok(None);
    }
    let versions = fs
        .list_dirs(&dir)
        .await
        .map_err(|e| ManifestError::io(&dir, e))?;
    Ok(select_latest_version(&versions, excluding))
}
