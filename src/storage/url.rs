//! Recognition of object-storage (S3) URLs.
//!
//! [`AmazonS3Url::parse`] maps an HTTP(S) URL onto a canonical
//! bucket/key/region model. Supported host shapes:
//!
//! | Shape | Example host |
//! |-------|--------------|
//! | Virtual-hosted | `bucket.s3.us-west-2.amazonaws.com` |
//! | Path-style | `s3.us-west-2.amazonaws.com` |
//! | Legacy dash region | `s3-us-west-2.amazonaws.com` |
//! | Global (no region) | `bucket.s3.amazonaws.com` |
//! | Dual-stack | `bucket.s3.dualstack.us-west-2.amazonaws.com` |
//! | Transfer acceleration | `bucket.s3-accelerate.amazonaws.com` |
//! | Website endpoint | `bucket.s3-website-us-west-2.amazonaws.com` |
//! | VPC interface endpoint | `bucket.bucket.vpce-0a1b2c.s3.us-west-2.vpce.amazonaws.com` |
//!
//! Parsing is total: malformed or foreign URLs yield a value with
//! `is_valid_s3_uri == false` and every other field empty.

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;
use tracing::trace;
use url::Url;

/// Region assumed when the host carries none, or carries the legacy
/// `external-1` alias.
pub const DEFAULT_REGION: &str = "us-east-1";

/// Region alias used by the legacy `s3-external-1` endpoint.
const LEGACY_EXTERNAL_REGION: &str = "external-1";

/// VPC interface endpoint hosts. Group 1: bucket, group 2: region.
///
/// A bare `bucket.` label in front of `vpce-` is the endpoint's own
/// bucket-addressing prefix, not a bucket name.
#[allow(clippy::expect_used)]
static VPCE_HOST_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^(?:(.+?)\.)??(?:bucket\.)?vpce-[a-z0-9-]+\.s3\.([a-z0-9-]+)\.vpce\.amazonaws\.com$",
    )
    .expect("VPC endpoint regex is valid") // Static pattern, safe to panic
});

/// General object-storage hosts. Group 1: bucket, group 2: region.
#[allow(clippy::expect_used)]
static S3_HOST_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^(?:(.+)\.)?s3[.-](?:website[-.])?(?:accelerate\.)?(?:dualstack[-.])?(?:([a-z0-9-]+)\.)?amazonaws\.com(?:\.cn)?$",
    )
    .expect("S3 host regex is valid") // Static pattern, safe to panic
});

/// Canonical view of an object-storage URL.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AmazonS3Url {
    /// Whether the host matched a known object-storage shape.
    pub is_valid_s3_uri: bool,
    /// Whether the bucket was taken from the path rather than the host.
    pub is_path_style: bool,
    /// Bucket name.
    pub bucket: String,
    /// Object key, without the leading `/`.
    pub key: String,
    /// Region; never empty for a valid URL.
    pub region: String,
}

impl AmazonS3Url {
    /// Parses `raw` into its bucket/key/region parts.
    ///
    /// Never fails; check [`is_valid_s3_uri`](Self::is_valid_s3_uri).
    ///
    /// # Examples
    ///
    /// ```
    /// use artifact_core::storage::AmazonS3Url;
    ///
    /// let url = AmazonS3Url::parse("https://abc.s3.mock-region.amazonaws.com/");
    /// assert!(url.is_valid_s3_uri);
    /// assert!(!url.is_path_style);
    /// assert_eq!(url.bucket, "abc");
    /// assert_eq!(url.region, "mock-region");
    /// ```
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        let Ok(parsed) = Url::parse(raw) else {
            trace!(url = %raw, "not a parseable URL");
            return Self::default();
        };
        let Some(host) = parsed.host_str() else {
            return Self::default();
        };

        let captures = VPCE_HOST_PATTERN
            .captures(host)
            .or_else(|| S3_HOST_PATTERN.captures(host));
        let Some(captures) = captures else {
            trace!(host, "host is not an object-storage endpoint");
            return Self::default();
        };

        let host_bucket = captures.get(1).map_or("", |m| m.as_str());
        let region = normalize_region(captures.get(2).map_or("", |m| m.as_str()));
        let path = decode_path(parsed.path());
        let path = path.strip_prefix('/').unwrap_or(&path);

        let (is_path_style, bucket, key) = if host_bucket.is_empty() {
            let (bucket, key) = path.split_once('/').unwrap_or((path, ""));
            (true, bucket.to_string(), key.to_string())
        } else {
            (false, host_bucket.to_string(), path.to_string())
        };

        Self {
            is_valid_s3_uri: true,
            is_path_style,
            bucket,
            key,
            region,
        }
    }

    /// Returns true when the URL is valid and names a bucket, key and region.
    #[must_use]
    pub fn is_bucket_and_key_present(&self) -> bool {
        self.is_valid_s3_uri
            && !self.bucket.is_empty()
            && !self.key.is_empty()
            && !self.region.is_empty()
    }
}

impl fmt::Display for AmazonS3Url {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_valid_s3_uri {
            write!(f, "s3://{}/{} ({})", self.bucket, self.key, self.region)
        } else {
            f.write_str("<not an object-storage URL>")
        }
    }
}

/// Rewrites a bucket-style `s3://bucket/key` location into an HTTPS
/// path-style URL in `region`. Other locations are returned unchanged.
///
/// # Examples
///
/// ```
/// use artifact_core::storage::resolve_location;
///
/// assert_eq!(
///     resolve_location("s3://packages/agent/1.0.0/agent.zip", "eu-west-1"),
///     "https://s3.eu-west-1.amazonaws.com/packages/agent/1.0.0/agent.zip"
/// );
/// assert_eq!(resolve_location("https://example.com/a.zip", "eu-west-1"), "https://example.com/a.zip");
/// ```
#[must_use]
pub fn resolve_location(location: &str, region: &str) -> String {
    match location.strip_prefix("s3://") {
        Some(rest) => {
            let region = if region.is_empty() { DEFAULT_REGION } else { region };
            format!("https://s3.{region}.amazonaws.com/{rest}")
        }
        None => location.to_string(),
    }
}

fn normalize_region(raw: &str) -> String {
    if raw.is_empty() || raw == LEGACY_EXTERNAL_REGION {
        DEFAULT_REGION.to_string()
    } else {
        raw.to_string()
    }
}

fn decode_path(path: &str) -> String {
    urlencoding::decode(path).map_or_else(|_| path.to_string(), std::borrow::Cow::into_owned)
}
