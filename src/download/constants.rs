//! Constants for the download module (timeouts, retry defaults, cache layout).

use std::time::Duration;

/// Default HTTP connect timeout (30 seconds).
pub const CONNECT_TIMEOUT_SECS: u64 = 30;

/// Default HTTP read timeout (5 minutes for large artifacts).
pub const READ_TIMEOUT_SECS: u64 = 300;

/// Initial retry interval for each transport session.
pub const DEFAULT_RETRY_INITIAL_INTERVAL: Duration = Duration::from_millis(200);

/// Retries after the initial attempt for each transport session.
pub const DEFAULT_MAX_RETRIES: u32 = 5;

/// Extension appended to a destination file to name its entity-tag sidecar.
pub const ETAG_SUFFIX: &str = "etag";

/// Response header naming the region a bucket actually lives in.
pub const BUCKET_REGION_HEADER: &str = "x-amz-bucket-region";
