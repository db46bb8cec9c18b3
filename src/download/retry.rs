//! Failure classification and backoff-driven retries for transport attempts.
//!
//! Each failed attempt is classified exactly once by [`classify_error`]:
//! - [`FailureClass::Retryable`] - may succeed on a later attempt
//! - [`FailureClass::Terminal`] - surfaced immediately, no retry budget spent
//!
//! [`retry_with_backoff`] then sleeps according to a [`BackoffPolicy`]
//! between retryable failures until the policy's retries are exhausted.
//!
//! # Example
//!
//! ```
//! use artifact_core::download::{DownloadError, FailureClass, classify_error};
//!
//! let forbidden = DownloadError::http_status("https://example.com/agent.zip", 403);
//! assert_eq!(classify_error(&forbidden), FailureClass::Terminal);
//!
//! let unavailable = DownloadError::http_status("https://example.com/agent.zip", 503);
//! assert_eq!(classify_error(&unavailable), FailureClass::Retryable);
//! ```

use std::error::Error as _;
use std::future::Future;
use std::time::Duration;

use tracing::{debug, warn};

use super::DownloadError;
use crate::backoff::BackoffPolicy;

/// Whether a failed attempt is worth repeating.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureClass {
    /// Temporary failure: other non-2xx statuses, timeouts, network errors.
    Retryable,
    /// Permanent failure: HTTP 403, certificate problems, local errors.
    Terminal,
}

/// Classifies a download error for retry decisions.
///
/// | Error | Class |
/// |-------|-------|
/// | HTTP 403 | Terminal |
/// | Other HTTP status | Retryable |
/// | Timeout | Retryable |
/// | Network (certificate/TLS) | Terminal |
/// | Network (other) | Retryable |
/// | IO, invalid URL, client build, backoff config, verification | Terminal |
#[must_use]
pub fn classify_error(error: &DownloadError) -> FailureClass {
    match error {
        DownloadError::HttpStatus { status: 403, .. } => FailureClass::Terminal,
        DownloadError::HttpStatus { .. } | DownloadError::Timeout { .. } => {
            FailureClass::Retryable
        }
        DownloadError::Network { source, .. } => {
            if is_certificate_error(source) {
                FailureClass::Terminal
            } else {
                FailureClass::Retryable
            }
        }
        DownloadError::Io { .. }
        | DownloadError::InvalidUrl { .. }
        | DownloadError::ClientBuild { .. }
        | DownloadError::Backoff(_)
        | DownloadError::Verification { .. } => FailureClass::Terminal,
    }
}

/// Checks the whole error chain for certificate/TLS failures.
fn is_certificate_error(error: &reqwest::Error) -> bool {
    let mut messages = vec![error.to_string()];
    let mut source = error.source();
    while let Some(cause) = source {
        messages.push(cause.to_string());
        source = cause.source();
    }
    messages.iter().any(|message| is_certificate_message(message))
}

fn is_certificate_message(message: &str) -> bool {
    let message = message.to_lowercase();
    message.contains("certificate")
        || message.contains("x509")
        || message.contains("tls handshake")
}

/// Runs `operation` until it succeeds, fails terminally, or the policy's
/// retries are exhausted. Returns the last error on failure.
///
/// # Errors
///
/// Returns the error of the final attempt.
pub async fn retry_with_backoff<T, F, Fut>(
    policy: &BackoffPolicy,
    label: &str,
    mut operation: F,
) -> Result<T, DownloadError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, DownloadError>>,
{
    let mut retry = 0_u32;
    let mut waited = Duration::ZERO;

    loop {
        let error = match operation().await {
            Ok(value) => return Ok(value),
            Err(error) => error,
        };

        if classify_error(&error) == FailureClass::Terminal {
            debug!(label, %error, "terminal failure, not retrying");
            return Err(error);
        }

        if retry >= policy.max_retries() {
            warn!(label, retries = retry, %error, "retries exhausted");
            return Err(error);
        }

        let delay = policy.delay_for(retry);
        waited += delay;
        if waited > policy.max_elapsed_time() {
            warn!(label, retries = retry, %error, "retry session out of time");
            return Err(error);
        }

        retry += 1;
        debug!(
            label,
            attempt = retry + 1,
            delay_ms = delay.as_millis(),
            %error,
            "will retry"
        );
        tokio::time::sleep(delay).await;
    }
}
