//! Transport seam shared by the HTTP and object-storage clients.
//!
//! A transport performs exactly one conditional request and reports either
//! "not modified" or a fresh body stream. Everything else in the
//! conditional-fetch contract (sidecar handling, file writes, retries) is
//! done once by the download engine.

use std::fmt;

use async_trait::async_trait;
use bytes::Bytes;
use futures_util::StreamExt;
use futures_util::stream::BoxStream;
use reqwest::StatusCode;
use reqwest::header::ETAG;
use tracing::debug;

use super::DownloadError;

/// Response body as a stream of chunks.
pub type BodyStream = BoxStream<'static, Result<Bytes, DownloadError>>;

/// Result of a single conditional request.
pub enum FetchResponse {
    /// The server confirmed the stored entity tag is current.
    NotModified,
    /// Fresh content.
    Modified {
        /// Entity tag returned with the content, if any.
        etag: Option<String>,
        /// The content.
        body: BodyStream,
    },
}

impl fmt::Debug for FetchResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotModified => f.write_str("NotModified"),
            Self::Modified { etag, .. } => f
                .debug_struct("Modified")
                .field("etag", etag)
                .finish_non_exhaustive(),
        }
    }
}

/// Generic HTTP transport.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    /// GETs `url`, sending `If-None-Match: <if_none_match>` when given.
    async fn get(
        &self,
        url: &str,
        if_none_match: Option<&str>,
    ) -> Result<FetchResponse, DownloadError>;
}

/// Maps a response onto [`FetchResponse`].
///
/// # Errors
///
/// Returns [`DownloadError::HttpStatus`] for any status other than 2xx and
/// 304.
pub(crate) fn into_fetch_response(
    url: &str,
    response: reqwest::Response,
) -> Result<FetchResponse, DownloadError> {
    let status = response.status();
    if status == StatusCode::NOT_MODIFIED {
        debug!(url, "not modified");
        return Ok(FetchResponse::NotModified);
    }
    if !status.is_success() {
        return Err(DownloadError::http_status(url, status.as_u16()));
    }

    let etag = response
        .headers()
        .get(ETAG)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(ToString::to_string);

    let owned_url = url.to_string();
    let body = response
        .bytes_stream()
        .map(move |chunk| chunk.map_err(|e| DownloadError::network(owned_url.clone(), e)))
        .boxed();

    Ok(FetchResponse::Modified { etag, body })
}

/// Maps a send failure onto a download error.
pub(crate) fn send_error(url: &str, error: reqwest::Error) -> DownloadError {
    if error.is_timeout() {
        DownloadError::timeout(url)
    } else {
        DownloadError::network(url, error)
    }
}
