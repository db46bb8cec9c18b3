//! HTTP client wrapper for conditional artifact fetches.
//!
//! This module provides the `HttpClient` struct, the generic-HTTP
//! [`HttpTransport`] used for every source that is not an object-storage
//! bucket URL (and as the fallback when object-storage access fails).

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use reqwest::header::IF_NONE_MATCH;
use tracing::{debug, instrument};
use url::Url;

use super::constants::{CONNECT_TIMEOUT_SECS, READ_TIMEOUT_SECS};
use super::error::DownloadError;
use super::transport::{FetchResponse, HttpTransport, into_fetch_response, send_error};
use crate::user_agent;

/// HTTP client for conditional downloads.
///
/// This client is designed to be created once and reused for multiple downloads,
/// taking advantage of connection pooling. Redirects (`Location`) are followed.
///
/// # Example
///
/// ```no_run
/// use artifact_core::download::{HttpClient, HttpTransport};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let client = HttpClient::new()?;
/// let response = client.get("https://example.com/agent.zip", None).await?;
/// println!("{response:?}");
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: Client,
}

impl HttpClient {
    /// Creates a new HTTP client with default timeouts.
    ///
    /// Default configuration:
    /// - Connect timeout: 30 seconds
    /// - Read timeout: 5 minutes (for large artifacts)
    /// - Gzip decompression: enabled
    ///
    /// # Errors
    ///
    /// Returns [`DownloadError::ClientBuild`] if the TLS backend cannot be
    /// initialized.
    pub fn new() -> Result<Self, DownloadError> {
        Self::new_with_timeouts(CONNECT_TIMEOUT_SECS, READ_TIMEOUT_SECS)
    }

    /// Creates a new HTTP client with explicit timeout values.
    ///
    /// # Errors
    ///
    /// Returns [`DownloadError::ClientBuild`] if the client cannot be built.
    pub fn new_with_timeouts(
        connect_timeout_secs: u64,
        read_timeout_secs: u64,
    ) -> Result<Self, DownloadError> {
        let client = build_client(connect_timeout_secs, read_timeout_secs)
            .map_err(|source| DownloadError::ClientBuild { source })?;
        Ok(Self { client })
    }

    /// Returns a reference to the underlying reqwest client.
    ///
    /// This can be used for advanced operations not covered by this wrapper.
    #[must_use]
    pub fn inner(&self) -> &Client {
        &self.client
    }
}

#[async_trait]
impl HttpTransport for HttpClient {
    #[instrument(skip(self), fields(url = %url))]
    async fn get(
        &self,
        url: &str,
        if_none_match: Option<&str>,
    ) -> Result<FetchResponse, DownloadError> {
        Url::parse(url).map_err(|_| DownloadError::invalid_url(url))?;

        let mut request = self.client.get(url);
        if let Some(tag) = if_none_match {
            debug!(etag = %tag, "sending conditional request");
            request = request.header(IF_NONE_MATCH, tag);
        }

        let response = request.send().await.map_err(|e| send_error(url, e))?;
        into_fetch_response(url, response)
    }
}

/// Builds the shared reqwest client used by both transports.
pub(crate) fn build_client(
    connect_timeout_secs: u64,
    read_timeout_secs: u64,
) -> Result<Client, reqwest::Error> {
    Client::builder()
        .connect_timeout(Duration::from_secs(connect_timeout_secs))
        .timeout(Duration::from_secs(read_timeout_secs))
        .gzip(true)
        .user_agent(user_agent::default_user_agent())
        .build()
}
