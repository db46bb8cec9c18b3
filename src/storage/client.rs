//! Anonymous object-storage GETs.
//!
//! [`S3HttpClient`] addresses objects by bucket, key and region and speaks
//! plain HTTPS to the regional endpoint. A wrong-region answer (301/307
//! carrying `x-amz-bucket-region`) is followed exactly once.

use async_trait::async_trait;
use reqwest::header::IF_NONE_MATCH;
use reqwest::{Client, StatusCode};
use tracing::{debug, info, instrument};

use super::url::{AmazonS3Url, DEFAULT_REGION};
use crate::download::constants::{BUCKET_REGION_HEADER, CONNECT_TIMEOUT_SECS, READ_TIMEOUT_SECS};
use crate::download::{DownloadError, FetchResponse};
use crate::download::client::build_client;
use crate::download::transport::{into_fetch_response, send_error};

/// Object-storage transport.
#[async_trait]
pub trait ObjectStorageClient: Send + Sync {
    /// Fetches the object named by `location`, sending `If-None-Match`
    /// when a tag is given.
    async fn get_object(
        &self,
        location: &AmazonS3Url,
        if_none_match: Option<&str>,
    ) -> Result<FetchResponse, DownloadError>;
}

/// Object-storage client over HTTPS.
#[derive(Debug, Clone)]
pub struct S3HttpClient {
    client: Client,
    endpoint: Option<String>,
}

impl S3HttpClient {
    /// Creates a client against the public regional endpoints.
    ///
    /// # Errors
    ///
    /// Returns [`DownloadError::ClientBuild`] if the client cannot be built.
    pub fn new() -> Result<Self, DownloadError> {
        Self::new_with_timeouts(CONNECT_TIMEOUT_SECS, READ_TIMEOUT_SECS)
    }

    /// Creates a client with explicit timeouts.
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
        Ok(Self {
            client,
            endpoint: None,
        })
    }

    /// Sends every request path-style to `endpoint` instead of the
    /// regional hosts. Used for compatible stores and tests.
    #[must_use]
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into().trim_end_matches('/').to_string());
        self
    }

    /// URL of `bucket/key` in `region`.
    #[must_use]
    pub fn object_url(&self, bucket: &str, key: &str, region: &str) -> String {
        let key = encode_key(key);
        if let Some(endpoint) = &self.endpoint {
            return format!("{endpoint}/{bucket}/{key}");
        }
        let region = if region.is_empty() { DEFAULT_REGION } else { region };
        let domain = if region.starts_with("cn-") {
            "amazonaws.com.cn"
        } else {
            "amazonaws.com"
        };
        // Dotted bucket names break the wildcard certificate.
        if bucket.contains('.') {
            format!("https://s3.{region}.{domain}/{bucket}/{key}")
        } else {
            format!("https://{bucket}.s3.{region}.{domain}/{key}")
        }
    }

    async fn send(
        &self,
        url: &str,
        if_none_match: Option<&str>,
    ) -> Result<reqwest::Response, DownloadError> {
        let mut request = self.client.get(url);
        if let Some(tag) = if_none_match {
            request = request.header(IF_NONE_MATCH, tag);
        }
        request.send().await.map_err(|e| send_error(url, e))
    }
}

#[async_trait]
impl ObjectStorageClient for S3HttpClient {
    #[instrument(skip(self, location), fields(bucket = %location.bucket, key = %location.key))]
    async fn get_object(
        &self,
        location: &AmazonS3Url,
        if_none_match: Option<&str>,
    ) -> Result<FetchResponse, DownloadError> {
        if !location.is_bucket_and_key_present() {
            return Err(DownloadError::invalid_url(location.to_string()));
        }

        let url = self.object_url(&location.bucket, &location.key, &location.region);
        debug!(%url, "requesting object");
        let response = self.send(&url, if_none_match).await?;

        if let Some(region) = redirect_region(&response, &location.region) {
            info!(from = %location.region, to = %region, "bucket lives in another region, retrying there");
            let url = self.object_url(&location.bucket, &location.key, &region);
            let response = self.send(&url, if_none_match).await?;
            return into_fetch_response(&url, response);
        }

        into_fetch_response(&url, response)
    }
}

/// Region named by a wrong-region redirect, if it differs from `current`.
fn redirect_region(response: &reqwest::Response, current: &str) -> Option<String> {
    let status = response.status();
    if status != StatusCode::MOVED_PERMANENTLY && status != StatusCode::TEMPORARY_REDIRECT {
        return None;
    }
    response
        .headers()
        .get(BUCKET_REGION_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|region| !region.is_empty() && *region != current)
        .map(ToString::to_string)
}

fn encode_key(key: &str) -> String {
    key.split('/')
        .map(|segment| urlencoding::encode(segment).into_owned())
        .collect::<Vec<_>>()
        .join("/")
}
