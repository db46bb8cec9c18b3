//! Artifact acquisition: local short-circuit, object-storage first with HTTP
//! fallback, conditional re-fetch and checksum verification.
//!
//! # Overview
//!
//! [`ArtifactDownloader::download`] resolves a [`DownloadRequest`] to a
//! file on disk. Remote content lands at `destination / hex(sha1(url))`,
//! so attacker-controlled names never reach the file system. Each transport
//! attempt follows the same conditional-fetch contract:
//!
//! 1. Replay the stored entity tag when both the file and its `.etag`
//!    sidecar exist.
//! 2. "Not modified" leaves the file untouched.
//! 3. Fresh content persists the new tag first, then streams the body.
//! 4. Any failure removes the file and its sidecar.
//!
//! Attempts are wrapped in [`retry_with_backoff`].
//!
//! # Example
//!
//! ```no_run
//! use artifact_core::download::{ArtifactDownloader, DownloadRequest, DownloaderConfig};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let downloader = ArtifactDownloader::new(DownloaderConfig::default())?;
//! let request = DownloadRequest::new("https://example.com/agent.zip")
//!     .with_checksum("sha256", "b94d27b9934d3e08a52e52d7da7dabfac484efe37a5380ee9088f7ace2efcde9");
//! let result = downloader.download(&request).await?;
//! println!("{} (updated: {})", result.local_file_path.display(), result.is_updated);
//! # Ok(())
//! # }
//! ```

use std::collections::BTreeMap;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use futures_util::StreamExt;
use sha1::{Digest, Sha1};
use tokio::io::{AsyncWriteExt, BufWriter};
use tracing::{debug, info, instrument, warn};
use url::Url;

use super::checksum::{Verification, verify_checksums};
use super::client::HttpClient;
use super::constants::{
    CONNECT_TIMEOUT_SECS, DEFAULT_MAX_RETRIES, DEFAULT_RETRY_INITIAL_INTERVAL, READ_TIMEOUT_SECS,
};
use super::error::DownloadError;
use super::etag::EtagCache;
use super::fs::{FileSystem, LocalFileSystem};
use super::retry::retry_with_backoff;
use super::transport::{BodyStream, FetchResponse, HttpTransport};
use crate::backoff::compute_schedule;
use crate::storage::{AmazonS3Url, ObjectStorageClient, S3HttpClient};

/// What to acquire and how to verify it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DownloadRequest {
    /// Remote URL, `file://` URL, or local path.
    pub source_url: String,
    /// Destination directory; the configured download root when `None`.
    pub destination_dir: Option<PathBuf>,
    /// Algorithm name to expected hex digest.
    pub checksums: BTreeMap<String, String>,
}

impl DownloadRequest {
    /// Request for `source_url` with default destination and no checksums.
    #[must_use]
    pub fn new(source_url: impl Into<String>) -> Self {
        Self {
            source_url: source_url.into(),
            ..Self::default()
        }
    }

    /// Sets the destination directory.
    #[must_use]
    pub fn with_destination(mut self, destination_dir: impl Into<PathBuf>) -> Self {
        self.destination_dir = Some(destination_dir.into());
        self
    }

    /// Adds an expected digest.
    #[must_use]
    pub fn with_checksum(mut self, algorithm: impl Into<String>, digest: impl Into<String>) -> Self {
        self.checksums.insert(algorithm.into(), digest.into());
        self
    }
}

/// Outcome of a successful download.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadResult {
    /// Where the artifact lives on disk.
    pub local_file_path: PathBuf,
    /// False when the existing file was confirmed current or the source was
    /// already local.
    pub is_updated: bool,
    /// How the checksums were checked.
    pub verification: Verification,
}

impl DownloadResult {
    /// True whenever a result exists; mismatches surface as
    /// [`DownloadError::Verification`].
    #[must_use]
    pub fn is_hash_matched(&self) -> bool {
        self.verification.is_matched()
    }
}

/// Downloader settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloaderConfig {
    /// Destination used when a request names none.
    pub download_root: PathBuf,
    /// First retry delay.
    pub retry_initial_interval: Duration,
    /// Retries after the first attempt, per transport.
    pub max_retries: u32,
    /// TCP/TLS connect timeout.
    pub connect_timeout: Duration,
    /// Whole-request timeout.
    pub read_timeout: Duration,
}

impl Default for DownloaderConfig {
    fn default() -> Self {
        Self {
            download_root: default_download_root(),
            retry_initial_interval: DEFAULT_RETRY_INITIAL_INTERVAL,
            max_retries: DEFAULT_MAX_RETRIES,
            connect_timeout: Duration::from_secs(CONNECT_TIMEOUT_SECS),
            read_timeout: Duration::from_secs(READ_TIMEOUT_SECS),
        }
    }
}

/// `<temp_dir>/artifact-fetch/downloads`.
#[must_use]
pub fn default_download_root() -> PathBuf {
    std::env::temp_dir().join("artifact-fetch").join("downloads")
}

/// Acquires artifacts through injected transports and file system.
pub struct ArtifactDownloader {
    http: Arc<dyn HttpTransport>,
    object_storage: Arc<dyn ObjectStorageClient>,
    fs: Arc<dyn FileSystem>,
    config: DownloaderConfig,
}

impl std::fmt::Debug for ArtifactDownloader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ArtifactDownloader")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl ArtifactDownloader {
    /// Creates a downloader with the production transports and local disk.
    ///
    /// # Errors
    ///
    /// Returns [`DownloadError::ClientBuild`] if an HTTP client cannot be built.
    pub fn new(config: DownloaderConfig) -> Result<Self, DownloadError> {
        let connect = config.connect_timeout.as_secs();
        let read = config.read_timeout.as_secs();
        let http = HttpClient::new_with_timeouts(connect, read)?;
        let object_storage = S3HttpClient::new_with_timeouts(connect, read)?;
        Ok(Self::with_components(
            config,
            Arc::new(http),
            Arc::new(object_storage),
            Arc::new(LocalFileSystem),
        ))
    }

    /// Creates a downloader over explicit collaborators.
    #[must_use]
    pub fn with_components(
        config: DownloaderConfig,
        http: Arc<dyn HttpTransport>,
        object_storage: Arc<dyn ObjectStorageClient>,
        fs: Arc<dyn FileSystem>,
    ) -> Self {
        Self {
            http,
            object_storage,
            fs,
            config,
        }
    }

    /// Settings in effect.
    #[must_use]
    pub fn config(&self) -> &DownloaderConfig {
        &self.config
    }

    /// Acquires and verifies the artifact named by `request`.
    ///
    /// # Errors
    ///
    /// - [`DownloadError::Io`] if the destination cannot be created or written
    /// - [`DownloadError::Backoff`] if the retry settings are invalid
    /// - transport errors once retries are exhausted, or immediately for
    ///   terminal failures such as HTTP 403
    /// - [`DownloadError::Verification`] on checksum failure; the file is
    ///   kept on disk
    #[instrument(skip(self, request), fields(url = %request.source_url))]
    pub async fn download(&self, request: &DownloadRequest) -> Result<DownloadResult, DownloadError> {
        let destination_dir = request
            .destination_dir
            .clone()
            .unwrap_or_else(|| self.config.download_root.clone());
        self.fs
            .create_dir_all(&destination_dir)
            .await
            .map_err(|e| DownloadError::io(destination_dir.clone(), e))?;

        if let Some(local) = self.local_source(&request.source_url).await {
            info!(path = %local.display(), "source is already local");
            let verification = self.verify(&local, &request.checksums).await?;
            return Ok(DownloadResult {
                local_file_path: local,
                is_updated: false,
                verification,
            });
        }

        let local_file_path = destination_dir.join(content_address(&request.source_url));
        let is_updated = self.fetch_remote(&request.source_url, &local_file_path).await?;
        let verification = self.verify(&local_file_path, &request.checksums).await?;

        info!(
            path = %local_file_path.display(),
            is_updated,
            "download complete"
        );
        Ok(DownloadResult {
            local_file_path,
            is_updated,
            verification,
        })
    }

    /// Existing local file named by a path or `file://` URL.
    async fn local_source(&self, source: &str) -> Option<PathBuf> {
        let path = Path::new(source);
        if self.fs.is_file(path).await {
            return Some(path.to_path_buf());
        }
        let url = Url::parse(source).ok().filter(|url| url.scheme() == "file")?;
        let path = url.to_file_path().ok()?;
        self.fs.is_file(&path).await.then_some(path)
    }

    /// Object storage first when the URL names a bucket and key, then HTTP.
    async fn fetch_remote(&self, url: &str, destination: &Path) -> Result<bool, DownloadError> {
        let policy = compute_schedule(self.config.retry_initial_interval, self.config.max_retries)?;

        let location = AmazonS3Url::parse(url);
        if location.is_bucket_and_key_present() {
            let storage = self.object_storage.as_ref();
            let location = &location;
            let attempt = retry_with_backoff(&policy, "object-storage", move || {
                self.conditional_fetch(destination, move |tag| async move {
                    storage.get_object(location, tag.as_deref()).await
                })
            })
            .await;
            match attempt {
                Ok(is_updated) => return Ok(is_updated),
                Err(error) => {
                    warn!(%location, %error, "object-storage download failed, falling back to HTTP");
                }
            }
        }

        let http = self.http.as_ref();
        retry_with_backoff(&policy, "http", move || {
            self.conditional_fetch(destination, move |tag| async move {
                http.get(url, tag.as_deref()).await
            })
        })
        .await
    }

    /// One attempt of the conditional-fetch contract. Returns whether the
    /// destination was rewritten.
    async fn conditional_fetch<F, Fut>(&self, destination: &Path, request: F) -> Result<bool, DownloadError>
    where
        F: FnOnce(Option<String>) -> Fut,
        Fut: Future<Output = Result<FetchResponse, DownloadError>>,
    {
        let cache = EtagCache::new(self.fs.as_ref());
        let stored = cache.load(destination).await;
        if let Some(tag) = &stored {
            debug!(etag = %tag, "replaying stored entity tag");
        }

        let outcome = match request(stored).await {
            Ok(FetchResponse::NotModified) => {
                info!(path = %destination.display(), "not modified, keeping existing file");
                return Ok(false);
            }
            Ok(FetchResponse::Modified { etag, body }) => {
                self.write_body(&cache, destination, etag, body).await
            }
            Err(error) => Err(error),
        };

        if outcome.is_err() {
            cache.discard(destination).await;
        }
        outcome.map(|()| true)
    }

    async fn write_body(
        &self,
        cache: &EtagCache<'_>,
        destination: &Path,
        etag: Option<String>,
        mut body: BodyStream,
    ) -> Result<(), DownloadError> {
        match etag {
            Some(tag) => cache.store(destination, &tag).await?,
            None => cache.forget(destination).await,
        }

        let file = self
            .fs
            .create(destination)
            .await
            .map_err(|e| DownloadError::io(destination, e))?;
        let mut writer = BufWriter::new(file);
        let mut bytes_written: u64 = 0;

        while let Some(chunk) = body.next().await {
            let chunk = chunk?;
            writer
                .write_all(&chunk)
                .await
                .map_err(|e| DownloadError::io(destination, e))?;
            bytes_written += chunk.len() as u64;
        }
        writer
            .flush()
            .await
            .map_err(|e| DownloadError::io(destination, e))?;

        debug!(path = %destination.display(), bytes = bytes_written, "body written");
        Ok(())
    }

    async fn verify(
        &self,
        path: &Path,
        checksums: &BTreeMap<String, String>,
    ) -> Result<Verification, DownloadError> {
        verify_checksums(self.fs.as_ref(), checksums, path)
            .await
            .map_err(|e| DownloadError::verification(path, e))
    }
}

/// File name for a remote source: lowercase hex SHA-1 of the URL.
#[must_use]
pub fn content_address(source_url: &str) -> String {
    hex::encode(Sha1::digest(source_url.as_bytes()))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    use std::collections::VecDeque;
    use std::sync::Mutex;

    use async_trait::async_trait;
    use bytes::Bytes;
    use futures_util::stream;
    use tempfile::TempDir;

    use crate::download::ChecksumError;
    use crate::download::etag::sidecar_path;

    const URL: &str = "https://example.com/agent.zip";
    const BUCKET_URL: &str = "https://packages.s3.us-west-2.amazonaws.com/agent/1.0.0/agent.zip";

    // ==================== Stubs ====================

    #[derive(Clone)]
    enum Reply {
        NotModified,
        Content(Option<&'static str>, &'static [u8]),
        Status(u16),
        BrokenBody,
    }

    impl Reply {
        fn into_response(self, url: &str) -> Result<FetchResponse, DownloadError> {
            match self {
                Self::NotModified => Ok(FetchResponse::NotModified),
                Self::Content(etag, body) => Ok(FetchResponse::Modified {
                    etag: etag.map(ToString::to_string),
                    body: stream::iter(vec![Ok(Bytes::from_static(body))]).boxed(),
                }),
                Self::Status(status) => Err(DownloadError::http_status(url, status)),
                Self::BrokenBody => Ok(FetchResponse::Modified {
                    etag: Some("\"broken\"".to_string()),
                    body: stream::iter(vec![
                        Ok(Bytes::from_static(b"partial")),
                        Err(DownloadError::timeout(url)),
                    ])
                    .boxed(),
                }),
            }
        }
    }

    /// Replays scripted replies and records the tag sent with each call.
    #[derive(Default)]
    struct Script {
        replies: Mutex<VecDeque<Reply>>,
        seen_tags: Mutex<Vec<Option<String>>>,
    }

    impl Script {
        fn new(replies: impl IntoIterator<Item = Reply>) -> Arc<Self> {
            Arc::new(Self {
                replies: Mutex::new(replies.into_iter().collect()),
                seen_tags: Mutex::new(Vec::new()),
            })
        }

        fn next(&self, url: &str, tag: Option<&str>) -> Result<FetchResponse, DownloadError> {
            self.seen_tags.lock().unwrap().push(tag.map(ToString::to_string));
            let reply = self
                .replies
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or(Reply::Status(599));
            reply.into_response(url)
        }

        fn calls(&self) -> usize {
            self.seen_tags.lock().unwrap().len()
        }

        fn tags(&self) -> Vec<Option<String>> {
            self.seen_tags.lock().unwrap().clone()
        }
    }

    struct StubHttp(Arc<Script>);

    #[async_trait]
    impl HttpTransport for StubHttp {
        async fn get(
            &self,
            url: &str,
            if_none_match: Option<&str>,
        ) -> Result<FetchResponse, DownloadError> {
            self.0.next(url, if_none_match)
        }
    }

    struct StubStorage(Arc<Script>);

    #[async_trait]
    impl ObjectStorageClient for StubStorage {
        async fn get_object(
            &self,
            location: &AmazonS3Url,
            if_none_match: Option<&str>,
        ) -> Result<FetchResponse, DownloadError> {
            self.0.next(&location.to_string(), if_none_match)
        }
    }

    fn downloader(dir: &TempDir, http: &Arc<Script>, storage: &Arc<Script>) -> ArtifactDownloader {
        let config = DownloaderConfig {
            download_root: dir.path().to_path_buf(),
            retry_initial_interval: Duration::from_millis(1),
            max_retries: 2,
            ..DownloaderConfig::default()
        };
        ArtifactDownloader::with_components(
            config,
            Arc::new(StubHttp(Arc::clone(http))),
            Arc::new(StubStorage(Arc::clone(storage))),
            Arc::new(LocalFileSystem),
        )
    }

    // ==================== Content Addressing ====================

    #[test]
    fn test_content_address_is_sha1_of_url() {
        assert_eq!(
            content_address(URL),
            "4d997eeec0f6399944cb618921aac8ca48c4c156"
        );
    }

    #[test]
    fn test_default_config() {
        let config = DownloaderConfig::default();
        assert_eq!(config.retry_initial_interval, Duration::from_millis(200));
        assert_eq!(config.max_retries, 5);
        assert!(config.download_root.ends_with("artifact-fetch/downloads"));
    }

    // ==================== HTTP Transport ====================

    #[tokio::test]
    async fn test_download_writes_file_and_sidecar() {
        let dir = TempDir::new().unwrap();
        let http = Script::new([Reply::Content(Some("\"v1\""), b"agent bytes")]);
        let storage = Script::new([]);

        let result = downloader(&dir, &http, &storage)
            .download(&DownloadRequest::new(URL))
            .await
            .unwrap();

        assert_eq!(result.local_file_path, dir.path().join(content_address(URL)));
        assert!(result.is_updated);
        assert!(result.is_hash_matched());
        assert_eq!(result.verification, Verification::Skipped);
        assert_eq!(std::fs::read(&result.local_file_path).unwrap(), b"agent bytes");
        assert_eq!(
            std::fs::read_to_string(sidecar_path(&result.local_file_path)).unwrap(),
            "\"v1\""
        );
        assert_eq!(storage.calls(), 0, "non-bucket URL must not use object storage");
    }

    #[tokio::test]
    async fn test_download_not_modified_keeps_file() {
        let dir = TempDir::new().unwrap();
        let http = Script::new([
            Reply::Content(Some("\"v1\""), b"agent bytes"),
            Reply::NotModified,
        ]);
        let storage = Script::new([]);
        let downloader = downloader(&dir, &http, &storage);

        let first = downloader.download(&DownloadRequest::new(URL)).await.unwrap();
        let second = downloader.download(&DownloadRequest::new(URL)).await.unwrap();

        assert!(first.is_updated);
        assert!(!second.is_updated);
        assert_eq!(first.local_file_path, second.local_file_path);
        assert_eq!(std::fs::read(&second.local_file_path).unwrap(), b"agent bytes");
        assert_eq!(http.tags(), vec![None, Some("\"v1\"".to_string())]);
    }

    #[tokio::test]
    async fn test_download_without_etag_removes_stale_sidecar() {
        let dir = TempDir::new().unwrap();
        let http = Script::new([
            Reply::Content(Some("\"v1\""), b"one"),
            Reply::Content(None, b"two"),
        ]);
        let storage = Script::new([]);
        let downloader = downloader(&dir, &http, &storage);

        downloader.download(&DownloadRequest::new(URL)).await.unwrap();
        let result = downloader.download(&DownloadRequest::new(URL)).await.unwrap();

        assert!(result.is_updated);
        assert_eq!(std::fs::read(&result.local_file_path).unwrap(), b"two");
        assert!(!sidecar_path(&result.local_file_path).exists());
    }

    #[tokio::test]
    async fn test_sidecar_alone_is_not_replayed() {
        let dir = TempDir::new().unwrap();
        let dest = dir.path().join(content_address(URL));
        std::fs::write(sidecar_path(&dest), "\"orphan\"").unwrap();

        let http = Script::new([Reply::Content(Some("\"v2\""), b"fresh")]);
        let storage = Script::new([]);
        downloader(&dir, &http, &storage)
            .download(&DownloadRequest::new(URL))
            .await
            .unwrap();

        assert_eq!(http.tags(), vec![None]);
    }

    #[tokio::test]
    async fn test_forbidden_is_terminal_and_cleans_up() {
        let dir = TempDir::new().unwrap();
        let dest = dir.path().join(content_address(URL));
        std::fs::write(&dest, b"old").unwrap();
        std::fs::write(sidecar_path(&dest), "\"old\"").unwrap();

        let http = Script::new([Reply::Status(403)]);
        let storage = Script::new([]);
        let err = downloader(&dir, &http, &storage)
            .download(&DownloadRequest::new(URL))
            .await
            .unwrap_err();

        assert_eq!(err.status(), Some(403));
        assert_eq!(http.calls(), 1, "403 must not be retried");
        assert!(!dest.exists());
        assert!(!sidecar_path(&dest).exists());
    }

    #[tokio::test]
    async fn test_server_error_is_retried() {
        let dir = TempDir::new().unwrap();
        let http = Script::new([Reply::Status(500), Reply::Content(None, b"ok")]);
        let storage = Script::new([]);

        let result = downloader(&dir, &http, &storage)
            .download(&DownloadRequest::new(URL))
            .await
            .unwrap();

        assert!(result.is_updated);
        assert_eq!(http.calls(), 2);
    }

    #[tokio::test]
    async fn test_retries_exhausted_returns_last_error() {
        let dir = TempDir::new().unwrap();
        let http = Script::new([Reply::Status(503), Reply::Status(503), Reply::Status(502)]);
        let storage = Script::new([]);

        let err = downloader(&dir, &http, &storage)
            .download(&DownloadRequest::new(URL))
            .await
            .unwrap_err();

        assert_eq!(err.status(), Some(502));
        assert_eq!(http.calls(), 3, "initial attempt plus two retries");
    }

    #[tokio::test]
    async fn test_broken_body_discards_partial_file() {
        let dir = TempDir::new().unwrap();
        let http = Script::new([Reply::BrokenBody, Reply::BrokenBody, Reply::BrokenBody]);
        let storage = Script::new([]);

        let err = downloader(&dir, &http, &storage)
            .download(&DownloadRequest::new(URL))
            .await
            .unwrap_err();

        let dest = dir.path().join(content_address(URL));
        assert!(matches!(err, DownloadError::Timeout { .. }));
        assert!(!dest.exists());
        assert!(!sidecar_path(&dest).exists());
    }

    // ==================== Object Storage ====================

    #[tokio::test]
    async fn test_bucket_url_uses_object_storage() {
        let dir = TempDir::new().unwrap();
        let http = Script::new([]);
        let storage = Script::new([Reply::Content(Some("\"s3\""), b"from bucket")]);

        let result = downloader(&dir, &http, &storage)
            .download(&DownloadRequest::new(BUCKET_URL))
            .await
            .unwrap();

        assert_eq!(std::fs::read(&result.local_file_path).unwrap(), b"from bucket");
        assert_eq!(storage.calls(), 1);
        assert_eq!(http.calls(), 0);
    }

    #[tokio::test]
    async fn test_object_storage_failure_falls_back_to_http() {
        let dir = TempDir::new().unwrap();
        let http = Script::new([Reply::Content(None, b"from http")]);
        let storage = Script::new([Reply::Status(403)]);

        let result = downloader(&dir, &http, &storage)
            .download(&DownloadRequest::new(BUCKET_URL))
            .await
            .unwrap();

        assert_eq!(result.local_file_path, dir.path().join(content_address(BUCKET_URL)));
        assert_eq!(std::fs::read(&result.local_file_path).unwrap(), b"from http");
        assert_eq!(storage.calls(), 1);
        assert_eq!(http.calls(), 1);
    }

    #[tokio::test]
    async fn test_object_storage_retries_before_fallback() {
        let dir = TempDir::new().unwrap();
        let http = Script::new([Reply::Content(None, b"from http")]);
        let storage = Script::new([Reply::Status(500), Reply::Status(500), Reply::Status(500)]);

        downloader(&dir, &http, &storage)
            .download(&DownloadRequest::new(BUCKET_URL))
            .await
            .unwrap();

        assert_eq!(storage.calls(), 3);
        assert_eq!(http.calls(), 1);
    }

    // ==================== Local Sources ====================

    #[tokio::test]
    async fn test_local_path_skips_network() {
        let dir = TempDir::new().unwrap();
        let local = dir.path().join("agent.zip");
        std::fs::write(&local, b"hello world").unwrap();
        let http = Script::new([]);
        let storage = Script::new([]);

        let request = DownloadRequest::new(local.to_str().unwrap()).with_checksum(
            "sha256",
            "b94d27b9934d3e08a52e52d7da7dabfac484efe37a5380ee9088f7ace2efcde9",
        );
        let result = downloader(&dir, &http, &storage).download(&request).await.unwrap();

        assert_eq!(result.local_file_path, local);
        assert!(!result.is_updated);
        assert!(matches!(result.verification, Verification::Matched { .. }));
        assert_eq!(http.calls() + storage.calls(), 0);
    }

    #[tokio::test]
    async fn test_file_url_skips_network() {
        let dir = TempDir::new().unwrap();
        let local = dir.path().join("agent.zip");
        std::fs::write(&local, b"data").unwrap();
        let http = Script::new([]);
        let storage = Script::new([]);

        let file_url = Url::from_file_path(&local).unwrap().to_string();
        let result = downloader(&dir, &http, &storage)
            .download(&DownloadRequest::new(file_url))
            .await
            .unwrap();

        assert_eq!(result.local_file_path, local);
        assert!(!result.is_updated);
        assert_eq!(http.calls(), 0);
    }

    // ==================== Destination & Verification ====================

    #[tokio::test]
    async fn test_request_destination_overrides_root() {
        let dir = TempDir::new().unwrap();
        let nested = dir.path().join("a").join("b");
        let http = Script::new([Reply::Content(None, b"x")]);
        let storage = Script::new([]);

        let result = downloader(&dir, &http, &storage)
            .download(&DownloadRequest::new(URL).with_destination(&nested))
            .await
            .unwrap();

        assert!(nested.is_dir());
        assert_eq!(result.local_file_path, nested.join(content_address(URL)));
    }

    #[tokio::test]
    async fn test_uncreatable_destination_is_io_error() {
        let dir = TempDir::new().unwrap();
        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, b"file").unwrap();
        let http = Script::new([]);
        let storage = Script::new([]);

        let err = downloader(&dir, &http, &storage)
            .download(&DownloadRequest::new(URL).with_destination(blocker.join("sub")))
            .await
            .unwrap_err();

        assert!(matches!(err, DownloadError::Io { .. }));
        assert_eq!(http.calls(), 0);
    }

    #[tokio::test]
    async fn test_checksum_mismatch_keeps_file() {
        let dir = TempDir::new().unwrap();
        let http = Script::new([Reply::Content(Some("\"v1\""), b"hello world")]);
        let storage = Script::new([]);

        let request = DownloadRequest::new(URL).with_checksum("md5", "00000000000000000000000000000000");
        let err = downloader(&dir, &http, &storage)
            .download(&request)
            .await
            .unwrap_err();

        match err {
            DownloadError::Verification { path, source } => {
                assert!(path.exists(), "file is kept for diagnostics");
                assert!(matches!(source, ChecksumError::Mismatch { algorithm: "md5", .. }));
            }
            other => panic!("Expected Verification error, got: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_checksum_match_after_download() {
        let dir = TempDir::new().unwrap();
        let http = Script::new([Reply::Content(None, b"hello world")]);
        let storage = Script::new([]);

        let request = DownloadRequest::new(URL)
            .with_checksum("md5", "5EB63BBBE01EEED093CB22BB8F5ACDC3")
            .with_checksum("sha512", "ignored");
        let result = downloader(&dir, &http, &storage).download(&request).await.unwrap();

        assert_eq!(
            result.verification,
            Verification::Matched {
                algorithms: vec![crate::download::HashAlgorithm::Md5]
            }
        );
    }
}
