//! Object-storage addressing and access.
//!
//! - [`url`] recognizes object-storage URLs and rewrites `s3://` locations
//! - [`client`] fetches objects anonymously over HTTPS

pub mod client;
pub mod url;

pub use client::{ObjectStorageClient, S3HttpClient};
pub use url::{AmazonS3Url, DEFAULT_REGION, resolve_location};
