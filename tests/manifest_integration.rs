//! Integration tests for manifest resolution feeding the downloader.

use std::time::Duration;

use artifact_core::download::{ArtifactDownloader, DownloaderConfig, LocalFileSystem};
use artifact_core::manifest::{
    ComponentManifest, ManifestError, PackageManifest, latest_installed_version,
    select_latest_version,
};
use artifact_core::storage::AmazonS3Url;
use tempfile::TempDir;

const HELLO_SHA256: &str = "b94d27b9934d3e08a52e52d7da7dabfac484efe37a5380ee9088f7ace2efcde9";

fn manifest_with_location(location: &str) -> String {
    format!(
        r#"{{
            "name": "agent",
            "version": "2.1.0",
            "packages": {{
                "ubuntu": {{ "_any": {{ "x86_64": {{ "file": "agent.zip" }} }} }}
            }},
            "files": {{
                "agent.zip": {{
                    "downloadLocation": {location:?},
                    "checksums": {{ "sha256": "{HELLO_SHA256}" }}
                }}
            }}
        }}"#
    )
}

#[tokio::test]
async fn test_manifest_to_local_download() {
    let temp_dir = TempDir::new().expect("temp dir");
    let artifact = temp_dir.path().join("agent.zip");
    std::fs::write(&artifact, b"hello world").expect("write artifact");
    let manifest_path = temp_dir.path().join("manifest.json");
    std::fs::write(
        &manifest_path,
        manifest_with_location(&artifact.to_string_lossy()),
    )
    .expect("write manifest");

    let manifest = PackageManifest::load(&LocalFileSystem, &manifest_path)
        .await
        .expect("manifest loads");
    let selection = manifest
        .select_variant("ubuntu", "24.04", "x86_64")
        .expect("variant");
    let request = manifest
        .download_request(&selection, None, None, "us-east-1")
        .expect("request");

    let downloader = ArtifactDownloader::new(DownloaderConfig {
        download_root: temp_dir.path().join("downloads"),
        retry_initial_interval: Duration::from_millis(1),
        ..DownloaderConfig::default()
    })
    .expect("downloader");
    let result = downloader.download(&request).await.expect("download");

    assert_eq!(result.local_file_path, artifact);
    assert!(!result.is_updated);
    assert!(result.is_hash_matched());
}

#[test]
fn test_bucket_location_resolves_to_parseable_url() {
    let manifest = PackageManifest::parse(&manifest_with_location(
        "s3://packages/agent/2.1.0/agent.zip",
    ))
    .expect("manifest parses");
    let selection = manifest
        .select_variant("ubuntu", "22.04", "x86_64")
        .expect("variant");
    let request = manifest
        .download_request(&selection, None, None, "ap-southeast-2")
        .expect("request");

    let parsed = AmazonS3Url::parse(&request.source_url);
    assert!(parsed.is_bucket_and_key_present());
    assert!(parsed.is_path_style);
    assert_eq!(parsed.bucket, "packages");
    assert_eq!(parsed.key, "agent/2.1.0/agent.zip");
    assert_eq!(parsed.region, "ap-southeast-2");
}

#[test]
fn test_unmatched_host_names_dimension() {
    let manifest = PackageManifest::parse(&manifest_with_location("https://e.com/a.zip"))
        .expect("manifest parses");
    let err = manifest
        .select_variant("ubuntu", "22.04", "arm64")
        .expect_err("arm64 is not packaged");
    assert!(err.to_string().contains("architecture"), "{err}");
    assert!(matches!(err, ManifestError::NoMatch { .. }));
}

#[tokio::test]
async fn test_installed_versions_and_component_manifest() {
    let root = TempDir::new().expect("temp dir");
    for version in ["1.9.0", "1.10.0", "2.0.0-rc1"] {
        let path = ComponentManifest::path(root.path(), "agent", version);
        std::fs::create_dir_all(path.parent().expect("parent")).expect("mkdir");
        std::fs::write(
            &path,
            format!(r#"{{"name":"agent","version":"{version}","install":"install.sh"}}"#),
        )
        .expect("write");
    }

    let latest = latest_installed_version(&LocalFileSystem, root.path(), "agent", "")
        .await
        .expect("list versions")
        .expect("a version is installed");
    assert_eq!(latest, "1.10.0");

    let manifest = ComponentManifest::load(&LocalFileSystem, root.path(), "agent", &latest)
        .await
        .expect("component manifest");
    assert_eq!(manifest.install.as_deref(), Some("install.sh"));
    assert!(!manifest.requires_reboot());

    let rc = ComponentManifest::load(&LocalFileSystem, root.path(), "agent", "2.0.0-rc1").await;
    assert!(matches!(rc, Err(ManifestError::InvalidComponent { .. })));
}

#[test]
fn test_select_latest_version_properties() {
    assert_eq!(
        select_latest_version(["1.0.0", "2.0.0", "10.0.0"], "").as_deref(),
        Some("10.0.0")
    );
    assert_eq!(select_latest_version(["Foo", "1.0", "1.0.0.0"], ""), None);
}
