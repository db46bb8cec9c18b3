//! `fetch-package` command: lock, detect host, select variant, download.

use anyhow::{Context, Result};
use artifact_core::ArtifactDownloader;
use artifact_core::download::LocalFileSystem;
use artifact_core::lock::ComponentLocks;
use artifact_core::manifest::PackageManifest;
use tracing::info;

use super::{downloader_config, print_download_result, resolve_host};
use crate::app_config::FileConfig;
use crate::cli::FetchPackageArgs;

pub async fn run_fetch_package_command(args: &FetchPackageArgs, config: &FileConfig) -> Result<()> {
    let fs = LocalFileSystem;
    let manifest = PackageManifest::load(&fs, &args.manifest)
        .await
        .with_context(|| format!("Failed to load manifest '{}'", args.manifest.display()))?;

    let locks = ComponentLocks::new();
    let _guard = locks.lock(&manifest.name, &args.action)?;

    let host = resolve_host(&args.host, &fs).await?;
    let selection = manifest
        .select_variant(&host.platform, &host.os_version, &host.arch)
        .with_context(|| format!("No variant of '{}' for this host", manifest.name))?;
    let request = manifest
        .download_request(
            &selection,
            args.transfer.output_dir.clone(),
            args.base_location.as_deref(),
            &args.region,
        )
        .context("Failed to build download request")?;

    info!(
        package = %manifest.name,
        version = %manifest.version,
        file = %selection.variant.file,
        source = %request.source_url,
        "fetching package"
    );

    let downloader = ArtifactDownloader::new(downloader_config(config, &args.transfer))
        .context("Failed to initialize downloader")?;
    let result = downloader
        .download(&request)
        .await
        .with_context(|| format!("Failed to download '{}'", request.source_url))?;

    println!("package = {}@{}", manifest.name, manifest.version);
    println!("file = {}", selection.variant.file);
    print_download_result(&result);
    Ok(())
}
