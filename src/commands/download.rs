//! `download` command: fetch one artifact.

use anyhow::{Context, Result};
use artifact_core::{ArtifactDownloader, DownloadRequest};
use tracing::info;

use super::{downloader_config, print_download_result};
use crate::app_config::FileConfig;
use crate::cli::DownloadArgs;

pub async fn run_download_command(args: &DownloadArgs, config: &FileConfig) -> Result<()> {
    let downloader = ArtifactDownloader::new(downloader_config(config, &args.transfer))
        .context("Failed to initialize downloader")?;

    let request = DownloadRequest {
        source_url: args.url.clone(),
        destination_dir: args.transfer.output_dir.clone(),
        checksums: args.checksums.iter().cloned().collect(),
    };
    let result = downloader
        .download(&request)
        .await
        .with_context(|| format!("Failed to download '{}'", args.url))?;

    info!(path = %result.local_file_path.display(), updated = result.is_updated, "artifact ready");
    print_download_result(&result);
    Ok(())
}
