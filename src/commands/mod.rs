//! CLI command handlers.

mod download;
mod fetch_package;
mod inspect;

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use artifact_core::download::{DownloadResult, DownloaderConfig, FileSystem, Verification};
use artifact_core::manifest::HostPlatform;
use tracing::debug;

use crate::app_config::FileConfig;
use crate::cli::{Command, HostArgs, TransferArgs};

pub use download::run_download_command;
pub use fetch_package::run_fetch_package_command;
pub use inspect::{run_latest_version_command, run_parse_url_command, run_select_variant_command};

/// Runs the selected subcommand.
pub async fn dispatch(command: Command, config: &FileConfig) -> Result<()> {
    match command {
        Command::Download(args) => run_download_command(&args, config).await,
        Command::ParseUrl { url } => run_parse_url_command(&url),
        Command::SelectVariant(args) => run_select_variant_command(&args).await,
        Command::LatestVersion(args) => run_latest_version_command(&args, config).await,
        Command::FetchPackage(args) => run_fetch_package_command(&args, config).await,
    }
}

/// Downloader settings: CLI flags over config file over built-in defaults.
pub(crate) fn downloader_config(file: &FileConfig, transfer: &TransferArgs) -> DownloaderConfig {
    let defaults = DownloaderConfig::default();
    DownloaderConfig {
        download_root: file.download_root.clone().unwrap_or(defaults.download_root),
        retry_initial_interval: transfer
            .retry_interval_ms
            .or(file.retry_initial_interval_ms)
            .map_or(defaults.retry_initial_interval, Duration::from_millis),
        max_retries: transfer
            .max_retries
            .or(file.max_retries)
            .unwrap_or(defaults.max_retries),
        connect_timeout: file
            .connect_timeout_secs
            .map_or(defaults.connect_timeout, Duration::from_secs),
        read_timeout: file
            .read_timeout_secs
            .map_or(defaults.read_timeout, Duration::from_secs),
    }
}

/// `<temp_dir>/artifact-fetch/packages` unless configured.
pub(crate) fn package_root(file: &FileConfig) -> PathBuf {
    file.package_root
        .clone()
        .unwrap_or_else(|| std::env::temp_dir().join("artifact-fetch").join("packages"))
}

/// Host values from flags, detecting only what was not given.
pub(crate) async fn resolve_host(host: &HostArgs, fs: &dyn FileSystem) -> Result<HostPlatform> {
    if let (Some(platform), Some(os_version), Some(arch)) =
        (&host.platform, &host.os_version, &host.arch)
    {
        return Ok(HostPlatform {
            platform: platform.clone(),
            os_version: os_version.clone(),
            arch: arch.clone(),
        });
    }

    let detected = HostPlatform::detect(fs)
        .await
        .context("Host detection failed; pass --platform, --os-version and --arch")?;
    debug!(?detected, "host detected");
    Ok(HostPlatform {
        platform: host.platform.clone().unwrap_or(detected.platform),
        os_version: host.os_version.clone().unwrap_or(detected.os_version),
        arch: host.arch.clone().unwrap_or(detected.arch),
    })
}

pub(crate) fn print_download_result(result: &DownloadResult) {
    println!("path = {}", result.local_file_path.display());
    println!("updated = {}", result.is_updated);
    let verification = match &result.verification {
        Verification::Skipped => "skipped".to_string(),
        Verification::Matched { algorithms } => algorithms
            .iter()
            .map(|algorithm| algorithm.as_str())
            .collect::<Vec<_>>()
            .join(","),
    };
    println!("verification = {verification}");
}
