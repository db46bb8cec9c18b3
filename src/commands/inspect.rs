//! Read-only commands: `parse-url`, `select-variant`, `latest-version`.

use anyhow::{Context, Result};
use artifact_core::download::LocalFileSystem;
use artifact_core::manifest::{PackageManifest, latest_installed_version};
use artifact_core::storage::AmazonS3Url;
use serde_json::json;
use tracing::info;

use super::{package_root, resolve_host};
use crate::app_config::FileConfig;
use crate::cli::{LatestVersionArgs, SelectVariantArgs};

pub fn run_parse_url_command(url: &str) -> Result<()> {
    let parsed = AmazonS3Url::parse(url);
    println!("{}", serde_json::to_string_pretty(&parsed)?);
    Ok(())
}

pub async fn run_select_variant_command(args: &SelectVariantArgs) -> Result<()> {
    let fs = LocalFileSystem;
    let manifest = PackageManifest::load(&fs, &args.manifest)
        .await
        .with_context(|| format!("Failed to load manifest '{}'", args.manifest.display()))?;
    let host = resolve_host(&args.host, &fs).await?;
    let selection = manifest
        .select_variant(&host.platform, &host.os_version, &host.arch)
        .with_context(|| format!("No variant of '{}' for this host", manifest.name))?;

    let output = json!({
        "host": host,
        "matched": {
            "platform": selection.platform,
            "os_version": selection.os_version,
            "arch": selection.arch,
        },
        "variant": selection.variant,
    });
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

pub async fn run_latest_version_command(args: &LatestVersionArgs, config: &FileConfig) -> Result<()> {
    let root = args
        .package_root
        .clone()
        .unwrap_or_else(|| package_root(config));
    let latest = latest_installed_version(
        &LocalFileSystem,
        &root,
        &args.component,
        args.exclude.as_deref().unwrap_or_default(),
    )
    .await
    .with_context(|| format!("Failed to list versions of '{}'", args.component))?;

    match latest {
        Some(version) => println!("{version}"),
        None => info!(component = %args.component, root = %root.display(), "no installed version found"),
    }
    Ok(())
}
