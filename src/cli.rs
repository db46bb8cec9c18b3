//! CLI argument definitions using clap derive macros.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use artifact_core::storage::DEFAULT_REGION;

/// Resolve and download platform-specific package artifacts.
///
/// Artifacts are fetched from object storage or plain HTTP(S), cached by
/// URL with entity-tag revalidation, and verified against their checksums.
#[derive(Parser, Debug)]
#[command(name = "artifact-fetch")]
#[command(author, version, about)]
pub struct Args {
    /// Increase output verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Config file (default: $XDG_CONFIG_HOME/artifact-fetch/config.toml)
    #[arg(long, value_name = "PATH", global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Download one artifact and verify it
    Download(DownloadArgs),
    /// Show how an object-storage URL is interpreted
    ParseUrl {
        /// URL to parse
        url: String,
    },
    /// Select the package variant for a host
    SelectVariant(SelectVariantArgs),
    /// Print the latest installed version of a component
    LatestVersion(LatestVersionArgs),
    /// Select, download and verify the package for this host
    FetchPackage(FetchPackageArgs),
}

/// Transfer settings shared by downloading commands.
#[derive(clap::Args, Debug, Clone, Default)]
pub struct TransferArgs {
    /// Destination directory (default: config `download_root`)
    #[arg(short = 'o', long, value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    /// Retries after the first attempt, per transport (1-100)
    #[arg(short = 'r', long, value_parser = clap::value_parser!(u32).range(1..=100))]
    pub max_retries: Option<u32>,

    /// First retry delay in milliseconds (1-10000)
    #[arg(long, value_name = "MS", value_parser = clap::value_parser!(u64).range(1..=10_000))]
    pub retry_interval_ms: Option<u64>,
}

#[derive(clap::Args, Debug, Clone)]
pub struct DownloadArgs {
    /// URL, file:// URL or local path
    pub url: String,

    /// Expected digest as ALGORITHM=HEX (repeatable; bare HEX means sha256)
    #[arg(long = "checksum", value_name = "ALG=HEX", value_parser = parse_checksum)]
    pub checksums: Vec<(String, String)>,

    #[command(flatten)]
    pub transfer: TransferArgs,
}

/// Host overrides; undetected values are filled in from the running host.
#[derive(clap::Args, Debug, Clone, Default)]
pub struct HostArgs {
    /// Platform name (e.g. ubuntu)
    #[arg(long)]
    pub platform: Option<String>,

    /// Platform version (e.g. 22.04)
    #[arg(long)]
    pub os_version: Option<String>,

    /// Architecture (x86_64, i386, arm64, arm)
    #[arg(long)]
    pub arch: Option<String>,
}

#[derive(clap::Args, Debug, Clone)]
pub struct SelectVariantArgs {
    /// Package manifest (JSON)
    pub manifest: PathBuf,

    #[command(flatten)]
    pub host: HostArgs,
}

#[derive(clap::Args, Debug, Clone)]
pub struct LatestVersionArgs {
    /// Component name
    pub component: String,

    /// Version to skip (e.g. the one being installed)
    #[arg(long, value_name = "VERSION")]
    pub exclude: Option<String>,

    /// Package root (default: config `package_root`)
    #[arg(long, value_name = "DIR")]
    pub package_root: Option<PathBuf>,
}

#[derive(clap::Args, Debug, Clone)]
pub struct FetchPackageArgs {
    /// Package manifest (JSON)
    pub manifest: PathBuf,

    /// Action the package is fetched for; held as the component lock
    #[arg(long, default_value = "install")]
    pub action: String,

    /// Location prefix for files without a downloadLocation
    #[arg(long, value_name = "URL")]
    pub base_location: Option<String>,

    /// Region for s3:// locations
    #[arg(long, default_value = DEFAULT_REGION)]
    pub region: String,

    #[command(flatten)]
    pub host: HostArgs,

    #[command(flatten)]
    pub transfer: TransferArgs,
}

/// Parses `ALG=HEX`, or a bare `HEX` meaning SHA-256.
fn parse_checksum(raw: &str) -> Result<(String, String), String> {
    let (algorithm, digest) = raw.split_once('=').unwrap_or(("", raw));
    let digest = digest.trim();
    if digest.is_empty() {
        return Err(format!("missing digest in '{raw}'"));
    }
    Ok((algorithm.trim().to_ascii_lowercase(), digest.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_download_minimal() {
        let args = Args::try_parse_from(["artifact-fetch", "download", "https://e.com/a.zip"]).unwrap();
        assert_eq!(args.verbose, 0);
        assert!(!args.quiet);
        match args.command {
            Command::Download(download) => {
                assert_eq!(download.url, "https://e.com/a.zip");
                assert!(download.checksums.is_empty());
                assert!(download.transfer.output_dir.is_none());
            }
            other => panic!("Expected download command, got: {other:?}"),
        }
    }

    #[test]
    fn test_cli_download_checksums_and_transfer() {
        let args = Args::try_parse_from([
            "artifact-fetch",
            "download",
            "https://e.com/a.zip",
            "--checksum",
            "SHA256=abc",
            "--checksum",
            "def",
            "-o",
            "/tmp/out",
            "-r",
            "3",
            "--retry-interval-ms",
            "50",
        ])
        .unwrap();
        let Command::Download(download) = args.command else {
            panic!("Expected download command");
        };
        assert_eq!(
            download.checksums,
            vec![
                ("sha256".to_string(), "abc".to_string()),
                (String::new(), "def".to_string())
            ]
        );
        assert_eq!(download.transfer.output_dir, Some(PathBuf::from("/tmp/out")));
        assert_eq!(download.transfer.max_retries, Some(3));
        assert_eq!(download.transfer.retry_interval_ms, Some(50));
    }

    #[test]
    fn test_cli_rejects_empty_checksum() {
        let result = Args::try_parse_from(["artifact-fetch", "download", "u", "--checksum", "md5="]);
        assert_eq!(result.unwrap_err().kind(), clap::error::ErrorKind::ValueValidation);
    }

    #[test]
    fn test_cli_max_retries_range() {
        for bad in ["0", "101"] {
            let result = Args::try_parse_from(["artifact-fetch", "download", "u", "-r", bad]);
            assert_eq!(result.unwrap_err().kind(), clap::error::ErrorKind::ValueValidation);
        }
    }

    #[test]
    fn test_cli_global_flags_after_subcommand() {
        let args = Args::try_parse_from([
            "artifact-fetch",
            "parse-url",
            "https://b.s3.amazonaws.com/k",
            "-vv",
            "--config",
            "/etc/af.toml",
        ])
        .unwrap();
        assert_eq!(args.verbose, 2);
        assert_eq!(args.config, Some(PathBuf::from("/etc/af.toml")));
    }

    #[test]
    fn test_cli_fetch_package_defaults() {
        let args = Args::try_parse_from(["artifact-fetch", "fetch-package", "m.json"]).unwrap();
        let Command::FetchPackage(fetch) = args.command else {
            panic!("Expected fetch-package command");
        };
        assert_eq!(fetch.action, "install");
        assert_eq!(fetch.region, DEFAULT_REGION);
        assert!(fetch.host.platform.is_none());
    }

    #[test]
    fn test_cli_select_variant_host_overrides() {
        let args = Args::try_parse_from([
            "artifact-fetch",
            "select-variant",
            "m.json",
            "--platform",
            "ubuntu",
            "--os-version",
            "22.04",
            "--arch",
            "arm64",
        ])
        .unwrap();
        let Command::SelectVariant(select) = args.command else {
            panic!("Expected select-variant command");
        };
        assert_eq!(select.host.platform.as_deref(), Some("ubuntu"));
        assert_eq!(select.host.os_version.as_deref(), Some("22.04"));
        assert_eq!(select.host.arch.as_deref(), Some("arm64"));
    }

    #[test]
    fn test_cli_requires_subcommand() {
        let result = Args::try_parse_from(["artifact-fetch"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_cli_version_flag_shows_version() {
        let result = Args::try_parse_from(["artifact-fetch", "--version"]);
        assert_eq!(result.unwrap_err().kind(), clap::error::ErrorKind::DisplayVersion);
    }
}
