//! CLI entry point for the artifact-fetch tool.

use anyhow::Result;
use clap::Parser;
use tracing::{debug, info};

mod app_config;
mod cli;
mod commands;

use app_config::{VerbositySetting, load_config};
use cli::Args;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse CLI arguments first (before tracing, so --help works without logs)
    let args = Args::parse();

    let loaded = load_config(args.config.as_deref())?;
    let file_config = loaded.config.unwrap_or_default();

    init_tracing(default_log_level(args.verbose, args.quiet, file_config.verbosity));

    debug!(?args, config_path = ?loaded.path, "CLI arguments parsed");
    info!("artifact-fetch starting");

    commands::dispatch(args.command, &file_config).await
}

/// Priority: RUST_LOG env var > quiet flag > verbose flag > config verbosity > info.
fn default_log_level(verbose: u8, quiet: bool, config: Option<VerbositySetting>) -> &'static str {
    if quiet {
        return "error";
    }
    match verbose {
        0 => config.map_or("info", VerbositySetting::log_level),
        1 => "debug",
        _ => "trace",
    }
}

fn init_tracing(default_level: &str) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));
    let _ = tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(filter)
        .try_init();
}
