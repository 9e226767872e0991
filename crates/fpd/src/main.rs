//! `fpd` entry point.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use fp_telemetry::{init_logging, TelemetryConfig};
use fpd::{FpdApp, FpdConfig, CONFIG_FILE_NAME};
use tracing::info;

#[derive(Parser)]
#[clap(rename_all = "kebab-case")]
#[clap(name = "fpd", version, about = "Finality provider daemon for BTC-staked consumer chains")]
struct Cli {
    #[clap(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Start the daemon.
    Start(StartArgs),
}

#[derive(clap::Args)]
#[clap(rename_all = "kebab-case")]
struct StartArgs {
    /// Home directory holding the config file and data.
    #[clap(long, default_value_os_t = default_home())]
    home: PathBuf,

    /// Config file. Defaults to `<home>/fpd.toml`.
    #[clap(long)]
    config: Option<PathBuf>,

    /// Overrides `log_level`.
    #[clap(long)]
    log_level: Option<String>,

    /// Overrides `api_port`.
    #[clap(long)]
    api_port: Option<u16>,
}

fn default_home() -> PathBuf {
    std::env::var_os("HOME")
        .map(PathBuf::from)
        .unwrap_or_default()
        .join(".fpd")
}

async fn start(args: StartArgs) -> Result<()> {
    let config_path = args.config.unwrap_or_else(|| args.home.join(CONFIG_FILE_NAME));
    let mut config = FpdConfig::load(&config_path)?;
    config.resolve_paths(&args.home);
    if let Some(level) = args.log_level {
        config.log_level = level;
    }
    if let Some(port) = args.api_port {
        config.api_port = port;
    }

    let telemetry = TelemetryConfig::from_env().with_overrides(Some(&config.log_level), config.json_logs);
    init_logging(&telemetry).context("failed to initialize logging")?;
    info!(config = %config_path.display(), "Loaded configuration");

    let mut app = FpdApp::new(config)?;
    app.start().await?;

    info!("Daemon is running. Press Ctrl+C to stop.");
    tokio::signal::ctrl_c().await.context("failed to listen for Ctrl+C")?;

    app.shutdown().await
}

#[tokio::main]
async fn main() -> Result<()> {
    match Cli::parse().command {
        Command::Start(args) => start(args).await,
    }
}
