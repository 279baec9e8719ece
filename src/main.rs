//! parca CLI
//!
//! Cut one source video into many clips, one per time range.
//!
//! # Usage
//!
//! ```bash
//! parca import ranges.txt
//! parca probe lecture.mp4
//! parca cut lecture.mp4 --ranges ranges.txt --mode precise --jobs 2
//! parca cut lecture.mp4 --range "0:12 to 1:05" --dry-run --duration 10:00
//! ```

use std::process::ExitCode;

use anyhow::Result;
use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use parca_cli::adapters::{init_logging, AppConfig};
use parca_cli::cli::{commands, Cli, Commands};

/// Main entry point for the parca CLI application
#[tokio::main]
async fn main() -> Result<ExitCode> {
    // Parse command line arguments
    let cli = Cli::parse();

    // Initialize logging
    init_logging(&cli.log_level, cli.log_format)?;

    match cli.command {
        Commands::Import(args) => commands::import(args),
        Commands::Probe(args) => {
            let config = load_config(cli.config.as_deref())?;
            commands::probe(args, config).await
        }
        Commands::Cut(args) => {
            let config = load_config(cli.config.as_deref())?;
            let cancel = CancellationToken::new();
            spawn_interrupt_handler(cancel.clone());
            commands::cut(args, config, cancel).await
        }
    }
}

/// Config file, then `PARCA_*` environment; command flags are applied later
fn load_config(explicit: Option<&std::path::Path>) -> Result<AppConfig> {
    let mut config = AppConfig::discover(explicit)?;
    config.apply_env()?;
    Ok(config)
}

/// Ctrl-C cancels the batch; running ffmpeg processes are killed
fn spawn_interrupt_handler(cancel: CancellationToken) {
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("Interrupt received, cancelling batch");
                cancel.cancel();
            }
            Err(e) => warn!(error = %e, "Cannot listen for Ctrl-C"),
        }
    });
}
