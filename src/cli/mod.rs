//! CLI module for parca
//!
//! This module handles command-line argument parsing and command execution.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::adapters::LogFormat;

pub mod args;
pub mod commands;

pub use args::{CutArgs, ImportArgs, ProbeArgs};

/// parca - cut one video into many clips
///
/// Reads start/end time ranges from a text file or the command line and
/// extracts one clip per range with ffmpeg, either by stream copy (fast) or
/// by re-encoding (precise).
#[derive(Parser, Debug)]
#[command(name = "parca")]
#[command(about = "Batch video clipper - one clip per time range")]
#[command(version)]
pub struct Cli {
    /// Logging level or filter directive (overridden by RUST_LOG)
    #[arg(long, default_value = "info", global = true)]
    pub log_level: String,

    /// Log line format: text or json
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Configuration file (default: ./parca.toml when present)
    #[arg(long, global = true, env = "PARCA_CONFIG")]
    pub config: Option<PathBuf>,

    /// The command to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Parse a range file and show accepted ranges and bad lines
    Import(ImportArgs),
    /// Print the duration of a video
    Probe(ProbeArgs),
    /// Cut a video into one clip per range
    Cut(CutArgs),
}
