//! Command-line argument definitions

use std::path::PathBuf;

use clap::Args;
use clap_num::number_range;

use crate::adapters::AudioChoice;
use crate::adapters::toml_config::MAX_CRF;
use crate::domain::model::{ExtractionMode, TimeSpec};

fn crf_in_range(s: &str) -> Result<u8, String> {
    number_range(s, 0, MAX_CRF)
}

fn jobs_in_range(s: &str) -> Result<usize, String> {
    number_range(s, 1, 256)
}

/// Arguments for the import command
#[derive(Args, Debug)]
pub struct ImportArgs {
    /// Text file with one range per line
    pub file: PathBuf,

    /// Output in JSON format
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the probe command
#[derive(Args, Debug)]
pub struct ProbeArgs {
    /// Input video file path
    pub video: PathBuf,

    /// Output in JSON format
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the cut command
#[derive(Args, Debug)]
pub struct CutArgs {
    /// Input video file path
    pub video: PathBuf,

    /// Text file with one range per line
    #[arg(long, value_name = "FILE")]
    pub ranges: Option<PathBuf>,

    /// A single range such as "1:05-2:30"; may be repeated
    #[arg(long = "range", value_name = "EXPR")]
    pub range: Vec<String>,

    /// Extraction mode: fast (stream copy) or precise (re-encode)
    #[arg(long, default_value = "fast")]
    pub mode: ExtractionMode,

    /// Directory the clips are written to
    #[arg(long, value_name = "DIR")]
    pub out_dir: Option<PathBuf>,

    /// Video codec for precise mode
    #[arg(long)]
    pub codec: Option<String>,

    /// Constant Rate Factor (0-51)
    #[arg(long, value_parser = crf_in_range)]
    pub crf: Option<u8>,

    /// Encoding preset
    #[arg(long)]
    pub preset: Option<String>,

    /// Audio in precise mode: copy or aac
    #[arg(long)]
    pub audio: Option<AudioChoice>,

    /// AAC bitrate when audio is re-encoded
    #[arg(long)]
    pub audio_bitrate: Option<String>,

    /// Number of clips extracted at once
    #[arg(long, short = 'j', value_parser = jobs_in_range)]
    pub jobs: Option<usize>,

    /// Source duration; skips probing with ffprobe
    #[arg(long, value_name = "TIME")]
    pub duration: Option<TimeSpec>,

    /// Print the report as JSON
    #[arg(long)]
    pub json: bool,

    /// Print the ffmpeg commands without running them
    #[arg(long)]
    pub dry_run: bool,
}
