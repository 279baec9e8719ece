// TOML config adapter - Layered configuration: file, environment, defaults

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::domain::model::{AudioMode, EncodingOptions};
use crate::error::{ParcaError, ParcaResult};
use crate::planner::{OverlapPolicy, PlannerConfig};

/// Looked up in the working directory when no `--config` is given
pub const DEFAULT_CONFIG_FILE: &str = "parca.toml";

/// Highest CRF accepted by x264/x265
pub const MAX_CRF: u8 = 51;

/// Largest configurable first job number
pub const MAX_FIRST_INDEX: usize = 1_000_000;

/// Audio handling in precise mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AudioChoice {
    #[default]
    Copy,
    Aac,
}

impl FromStr for AudioChoice {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "copy" => Ok(AudioChoice::Copy),
            "aac" | "reencode" => Ok(AudioChoice::Aac),
            other => Err(format!("unknown audio mode '{}' (expected copy or aac)", other)),
        }
    }
}

impl fmt::Display for AudioChoice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AudioChoice::Copy => write!(f, "copy"),
            AudioChoice::Aac => write!(f, "aac"),
        }
    }
}

/// External tool locations
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ToolsConfig {
    pub ffmpeg: String,
    pub ffprobe: String,
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            ffmpeg: "ffmpeg".to_string(),
            ffprobe: "ffprobe".to_string(),
        }
    }
}

/// Precise-mode encoder settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EncodingConfig {
    pub video_codec: String,
    pub crf: u8,
    pub preset: String,
    pub audio: AudioChoice,
    pub audio_bitrate: String,
}

impl Default for EncodingConfig {
    fn default() -> Self {
        Self {
            video_codec: "libx264".to_string(),
            crf: 18,
            preset: "veryfast".to_string(),
            audio: AudioChoice::Copy,
            audio_bitrate: "192k".to_string(),
        }
    }
}

/// Batch scheduling and output settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BatchConfig {
    pub concurrency: usize,
    pub output_dir: PathBuf,
    pub extension: String,
    pub overlap: OverlapPolicy,
    pub first_index: usize,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            concurrency: 1,
            output_dir: PathBuf::from("."),
            extension: "mp4".to_string(),
            overlap: OverlapPolicy::Allow,
            first_index: 1,
        }
    }
}

/// Application configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AppConfig {
    pub tools: ToolsConfig,
    pub encoding: EncodingConfig,
    pub batch: BatchConfig,
}

impl AppConfig {
    pub fn from_toml_str(content: &str) -> ParcaResult<Self> {
        toml::from_str(content).map_err(|e| ParcaError::Config {
            message: format!("failed to parse TOML: {}", e),
        })
    }

    pub fn load_file(path: &Path) -> ParcaResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| ParcaError::Config {
            message: format!("cannot read {}: {}", path.display(), e),
        })?;
        let config = Self::from_toml_str(&content)?;
        info!(path = %path.display(), "Loaded configuration file");
        Ok(config)
    }

    /// Explicit file (must exist), else `parca.toml` if present, else defaults
    pub fn discover(explicit: Option<&Path>) -> ParcaResult<Self> {
        match explicit {
            Some(path) => Self::load_file(path),
            None => {
                let fallback = Path::new(DEFAULT_CONFIG_FILE);
                if fallback.is_file() {
                    Self::load_file(fallback)
                } else {
                    Ok(Self::default())
                }
            }
        }
    }

    /// Apply `PARCA_*` variables from the process environment
    pub fn apply_env(&mut self) -> ParcaResult<()> {
        self.apply_env_from(|key| std::env::var(key).ok())
    }

    /// Apply `PARCA_*` variables from an arbitrary lookup
    pub fn apply_env_from<F>(&mut self, lookup: F) -> ParcaResult<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(value) = lookup("PARCA_FFMPEG") {
            self.tools.ffmpeg = value;
        }
        if let Some(value) = lookup("PARCA_FFPROBE") {
            self.tools.ffprobe = value;
        }
        if let Some(value) = lookup("PARCA_CONCURRENCY") {
            self.batch.concurrency = parse_env("PARCA_CONCURRENCY", &value)?;
        }
        if let Some(value) = lookup("PARCA_CRF") {
            self.encoding.crf = parse_env("PARCA_CRF", &value)?;
        }
        if let Some(value) = lookup("PARCA_PRESET") {
            self.encoding.preset = value;
        }
        if let Some(value) = lookup("PARCA_VIDEO_CODEC") {
            self.encoding.video_codec = value;
        }
        if let Some(value) = lookup("PARCA_OUTPUT_DIR") {
            self.batch.output_dir = PathBuf::from(value);
        }
        Ok(())
    }

    /// Check ranges; an oversized worker pool is capped at the CPU count
    pub fn validate(&mut self) -> ParcaResult<()> {
        if self.encoding.crf > MAX_CRF {
            return Err(config_error(format!(
                "crf {} is out of range 0-{}",
                self.encoding.crf, MAX_CRF
            )));
        }
        if self.batch.first_index == 0 || self.batch.first_index > MAX_FIRST_INDEX {
            return Err(config_error(format!(
                "first_index {} is out of range 1-{}",
                self.batch.first_index, MAX_FIRST_INDEX
            )));
        }
        if self.batch.concurrency == 0 {
            return Err(config_error("concurrency must be at least 1".to_string()));
        }
        let cpus = num_cpus::get().max(1);
        if self.batch.concurrency > cpus {
            warn!(
                requested = self.batch.concurrency,
                cpus, "Capping concurrency at the number of CPUs"
            );
            self.batch.concurrency = cpus;
        }

        for (name, value) in [
            ("tools.ffmpeg", &self.tools.ffmpeg),
            ("tools.ffprobe", &self.tools.ffprobe),
            ("encoding.video_codec", &self.encoding.video_codec),
            ("encoding.preset", &self.encoding.preset),
            ("encoding.audio_bitrate", &self.encoding.audio_bitrate),
            ("batch.extension", &self.batch.extension),
        ] {
            if value.trim().is_empty() {
                return Err(config_error(format!("{} must not be empty", name)));
            }
        }
        Ok(())
    }

    pub fn encoding_options(&self) -> EncodingOptions {
        EncodingOptions {
            video_codec: self.encoding.video_codec.clone(),
            crf: self.encoding.crf,
            preset: self.encoding.preset.clone(),
            audio: match self.encoding.audio {
                AudioChoice::Copy => AudioMode::Copy,
                AudioChoice::Aac => AudioMode::Reencode {
                    bitrate: self.encoding.audio_bitrate.clone(),
                },
            },
        }
    }

    pub fn planner_config(&self) -> PlannerConfig {
        PlannerConfig {
            output_dir: self.batch.output_dir.clone(),
            extension: self.batch.extension.clone(),
            overlap: self.batch.overlap,
            first_index: self.batch.first_index,
        }
    }
}

fn config_error(message: String) -> ParcaError {
    ParcaError::Config { message }
}

fn parse_env<T: FromStr>(key: &str, value: &str) -> ParcaResult<T> {
    value
        .trim()
        .parse()
        .map_err(|_| config_error(format!("{}='{}' is not a valid number", key, value)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.tools.ffmpeg, "ffmpeg");
        assert_eq!(config.encoding_options(), EncodingOptions::default());
        assert_eq!(config.planner_config(), PlannerConfig::default());
        assert_eq!(config.encoding.audio_bitrate, "192k");
        assert_eq!(config.batch.concurrency, 1);
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let config = AppConfig::from_toml_str(
            r#"
            [encoding]
            crf = 23
            audio = "aac"

            [batch]
            overlap = "reject"
            output_dir = "clips"
            "#,
        )
        .unwrap();
        assert_eq!(config.encoding.crf, 23);
        assert_eq!(config.encoding.preset, "veryfast");
        assert_eq!(config.batch.overlap, OverlapPolicy::Reject);
        assert_eq!(config.batch.output_dir, PathBuf::from("clips"));
        assert_eq!(
            config.encoding_options().audio,
            AudioMode::Reencode {
                bitrate: "192k".to_string()
            }
        );
    }

    #[test]
    fn test_unknown_keys_are_rejected() {
        let err = AppConfig::from_toml_str("[batch]\nthreads = 4\n").unwrap_err();
        assert!(matches!(err, ParcaError::Config { .. }));
    }

    #[test]
    fn test_env_overrides_file() {
        let mut config = AppConfig::from_toml_str("[encoding]\ncrf = 23\n").unwrap();
        let env: HashMap<&str, &str> = [
            ("PARCA_CRF", "30"),
            ("PARCA_FFMPEG", "/opt/ffmpeg/bin/ffmpeg"),
            ("PARCA_OUTPUT_DIR", "out"),
        ]
        .into_iter()
        .collect();
        config
            .apply_env_from(|key| env.get(key).map(|v| v.to_string()))
            .unwrap();
        assert_eq!(config.encoding.crf, 30);
        assert_eq!(config.tools.ffmpeg, "/opt/ffmpeg/bin/ffmpeg");
        assert_eq!(config.batch.output_dir, PathBuf::from("out"));
    }

    #[test]
    fn test_bad_env_value() {
        let mut config = AppConfig::default();
        let err = config
            .apply_env_from(|key| (key == "PARCA_CONCURRENCY").then(|| "many".to_string()))
            .unwrap_err();
        assert!(err.to_string().contains("PARCA_CONCURRENCY"));
    }

    #[test]
    fn test_validate() {
        let mut config = AppConfig::default();
        config.encoding.crf = 52;
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.batch.concurrency = 0;
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.batch.concurrency = 100_000;
        config.validate().unwrap();
        assert_eq!(config.batch.concurrency, num_cpus::get().max(1));

        let mut config = AppConfig::default();
        config.encoding.preset = " ".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_first_index() {
        let mut config = AppConfig::default();
        config.batch.first_index = 0;
        assert!(matches!(config.validate(), Err(ParcaError::Config { .. })));

        let mut config = AppConfig::from_toml_str("[batch]\nfirst_index = 0\n").unwrap();
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.batch.first_index = usize::MAX;
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.batch.first_index = MAX_FIRST_INDEX;
        config.validate().unwrap();
    }

    #[test]
    fn test_load_explicit_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[tools]\nffprobe = \"my-ffprobe\"").unwrap();
        let config = AppConfig::discover(Some(file.path())).unwrap();
        assert_eq!(config.tools.ffprobe, "my-ffprobe");

        let missing = file.path().with_extension("missing");
        assert!(AppConfig::discover(Some(&missing)).is_err());
    }
}
