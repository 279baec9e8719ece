//! FFprobe adapter for source duration probing

use std::io;
use std::path::Path;
use std::process::Stdio;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::debug;

use crate::domain::model::TimeSpec;
use crate::error::{ParcaError, ParcaResult};
use crate::ports::ProbePort;

/// FFprobe-based probe adapter
#[derive(Debug, Clone)]
pub struct FfprobeAdapter {
    program: String,
}

impl FfprobeAdapter {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    pub fn program(&self) -> &str {
        &self.program
    }
}

impl Default for FfprobeAdapter {
    fn default() -> Self {
        Self::new("ffprobe")
    }
}

#[async_trait]
impl ProbePort for FfprobeAdapter {
    async fn probe_duration(&self, path: &Path) -> ParcaResult<TimeSpec> {
        let probe_error = |message: String| ParcaError::Probe {
            path: path.to_path_buf(),
            message,
        };

        let output = Command::new(&self.program)
            .args([
                "-v",
                "error",
                "-show_entries",
                "format=duration",
                "-of",
                "default=noprint_wrappers=1:nokey=1",
            ])
            .arg(path)
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| match e.kind() {
                io::ErrorKind::NotFound => ParcaError::ToolNotFound {
                    tool: self.program.clone(),
                },
                _ => probe_error(e.to_string()),
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let message = stderr
                .lines()
                .map(str::trim)
                .filter(|line| !line.is_empty())
                .last()
                .unwrap_or("ffprobe exited with an error")
                .to_string();
            return Err(probe_error(message));
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        let duration = parse_duration_output(&stdout).map_err(probe_error)?;
        debug!(path = %path.display(), %duration, "Probed source duration");
        Ok(duration)
    }
}

/// Read the duration printed by ffprobe in seconds
pub fn parse_duration_output(stdout: &str) -> Result<TimeSpec, String> {
    let value = stdout
        .lines()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .ok_or_else(|| "ffprobe reported no duration".to_string())?;

    let seconds: f64 = value
        .parse()
        .map_err(|_| format!("unreadable duration '{}'", value))?;
    if !seconds.is_finite() || seconds <= 0.0 {
        return Err(format!("duration '{}' is not positive", value));
    }

    let duration = TimeSpec::from_seconds(seconds);
    if duration == TimeSpec::ZERO {
        return Err(format!("duration '{}' is not positive", value));
    }
    Ok(duration)
}
