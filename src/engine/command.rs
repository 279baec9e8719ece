//! Transcoder command construction
//!
//! Fast mode seeks before `-i` (keyframe aligned, stream copy). Precise mode
//! seeks after `-i` and re-encodes, so the cut lands on the exact frame.

use crate::domain::model::{AudioMode, ExtractionJob, ExtractionMode};
use crate::ports::ProcessInvocation;

/// Builds ffmpeg invocations for extraction jobs
#[derive(Debug, Clone)]
pub struct CommandBuilder {
    ffmpeg: String,
}

impl Default for CommandBuilder {
    fn default() -> Self {
        Self::new("ffmpeg")
    }
}

impl CommandBuilder {
    pub fn new(ffmpeg: impl Into<String>) -> Self {
        Self {
            ffmpeg: ffmpeg.into(),
        }
    }

    pub fn program(&self) -> &str {
        &self.ffmpeg
    }

    /// Build the invocation for one job; pure, touches no files
    pub fn build(&self, job: &ExtractionJob) -> ProcessInvocation {
        let input = job.source.path.to_string_lossy().into_owned();
        let output = job.output_path.to_string_lossy().into_owned();
        let start = job.range.start().format_hms();
        let duration = job.range.duration().format_hms();

        let invocation =
            ProcessInvocation::new(self.ffmpeg.as_str()).args(["-hide_banner", "-nostdin", "-y"]);

        match job.mode {
            ExtractionMode::Fast => invocation
                .args(["-ss", start.as_str(), "-i", input.as_str()])
                .args(["-t", duration.as_str()])
                .args(["-c", "copy", "-avoid_negative_ts", "make_zero"])
                .arg(output),
            ExtractionMode::Precise => {
                let options = &job.options;
                let invocation = invocation
                    .args(["-i", input.as_str(), "-ss", start.as_str()])
                    .args(["-t", duration.as_str(), "-map", "0"])
                    .args(["-c:v", options.video_codec.as_str()])
                    .args(["-preset", options.preset.as_str()])
                    .args(["-crf".to_string(), options.crf.to_string()]);
                let invocation = match &options.audio {
                    AudioMode::Copy => invocation.args(["-c:a", "copy"]),
                    AudioMode::Reencode { bitrate } => {
                        invocation.args(["-c:a", "aac", "-b:a", bitrate.as_str()])
                    }
                };
                invocation.arg(output)
            }
        }
    }
}
