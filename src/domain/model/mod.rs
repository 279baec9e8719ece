// Domain models - Core types and data structures

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;

use serde::Serialize;

use crate::domain::errors::{FailureReason, ParseErrorKind};

const MILLIS_PER_SECOND: u64 = 1_000;
const MILLIS_PER_MINUTE: u64 = 60 * MILLIS_PER_SECOND;
const MILLIS_PER_HOUR: u64 = 60 * MILLIS_PER_MINUTE;

/// Non-negative elapsed time with millisecond precision
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize)]
#[serde(into = "String")]
pub struct TimeSpec {
    millis: u64,
}

impl TimeSpec {
    pub const ZERO: TimeSpec = TimeSpec { millis: 0 };

    /// Create a new TimeSpec from whole milliseconds
    pub const fn from_millis(millis: u64) -> Self {
        Self { millis }
    }

    /// Create a new TimeSpec from seconds; negative or non-finite input becomes zero
    pub fn from_seconds(seconds: f64) -> Self {
        if !seconds.is_finite() || seconds <= 0.0 {
            return Self::ZERO;
        }
        Self {
            millis: (seconds * MILLIS_PER_SECOND as f64).round() as u64,
        }
    }

    /// Create a new TimeSpec from hours, minutes, seconds, milliseconds
    pub fn from_components(hours: u64, minutes: u64, seconds: u64, milliseconds: u64) -> Self {
        Self {
            millis: hours * MILLIS_PER_HOUR
                + minutes * MILLIS_PER_MINUTE
                + seconds * MILLIS_PER_SECOND
                + milliseconds,
        }
    }

    pub fn as_millis(&self) -> u64 {
        self.millis
    }

    pub fn as_seconds(&self) -> f64 {
        self.millis as f64 / MILLIS_PER_SECOND as f64
    }

    pub fn saturating_sub(self, other: TimeSpec) -> TimeSpec {
        Self {
            millis: self.millis.saturating_sub(other.millis),
        }
    }

    /// Parse `hh:mm:ss[.ms]`, `mm:ss[.ms]` or `ss[.ms]`.
    ///
    /// The leading component is unbounded (`90:00` is ninety minutes); any
    /// component following another one must be below 60.
    pub fn parse(token: &str) -> Result<Self, ParseErrorKind> {
        let trimmed = token.trim();
        if trimmed.is_empty() {
            return Err(ParseErrorKind::Empty);
        }
        if trimmed.starts_with('-') {
            return Err(ParseErrorKind::Negative(trimmed.to_string()));
        }

        let parts: Vec<&str> = trimmed.split(':').collect();
        if parts.len() > 3 {
            return Err(ParseErrorKind::TooManyComponents(trimmed.to_string()));
        }
        let (seconds_part, leading) = match parts.split_last() {
            Some(split) => split,
            None => return Err(ParseErrorKind::Empty),
        };

        let seconds = parse_seconds(seconds_part)?;
        if !leading.is_empty() && seconds >= MILLIS_PER_MINUTE {
            return Err(ParseErrorKind::ComponentOutOfRange {
                unit: "seconds",
                value: seconds / MILLIS_PER_SECOND,
            });
        }

        let overflow = || ParseErrorKind::NonNumeric(trimmed.to_string());
        let millis = match leading {
            [] => seconds,
            [minutes] => parse_component(minutes)?
                .checked_mul(MILLIS_PER_MINUTE)
                .and_then(|m| m.checked_add(seconds))
                .ok_or_else(overflow)?,
            [hours, minutes] => {
                let minutes = parse_component(minutes)?;
                if minutes >= 60 {
                    return Err(ParseErrorKind::ComponentOutOfRange {
                        unit: "minutes",
                        value: minutes,
                    });
                }
                parse_component(hours)?
                    .checked_mul(MILLIS_PER_HOUR)
                    .and_then(|h| h.checked_add(minutes * MILLIS_PER_MINUTE + seconds))
                    .ok_or_else(overflow)?
            }
            _ => return Err(ParseErrorKind::TooManyComponents(trimmed.to_string())),
        };

        Ok(Self { millis })
    }

    fn split(&self) -> (u64, u64, u64, u64) {
        (
            self.millis / MILLIS_PER_HOUR,
            (self.millis % MILLIS_PER_HOUR) / MILLIS_PER_MINUTE,
            (self.millis % MILLIS_PER_MINUTE) / MILLIS_PER_SECOND,
            self.millis % MILLIS_PER_SECOND,
        )
    }

    /// Format as HH:MM:SS.mmm, the form handed to the transcoder
    pub fn format_hms(&self) -> String {
        let (hours, minutes, seconds, millis) = self.split();
        format!("{:02}:{:02}:{:02}.{:03}", hours, minutes, seconds, millis)
    }

    /// Format as hh_mm_ss for use inside file names
    pub fn file_stamp(&self) -> String {
        let (hours, minutes, seconds, _) = self.split();
        format!("{:02}_{:02}_{:02}", hours, minutes, seconds)
    }
}

fn parse_component(raw: &str) -> Result<u64, ParseErrorKind> {
    if raw.starts_with('-') {
        return Err(ParseErrorKind::Negative(raw.to_string()));
    }
    if raw.is_empty() || !raw.bytes().all(|b| b.is_ascii_digit()) {
        return Err(ParseErrorKind::NonNumeric(raw.to_string()));
    }
    raw.parse::<u64>()
        .map_err(|_| ParseErrorKind::NonNumeric(raw.to_string()))
}

/// Seconds component with an optional fraction, returned in milliseconds
fn parse_seconds(raw: &str) -> Result<u64, ParseErrorKind> {
    let (whole, fraction) = match raw.split_once('.') {
        Some((whole, fraction)) => (whole, Some(fraction)),
        None => (raw, None),
    };
    let whole = parse_component(whole)?;

    let fraction_millis = match fraction {
        None => 0,
        Some(digits) => {
            if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
                return Err(ParseErrorKind::NonNumeric(raw.to_string()));
            }
            let mut millis = digits
                .bytes()
                .chain(std::iter::repeat(b'0'))
                .take(3)
                .fold(0u64, |acc, b| acc * 10 + u64::from(b - b'0'));
            // round half up on the first dropped digit
            if digits.as_bytes().get(3).is_some_and(|b| *b >= b'5') {
                millis += 1;
            }
            millis
        }
    };

    whole
        .checked_mul(MILLIS_PER_SECOND)
        .and_then(|w| w.checked_add(fraction_millis))
        .ok_or_else(|| ParseErrorKind::NonNumeric(raw.to_string()))
}

impl fmt::Display for TimeSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.format_hms())
    }
}

impl From<TimeSpec> for String {
    fn from(value: TimeSpec) -> Self {
        value.format_hms()
    }
}

impl FromStr for TimeSpec {
    type Err = ParseErrorKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// Validated `[start, end)` interval of the source timeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TimeRange {
    start: TimeSpec,
    end: TimeSpec,
}

impl TimeRange {
    /// Create a range; `end` must be strictly after `start`
    pub fn new(start: TimeSpec, end: TimeSpec) -> Result<Self, ParseErrorKind> {
        if end <= start {
            return Err(ParseErrorKind::NotIncreasing { start, end });
        }
        Ok(Self { start, end })
    }

    pub fn start(&self) -> TimeSpec {
        self.start
    }

    pub fn end(&self) -> TimeSpec {
        self.end
    }

    pub fn duration(&self) -> TimeSpec {
        self.end.saturating_sub(self.start)
    }

    pub fn overlaps(&self, other: &TimeRange) -> bool {
        self.start < other.end && other.start < self.end
    }

    /// Clamp the end to `limit`; `None` when the range starts at or after it
    pub fn clamp_to(&self, limit: TimeSpec) -> Option<TimeRange> {
        if self.start >= limit {
            return None;
        }
        Some(Self {
            start: self.start,
            end: self.end.min(limit),
        })
    }
}

impl fmt::Display for TimeRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} - {}", self.start, self.end)
    }
}

/// The video every job of a batch is cut from
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SourceVideo {
    pub path: PathBuf,
    pub total_duration: TimeSpec,
}

impl SourceVideo {
    pub fn new(path: impl Into<PathBuf>, total_duration: TimeSpec) -> Self {
        Self {
            path: path.into(),
            total_duration,
        }
    }

    /// File name without its extension, used as the clip name prefix
    pub fn base_name(&self) -> String {
        base_name_of(&self.path)
    }
}

fn base_name_of(path: &Path) -> String {
    path.file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .filter(|stem| !stem.is_empty())
        .unwrap_or_else(|| "video".to_string())
}

/// Extraction strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ExtractionMode {
    /// Stream copy from the nearest keyframe at or before the start
    #[default]
    Fast,
    /// Re-encode with frame-accurate seeking
    Precise,
}

impl FromStr for ExtractionMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "fast" | "copy" => Ok(ExtractionMode::Fast),
            "precise" | "accurate" | "reencode" => Ok(ExtractionMode::Precise),
            other => Err(format!(
                "Invalid extraction mode: {}. Valid modes: fast, precise",
                other
            )),
        }
    }
}

impl fmt::Display for ExtractionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExtractionMode::Fast => write!(f, "fast"),
            ExtractionMode::Precise => write!(f, "precise"),
        }
    }
}

/// Audio handling for precise extraction
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "mode", rename_all = "lowercase")]
pub enum AudioMode {
    Copy,
    Reencode { bitrate: String },
}

/// Re-encode parameters, only used by `ExtractionMode::Precise`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EncodingOptions {
    pub video_codec: String,
    /// Constant rate factor (0-51, lower is higher quality)
    pub crf: u8,
    pub preset: String,
    pub audio: AudioMode,
}

impl Default for EncodingOptions {
    fn default() -> Self {
        Self {
            video_codec: "libx264".to_string(),
            crf: 18,
            preset: "veryfast".to_string(),
            audio: AudioMode::Copy,
        }
    }
}

/// Lifecycle of a job; terminal states are never left
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum JobState {
    Pending,
    Running,
    Succeeded,
    Failed,
}

impl JobState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobState::Succeeded | JobState::Failed)
    }

    /// Pending jobs may also fail directly when cancelled before dispatch
    pub fn can_transition_to(&self, next: JobState) -> bool {
        matches!(
            (self, next),
            (JobState::Pending, JobState::Running)
                | (JobState::Pending, JobState::Failed)
                | (JobState::Running, JobState::Succeeded)
                | (JobState::Running, JobState::Failed)
        )
    }
}

/// Final result of one job
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum JobOutcome {
    Succeeded { output_path: PathBuf },
    Failed { reason: FailureReason },
}

impl JobOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, JobOutcome::Succeeded { .. })
    }

    pub fn state(&self) -> JobState {
        match self {
            JobOutcome::Succeeded { .. } => JobState::Succeeded,
            JobOutcome::Failed { .. } => JobState::Failed,
        }
    }
}

/// One planned clip of the batch
#[derive(Debug, Clone)]
pub struct ExtractionJob {
    /// 1-based position among accepted ranges
    pub index: usize,
    pub range: TimeRange,
    pub output_path: PathBuf,
    pub mode: ExtractionMode,
    pub options: EncodingOptions,
    pub source: Arc<SourceVideo>,
    state: JobState,
}

impl ExtractionJob {
    pub fn new(
        index: usize,
        range: TimeRange,
        output_path: PathBuf,
        mode: ExtractionMode,
        options: EncodingOptions,
        source: Arc<SourceVideo>,
    ) -> Self {
        Self {
            index,
            range,
            output_path,
            mode,
            options,
            source,
            state: JobState::Pending,
        }
    }

    pub fn state(&self) -> JobState {
        self.state
    }

    /// Apply a state transition; invalid transitions are refused
    pub(crate) fn transition(&mut self, next: JobState) -> bool {
        if !self.state.can_transition_to(next) {
            tracing::warn!(
                job = self.index,
                from = ?self.state,
                to = ?next,
                "Refusing invalid job state transition"
            );
            return false;
        }
        self.state = next;
        true
    }
}

#[cfg(test)]
mod tests;
