// Domain errors - Recoverable errors scoped to a line, a range or a job

use serde::Serialize;
use thiserror::Error;

use crate::domain::model::TimeSpec;

/// Why a single timecode or range expression was rejected
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseErrorKind {
    #[error("empty time value")]
    Empty,

    #[error("'{0}' is not a number")]
    NonNumeric(String),

    #[error("negative time '{0}'")]
    Negative(String),

    #[error("'{0}' has more than three ':' separated components")]
    TooManyComponents(String),

    #[error("{unit} component {value} must be below 60")]
    ComponentOutOfRange { unit: &'static str, value: u64 },

    #[error("no range delimiter found (expected '-', '..', ',' or 'to')")]
    MissingDelimiter,

    #[error("delimiter '{0}' appears more than once")]
    AmbiguousDelimiter(String),

    #[error("end {end} must be after start {start}")]
    NotIncreasing { start: TimeSpec, end: TimeSpec },
}

/// A line of range text that could not be turned into a `TimeRange`
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("'{line}': {reason}")]
pub struct ParseError {
    pub line: String,
    pub reason: ParseErrorKind,
}

impl ParseError {
    pub fn new(line: impl Into<String>, reason: ParseErrorKind) -> Self {
        Self {
            line: line.into(),
            reason,
        }
    }
}

/// Why the planner refused a range
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PlanningError {
    #[error("start {start} is not before the source duration {total}")]
    OutOfBounds { start: TimeSpec, total: TimeSpec },

    #[error("overlaps job {with_job}")]
    Overlap { with_job: usize },
}

/// Why a dispatched (or never dispatched) job ended up `Failed`
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FailureReason {
    #[error("transcoder exited with {}: {diagnostic}", exit_label(.code))]
    ExitStatus {
        code: Option<i32>,
        diagnostic: String,
    },

    #[error("failed to launch transcoder: {message}")]
    Launch { message: String },

    #[error("cancelled")]
    Cancelled,
}

fn exit_label(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("code {}", code),
        None => "a signal".to_string(),
    }
}
