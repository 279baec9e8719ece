//! parca - batch video segment extraction
//!
//! Parses heterogeneous time-range text, plans one extraction job per range,
//! runs ffmpeg for every job with bounded concurrency and reports each
//! job's outcome without letting one failure stop the batch.

pub mod adapters;
pub mod app;
pub mod cli;
pub mod domain;
pub mod engine;
pub mod error;
pub mod output;
pub mod planner;
pub mod ports;
pub mod ranges;

// Re-export commonly used types
pub use domain::errors::{FailureReason, ParseError, ParseErrorKind, PlanningError};
pub use domain::model::{ExtractionJob, ExtractionMode, JobOutcome, JobState, SourceVideo, TimeRange, TimeSpec};
pub use error::{ParcaError, ParcaResult};
