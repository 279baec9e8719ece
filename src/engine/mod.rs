//! Extraction engine
//!
//! Command construction, progress parsing and batch execution. The engine
//! talks to the transcoder only through `ports::ProcessSpawner`.

pub mod command;
pub mod progress;
pub mod runner;

pub use command::CommandBuilder;
pub use progress::{parse_progress_time, BatchProgress, DiagnosticTail, JobProgress};
pub use runner::{BatchRun, JobEventKind, JobProgressEvent, JobRecord, JobRunner, DEFAULT_TAIL_LINES};
