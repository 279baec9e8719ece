//! Result aggregation and rendering

use std::fmt::Write as _;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::domain::errors::FailureReason;
use crate::domain::model::{ExtractionMode, JobOutcome, TimeRange};
use crate::engine::JobRecord;
use crate::planner::RejectedRange;

/// Outcome of one accepted job
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JobReport {
    pub index: usize,
    pub range: TimeRange,
    pub mode: ExtractionMode,
    pub output_path: PathBuf,
    pub outcome: JobOutcome,
}

/// Every accepted job with an explicit outcome, in job order
#[derive(Debug, Clone, Default, Serialize)]
pub struct BatchReport {
    pub source: Option<PathBuf>,
    pub mode: Option<ExtractionMode>,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
    pub jobs: Vec<JobReport>,
    pub rejected: Vec<RejectedRange>,
}

/// Summarise finished jobs; never mutates the records
pub fn aggregate(records: &[JobRecord]) -> BatchReport {
    let jobs: Vec<JobReport> = records
        .iter()
        .map(|record| JobReport {
            index: record.job.index,
            range: record.job.range,
            mode: record.job.mode,
            output_path: record.job.output_path.clone(),
            outcome: record.outcome.clone(),
        })
        .collect();
    BatchReport {
        source: records.first().map(|record| record.job.source.path.clone()),
        mode: records.first().map(|record| record.job.mode),
        jobs,
        ..BatchReport::default()
    }
}

impl BatchReport {
    pub fn with_rejected(mut self, rejected: Vec<RejectedRange>) -> Self {
        self.rejected = rejected;
        self
    }

    pub fn with_timing(mut self, started_at: DateTime<Utc>, finished_at: DateTime<Utc>) -> Self {
        self.started_at = Some(started_at);
        self.finished_at = Some(finished_at);
        self
    }

    /// Record the source even when no job was accepted
    pub fn with_source(mut self, source: PathBuf, mode: ExtractionMode) -> Self {
        self.source = Some(source);
        self.mode = Some(mode);
        self
    }

    pub fn total(&self) -> usize {
        self.jobs.len()
    }

    pub fn succeeded(&self) -> usize {
        self.jobs.iter().filter(|job| job.outcome.is_success()).count()
    }

    pub fn failed(&self) -> usize {
        self.total() - self.succeeded()
    }

    /// Failed jobs whose reason is cancellation
    pub fn cancelled(&self) -> usize {
        self.jobs
            .iter()
            .filter(|job| {
                matches!(
                    job.outcome,
                    JobOutcome::Failed {
                        reason: FailureReason::Cancelled
                    }
                )
            })
            .count()
    }

    pub fn all_succeeded(&self) -> bool {
        self.failed() == 0
    }

    /// Plain-text table, one line per job plus a summary
    pub fn render_text(&self) -> String {
        let mut out = String::new();
        for job in &self.jobs {
            let status = match &job.outcome {
                JobOutcome::Succeeded { .. } => "done".to_string(),
                JobOutcome::Failed { reason } => format!("FAILED ({})", first_line(&reason.to_string())),
            };
            let _ = writeln!(
                out,
                "[{:02}] {}  {}  {}",
                job.index,
                job.range,
                job.output_path.display(),
                status
            );
        }
        for rejected in &self.rejected {
            let _ = writeln!(
                out,
                "[--] range #{} {} rejected: {}",
                rejected.range_index, rejected.range, rejected.reason
            );
        }
        let _ = write!(
            out,
            "{} of {} clips written, {} failed",
            self.succeeded(),
            self.total(),
            self.failed()
        );
        if self.cancelled() > 0 {
            let _ = write!(out, " ({} cancelled)", self.cancelled());
        }
        if let (Some(start), Some(end)) = (self.started_at, self.finished_at) {
            let _ = write!(out, " in {:.1}s", (end - start).num_milliseconds() as f64 / 1000.0);
        }
        out.push('\n');
        out
    }
}

fn first_line(text: &str) -> &str {
    text.lines().next().unwrap_or(text)
}
