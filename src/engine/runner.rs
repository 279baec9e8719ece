//! Batch job execution
//!
//! Jobs are dispatched in order, at most `concurrency` at a time. Every
//! dispatched job owns one transcoder process; its diagnostic stream is
//! parsed for progress while the driver task, the single writer of job
//! state and batch progress, turns worker messages into events.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::mpsc;
use tokio::task::{JoinHandle, JoinSet};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::domain::errors::FailureReason;
use crate::domain::model::{ExtractionJob, JobOutcome, JobState, TimeSpec};
use crate::engine::command::CommandBuilder;
use crate::engine::progress::{BatchProgress, DiagnosticTail, JobProgress};
use crate::error::{ParcaError, ParcaResult};
use crate::ports::{ProcessHandle, ProcessInvocation, ProcessSpawner};

/// Lines of diagnostic output kept for a failed job
pub const DEFAULT_TAIL_LINES: usize = 20;

/// What happened to a job
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum JobEventKind {
    Started,
    Progress,
    Succeeded { output_path: PathBuf },
    Failed { reason: FailureReason },
}

/// One entry of the batch event sequence
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JobProgressEvent {
    pub job_index: usize,
    #[serde(flatten)]
    pub kind: JobEventKind,
    /// This job's completion, non-decreasing per job
    pub fraction_complete: f64,
    /// Whole batch completion, weighted by planned durations
    pub batch_fraction: f64,
}

impl JobProgressEvent {
    /// Success or failure; always the last event of its job
    pub fn is_terminal(&self) -> bool {
        matches!(
            self.kind,
            JobEventKind::Succeeded { .. } | JobEventKind::Failed { .. }
        )
    }
}

/// A job in its terminal state together with its outcome
#[derive(Debug, Clone)]
pub struct JobRecord {
    pub job: ExtractionJob,
    pub outcome: JobOutcome,
}

/// Runs extraction jobs against a process spawner
#[derive(Clone)]
pub struct JobRunner {
    spawner: Arc<dyn ProcessSpawner>,
    builder: CommandBuilder,
    concurrency: usize,
    tail_lines: usize,
}

impl JobRunner {
    /// Sequential runner
    pub fn new(spawner: Arc<dyn ProcessSpawner>, builder: CommandBuilder) -> Self {
        Self {
            spawner,
            builder,
            concurrency: 1,
            tail_lines: DEFAULT_TAIL_LINES,
        }
    }

    /// Allow up to `limit` jobs at once (at least one)
    pub fn with_concurrency(mut self, limit: usize) -> Self {
        self.concurrency = limit.max(1);
        self
    }

    pub fn with_tail_lines(mut self, lines: usize) -> Self {
        self.tail_lines = lines.max(1);
        self
    }

    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    /// Start the batch. Must be called inside a Tokio runtime.
    ///
    /// Cancelling `cancel` kills running processes, fails them with
    /// `Cancelled` and fails every job not yet dispatched the same way.
    pub fn run(&self, jobs: Vec<ExtractionJob>, cancel: CancellationToken) -> BatchRun {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let driver = tokio::spawn(self.clone().drive(jobs, cancel, events_tx));
        BatchRun {
            events: events_rx,
            driver,
        }
    }

    async fn drive(
        self,
        mut jobs: Vec<ExtractionJob>,
        cancel: CancellationToken,
        events: mpsc::UnboundedSender<JobProgressEvent>,
    ) -> Vec<JobRecord> {
        let positions: HashMap<usize, usize> = jobs
            .iter()
            .enumerate()
            .map(|(position, job)| (job.index, position))
            .collect();
        let mut batch = BatchProgress::new(&jobs);
        let mut fractions = vec![0.0_f64; jobs.len()];
        let mut outcomes: Vec<Option<JobOutcome>> = vec![None; jobs.len()];

        let (worker_tx, mut worker_rx) = mpsc::unbounded_channel::<WorkerMessage>();
        let mut workers = JoinSet::new();
        let mut next = 0;
        let mut running = 0;

        info!(jobs = jobs.len(), concurrency = self.concurrency, "Starting batch");

        loop {
            while running < self.concurrency && next < jobs.len() && !cancel.is_cancelled() {
                let job = &mut jobs[next];
                next += 1;
                job.transition(JobState::Running);

                let invocation = self.builder.build(job);
                info!(job = job.index, range = %job.range, output = %job.output_path.display(), "Dispatching job");
                debug!(job = job.index, command = %invocation, "Transcoder command");

                emit(&events, job.index, JobEventKind::Started, 0.0, batch.fraction());
                workers.spawn(supervise(
                    Worker {
                        spawner: Arc::clone(&self.spawner),
                        invocation,
                        index: job.index,
                        expected: job.range.duration(),
                        output_path: job.output_path.clone(),
                        tail_lines: self.tail_lines,
                        cancel: cancel.clone(),
                    },
                    worker_tx.clone(),
                ));
                running += 1;
            }

            if running == 0 {
                break;
            }

            let Some(message) = worker_rx.recv().await else {
                break;
            };
            match message {
                WorkerMessage::Progress { index, fraction } => {
                    let Some(&position) = positions.get(&index) else {
                        continue;
                    };
                    fractions[position] = fractions[position].max(fraction);
                    batch.update(index, fraction);
                    emit(&events, index, JobEventKind::Progress, fractions[position], batch.fraction());
                }
                WorkerMessage::Finished { index, outcome } => {
                    running -= 1;
                    let Some(&position) = positions.get(&index) else {
                        continue;
                    };
                    let job = &mut jobs[position];
                    job.transition(outcome.state());
                    batch.finish(index);
                    if outcome.is_success() {
                        fractions[position] = 1.0;
                    }

                    let kind = match &outcome {
                        JobOutcome::Succeeded { output_path } => {
                            info!(job = index, output = %output_path.display(), "Job succeeded");
                            JobEventKind::Succeeded {
                                output_path: output_path.clone(),
                            }
                        }
                        JobOutcome::Failed { reason } => {
                            warn!(job = index, %reason, "Job failed");
                            JobEventKind::Failed {
                                reason: reason.clone(),
                            }
                        }
                    };
                    emit(&events, index, kind, fractions[position], batch.fraction());
                    outcomes[position] = Some(outcome);
                }
            }
        }

        // Only reachable with undispatched jobs after cancellation
        for job in jobs.iter_mut().skip(next) {
            job.transition(JobState::Failed);
            batch.finish(job.index);
            emit(
                &events,
                job.index,
                JobEventKind::Failed {
                    reason: FailureReason::Cancelled,
                },
                0.0,
                batch.fraction(),
            );
        }
        if next < jobs.len() {
            info!(skipped = jobs.len() - next, "Batch cancelled before all jobs were dispatched");
        }

        while workers.join_next().await.is_some() {}

        jobs.into_iter()
            .zip(outcomes)
            .map(|(job, outcome)| JobRecord {
                job,
                outcome: outcome.unwrap_or(JobOutcome::Failed {
                    reason: FailureReason::Cancelled,
                }),
            })
            .collect()
    }
}

fn emit(
    events: &mpsc::UnboundedSender<JobProgressEvent>,
    job_index: usize,
    kind: JobEventKind,
    fraction_complete: f64,
    batch_fraction: f64,
) {
    // A dropped receiver only means nobody is watching
    let _ = events.send(JobProgressEvent {
        job_index,
        kind,
        fraction_complete,
        batch_fraction,
    });
}

/// Handle to a running batch; yields events, then the job records
pub struct BatchRun {
    events: mpsc::UnboundedReceiver<JobProgressEvent>,
    driver: JoinHandle<Vec<JobRecord>>,
}

impl BatchRun {
    /// Next event; `None` once the batch has finished and all events were read
    pub async fn next_event(&mut self) -> Option<JobProgressEvent> {
        self.events.recv().await
    }

    /// Wait for the batch to finish, discarding unread events
    pub async fn finish(self) -> ParcaResult<Vec<JobRecord>> {
        drop(self.events);
        self.driver.await.map_err(|e| ParcaError::Internal {
            message: format!("batch driver failed: {}", e),
        })
    }

    /// Drain every event through `on_event`, then return the job records
    pub async fn observe<F>(mut self, mut on_event: F) -> ParcaResult<Vec<JobRecord>>
    where
        F: FnMut(&JobProgressEvent),
    {
        while let Some(event) = self.next_event().await {
            on_event(&event);
        }
        self.finish().await
    }
}

enum WorkerMessage {
    Progress { index: usize, fraction: f64 },
    Finished { index: usize, outcome: JobOutcome },
}

struct Worker {
    spawner: Arc<dyn ProcessSpawner>,
    invocation: ProcessInvocation,
    index: usize,
    expected: TimeSpec,
    output_path: PathBuf,
    tail_lines: usize,
    cancel: CancellationToken,
}

/// Run a worker in its own task so a panic still produces a `Finished`
async fn supervise(worker: Worker, tx: mpsc::UnboundedSender<WorkerMessage>) {
    let index = worker.index;
    let outcome = match tokio::spawn(worker.run(tx.clone())).await {
        Ok(outcome) => outcome,
        Err(e) => JobOutcome::Failed {
            reason: FailureReason::Launch {
                message: format!("worker task failed: {}", e),
            },
        },
    };
    let _ = tx.send(WorkerMessage::Finished { index, outcome });
}

impl Worker {
    async fn run(self, tx: mpsc::UnboundedSender<WorkerMessage>) -> JobOutcome {
        if self.cancel.is_cancelled() {
            return cancelled();
        }

        let mut process = match self.spawner.spawn(&self.invocation).await {
            Ok(process) => process,
            Err(e) => {
                warn!(job = self.index, error = %e, "Failed to launch transcoder");
                return JobOutcome::Failed {
                    reason: FailureReason::Launch {
                        message: e.to_string(),
                    },
                };
            }
        };

        let mut progress = JobProgress::new(self.expected);
        let mut tail = DiagnosticTail::new(self.tail_lines);

        loop {
            let line = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => None,
                line = process.next_line() => Some(line),
            };
            match line {
                None => return terminate(process, self.index).await,
                Some(Ok(Some(line))) => {
                    if let Some(fraction) = progress.observe(&line) {
                        let _ = tx.send(WorkerMessage::Progress {
                            index: self.index,
                            fraction,
                        });
                    }
                    tail.push(&line);
                }
                Some(Ok(None)) => break,
                Some(Err(e)) => {
                    debug!(job = self.index, error = %e, "Diagnostic stream closed with error");
                    break;
                }
            }
        }

        let status = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => None,
            status = process.wait() => Some(status),
        };
        match status {
            None => terminate(process, self.index).await,
            Some(Ok(Some(0))) => JobOutcome::Succeeded {
                output_path: self.output_path,
            },
            Some(Ok(code)) => JobOutcome::Failed {
                reason: FailureReason::ExitStatus {
                    code,
                    diagnostic: tail.render(),
                },
            },
            Some(Err(e)) => JobOutcome::Failed {
                reason: FailureReason::ExitStatus {
                    code: None,
                    diagnostic: e.to_string(),
                },
            },
        }
    }
}

async fn terminate(mut process: Box<dyn ProcessHandle>, index: usize) -> JobOutcome {
    info!(job = index, "Cancelling running job");
    if let Err(e) = process.kill().await {
        warn!(job = index, error = %e, "Failed to kill transcoder");
    }
    let _ = process.wait().await;
    cancelled()
}

fn cancelled() -> JobOutcome {
    JobOutcome::Failed {
        reason: FailureReason::Cancelled,
    }
}
