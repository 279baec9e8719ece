// Batch interactor - Orchestrates probe, plan, run and report

use std::path::PathBuf;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::domain::model::{EncodingOptions, ExtractionMode, SourceVideo, TimeRange, TimeSpec};
use crate::engine::{BatchRun, CommandBuilder, JobProgressEvent, JobRunner};
use crate::error::{ParcaError, ParcaResult};
use crate::output::{aggregate, BatchReport};
use crate::planner::{ExtractionPlanner, Plan, PlannerConfig, RejectedRange};
use crate::ports::{ProbePort, ProcessInvocation, ProcessSpawner};

/// One cut batch over a single source video
#[derive(Debug, Clone)]
pub struct CutRequest {
    pub source: PathBuf,
    pub ranges: Vec<TimeRange>,
    pub mode: ExtractionMode,
    /// Skips the probe when the duration is already known
    pub known_duration: Option<TimeSpec>,
}

/// A planned batch that has not started yet
#[derive(Debug, Clone)]
pub struct PreparedBatch {
    pub source: Arc<SourceVideo>,
    pub mode: ExtractionMode,
    pub plan: Plan,
}

/// Interactor for the batch cut use case
pub struct BatchInteractor {
    probe: Arc<dyn ProbePort>,
    spawner: Arc<dyn ProcessSpawner>,
    builder: CommandBuilder,
    planner: ExtractionPlanner,
    options: EncodingOptions,
    concurrency: usize,
}

impl BatchInteractor {
    pub fn new(
        probe: Arc<dyn ProbePort>,
        spawner: Arc<dyn ProcessSpawner>,
        builder: CommandBuilder,
        planner: PlannerConfig,
        options: EncodingOptions,
        concurrency: usize,
    ) -> Self {
        Self {
            probe,
            spawner,
            builder,
            planner: ExtractionPlanner::new(planner),
            options,
            concurrency: concurrency.max(1),
        }
    }

    /// Determine the source duration and plan one job per usable range.
    ///
    /// Fails before anything runs when there are no ranges, the duration
    /// cannot be determined or every range is rejected.
    pub async fn prepare(&self, request: &CutRequest) -> ParcaResult<PreparedBatch> {
        if request.ranges.is_empty() {
            return Err(ParcaError::NoRanges);
        }

        let duration = match request.known_duration {
            Some(duration) => duration,
            None => self.probe.probe_duration(&request.source).await?,
        };
        if duration == TimeSpec::ZERO {
            return Err(ParcaError::Probe {
                path: request.source.clone(),
                message: "source duration is zero".to_string(),
            });
        }
        info!(source = %request.source.display(), %duration, "Source duration");

        let source = Arc::new(SourceVideo::new(request.source.clone(), duration));
        let plan = self
            .planner
            .plan(Arc::clone(&source), &request.ranges, request.mode, &self.options);
        for rejected in &plan.rejected {
            warn!(position = rejected.range_index, range = %rejected.range, reason = %rejected.reason, "Range rejected");
        }
        if plan.jobs.is_empty() {
            return Err(ParcaError::NoRanges);
        }

        Ok(PreparedBatch {
            source,
            mode: request.mode,
            plan,
        })
    }

    /// The command lines a batch would run, in job order
    pub fn invocations(&self, prepared: &PreparedBatch) -> Vec<ProcessInvocation> {
        prepared
            .plan
            .jobs
            .iter()
            .map(|job| self.builder.build(job))
            .collect()
    }

    /// Create the output directory and start the jobs
    pub fn start(&self, prepared: PreparedBatch, cancel: CancellationToken) -> ParcaResult<RunningBatch> {
        let output_dir = &self.planner.config().output_dir;
        if !prepared.plan.jobs.is_empty() && !output_dir.as_os_str().is_empty() {
            std::fs::create_dir_all(output_dir)?;
        }

        let runner = JobRunner::new(Arc::clone(&self.spawner), self.builder.clone())
            .with_concurrency(self.concurrency);
        let started_at = Utc::now();
        let run = runner.run(prepared.plan.jobs, cancel);

        Ok(RunningBatch {
            run,
            source: prepared.source.path.clone(),
            mode: prepared.mode,
            rejected: prepared.plan.rejected,
            started_at,
        })
    }
}

/// A batch in progress; read its events, then collect the report
pub struct RunningBatch {
    run: BatchRun,
    source: PathBuf,
    mode: ExtractionMode,
    rejected: Vec<RejectedRange>,
    started_at: DateTime<Utc>,
}

impl RunningBatch {
    pub async fn next_event(&mut self) -> Option<JobProgressEvent> {
        self.run.next_event().await
    }

    /// Wait for every job and build the report
    pub async fn finish(self) -> ParcaResult<BatchReport> {
        let records = self.run.finish().await?;
        let report = aggregate(&records)
            .with_source(self.source, self.mode)
            .with_rejected(self.rejected)
            .with_timing(self.started_at, Utc::now());
        info!(
            succeeded = report.succeeded(),
            failed = report.failed(),
            "Batch finished"
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::io;
    use std::path::Path;

    use crate::ports::ProcessHandle;

    struct FixedProbe(TimeSpec);

    #[async_trait]
    impl ProbePort for FixedProbe {
        async fn probe_duration(&self, _path: &Path) -> ParcaResult<TimeSpec> {
            Ok(self.0)
        }
    }

    struct FailingProbe;

    #[async_trait]
    impl ProbePort for FailingProbe {
        async fn probe_duration(&self, path: &Path) -> ParcaResult<TimeSpec> {
            Err(ParcaError::Probe {
                path: path.to_path_buf(),
                message: "moov atom not found".to_string(),
            })
        }
    }

    /// Every process exits immediately with code 0 and no output
    struct InstantSpawner;

    struct Done;

    #[async_trait]
    impl ProcessHandle for Done {
        async fn next_line(&mut self) -> io::Result<Option<String>> {
            Ok(None)
        }
        async fn wait(&mut self) -> io::Result<Option<i32>> {
            Ok(Some(0))
        }
        async fn kill(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[async_trait]
    impl ProcessSpawner for InstantSpawner {
        async fn spawn(&self, _invocation: &ProcessInvocation) -> io::Result<Box<dyn ProcessHandle>> {
            Ok(Box::new(Done))
        }
    }

    fn interactor(probe: Arc<dyn ProbePort>, output_dir: PathBuf) -> BatchInteractor {
        BatchInteractor::new(
            probe,
            Arc::new(InstantSpawner),
            CommandBuilder::default(),
            PlannerConfig {
                output_dir,
                ..PlannerConfig::default()
            },
            EncodingOptions::default(),
            1,
        )
    }

    fn range(start: u64, end: u64) -> TimeRange {
        TimeRange::new(TimeSpec::from_millis(start), TimeSpec::from_millis(end)).unwrap()
    }

    fn request(ranges: Vec<TimeRange>) -> CutRequest {
        CutRequest {
            source: PathBuf::from("talk.mp4"),
            ranges,
            mode: ExtractionMode::Fast,
            known_duration: None,
        }
    }

    #[tokio::test]
    async fn test_no_ranges_is_fatal() {
        let interactor = interactor(Arc::new(FixedProbe(TimeSpec::from_millis(1_000))), PathBuf::from("."));
        let err = interactor.prepare(&request(Vec::new())).await.unwrap_err();
        assert!(matches!(err, ParcaError::NoRanges));
    }

    #[tokio::test]
    async fn test_probe_failure_is_fatal() {
        let interactor = interactor(Arc::new(FailingProbe), PathBuf::from("."));
        let err = interactor
            .prepare(&request(vec![range(0, 1_000)]))
            .await
            .unwrap_err();
        assert!(matches!(err, ParcaError::Probe { .. }));
    }

    #[tokio::test]
    async fn test_all_ranges_rejected_is_fatal() {
        let interactor = interactor(Arc::new(FixedProbe(TimeSpec::from_millis(60_000))), PathBuf::from("."));
        let err = interactor
            .prepare(&request(vec![range(60_000, 70_000), range(90_000, 95_000)]))
            .await
            .unwrap_err();
        assert!(matches!(err, ParcaError::NoRanges));
    }

    #[tokio::test]
    async fn test_known_duration_skips_probe() {
        let interactor = interactor(Arc::new(FailingProbe), PathBuf::from("."));
        let mut request = request(vec![range(0, 1_000), range(5_000, 6_000)]);
        request.known_duration = Some(TimeSpec::from_millis(4_000));
        let prepared = interactor.prepare(&request).await.unwrap();
        assert_eq!(prepared.plan.jobs.len(), 1);
        assert_eq!(prepared.plan.rejected.len(), 1);
        let invocations = interactor.invocations(&prepared);
        assert_eq!(invocations.len(), 1);
        assert_eq!(invocations[0].program, "ffmpeg");
    }

    #[tokio::test]
    async fn test_full_batch_produces_report() {
        let dir = tempfile::tempdir().unwrap();
        let output_dir = dir.path().join("clips");
        let interactor = interactor(
            Arc::new(FixedProbe(TimeSpec::from_millis(600_000))),
            output_dir.clone(),
        );
        let prepared = interactor
            .prepare(&request(vec![range(0, 315_000), range(600_000, 754_000), range(12_000, 65_000)]))
            .await
            .unwrap();

        let mut batch = interactor
            .start(prepared, CancellationToken::new())
            .unwrap();
        let mut terminal = 0;
        while let Some(event) = batch.next_event().await {
            if event.is_terminal() {
                terminal += 1;
            }
        }
        let report = batch.finish().await.unwrap();

        assert!(output_dir.is_dir());
        assert_eq!(terminal, 2);
        assert_eq!(report.succeeded(), 2);
        assert_eq!(report.rejected.len(), 1);
        assert_eq!(report.rejected[0].range_index, 2);
        assert_eq!(report.source, Some(PathBuf::from("talk.mp4")));
        assert!(report.started_at <= report.finished_at);
        assert_eq!(
            report.jobs[0].output_path,
            output_dir.join("talk_parca01_00_00_00_to_00_05_15.mp4")
        );
    }
}
