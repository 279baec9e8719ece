//! Extraction planning
//!
//! Validates ranges against the probed source duration and turns the
//! accepted ones into numbered `ExtractionJob`s with deterministic output
//! paths. Performs no I/O.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::domain::errors::PlanningError;
use crate::domain::model::{EncodingOptions, ExtractionJob, ExtractionMode, SourceVideo, TimeRange};

pub mod naming;

/// What to do with a range that overlaps an already accepted one
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OverlapPolicy {
    /// Overlapping clips are intentional and kept
    #[default]
    Allow,
    /// Later overlapping ranges are rejected
    Reject,
}

impl FromStr for OverlapPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "allow" => Ok(OverlapPolicy::Allow),
            "reject" => Ok(OverlapPolicy::Reject),
            other => Err(format!(
                "Invalid overlap policy: {}. Valid policies: allow, reject",
                other
            )),
        }
    }
}

impl fmt::Display for OverlapPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OverlapPolicy::Allow => write!(f, "allow"),
            OverlapPolicy::Reject => write!(f, "reject"),
        }
    }
}

/// Planner settings
#[derive(Debug, Clone, PartialEq)]
pub struct PlannerConfig {
    /// Directory the clips are written to
    pub output_dir: PathBuf,
    /// Output container extension, without the dot
    pub extension: String,
    pub overlap: OverlapPolicy,
    /// Number given to the first accepted job; 0 is treated as 1
    pub first_index: usize,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("."),
            extension: "mp4".to_string(),
            overlap: OverlapPolicy::Allow,
            first_index: 1,
        }
    }
}

/// A range the planner refused
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RejectedRange {
    /// 1-based position of the range in the planner input
    pub range_index: usize,
    pub range: TimeRange,
    pub reason: PlanningError,
}

/// Jobs in input order plus the ranges that did not make it
#[derive(Debug, Clone, Default)]
pub struct Plan {
    pub jobs: Vec<ExtractionJob>,
    pub rejected: Vec<RejectedRange>,
}

/// Builds extraction jobs from validated ranges
#[derive(Debug, Clone, Default)]
pub struct ExtractionPlanner {
    config: PlannerConfig,
}

impl ExtractionPlanner {
    pub fn new(config: PlannerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &PlannerConfig {
        &self.config
    }

    /// Plan one job per acceptable range.
    ///
    /// Rejected ranges do not consume a job number. Ends past the source
    /// duration are clamped, not rejected.
    pub fn plan(
        &self,
        source: Arc<SourceVideo>,
        ranges: &[TimeRange],
        mode: ExtractionMode,
        options: &EncodingOptions,
    ) -> Plan {
        let total = source.total_duration;
        let base_name = source.base_name();
        let mut plan = Plan::default();

        for (position, range) in ranges.iter().enumerate() {
            let range_index = position + 1;

            let clamped = match range.clamp_to(total) {
                Some(clamped) => clamped,
                None => {
                    warn!(position = range_index, %range, %total, "Range starts past the end of the source");
                    plan.rejected.push(RejectedRange {
                        range_index,
                        range: *range,
                        reason: PlanningError::OutOfBounds {
                            start: range.start(),
                            total,
                        },
                    });
                    continue;
                }
            };
            if clamped.end() != range.end() {
                debug!(position = range_index, end = %clamped.end(), "Clamped range end to source duration");
            }

            if self.config.overlap == OverlapPolicy::Reject {
                if let Some(existing) = plan.jobs.iter().find(|job| job.range.overlaps(&clamped)) {
                    warn!(position = range_index, with_job = existing.index, "Rejecting overlapping range");
                    plan.rejected.push(RejectedRange {
                        range_index,
                        range: *range,
                        reason: PlanningError::Overlap {
                            with_job: existing.index,
                        },
                    });
                    continue;
                }
            }

            let index = self.config.first_index.max(1).saturating_add(plan.jobs.len());
            let file_name =
                naming::output_file_name(&base_name, index, &clamped, &self.config.extension);
            plan.jobs.push(ExtractionJob::new(
                index,
                clamped,
                self.config.output_dir.join(file_name),
                mode,
                options.clone(),
                Arc::clone(&source),
            ));
        }

        info!(
            accepted = plan.jobs.len(),
            rejected = plan.rejected.len(),
            %mode,
            "Planned extraction jobs"
        );
        plan
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::TimeSpec;
    use crate::ranges::import_ranges;

    fn source(seconds: u64) -> Arc<SourceVideo> {
        Arc::new(SourceVideo::new(
            "/media/ders.mp4",
            TimeSpec::from_millis(seconds * 1_000),
        ))
    }

    fn range(start: u64, end: u64) -> TimeRange {
        TimeRange::new(
            TimeSpec::from_millis(start * 1_000),
            TimeSpec::from_millis(end * 1_000),
        )
        .unwrap()
    }

    fn planner_in(dir: &str) -> ExtractionPlanner {
        ExtractionPlanner::new(PlannerConfig {
            output_dir: PathBuf::from(dir),
            ..PlannerConfig::default()
        })
    }

    #[test]
    fn test_plan_imported_scenario() {
        let imported = import_ranges("00:00-05:15\n0:12 to 1:05\n2:00,2:45\n10:00..12:34\n");
        assert_eq!(imported.ranges.len(), 4);

        let plan = planner_in("out").plan(
            source(600),
            &imported.ranges,
            ExtractionMode::Fast,
            &EncodingOptions::default(),
        );

        assert_eq!(plan.jobs.len(), 3);
        let indices: Vec<usize> = plan.jobs.iter().map(|job| job.index).collect();
        assert_eq!(indices, vec![1, 2, 3]);
        assert_eq!(
            plan.jobs[0].output_path,
            PathBuf::from("out").join("ders_parca01_00_00_00_to_00_05_15.mp4")
        );
        assert_eq!(
            plan.jobs[1].output_path,
            PathBuf::from("out").join("ders_parca02_00_00_12_to_00_01_05.mp4")
        );

        assert_eq!(plan.rejected.len(), 1);
        assert_eq!(plan.rejected[0].range_index, 4);
        assert!(matches!(
            plan.rejected[0].reason,
            PlanningError::OutOfBounds { .. }
        ));
    }

    #[test]
    fn test_plan_clamps_end_past_duration() {
        let plan = planner_in(".").plan(
            source(100),
            &[range(90, 150)],
            ExtractionMode::Precise,
            &EncodingOptions::default(),
        );
        assert!(plan.rejected.is_empty());
        assert_eq!(plan.jobs[0].range, range(90, 100));
        assert_eq!(plan.jobs[0].mode, ExtractionMode::Precise);
    }

    #[test]
    fn test_rejected_ranges_do_not_consume_indices() {
        let plan = planner_in(".").plan(
            source(100),
            &[range(200, 210), range(1, 2), range(100, 120), range(3, 4)],
            ExtractionMode::Fast,
            &EncodingOptions::default(),
        );
        let indices: Vec<usize> = plan.jobs.iter().map(|job| job.index).collect();
        assert_eq!(indices, vec![1, 2]);
        let rejected: Vec<usize> = plan.rejected.iter().map(|r| r.range_index).collect();
        assert_eq!(rejected, vec![1, 3]);
    }

    #[test]
    fn test_overlap_allowed_by_default() {
        let plan = planner_in(".").plan(
            source(100),
            &[range(0, 10), range(5, 15), range(0, 10)],
            ExtractionMode::Fast,
            &EncodingOptions::default(),
        );
        assert_eq!(plan.jobs.len(), 3);
        let mut paths: Vec<_> = plan.jobs.iter().map(|job| job.output_path.clone()).collect();
        paths.dedup();
        assert_eq!(paths.len(), 3);
    }

    #[test]
    fn test_overlap_reject_policy() {
        let planner = ExtractionPlanner::new(PlannerConfig {
            overlap: OverlapPolicy::Reject,
            ..PlannerConfig::default()
        });
        let plan = planner.plan(
            source(100),
            &[range(0, 10), range(5, 15), range(10, 20)],
            ExtractionMode::Fast,
            &EncodingOptions::default(),
        );
        assert_eq!(plan.jobs.len(), 2);
        assert_eq!(plan.jobs[1].index, 2);
        assert_eq!(plan.rejected[0].reason, PlanningError::Overlap { with_job: 1 });
    }

    #[test]
    fn test_first_index_offsets_numbering() {
        let planner = ExtractionPlanner::new(PlannerConfig {
            first_index: 7,
            extension: "mkv".to_string(),
            ..PlannerConfig::default()
        });
        let plan = planner.plan(
            source(100),
            &[range(0, 10)],
            ExtractionMode::Fast,
            &EncodingOptions::default(),
        );
        assert_eq!(plan.jobs[0].index, 7);
        assert!(plan.jobs[0]
            .output_path
            .to_string_lossy()
            .ends_with("ders_parca07_00_00_00_to_00_00_10.mkv"));
    }

    #[test]
    fn test_job_numbers_stay_one_based() {
        let planner = ExtractionPlanner::new(PlannerConfig {
            first_index: 0,
            ..PlannerConfig::default()
        });
        let plan = planner.plan(
            source(100),
            &[range(0, 1), range(2, 3)],
            ExtractionMode::Fast,
            &EncodingOptions::default(),
        );
        let indices: Vec<usize> = plan.jobs.iter().map(|job| job.index).collect();
        assert_eq!(indices, vec![1, 2]);
        assert!(plan.jobs[0]
            .output_path
            .to_string_lossy()
            .contains("_parca01_"));

        let planner = ExtractionPlanner::new(PlannerConfig {
            first_index: usize::MAX,
            ..PlannerConfig::default()
        });
        let plan = planner.plan(
            source(100),
            &[range(0, 1), range(2, 3)],
            ExtractionMode::Fast,
            &EncodingOptions::default(),
        );
        assert_eq!(plan.jobs.len(), 2);
        assert_eq!(plan.jobs[1].index, usize::MAX);
    }

    #[test]
    fn test_overlap_policy_parse() {
        assert_eq!("Reject".parse::<OverlapPolicy>(), Ok(OverlapPolicy::Reject));
        assert!("maybe".parse::<OverlapPolicy>().is_err());
    }
}
