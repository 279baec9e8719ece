//! Progress tracking from the transcoder's diagnostic stream

use std::collections::{BTreeMap, VecDeque};

use crate::domain::model::{ExtractionJob, TimeSpec};

/// Extract the processed-time marker (`time=00:01:02.34`) from a stats line.
///
/// Also matches `out_time=` from `-progress` output. `N/A` and negative
/// markers yield `None`.
pub fn parse_progress_time(line: &str) -> Option<TimeSpec> {
    let (_, rest) = line.split_once("time=")?;
    let token = rest.split_whitespace().next()?;
    TimeSpec::parse(token).ok()
}

/// Per-job fraction that never moves backwards
#[derive(Debug, Clone)]
pub struct JobProgress {
    expected: TimeSpec,
    fraction: f64,
}

impl JobProgress {
    pub fn new(expected: TimeSpec) -> Self {
        Self {
            expected,
            fraction: 0.0,
        }
    }

    pub fn fraction(&self) -> f64 {
        self.fraction
    }

    /// Feed one diagnostic line; returns the new fraction when it advanced
    pub fn observe(&mut self, line: &str) -> Option<f64> {
        let processed = parse_progress_time(line)?;
        let fraction = if self.expected.as_millis() == 0 {
            1.0
        } else {
            (processed.as_millis() as f64 / self.expected.as_millis() as f64).clamp(0.0, 1.0)
        };
        if fraction > self.fraction {
            self.fraction = fraction;
            Some(fraction)
        } else {
            None
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Slot {
    weight: u64,
    fraction: f64,
}

/// Batch-wide completion, weighted by each job's planned duration.
///
/// Pending jobs count as 0.0, finished jobs (either outcome) as 1.0 and
/// running jobs as their parsed fraction. Owned by a single writer.
#[derive(Debug, Clone, Default)]
pub struct BatchProgress {
    slots: BTreeMap<usize, Slot>,
}

impl BatchProgress {
    pub fn new(jobs: &[ExtractionJob]) -> Self {
        let slots = jobs
            .iter()
            .map(|job| {
                (
                    job.index,
                    Slot {
                        weight: job.range.duration().as_millis(),
                        fraction: 0.0,
                    },
                )
            })
            .collect();
        Self { slots }
    }

    pub fn update(&mut self, index: usize, fraction: f64) {
        if let Some(slot) = self.slots.get_mut(&index) {
            slot.fraction = slot.fraction.max(fraction.clamp(0.0, 1.0));
        }
    }

    pub fn finish(&mut self, index: usize) {
        self.update(index, 1.0);
    }

    pub fn fraction(&self) -> f64 {
        if self.slots.is_empty() {
            return 1.0;
        }
        let total_weight: u64 = self.slots.values().map(|slot| slot.weight).sum();
        if total_weight == 0 {
            let sum: f64 = self.slots.values().map(|slot| slot.fraction).sum();
            return sum / self.slots.len() as f64;
        }
        let done: f64 = self
            .slots
            .values()
            .map(|slot| slot.weight as f64 * slot.fraction)
            .sum();
        done / total_weight as f64
    }
}

const DIAGNOSTIC_CHAR_LIMIT: usize = 1000;

/// Last few non-progress lines of a process's diagnostic output
#[derive(Debug, Clone)]
pub struct DiagnosticTail {
    lines: VecDeque<String>,
    capacity: usize,
}

impl DiagnosticTail {
    pub fn new(capacity: usize) -> Self {
        Self {
            lines: VecDeque::with_capacity(capacity),
            capacity: capacity.max(1),
        }
    }

    pub fn push(&mut self, line: &str) {
        let line = line.trim_end();
        if line.is_empty() || parse_progress_time(line).is_some() {
            return;
        }
        if self.lines.len() == self.capacity {
            self.lines.pop_front();
        }
        self.lines.push_back(line.to_string());
    }

    /// Joined tail, cut to the last 1000 characters
    pub fn render(&self) -> String {
        let joined = self.lines.iter().cloned().collect::<Vec<_>>().join("\n");
        let count = joined.chars().count();
        if count <= DIAGNOSTIC_CHAR_LIMIT {
            return joined;
        }
        joined.chars().skip(count - DIAGNOSTIC_CHAR_LIMIT).collect()
    }
}
