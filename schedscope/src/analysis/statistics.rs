//! Per-process run/wait/disk-wait statistics.
//!
//! One pass over the Timeline with a [`StateWalker`]: whenever a process
//! leaves a state, the time spent in it is credited to that state's
//! bucket. Results are written back into the process table and returned
//! as [`ProcessStats`] rows, busiest process first.

// Ratios and percentages intentionally convert u64 to f64
#![allow(clippy::cast_precision_loss)]

use serde::Serialize;
use std::collections::BTreeMap;

use super::walk::StateWalker;
use crate::domain::{Duration, Pid, Timestamp};
use crate::process_table::{ProcessRecord, StateTimes};
use crate::trace_data::TraceData;

// =============================================================================
// OUTPUT TYPES
// =============================================================================

/// Time spent in one state, with occurrence count and longest stretch
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BucketStats {
    pub total_us: u64,
    pub percentage: f64,
    pub count: u32,
    pub avg_us: u64,
    pub max_us: u64,
    /// Ratio of this bucket to the run time, 0 when the process never ran
    pub per_run: f64,
}

/// One row of the statistics table
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProcessStats {
    pub pid: Pid,
    pub name: String,
    pub run_us: u64,
    pub run_percentage: f64,
    pub wait: BucketStats,
    pub disk_wait: BucketStats,
}

impl ProcessStats {
    fn from_record(record: &ProcessRecord, duration: Duration) -> Self {
        let times = &record.times;
        Self {
            pid: record.pid,
            name: record.display_name(),
            run_us: times.run.as_micros(),
            run_percentage: times.run.percent_of(duration),
            wait: bucket(times.wait, times.wait_count, times.wait_max, times.run, duration),
            disk_wait: bucket(times.disk, times.disk_count, times.disk_max, times.run, duration),
        }
    }
}

fn bucket(total: Duration, count: u32, max: Duration, run: Duration, duration: Duration) -> BucketStats {
    BucketStats {
        total_us: total.as_micros(),
        percentage: total.percent_of(duration),
        count,
        avg_us: if count == 0 { 0 } else { total.as_micros() / u64::from(count) },
        max_us: max.as_micros(),
        per_run: if run == Duration::ZERO { 0.0 } else { total.as_micros() as f64 / run.as_micros() as f64 },
    }
}

/// Statistics for a whole trace
#[derive(Debug, Clone, Serialize)]
pub struct Statistics {
    pub duration_us: u64,
    /// Sorted by run time, then wait time, then disk-wait time (descending)
    pub processes: Vec<ProcessStats>,
}

impl Statistics {
    /// Rows for real processes, leaving out the idle process
    pub fn interesting(&self) -> impl Iterator<Item = &ProcessStats> {
        self.processes.iter().filter(|p| !p.pid.is_idle())
    }

    pub fn get(&self, pid: Pid) -> Option<&ProcessStats> {
        self.processes.iter().find(|p| p.pid == pid)
    }
}

// =============================================================================
// AGGREGATION
// =============================================================================

/// Credit state durations to every process and build the table rows.
///
/// Accumulators are reset first, so calling this twice gives the same
/// result.
pub fn aggregate(data: &mut TraceData) -> Statistics {
    let mut times: BTreeMap<Pid, StateTimes> = BTreeMap::new();
    let mut walker = StateWalker::new(data);
    for step in walker.by_ref() {
        for transition in step.transitions() {
            times.entry(transition.pid).or_default().credit(transition.from, transition.elapsed());
        }
    }
    let last_change: BTreeMap<Pid, Timestamp> = walker.states().map(|(pid, _, since)| (pid, since)).collect();

    for record in data.processes.iter_mut() {
        record.times = times.remove(&record.pid).unwrap_or_default();
        record.last_time = last_change.get(&record.pid).copied().unwrap_or_default();
    }

    let duration = data.duration();
    let processes = data
        .processes
        .used_sorted()
        .into_iter()
        .map(|record| ProcessStats::from_record(record, duration))
        .collect();

    Statistics { duration_us: duration.as_micros(), processes }
}

// =============================================================================
// TESTS
// =============================================================================
