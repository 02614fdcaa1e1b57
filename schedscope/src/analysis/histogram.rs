//! Parallel-process histogram.
//!
//! How long were exactly N non-idle processes running or waiting at the
//! same time? Each interval between two consecutive records is credited to
//! the snapshot taken at its start. Counts of 15 and above share the last
//! bucket.
//!
//! Besides the totals, the histogram keeps a per-pixel min/max of the
//! snapshot for the band chart drawn by [`crate::charts`].

// Percentages intentionally convert u64 to f64
#![allow(clippy::cast_precision_loss)]

use serde::Serialize;

use crate::domain::Duration;
use crate::trace_data::Timeline;

/// Number of histogram buckets; the last one collects everything above
pub const MAX_PARALLEL: usize = 16;

/// Default width, in pixels, of per-process strips and the band chart
pub const TRACE_W: usize = 600;

/// One row of the histogram table
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistogramRow {
    pub bucket: usize,
    pub label: String,
    pub total_us: u64,
    pub percentage: f64,
}

#[derive(Debug, Clone)]
pub struct ParallelHistogram {
    pub buckets: [Duration; MAX_PARALLEL],
    pub duration: Duration,
    /// Smallest snapshot seen in each pixel column, `None` for no data
    pub min_per_px: Vec<Option<usize>>,
    /// Largest snapshot seen in each pixel column
    pub max_per_px: Vec<Option<usize>>,
}

impl ParallelHistogram {
    /// Integrate the snapshots of `timeline`, mapping time onto `width`
    /// pixel columns
    pub fn build(timeline: &Timeline, width: usize) -> Self {
        let mut histogram = Self {
            buckets: [Duration::ZERO; MAX_PARALLEL],
            duration: timeline.duration(),
            min_per_px: vec![None; width],
            max_per_px: vec![None; width],
        };

        let start = timeline.start_time();
        for pair in timeline.records().windows(2) {
            let (current, following) = (&pair[0], &pair[1]);
            let count = usize::try_from(current.nr_run_wait.max(0)).unwrap_or(0);
            histogram.buckets[count.min(MAX_PARALLEL - 1)] += following.time - current.time;

            let from = histogram.pixel(current.time - start, width);
            let to = histogram.pixel(following.time - start, width);
            histogram.mark(from, to, count);
        }

        histogram
    }

    /// Column of an offset from the trace start, clamped to the last column
    fn pixel(&self, offset: Duration, width: usize) -> usize {
        if self.duration == Duration::ZERO || width == 0 {
            return 0;
        }
        let x = u128::from(offset.as_micros()) * width as u128 / u128::from(self.duration.as_micros());
        usize::try_from(x).unwrap_or(usize::MAX).min(width - 1)
    }

    fn mark(&mut self, from: usize, to: usize, count: usize) {
        for x in from..=to.min(self.min_per_px.len().saturating_sub(1)) {
            if let Some(min) = self.min_per_px.get_mut(x) {
                *min = Some(min.map_or(count, |m| m.min(count)));
            }
            if let Some(max) = self.max_per_px.get_mut(x) {
                *max = Some(max.map_or(count, |m| m.max(count)));
            }
        }
    }

    /// Highest bucket with any time credited
    pub fn max_used(&self) -> Option<usize> {
        self.buckets.iter().rposition(|d| *d > Duration::ZERO)
    }

    /// Table rows from bucket 0 up to the highest used bucket
    pub fn rows(&self) -> Vec<HistogramRow> {
        let Some(max_used) = self.max_used() else {
            return Vec::new();
        };
        self.buckets[..=max_used]
            .iter()
            .enumerate()
            .map(|(bucket, total)| HistogramRow {
                bucket,
                label: bucket_label(bucket),
                total_us: total.as_micros(),
                percentage: total.percent_of(self.duration),
            })
            .collect()
    }
}

pub fn bucket_label(bucket: usize) -> String {
    if bucket == MAX_PARALLEL - 1 {
        format!("{bucket} or more")
    } else {
        bucket.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{EventKind, Pid, ProcessState, Timestamp};
    use crate::trace_data::TraceRecord;

    fn timeline(points: &[(u64, i64)]) -> Timeline {
        let mut timeline = Timeline::default();
        for &(time, nr_run_wait) in points {
            timeline.push(TraceRecord {
                time: Timestamp(time),
                prev_pid: Pid(0),
                next_pid: Pid(1),
                prev_state: ProcessState::RunnableWaiting,
                next_state: ProcessState::Sleeping,
                kind: EventKind::ContextSwitch,
                nr_run_wait,
            });
        }
        timeline
    }

    #[test]
    fn test_intervals_credit_starting_snapshot() {
        let timeline = timeline(&[(0, 1), (10, 1), (50, 0), (100, 1), (120, 1), (200, 0)]);
        let histogram = ParallelHistogram::build(&timeline, TRACE_W);

        assert_eq!(histogram.buckets[0], Duration(50));
        assert_eq!(histogram.buckets[1], Duration(150));

        let rows = histogram.rows();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].label, "0");
        assert!((rows[0].percentage - 25.0).abs() < 1e-9);
        assert!((rows[1].percentage - 75.0).abs() < 1e-9);
    }

    #[test]
    fn test_percentages_sum_to_100() {
        let timeline = timeline(&[(0, 2), (7, 5), (19, 1), (23, 3), (61, 0)]);
        let histogram = ParallelHistogram::build(&timeline, TRACE_W);
        let sum: f64 = histogram.rows().iter().map(|r| r.percentage).sum();
        assert!((sum - 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_one_runnable_process_fills_one_bucket() {
        let timeline = timeline(&[(0, 1), (150, 1), (200, 1)]);
        let histogram = ParallelHistogram::build(&timeline, TRACE_W);
        assert_eq!(histogram.buckets[1], Duration(200));

        let rows = histogram.rows();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].total_us, 0);
        assert_eq!(rows[1].total_us, 200);
        assert!((rows[1].percentage - 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_large_counts_share_last_bucket() {
        let timeline = timeline(&[(0, 15), (10, 40), (30, 0)]);
        let histogram = ParallelHistogram::build(&timeline, TRACE_W);
        assert_eq!(histogram.buckets[MAX_PARALLEL - 1], Duration(30));

        let rows = histogram.rows();
        assert_eq!(rows.len(), MAX_PARALLEL);
        assert_eq!(rows[MAX_PARALLEL - 1].label, "15 or more");
    }

    #[test]
    fn test_pixel_min_max() {
        let timeline = timeline(&[(0, 1), (50, 0), (100, 2), (200, 0)]);
        let histogram = ParallelHistogram::build(&timeline, 20);
        // 10us per pixel: the switch at 50 lands in column 5
        assert_eq!(histogram.min_per_px[0], Some(1));
        assert_eq!(histogram.min_per_px[5], Some(0));
        assert_eq!(histogram.max_per_px[5], Some(1));
        assert_eq!(histogram.max_per_px[10], Some(2));
        assert_eq!(histogram.max_per_px[19], Some(2));
    }

    #[test]
    fn test_empty_and_single_record() {
        let histogram = ParallelHistogram::build(&Timeline::default(), TRACE_W);
        assert!(histogram.rows().is_empty());

        let histogram = ParallelHistogram::build(&timeline(&[(5, 1)]), TRACE_W);
        assert!(histogram.rows().is_empty());
        assert!(histogram.min_per_px.iter().all(Option::is_none));
    }
}
