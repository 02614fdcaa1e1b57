//! Band chart of the number of processes running or waiting over time.
//!
//! Each pixel column shows the smallest snapshot seen in that column in
//! bright red, stacked under the largest one in dark red. Every process is
//! 8 pixels tall.

use super::{theme, Canvas};
use crate::analysis::{ParallelHistogram, MAX_PARALLEL};

const STEP: u32 = 8;

/// Height of the band chart
#[allow(clippy::cast_possible_truncation)]
pub const PARALLEL_CHART_H: u32 = STEP * MAX_PARALLEL as u32;

pub fn draw_parallel_chart<C: Canvas>(canvas: &mut C, histogram: &ParallelHistogram) {
    let (w, h) = (canvas.width(), canvas.height());
    canvas.fill_rect(0, 0, w, h, theme::BLACK);

    let bottom = i32::try_from(h).unwrap_or(i32::MAX) - 1;
    let y_of = |count: usize| {
        let offset = u32::try_from(count).unwrap_or(u32::MAX).saturating_mul(STEP);
        bottom.saturating_sub(i32::try_from(offset).unwrap_or(i32::MAX)).max(0)
    };

    let columns = histogram.min_per_px.iter().zip(&histogram.max_per_px);
    for (x, (min, max)) in (0..i32::try_from(w).unwrap_or(i32::MAX)).zip(columns) {
        let (Some(min), Some(max)) = (*min, *max) else {
            continue;
        };
        let (ymin, ymax) = (y_of(min), y_of(max));
        canvas.fill_rect(x, ymin, 1, u32::try_from(bottom + 1 - ymin).unwrap_or(0), theme::BAND_MIN);
        if ymax < ymin {
            canvas.fill_rect(x, ymax, 1, u32::try_from(ymin - ymax).unwrap_or(0), theme::BAND_MAX);
        }
    }

    let right = i32::try_from(w).unwrap_or(i32::MAX);
    for level in 0..MAX_PARALLEL {
        let y = y_of(level);
        canvas.draw_line(0, y, right, y, theme::GUIDELINE);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::charts::RecordingCanvas;
    use crate::domain::{EventKind, Pid, ProcessState, Timestamp};
    use crate::trace_data::{Timeline, TraceRecord};

    fn timeline(points: &[(u64, i64)]) -> Timeline {
        let mut timeline = Timeline::default();
        for &(time, nr_run_wait) in points {
            timeline.push(TraceRecord {
                time: Timestamp(time),
                prev_pid: Pid::IDLE,
                next_pid: Pid(1),
                prev_state: ProcessState::RunnableWaiting,
                next_state: ProcessState::Sleeping,
                kind: EventKind::ContextSwitch,
                nr_run_wait,
            });
        }
        timeline
    }

    /// Snapshots of the kworker trace
    fn histogram() -> ParallelHistogram {
        let timeline = timeline(&[(0, 1), (10, 1), (50, 0), (100, 1), (120, 1), (200, 0)]);
        ParallelHistogram::build(&timeline, 600)
    }

    #[test]
    fn test_band_columns() {
        let mut canvas = RecordingCanvas::new(600, PARALLEL_CHART_H);
        draw_parallel_chart(&mut canvas, &histogram());

        assert_eq!(canvas.rects(theme::BLACK), vec![(0, 0, 600, 128)]);

        let low = canvas.rects(theme::BAND_MIN);
        assert_eq!(low.len(), 600);
        assert_eq!(low[0], (0, 119, 1, 9));
        assert_eq!(low[200], (200, 127, 1, 1));

        // Columns where the count changed between 1 and 0
        assert_eq!(canvas.rects(theme::BAND_MAX), vec![(150, 119, 1, 8), (300, 119, 1, 8)]);
    }

    #[test]
    fn test_guidelines() {
        let mut canvas = RecordingCanvas::new(600, PARALLEL_CHART_H);
        draw_parallel_chart(&mut canvas, &histogram());

        let lines = canvas.lines(theme::GUIDELINE);
        assert_eq!(lines.len(), MAX_PARALLEL);
        assert_eq!(lines[0], (0, 127, 600, 127));
        assert_eq!(lines[15], (0, 7, 600, 7));
    }

    #[test]
    fn test_crowded_column_is_clamped() {
        let timeline = timeline(&[(0, 40), (10, 40)]);
        let mut canvas = RecordingCanvas::new(4, PARALLEL_CHART_H);
        draw_parallel_chart(&mut canvas, &ParallelHistogram::build(&timeline, 4));

        assert_eq!(canvas.rects(theme::BAND_MIN)[0], (0, 0, 1, 128));
    }
}
