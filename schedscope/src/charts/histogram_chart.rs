//! Bar chart of the parallel-process histogram.

use super::{theme, Canvas, TEXT_ASCENT};
use crate::analysis::ParallelHistogram;

// Plot area and margins
const PLOT_W: i32 = 400;
const PLOT_H: i32 = 400;
const MARGIN_LEFT: i32 = 64;
const MARGIN_RIGHT: i32 = 32;
const MARGIN_TOP: i32 = 32;
const MARGIN_BOTTOM: i32 = 64;
/// Height of a bar holding 100% of the trace
const BAR_MAX: i32 = 350;
const BAR_MARGIN: i32 = 2;
const ARROW: i32 = 5;

pub const HISTOGRAM_CHART_W: u32 = (MARGIN_LEFT + PLOT_W + MARGIN_RIGHT) as u32;
pub const HISTOGRAM_CHART_H: u32 = (MARGIN_TOP + PLOT_H + MARGIN_BOTTOM) as u32;

pub fn draw_histogram_chart<C: Canvas>(canvas: &mut C, histogram: &ParallelHistogram) {
    canvas.fill_rect(0, 0, HISTOGRAM_CHART_W, HISTOGRAM_CHART_H, theme::WHITE);

    let (left, top) = (MARGIN_LEFT, MARGIN_TOP);
    let (right, bottom) = (left + PLOT_W, top + PLOT_H);

    // Axes with arrowheads
    canvas.draw_line(left, top, left, bottom, theme::BLACK);
    canvas.draw_line(left - ARROW, top + ARROW, left, top, theme::BLACK);
    canvas.draw_line(left + ARROW, top + ARROW, left, top, theme::BLACK);
    canvas.draw_line(right, bottom, left, bottom, theme::BLACK);
    canvas.draw_line(right - ARROW, bottom - ARROW, right, bottom, theme::BLACK);
    canvas.draw_line(right - ARROW, bottom + ARROW, right, bottom, theme::BLACK);

    for percent in (10..=100).step_by(10) {
        let y = bottom - BAR_MAX * percent / 100;
        canvas.draw_line(left - ARROW, y, left, y, theme::BLACK);
        let label = format!("{percent}% ");
        let x = left - ARROW - text_width(canvas, &label);
        canvas.draw_text(x, y, &label, theme::BLACK);
        canvas.draw_line(left, y, right, y, theme::LIGHT_GRAY);
    }

    let buckets = histogram.buckets.len();
    let slot = PLOT_W / i32::try_from(buckets).unwrap_or(i32::MAX).max(1);
    let bar_w = slot - 2 * BAR_MARGIN;
    let duration = histogram.duration.as_micros();

    for (bucket, total) in histogram.buckets.iter().enumerate() {
        let x = left + i32::try_from(bucket).unwrap_or(0) * slot + BAR_MARGIN;
        let bar_h = if duration == 0 {
            0
        } else {
            i32::try_from(u64::try_from(BAR_MAX).unwrap_or(0) * total.as_micros() / duration).unwrap_or(BAR_MAX)
        };
        if bar_h > 0 {
            let (w, h) = (u32::try_from(bar_w).unwrap_or(0), u32::try_from(bar_h).unwrap_or(0));
            canvas.fill_rect(x, bottom - bar_h, w, h, theme::bar_color(bucket, buckets));
        }

        let center = x + bar_w / 2;
        canvas.draw_line(center, bottom, center, bottom + ARROW, theme::BLACK);
        let label = bucket.to_string();
        let label_x = center - text_width(canvas, &label) / 2;
        canvas.draw_text(label_x, bottom + ARROW + TEXT_ASCENT, &label, theme::BLACK);
    }

    canvas.draw_text(10, 10 + TEXT_ASCENT, "Parallel process histogram", theme::BLACK);
}

fn text_width<C: Canvas>(canvas: &C, text: &str) -> i32 {
    i32::try_from(canvas.text_width(text)).unwrap_or(0)
}
