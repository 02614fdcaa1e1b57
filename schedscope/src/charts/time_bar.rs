//! Relative time scale drawn above the process strips.
//!
//! About ten ticks, each labelled with the time since the trace start.
//! Traces up to ten seconds are labelled in milliseconds (`1.250s`),
//! longer ones as `HH:MM:SS` with ticks on round seconds or minutes.

use super::{theme, Canvas, TEXT_ASCENT};
use crate::domain::Duration;

/// Height of the time bar
pub const TIME_BAR_H: u32 = 75;

const MARKS: u64 = 10;
const TICK: i32 = 10;
/// Longest trace labelled in milliseconds
const MAX_MS_SCALE: u64 = 10 * 1000;
const LABEL_ANGLE: i32 = -45;

/// Tick positions and their labels
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimeScale {
    /// Length of the scale, in its own unit
    pub span: u64,
    /// `(offset, label)` for every tick, offsets in the same unit as `span`
    pub marks: Vec<(u64, String)>,
}

impl TimeScale {
    /// Ticks for a trace of `duration`, `None` for traces under a
    /// millisecond
    #[must_use]
    pub fn new(duration: Duration) -> Option<Self> {
        let span_ms = duration.as_micros() / 1000;
        if span_ms == 0 {
            return None;
        }

        let in_ms = span_ms <= MAX_MS_SCALE;
        let (span, slice) = if in_ms {
            (span_ms, round_ms_slice(span_ms / MARKS))
        } else {
            let span = span_ms / 1000;
            (span, round_sec_slice(span / MARKS))
        };
        let step = usize::try_from(slice.max(1)).unwrap_or(usize::MAX);

        let marks = (0..span)
            .step_by(step)
            .map(|at| (at, if in_ms { ms_label(at) } else { clock_label(at) }))
            .collect();
        Some(Self { span, marks })
    }
}

/// Drop the digits below roughly a third of the slice's magnitude
fn round_ms_slice(slice: u64) -> u64 {
    let square = u128::from(slice).pow(2);
    let mut mask: u64 = 1;
    while square >= 10 * u128::from(mask * 10).pow(2) {
        mask *= 10;
    }
    slice - slice % mask
}

/// Round a slice in seconds to 5 s, a minute, 5 minutes or an hour
fn round_sec_slice(slice: u64) -> u64 {
    let unit = match slice {
        0..=4 => 1,
        5..=59 => 5,
        60..=299 => 60,
        300..=3599 => 5 * 60,
        _ => 60 * 60,
    };
    slice - slice % unit
}

fn ms_label(ms: u64) -> String {
    format!("{}.{:03}s", ms / 1000, ms % 1000)
}

fn clock_label(secs: u64) -> String {
    format!("{:02}:{:02}:{:02}", (secs / 3600) % 24, (secs / 60) % 60, secs % 60)
}

/// Draw the time bar over the whole canvas.
///
/// Returns `false`, leaving the canvas untouched, when the trace is too
/// short for a scale.
pub fn draw_time_bar<C: Canvas>(canvas: &mut C, duration: Duration) -> bool {
    let Some(scale) = TimeScale::new(duration) else {
        return false;
    };

    let (w, h) = (canvas.width(), canvas.height());
    canvas.fill_rect(0, 0, w, h, theme::WHITE);
    let (right, bottom) = (i32::try_from(w).unwrap_or(i32::MAX), i32::try_from(h).unwrap_or(i32::MAX) - 1);
    canvas.draw_line(0, bottom, right, bottom, theme::BLACK);

    for (at, label) in &scale.marks {
        let x = i32::try_from(u128::from(*at) * u128::from(w) / u128::from(scale.span)).unwrap_or(i32::MAX);
        canvas.draw_line(x, bottom, x, bottom - TICK, theme::BLACK);
        canvas.draw_text_rotated(x, bottom - TICK - TEXT_ASCENT / 2, label, LABEL_ANGLE, theme::BLACK);
    }
    true
}
