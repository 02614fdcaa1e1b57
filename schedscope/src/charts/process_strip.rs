//! One horizontal strip per process showing what it did over the trace.
//!
//! Red is running, cyan is waiting for a CPU, a yellow line through the
//! middle is disk wait, black is sleeping. Stretches shorter than a pixel
//! are drawn as a one pixel column in a darker shade so they stay visible.

use super::{theme, time_to_x, Canvas, Rgb};
use crate::analysis::walk::StateWalker;
use crate::domain::{Pid, ProcessState, Timestamp};
use crate::trace_data::TraceData;

/// Height of a process strip
pub const TRACE_H: u32 = 24;

/// Draw the strip of `pid` over the whole canvas
pub fn draw_process_strip<C: Canvas>(canvas: &mut C, data: &TraceData, pid: Pid) {
    let (w, h) = (canvas.width(), canvas.height());
    canvas.fill_rect(0, 0, w, h, theme::BLACK);

    let start = data.start_time();
    let duration = data.duration().as_micros();
    let x_of = |time: Timestamp| time_to_x((time - start).as_micros(), duration, w);

    let mut walker = StateWalker::new(data);
    for step in walker.by_ref() {
        for transition in step.transitions().filter(|t| t.pid == pid) {
            draw_stretch(canvas, pid, transition.from, x_of(transition.since), x_of(transition.at));
        }
    }

    // Whatever the process was doing when the trace ended
    let end = data.timeline.end_time();
    let last = walker.states().find(|&(p, _, _)| p == pid);
    if let Some((_, state, since)) = last {
        if end > since {
            draw_stretch(canvas, pid, state, x_of(since), x_of(end));
        }
    }
}

fn draw_stretch<C: Canvas>(canvas: &mut C, pid: Pid, state: ProcessState, from: i32, to: i32) {
    match state {
        ProcessState::Running => fill_stretch(canvas, from, to, theme::RUNNING, theme::RUNNING_SHORT),
        // The idle process waiting just means something else runs
        ProcessState::RunnableWaiting if !pid.is_idle() => {
            fill_stretch(canvas, from, to, theme::WAITING, theme::WAITING_SHORT);
        }
        ProcessState::DiskWait => {
            let y = i32::try_from(canvas.height() / 2).unwrap_or(0);
            canvas.draw_line(from, y, to, y, theme::DISK_WAIT);
        }
        _ => {}
    }
}

fn fill_stretch<C: Canvas>(canvas: &mut C, from: i32, to: i32, color: Rgb, short: Rgb) {
    let h = canvas.height();
    if from == to {
        canvas.fill_rect(from, 0, 1, h, short);
    } else {
        let width = u32::try_from(to - from).unwrap_or(0);
        canvas.fill_rect(from + 1, 0, width, h, color);
    }
}
