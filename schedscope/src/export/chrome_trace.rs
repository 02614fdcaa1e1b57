// Microsecond timestamps are exported as f64
#![allow(clippy::cast_precision_loss)]

use serde::Serialize;
use serde_json::Value as JsonValue;
use std::collections::HashMap;
use std::io::Write;

use crate::analysis::walk::StateWalker;
use crate::domain::{ExportError, Pid, ProcessState, Timestamp};
use crate::trace_data::TraceData;

/// All processes are shown as threads of this one synthetic process
const TRACE_PID: u32 = 1;

/// Chrome Trace Event format
/// Format reference: https://docs.google.com/document/d/1CvAClvFfyA5R-PhYUmn5OOQtYMH4h6I0nSsKchNAySU/preview
#[derive(Debug, Clone, Serialize)]
struct ChromeTraceEvent {
    /// Event name (the scheduler state for slices)
    name: String,
    /// Category for filtering/coloring
    cat: String,
    /// Phase: "X" = complete, "C" = counter, "M" = metadata
    ph: String,
    /// Timestamp in microseconds, relative to the first record
    ts: f64,
    /// Duration of "X" events in microseconds
    #[serde(skip_serializing_if = "Option::is_none")]
    dur: Option<f64>,
    pid: u32,
    /// Process id of the traced process
    tid: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    args: Option<HashMap<String, JsonValue>>,
}

/// Chrome Trace Format container
#[derive(Debug, Serialize)]
struct ChromeTrace {
    #[serde(rename = "traceEvents")]
    trace_events: Vec<ChromeTraceEvent>,
    #[serde(rename = "displayTimeUnit")]
    display_time_unit: String,
}

/// Chrome trace exporter for timeline visualization (Perfetto or
/// chrome://tracing)
///
/// Every stretch a process spends running, waiting for a CPU or in disk
/// wait becomes one complete ("X") slice on that process's track. The
/// runnable-or-waiting snapshot is exported as a `RUNWAIT` counter.
pub struct ChromeTraceExporter {
    events: Vec<ChromeTraceEvent>,
    start: Timestamp,
}

impl ChromeTraceExporter {
    pub fn from_trace(data: &TraceData) -> Self {
        let mut exporter = Self { events: Vec::new(), start: data.start_time() };

        for record in data.processes.used() {
            let mut args = HashMap::new();
            args.insert("name".to_string(), serde_json::json!(record.display_name()));
            exporter.events.push(ChromeTraceEvent {
                name: "thread_name".to_string(),
                cat: String::new(),
                ph: "M".to_string(), // Metadata
                ts: 0.0,
                dur: None,
                pid: TRACE_PID,
                tid: record.pid.0,
                args: Some(args),
            });
        }

        let mut walker = StateWalker::new(data);
        let mut last_count = None;
        for step in walker.by_ref() {
            if last_count != Some(step.record.nr_run_wait) {
                last_count = Some(step.record.nr_run_wait);
                exporter.add_counter(step.record.time, step.record.nr_run_wait);
            }
            for transition in step.transitions() {
                exporter.add_slice(transition.pid, transition.from, transition.since, transition.at);
            }
        }

        // Close whatever is still open at the end of the trace
        let end = data.timeline.end_time();
        for (pid, state, since) in walker.states() {
            exporter.add_slice(pid, state, since, end);
        }

        exporter
    }

    fn relative(&self, time: Timestamp) -> f64 {
        (time - self.start).as_micros() as f64
    }

    fn add_slice(&mut self, pid: Pid, state: ProcessState, since: Timestamp, until: Timestamp) {
        let category = match state {
            ProcessState::Running => "running",
            ProcessState::RunnableWaiting => "waiting",
            ProcessState::DiskWait => "disk_wait",
            ProcessState::Sleeping => return,
        };
        if until <= since {
            return;
        }

        self.events.push(ChromeTraceEvent {
            name: state.to_string(),
            cat: category.to_string(),
            ph: "X".to_string(), // Complete
            ts: self.relative(since),
            dur: Some((until - since).as_micros() as f64),
            pid: TRACE_PID,
            tid: pid.0,
            args: None,
        });
    }

    fn add_counter(&mut self, time: Timestamp, count: i64) {
        let mut args = HashMap::new();
        args.insert("processes".to_string(), serde_json::json!(count));
        self.events.push(ChromeTraceEvent {
            name: "RUNWAIT".to_string(),
            cat: "scheduler".to_string(),
            ph: "C".to_string(), // Counter
            ts: self.relative(time),
            dur: None,
            pid: TRACE_PID,
            tid: 0,
            args: Some(args),
        });
    }

    /// Export the trace to any writer (file, stdout, buffer, etc.)
    ///
    /// # Errors
    /// Returns an error if serialization or the writer fails.
    pub fn export<W: Write>(&self, writer: W) -> Result<(), ExportError> {
        let trace = ChromeTrace { trace_events: self.events.clone(), display_time_unit: "ms".to_string() };
        serde_json::to_writer_pretty(writer, &trace)?;
        Ok(())
    }

    /// Get the number of events collected
    pub fn event_count(&self) -> usize {
        self.events.len()
    }
}
