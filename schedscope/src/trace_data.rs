//! Trace data models shared by every pipeline stage
//!
//! - [`TraceEvent`]: one decoded trace line, as produced by the decoders
//! - [`TraceRecord`]: one accepted event as persisted in the [`Timeline`]
//! - [`TraceData`]: the finished Timeline plus the process table, the only
//!   thing downstream stages (statistics, waveform, charts) ever see

use serde::Serialize;

use crate::domain::{Duration, EventKind, Pid, ProcessState, Timestamp};
use crate::process_table::ProcessTable;

/// One side of a scheduler event
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskRef {
    pub pid: Pid,
    /// Command name, `None` when the tracer printed the `<...>` placeholder
    pub name: Option<String>,
    /// State reported by the tracer for this side of the event
    pub state: ProcessState,
}

impl TaskRef {
    pub fn new(pid: Pid, name: Option<String>, state: ProcessState) -> Self {
        Self { pid, name, state }
    }
}

/// Normalized form of one decoded trace line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TraceEvent {
    pub time: Timestamp,
    pub kind: EventKind,
    /// The process that was on CPU when the event fired
    pub prev: TaskRef,
    /// The process switched in (context switch) or woken up (wakeup)
    pub next: TaskRef,
}

/// One node of the Timeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TraceRecord {
    pub time: Timestamp,
    pub prev_pid: Pid,
    pub next_pid: Pid,
    pub prev_state: ProcessState,
    pub next_state: ProcessState,
    pub kind: EventKind,
    /// Number of non-idle processes runnable or running at this instant
    pub nr_run_wait: i64,
}

impl TraceRecord {
    /// State the outgoing process moves into, if this record changes it
    #[must_use]
    pub fn prev_transition(&self) -> Option<ProcessState> {
        match self.kind {
            EventKind::ContextSwitch => Some(self.prev_state),
            EventKind::Wakeup => None,
        }
    }

    /// State the incoming process moves into
    #[must_use]
    pub fn next_transition(&self) -> ProcessState {
        self.kind.incoming_state()
    }
}

/// Time-ordered sequence of trace records
///
/// Only the reconstructor can append or shift records; once it hands the
/// Timeline out through [`TraceData`] it is read-only.
#[derive(Debug, Default, Clone)]
pub struct Timeline {
    records: Vec<TraceRecord>,
}

impl Timeline {
    pub(crate) fn push(&mut self, record: TraceRecord) {
        self.records.push(record);
    }

    pub(crate) fn records_mut(&mut self) -> &mut [TraceRecord] {
        &mut self.records
    }

    /// Add `delta` to every snapshot
    pub(crate) fn shift_all(&mut self, delta: i64) {
        for record in &mut self.records {
            record.nr_run_wait += delta;
        }
    }

    pub fn records(&self) -> &[TraceRecord] {
        &self.records
    }

    pub fn iter(&self) -> std::slice::Iter<'_, TraceRecord> {
        self.records.iter()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn first(&self) -> Option<&TraceRecord> {
        self.records.first()
    }

    pub fn last(&self) -> Option<&TraceRecord> {
        self.records.last()
    }

    /// Time of the first record (zero for an empty timeline)
    pub fn start_time(&self) -> Timestamp {
        self.first().map(|r| r.time).unwrap_or_default()
    }

    /// Time of the last record (zero for an empty timeline)
    pub fn end_time(&self) -> Timestamp {
        self.last().map(|r| r.time).unwrap_or_default()
    }

    /// Time between the first and the last record
    pub fn duration(&self) -> Duration {
        self.end_time() - self.start_time()
    }
}

impl<'a> IntoIterator for &'a Timeline {
    type Item = &'a TraceRecord;
    type IntoIter = std::slice::Iter<'a, TraceRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}

/// Result of analysing one trace section
#[derive(Debug)]
pub struct TraceData {
    pub timeline: Timeline,
    pub processes: ProcessTable,
}

impl TraceData {
    pub fn duration(&self) -> Duration {
        self.timeline.duration()
    }

    pub fn start_time(&self) -> Timestamp {
        self.timeline.start_time()
    }

    pub fn is_empty(&self) -> bool {
        self.timeline.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(time: u64, kind: EventKind) -> TraceRecord {
        TraceRecord {
            time: Timestamp(time),
            prev_pid: Pid(0),
            next_pid: Pid(1),
            prev_state: ProcessState::RunnableWaiting,
            next_state: ProcessState::Sleeping,
            kind,
            nr_run_wait: 1,
        }
    }

    #[test]
    fn test_empty_timeline_has_zero_duration() {
        let timeline = Timeline::default();
        assert!(timeline.is_empty());
        assert_eq!(timeline.duration(), Duration::ZERO);
        assert_eq!(timeline.start_time(), Timestamp(0));
    }

    #[test]
    fn test_timeline_duration() {
        let mut timeline = Timeline::default();
        timeline.push(record(1_000, EventKind::Wakeup));
        timeline.push(record(1_250, EventKind::ContextSwitch));
        assert_eq!(timeline.len(), 2);
        assert_eq!(timeline.start_time(), Timestamp(1_000));
        assert_eq!(timeline.duration(), Duration(250));
    }

    #[test]
    fn test_wakeup_leaves_outgoing_untouched() {
        let wakeup = record(0, EventKind::Wakeup);
        assert_eq!(wakeup.prev_transition(), None);
        assert_eq!(wakeup.next_transition(), ProcessState::RunnableWaiting);

        let switch = record(0, EventKind::ContextSwitch);
        assert_eq!(switch.prev_transition(), Some(ProcessState::RunnableWaiting));
        assert_eq!(switch.next_transition(), ProcessState::Running);
    }
}
