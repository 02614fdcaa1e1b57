//! State reconstruction from decoded scheduler events.
//!
//! The tracer only reports transitions, never the state a process was in
//! when tracing started. The reconstructor replays events in order, keeps a
//! running count of processes that are running or waiting for a CPU, and
//! guesses each process's initial state from its first transition.
//!
//! # Back-patching
//!
//! A guess can reveal that earlier records undercounted: a process switched
//! in without a preceding wakeup must have been waiting all along. Such
//! corrections are recorded as `(records_before, delta)` requests and
//! applied in [`Reconstructor::finish`], which is also the only way to get
//! at the [`Timeline`]. Nobody can observe a snapshot that is still going
//! to change.
//!
//! ```text
//! apply(event) ─► update states ─► tally ─► push TraceRecord
//!                      │
//!                      └─► first transition? ─► init_state (+ back-patch request)
//!
//! finish() ─► apply back-patches ─► idle adjustment ─► signal ids ─► TraceData
//! ```

use log::{debug, warn};

use crate::domain::{EventKind, Pid, ProcessState, Timestamp};
use crate::process_table::{NameResolver, NoResolver, ProcessTable};
use crate::trace_data::{Timeline, TraceData, TraceEvent, TraceRecord};

// =============================================================================
// TRANSITION OUTCOME
// =============================================================================

/// Which side of an event a process is on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Side {
    Outgoing,
    Incoming,
}

/// Result of moving one process to a new state
#[derive(Debug, Clone, Copy, Default)]
struct Outcome {
    /// Change of the runnable-or-waiting count
    delta: i64,
    /// The already-emitted records must be corrected by `delta`
    back_patch: bool,
}

// =============================================================================
// RECONSTRUCTOR
// =============================================================================

/// Incremental builder of the Timeline and the process table.
///
/// Feed events in trace order with [`apply`](Self::apply), then call
/// [`finish`](Self::finish).
pub struct Reconstructor<'r> {
    resolver: &'r dyn NameResolver,
    timeline: Timeline,
    processes: ProcessTable,
    /// Runnable-or-waiting count including the idle process
    tally: i64,
    /// `(records_before, delta)`: add `delta` to the first `records_before` records
    back_patches: Vec<(usize, i64)>,
    saw_idle: bool,
    last_time: Option<Timestamp>,
}

impl Default for Reconstructor<'static> {
    fn default() -> Self {
        Self::new(&NoResolver)
    }
}

impl<'r> Reconstructor<'r> {
    pub fn new(resolver: &'r dyn NameResolver) -> Self {
        Self {
            resolver,
            timeline: Timeline::default(),
            processes: ProcessTable::new(),
            tally: 0,
            back_patches: Vec::new(),
            saw_idle: false,
            last_time: None,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.timeline.is_empty()
    }

    /// Account one event and append its record.
    ///
    /// The returned record carries the snapshot as known right now; later
    /// back-patches are only visible in the finished Timeline.
    pub fn apply(&mut self, event: TraceEvent) -> TraceRecord {
        let time = self.monotonic(event.time);
        let prev_pid = event.prev.pid;
        let next_pid = event.next.pid;

        if let Some(name) = &event.prev.name {
            self.processes.set_name(prev_pid, name, self.resolver);
        }
        if let Some(name) = &event.next.name {
            self.processes.set_name(next_pid, name, self.resolver);
        }

        let mut new_tally = self.tally;
        if event.kind == EventKind::ContextSwitch {
            let outcome = self.transition(prev_pid, event.prev.state, Side::Outgoing, event.prev.state);
            new_tally += self.settle(outcome);
        }
        let outcome = self.transition(next_pid, event.kind.incoming_state(), Side::Incoming, event.next.state);
        new_tally += self.settle(outcome);

        if new_tally <= 0 {
            warn!("Runnable count dropped to {new_tally} at {time}, clamping to 1");
            new_tally = 1;
        }
        self.tally = new_tally;

        let record = TraceRecord {
            time,
            prev_pid,
            next_pid,
            prev_state: event.prev.state,
            next_state: event.next.state,
            kind: event.kind,
            // The idle process is always either running or waiting
            nr_run_wait: self.tally - 1,
        };
        self.timeline.push(record);

        self.processes.get_or_insert(prev_pid, self.resolver).used += 1;
        self.processes.get_or_insert(next_pid, self.resolver).used += 1;
        if prev_pid.is_idle() || next_pid.is_idle() {
            self.saw_idle = true;
        }

        record
    }

    /// Finalize the Timeline and hand out the analysis result
    pub fn finish(mut self) -> TraceData {
        self.apply_back_patches();

        if !self.saw_idle && !self.timeline.is_empty() {
            // Nothing ever switched to or from idle, so the `- 1` taken for
            // it in every snapshot was never justified
            debug!("Idle process never seen, adjusting all snapshots by +1");
            self.timeline.shift_all(1);
        }

        self.processes.assign_signal_ids();
        TraceData { timeline: self.timeline, processes: self.processes }
    }

    // =========================================================================
    // INTERNALS
    // =========================================================================

    /// Clamp out-of-order timestamps to the previous record's time
    fn monotonic(&mut self, time: Timestamp) -> Timestamp {
        let time = match self.last_time {
            Some(last) if time < last => {
                warn!("Timestamp {time} goes backwards (previous {last}), using {last}");
                last
            }
            _ => time,
        };
        self.last_time = Some(time);
        time
    }

    /// Move `pid` into `new_state` and guess its initial state if this is
    /// its first transition
    fn transition(&mut self, pid: Pid, new_state: ProcessState, side: Side, reported: ProcessState) -> Outcome {
        let record = self.processes.get_or_insert(pid, self.resolver);
        let old_state = record.state;
        let delta = i64::from(old_state.count_delta(new_state));
        let mut back_patch = false;

        if !record.init_state_inferred {
            match side {
                Side::Incoming => {
                    if old_state == ProcessState::Sleeping && new_state == ProcessState::Running {
                        // Switched in without a wakeup: it was already waiting
                        record.init_state = ProcessState::RunnableWaiting;
                        back_patch = true;
                    } else if old_state == ProcessState::Sleeping
                        && new_state == ProcessState::RunnableWaiting
                        && reported == ProcessState::DiskWait
                    {
                        record.init_state = ProcessState::DiskWait;
                    }
                }
                Side::Outgoing => {
                    if delta == 1 {
                        // Leaving a CPU, so it cannot have been asleep
                        record.init_state = ProcessState::Running;
                        back_patch = true;
                    }
                }
            }
            record.init_state_inferred = true;
        }

        record.state = new_state;
        Outcome { delta, back_patch }
    }

    /// Queue the back-patch for an outcome and return its tally delta
    fn settle(&mut self, outcome: Outcome) -> i64 {
        if outcome.back_patch && outcome.delta != 0 && !self.timeline.is_empty() {
            self.back_patches.push((self.timeline.len(), outcome.delta));
        }
        outcome.delta
    }

    /// Each record receives the sum of every delta requested after it was
    /// emitted
    fn apply_back_patches(&mut self) {
        if self.back_patches.is_empty() {
            return;
        }

        let records = self.timeline.records_mut();
        let mut pending = vec![0_i64; records.len() + 1];
        for &(before, delta) in &self.back_patches {
            pending[before] += delta;
        }

        let mut running = 0;
        for (index, record) in records.iter_mut().enumerate().rev() {
            running += pending[index + 1];
            record.nr_run_wait += running;
        }
        debug!("Applied {} back-patch requests", self.back_patches.len());
        self.back_patches.clear();
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trace_data::TaskRef;
    use std::collections::BTreeMap;

    fn task(pid: u32, state: ProcessState) -> TaskRef {
        TaskRef::new(Pid(pid), None, state)
    }

    fn switch(time: u64, prev: u32, prev_state: ProcessState, next: u32) -> TraceEvent {
        TraceEvent {
            time: Timestamp(time),
            kind: EventKind::ContextSwitch,
            prev: task(prev, prev_state),
            next: task(next, ProcessState::RunnableWaiting),
        }
    }

    fn wakeup(time: u64, waker: u32, target: u32, target_state: ProcessState) -> TraceEvent {
        TraceEvent {
            time: Timestamp(time),
            kind: EventKind::Wakeup,
            prev: task(waker, ProcessState::RunnableWaiting),
            next: task(target, target_state),
        }
    }

    fn snapshots(data: &TraceData) -> Vec<i64> {
        data.timeline.iter().map(|r| r.nr_run_wait).collect()
    }

    #[test]
    fn test_switch_from_idle_counts_one() {
        let mut reconstructor = Reconstructor::default();
        reconstructor.apply(switch(10, 0, ProcessState::RunnableWaiting, 1));
        let data = reconstructor.finish();

        assert_eq!(snapshots(&data), vec![1]);
        let record = data.processes.get(Pid(1)).unwrap();
        assert_eq!(record.init_state, ProcessState::RunnableWaiting);
        assert_eq!(record.used, 1);
    }

    #[test]
    fn test_wake_run_sleep_cycle() {
        let mut reconstructor = Reconstructor::default();
        reconstructor.apply(wakeup(0, 0, 123, ProcessState::Sleeping));
        reconstructor.apply(switch(10, 0, ProcessState::RunnableWaiting, 123));
        reconstructor.apply(switch(50, 123, ProcessState::DiskWait, 0));
        reconstructor.apply(wakeup(100, 0, 123, ProcessState::DiskWait));
        reconstructor.apply(switch(120, 0, ProcessState::RunnableWaiting, 123));
        reconstructor.apply(switch(200, 123, ProcessState::Sleeping, 0));
        let data = reconstructor.finish();

        assert_eq!(snapshots(&data), vec![1, 1, 0, 1, 1, 0]);
        assert_eq!(data.processes.get(Pid::IDLE).unwrap().init_state, ProcessState::Running);
        assert_eq!(data.processes.get(Pid(123)).unwrap().init_state, ProcessState::Sleeping);
    }

    #[test]
    fn test_switch_without_wakeup_back_patches_history() {
        let mut reconstructor = Reconstructor::default();
        reconstructor.apply(wakeup(0, 0, 1, ProcessState::Sleeping));
        reconstructor.apply(switch(5, 0, ProcessState::RunnableWaiting, 1));
        // pid 2 was never woken inside the trace, it must have been waiting
        let live = reconstructor.apply(switch(9, 1, ProcessState::Sleeping, 2));
        assert_eq!(live.nr_run_wait, 1);

        let data = reconstructor.finish();
        // The first two records learn about pid 2 only after the fact
        assert_eq!(snapshots(&data), vec![2, 2, 1]);
        assert_eq!(data.processes.get(Pid(2)).unwrap().init_state, ProcessState::RunnableWaiting);
    }

    #[test]
    fn test_outgoing_first_sighting_is_running() {
        let mut reconstructor = Reconstructor::default();
        reconstructor.apply(wakeup(0, 0, 1, ProcessState::Sleeping));
        // pid 7 leaves the CPU still runnable: it was running before
        reconstructor.apply(switch(4, 7, ProcessState::RunnableWaiting, 1));
        let data = reconstructor.finish();

        assert_eq!(data.processes.get(Pid(7)).unwrap().init_state, ProcessState::Running);
        // The wakeup record learns afterwards that pid 7 was on CPU
        assert_eq!(snapshots(&data), vec![1, 1]);
    }

    #[test]
    fn test_disk_wakeup_infers_disk_wait() {
        let mut reconstructor = Reconstructor::default();
        reconstructor.apply(wakeup(0, 0, 3, ProcessState::DiskWait));
        let data = reconstructor.finish();
        assert_eq!(data.processes.get(Pid(3)).unwrap().init_state, ProcessState::DiskWait);
    }

    #[test]
    fn test_inference_only_on_first_transition() {
        let mut reconstructor = Reconstructor::default();
        reconstructor.apply(wakeup(0, 0, 3, ProcessState::Sleeping));
        reconstructor.apply(switch(1, 0, ProcessState::RunnableWaiting, 3));
        reconstructor.apply(switch(2, 3, ProcessState::Sleeping, 0));
        // Second switch-in without a wakeup: no guess this time
        reconstructor.apply(switch(3, 0, ProcessState::RunnableWaiting, 3));
        let data = reconstructor.finish();
        assert_eq!(data.processes.get(Pid(3)).unwrap().init_state, ProcessState::Sleeping);
    }

    #[test]
    fn test_snapshots_never_negative() {
        let mut reconstructor = Reconstructor::default();
        reconstructor.apply(switch(0, 5, ProcessState::Sleeping, 0));
        reconstructor.apply(switch(1, 0, ProcessState::Sleeping, 0));
        reconstructor.apply(switch(2, 0, ProcessState::DiskWait, 5));
        reconstructor.apply(switch(3, 5, ProcessState::DiskWait, 0));
        let data = reconstructor.finish();
        assert!(snapshots(&data).iter().all(|&n| n >= 0));
    }

    #[test]
    fn test_no_idle_adjustment() {
        let mut reconstructor = Reconstructor::default();
        reconstructor.apply(wakeup(0, 1, 2, ProcessState::Sleeping));
        reconstructor.apply(switch(3, 1, ProcessState::Sleeping, 2));
        let data = reconstructor.finish();
        // Without idle in the trace nothing is subtracted for it
        assert_eq!(snapshots(&data), vec![1, 1]);
    }

    #[test]
    fn test_backwards_timestamp_is_clamped() {
        let mut reconstructor = Reconstructor::default();
        reconstructor.apply(wakeup(100, 0, 1, ProcessState::Sleeping));
        let record = reconstructor.apply(switch(90, 0, ProcessState::RunnableWaiting, 1));
        assert_eq!(record.time, Timestamp(100));
    }

    #[test]
    fn test_names_and_signal_ids() {
        let mut known = BTreeMap::new();
        known.insert(Pid(9), "9-system_server".to_string());
        let mut reconstructor = Reconstructor::new(&known);
        reconstructor.apply(TraceEvent {
            time: Timestamp(0),
            kind: EventKind::ContextSwitch,
            prev: TaskRef::new(Pid(0), Some("<idle>".into()), ProcessState::RunnableWaiting),
            next: TaskRef::new(Pid(9), Some("Binder".into()), ProcessState::RunnableWaiting),
        });
        let data = reconstructor.finish();

        assert_eq!(data.processes.get(Pid::IDLE).unwrap().display_name(), "SLEEP");
        assert_eq!(data.processes.get(Pid(9)).unwrap().display_name(), "9-system_server");
        assert_eq!(data.processes.get(Pid::IDLE).unwrap().signal_id.as_deref(), Some("A"));
        assert_eq!(data.processes.get(Pid(9)).unwrap().signal_id.as_deref(), Some("B"));
    }
}
