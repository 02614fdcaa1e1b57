//! Replay of a finished Timeline as per-process state transitions.
//!
//! The statistics, the waveform and the Chrome trace all need to know, for
//! every record, which processes changed state and since when they had
//! been in the old one. [`StateWalker`] does that bookkeeping once.
//!
//! Every used process starts in its inferred initial state at the time of
//! the first record. Only real changes are reported; a process moving into
//! the state it is already in produces no [`Transition`].

use std::collections::BTreeMap;

use crate::domain::{Duration, Pid, ProcessState, Timestamp};
use crate::trace_data::{TraceData, TraceRecord};

/// One process leaving one state for another
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub pid: Pid,
    pub from: ProcessState,
    pub to: ProcessState,
    /// When the process entered `from`
    pub since: Timestamp,
    /// When it left `from`
    pub at: Timestamp,
}

impl Transition {
    /// Time spent in `from`
    #[must_use]
    pub fn elapsed(&self) -> Duration {
        self.at - self.since
    }
}

/// Transitions caused by one record, outgoing process first
#[derive(Debug, Clone, Copy)]
pub struct Step<'a> {
    pub record: &'a TraceRecord,
    pub prev: Option<Transition>,
    pub next: Option<Transition>,
}

impl Step<'_> {
    pub fn transitions(&self) -> impl Iterator<Item = Transition> {
        self.prev.into_iter().chain(self.next)
    }
}

/// Iterator over the [`Step`]s of a Timeline
pub struct StateWalker<'a> {
    records: std::slice::Iter<'a, TraceRecord>,
    /// Current state and time it was entered, per used process
    states: BTreeMap<Pid, (ProcessState, Timestamp)>,
}

impl<'a> StateWalker<'a> {
    pub fn new(data: &'a TraceData) -> Self {
        let start = data.start_time();
        let states = data.processes.used().map(|p| (p.pid, (p.init_state, start))).collect();
        Self { records: data.timeline.iter(), states }
    }

    /// Current state of every used process, in pid order
    pub fn states(&self) -> impl Iterator<Item = (Pid, ProcessState, Timestamp)> + '_ {
        self.states.iter().map(|(&pid, &(state, since))| (pid, state, since))
    }

    fn move_to(&mut self, pid: Pid, to: ProcessState, at: Timestamp) -> Option<Transition> {
        let (state, since) = self.states.entry(pid).or_insert((ProcessState::Sleeping, at));
        if *state == to {
            return None;
        }
        let transition = Transition { pid, from: *state, to, since: *since, at };
        *state = to;
        *since = at;
        Some(transition)
    }
}

impl<'a> Iterator for StateWalker<'a> {
    type Item = Step<'a>;

    fn next(&mut self) -> Option<Step<'a>> {
        let record = self.records.next()?;
        let prev = record.prev_transition().and_then(|to| self.move_to(record.prev_pid, to, record.time));
        let next = self.move_to(record.next_pid, record.next_transition(), record.time);
        Some(Step { record, prev, next })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::reconstructor::Reconstructor;
    use crate::domain::EventKind;
    use crate::trace_data::{TaskRef, TraceEvent};

    fn event(time: u64, kind: EventKind, prev: (u32, ProcessState), next: u32) -> TraceEvent {
        TraceEvent {
            time: Timestamp(time),
            kind,
            prev: TaskRef::new(Pid(prev.0), None, prev.1),
            next: TaskRef::new(Pid(next), None, ProcessState::Sleeping),
        }
    }

    fn sample() -> TraceData {
        let mut reconstructor = Reconstructor::default();
        reconstructor.apply(event(0, EventKind::Wakeup, (0, ProcessState::RunnableWaiting), 5));
        reconstructor.apply(event(10, EventKind::ContextSwitch, (0, ProcessState::RunnableWaiting), 5));
        reconstructor.apply(event(40, EventKind::ContextSwitch, (5, ProcessState::Sleeping), 0));
        reconstructor.finish()
    }

    #[test]
    fn test_walk_reports_changes_only() {
        let data = sample();
        let steps: Vec<Step> = StateWalker::new(&data).collect();
        assert_eq!(steps.len(), 3);

        // Wakeup leaves the waker alone
        assert!(steps[0].prev.is_none());
        let woken = steps[0].next.unwrap();
        assert_eq!((woken.from, woken.to), (ProcessState::Sleeping, ProcessState::RunnableWaiting));

        let idle_out = steps[1].prev.unwrap();
        assert_eq!(idle_out.pid, Pid::IDLE);
        assert_eq!((idle_out.from, idle_out.to), (ProcessState::Running, ProcessState::RunnableWaiting));
        assert_eq!(idle_out.elapsed(), Duration(10));

        let sleeping = steps[2].prev.unwrap();
        assert_eq!(sleeping.from, ProcessState::Running);
        assert_eq!(sleeping.since, Timestamp(10));
        assert_eq!(sleeping.elapsed(), Duration(30));
    }

    #[test]
    fn test_transitions_order() {
        let data = sample();
        let step = StateWalker::new(&data).nth(1).unwrap();
        let pids: Vec<Pid> = step.transitions().map(|t| t.pid).collect();
        assert_eq!(pids, vec![Pid::IDLE, Pid(5)]);
    }

    #[test]
    fn test_final_states() {
        let data = sample();
        let mut walker = StateWalker::new(&data);
        for _ in walker.by_ref() {}
        let states: Vec<(Pid, ProcessState)> = walker.states().map(|(pid, state, _)| (pid, state)).collect();
        assert_eq!(states, vec![(Pid::IDLE, ProcessState::Running), (Pid(5), ProcessState::Sleeping)]);
    }
}
