//! Decoder for event-annotated tracer output
//!
//! ```text
//!           <idle>-0     [000] d..3   100.000010: sched_switch: prev_comm=swapper prev_pid=0 prev_prio=120 prev_state=R ==> next_comm=kworker next_pid=123 next_prio=120
//!           <idle>-0     [000] d.h4   100.000000: sched_wakeup: comm=kworker pid=123 prio=120 success=1 target_cpu=000
//! ```
//!
//! The flags column (`d..3`) and the `(tgid)` column are optional. Only
//! `sched_switch`, `sched_wakeup` and `sched_wakeup_new` are modelled;
//! every other event is skipped.
//!
//! Wakeup lines do not say what the woken process was doing. The decoder
//! remembers the state each pid was switched out with and reports that,
//! falling back to an ordinary sleep for pids never seen leaving a CPU.

use log::{debug, trace};
use regex::Regex;
use std::collections::HashMap;
use std::sync::OnceLock;

use super::{is_comment, known_name, parse_timestamp, parse_u32, split_task_prefix, TraceDecoder};
use crate::domain::{DecodeError, EventKind, Pid, ProcessState, Timestamp};
use crate::trace_data::{TaskRef, TraceEvent};

/// Any tracer header; the data lines decide whether the grammar fits
const ANNOTATED_HEADER_PREFIX: &str = "# tracer: ";

struct Patterns {
    prefix: Regex,
    switch: Regex,
    wakeup: Regex,
}

fn patterns() -> &'static Patterns {
    static PATTERNS: OnceLock<Patterns> = OnceLock::new();
    PATTERNS.get_or_init(|| Patterns {
        prefix: Regex::new(
            r"^\s+(?:\(\s*[\d-]+\)\s+)?\S+\s+(?:[^\s:]+\s+)?(\d+(?:\.\d+)?):\s+([\w-]+):\s?(.*)$",
        )
        .unwrap(),
        switch: Regex::new(
            r"^prev_comm=.* prev_pid=.* prev_state=(\S+) ==> next_comm=(.*) next_pid=(\d+) next_prio=(\d+)$",
        )
        .unwrap(),
        wakeup: Regex::new(r"^comm=(.*) pid=(\d+) prio=(\d+)(?: success=\d+)? target_cpu=(\d+)$").unwrap(),
    })
}

#[derive(Debug, Default)]
pub struct AnnotatedDecoder {
    /// State each pid was last switched out with
    last_state: HashMap<Pid, ProcessState>,
}

impl AnnotatedDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    fn decode_switch(
        &mut self,
        prev: TaskRef,
        time: Timestamp,
        payload: &str,
    ) -> Result<TraceEvent, DecodeError> {
        let caps = patterns().switch.captures(payload).ok_or(DecodeError::Malformed("sched_switch"))?;

        let prev_code = caps[1].chars().next().unwrap_or('S');
        let prev_state = ProcessState::from_code(prev_code);
        self.last_state.insert(prev.pid, prev_state);

        let next_pid = Pid(parse_u32("next_pid", &caps[3])?);
        Ok(TraceEvent {
            time,
            kind: EventKind::ContextSwitch,
            prev: TaskRef { state: prev_state, ..prev },
            // Whoever gets the CPU was runnable a moment ago
            next: TaskRef::new(next_pid, known_name(&caps[2]), ProcessState::RunnableWaiting),
        })
    }

    fn decode_wakeup(&self, prev: TaskRef, time: Timestamp, payload: &str) -> Result<TraceEvent, DecodeError> {
        let caps = patterns().wakeup.captures(payload).ok_or(DecodeError::Malformed("sched_wakeup"))?;

        let next_pid = Pid(parse_u32("pid", &caps[2])?);
        let next_state = self.last_state.get(&next_pid).copied().unwrap_or(ProcessState::Sleeping);
        Ok(TraceEvent {
            time,
            kind: EventKind::Wakeup,
            prev,
            next: TaskRef::new(next_pid, known_name(&caps[1]), next_state),
        })
    }
}

impl TraceDecoder for AnnotatedDecoder {
    fn name(&self) -> &'static str {
        "annotated"
    }

    fn accepts_header(&self, lines: &[&str]) -> bool {
        lines.first().is_some_and(|line| line.starts_with(ANNOTATED_HEADER_PREFIX))
    }

    fn decode_line(&mut self, line: &str) -> Result<Option<TraceEvent>, DecodeError> {
        if is_comment(line) {
            return Ok(None);
        }

        let (comm, pid, rest) = split_task_prefix(line)?;
        let caps = patterns()
            .prefix
            .captures(rest.trim_end())
            .ok_or(DecodeError::Malformed("event tracer"))?;
        let time = parse_timestamp(&caps[1])?;
        let event_name = &caps[2];
        let payload = &caps[3];

        // The outgoing process is on CPU, so it is reported as runnable
        let prev = TaskRef::new(Pid(pid), known_name(comm), ProcessState::RunnableWaiting);

        match event_name {
            "sched_switch" => self.decode_switch(prev, time, payload).map(Some),
            "sched_wakeup" | "sched_wakeup_new" => self.decode_wakeup(prev, time, payload).map(Some),
            "sched_migrate_task" => Ok(None),
            name if name.starts_with("sched_stat_") => Ok(None),
            name => {
                trace!("Ignoring unknown event {name} at {time}");
                Ok(None)
            }
        }
        .inspect_err(|err| debug!("{err}: {payload}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SWITCH_OUT: &str = "         kworker-123   [000] d..3   100.000050: sched_switch: prev_comm=kworker prev_pid=123 prev_prio=120 prev_state=D ==> next_comm=swapper next_pid=0 next_prio=120";
    const WAKEUP: &str = "          <idle>-0     [000] d.h4   100.000100: sched_wakeup: comm=kworker pid=123 prio=120 success=1 target_cpu=000";

    #[test]
    fn test_header_check() {
        let decoder = AnnotatedDecoder::new();
        assert!(decoder.accepts_header(&["# tracer: nop"]));
        assert!(decoder.accepts_header(&["# tracer: sched_switch"]));
        assert!(!decoder.accepts_header(&["------ FTRACE ------"]));
    }

    #[test]
    fn test_decode_switch() {
        let mut decoder = AnnotatedDecoder::new();
        let event = decoder.decode_line(SWITCH_OUT).unwrap().unwrap();
        assert_eq!(event.kind, EventKind::ContextSwitch);
        assert_eq!(event.time, Timestamp(100_000_050));
        assert_eq!(event.prev.pid, Pid(123));
        assert_eq!(event.prev.name.as_deref(), Some("kworker"));
        assert_eq!(event.prev.state, ProcessState::DiskWait);
        assert_eq!(event.next.pid, Pid(0));
        assert_eq!(event.next.name.as_deref(), Some("swapper"));
        assert_eq!(event.next.state, ProcessState::RunnableWaiting);
    }

    #[test]
    fn test_wakeup_reports_last_switched_out_state() {
        let mut decoder = AnnotatedDecoder::new();

        // Never seen leaving a CPU: assumed asleep
        let event = decoder.decode_line(WAKEUP).unwrap().unwrap();
        assert_eq!(event.kind, EventKind::Wakeup);
        assert_eq!(event.next.state, ProcessState::Sleeping);
        assert_eq!(event.prev.state, ProcessState::RunnableWaiting);

        decoder.decode_line(SWITCH_OUT).unwrap();
        let event = decoder.decode_line(WAKEUP).unwrap().unwrap();
        assert_eq!(event.next.pid, Pid(123));
        assert_eq!(event.next.state, ProcessState::DiskWait);
    }

    #[test]
    fn test_optional_columns() {
        let mut decoder = AnnotatedDecoder::new();

        // No flags column, no success field
        let line = "          <idle>-0     [001]     7.000001: sched_wakeup_new: comm=sh pid=9 prio=120 target_cpu=001";
        let event = decoder.decode_line(line).unwrap().unwrap();
        assert_eq!(event.kind, EventKind::Wakeup);
        assert_eq!(event.next.pid, Pid(9));

        // tgid column
        let line = "              sh-9     (    9) [001] ....     7.000002: sched_switch: prev_comm=sh prev_pid=9 prev_prio=120 prev_state=S ==> next_comm=swapper/1 next_pid=0 next_prio=120";
        let event = decoder.decode_line(line).unwrap().unwrap();
        assert_eq!(event.prev.state, ProcessState::Sleeping);
        assert_eq!(event.next.name.as_deref(), Some("swapper/1"));
    }

    #[test]
    fn test_uninteresting_events_are_skipped() {
        let mut decoder = AnnotatedDecoder::new();
        for event in [
            "sched_migrate_task: comm=sh pid=9 prio=120 orig_cpu=0 dest_cpu=1",
            "sched_stat_runtime: comm=sh pid=9 runtime=1000 [ns] vruntime=5 [ns]",
            "irq_handler_entry: irq=30 name=arch_timer",
        ] {
            let line = format!("          <idle>-0     [000] d..3   100.000010: {event}");
            assert_eq!(decoder.decode_line(&line).unwrap(), None, "{event}");
        }
    }

    #[test]
    fn test_malformed_switch_is_rejected() {
        let line = "          <idle>-0     [000] d..3   100.000010: sched_switch: something else entirely";
        assert!(matches!(
            AnnotatedDecoder::new().decode_line(line),
            Err(DecodeError::Malformed("sched_switch"))
        ));
    }
}
