//! Decoder for the fixed-column `sched_switch` tracer output
//!
//! ```text
//!           <idle>-0     [000]   100.000010:      0:140:R ==> [000]   123:120:R kworker
//!           <idle>-0     [000]   100.000000:      0:140:R   +   [000]   123:120:S kworker
//! ```
//!
//! `==>` marks a context switch, `+` a wakeup. The pid printed inside the
//! payload for the outgoing side duplicates the prefix pid and is ignored.

use regex::Regex;
use std::sync::OnceLock;

use super::{is_comment, known_name, parse_timestamp, parse_u32, split_task_prefix, TraceDecoder};
use crate::domain::{DecodeError, EventKind, Pid, ProcessState};
use crate::trace_data::{TaskRef, TraceEvent};

/// First line of a section written by the `sched_switch` tracer
pub const LEGACY_HEADER: &str = "# tracer: sched_switch";

fn payload_regex() -> &'static Regex {
    static PAYLOAD: OnceLock<Regex> = OnceLock::new();
    PAYLOAD.get_or_init(|| {
        // Literal pattern, checked by the unit tests below
        Regex::new(
            r"^\s+\S+\s+([0-9.]+):\s+\d+:\d+:(\S)\s(  \+|==>)\s+\S+\s+(\d+):\d+:(\S) ?(.*)$",
        )
        .unwrap()
    })
}

#[derive(Debug, Default)]
pub struct LegacyDecoder;

impl LegacyDecoder {
    pub fn new() -> Self {
        Self
    }
}

impl TraceDecoder for LegacyDecoder {
    fn name(&self) -> &'static str {
        "legacy"
    }

    fn accepts_header(&self, lines: &[&str]) -> bool {
        lines.first().is_some_and(|line| line.trim_end() == LEGACY_HEADER)
    }

    fn decode_line(&mut self, line: &str) -> Result<Option<TraceEvent>, DecodeError> {
        if is_comment(line) {
            return Ok(None);
        }

        let (comm, pid, rest) = split_task_prefix(line)?;
        let caps = payload_regex()
            .captures(rest.trim_end())
            .ok_or(DecodeError::Malformed("sched_switch tracer"))?;

        let time = parse_timestamp(&caps[1])?;
        let prev_code = caps[2].chars().next().unwrap_or('S');
        let kind = if &caps[3] == "==>" { EventKind::ContextSwitch } else { EventKind::Wakeup };
        let next_pid = parse_u32("pid", &caps[4])?;
        let next_code = caps[5].chars().next().unwrap_or('S');

        Ok(Some(TraceEvent {
            time,
            kind,
            prev: TaskRef::new(Pid(pid), known_name(comm), ProcessState::from_code(prev_code)),
            next: TaskRef::new(Pid(next_pid), known_name(&caps[6]), ProcessState::from_code(next_code)),
        }))
    }
}
