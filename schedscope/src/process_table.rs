//! Per-process bookkeeping for one trace analysis.
//!
//! Records are created lazily the first time a pid shows up in a trace line
//! and live until the analysis run ends. Display names come from three
//! places, in priority order: an external [`NameResolver`] (the bug
//! report's known-process registry), the first command name printed by the
//! tracer, and finally the bare pid.

use serde::Serialize;
use std::collections::BTreeMap;

use crate::domain::{Duration, Pid, ProcessState, Timestamp};

/// Display name of the idle process
pub const IDLE_NAME: &str = "SLEEP";

/// Lookup seam for process names known from outside the trace
///
/// Implemented by the surrounding application (e.g. backed by `ps` output
/// from the same bug report). The returned string is used verbatim as the
/// display name.
pub trait NameResolver {
    fn resolve(&self, pid: Pid) -> Option<String>;
}

/// Resolver that knows nothing; names come from the trace only
#[derive(Debug, Default, Clone, Copy)]
pub struct NoResolver;

impl NameResolver for NoResolver {
    fn resolve(&self, _pid: Pid) -> Option<String> {
        None
    }
}

impl NameResolver for BTreeMap<Pid, String> {
    fn resolve(&self, pid: Pid) -> Option<String> {
        self.get(&pid).cloned()
    }
}

/// Time accumulated per state bucket
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StateTimes {
    pub run: Duration,
    pub wait: Duration,
    pub wait_count: u32,
    pub wait_max: Duration,
    pub disk: Duration,
    pub disk_count: u32,
    pub disk_max: Duration,
}

impl StateTimes {
    /// Credit `elapsed` to the bucket of `state`
    pub fn credit(&mut self, state: ProcessState, elapsed: Duration) {
        match state {
            ProcessState::Running => self.run += elapsed,
            ProcessState::RunnableWaiting => {
                self.wait += elapsed;
                self.wait_count += 1;
                self.wait_max = self.wait_max.max(elapsed);
            }
            ProcessState::DiskWait => {
                self.disk += elapsed;
                self.disk_count += 1;
                self.disk_max = self.disk_max.max(elapsed);
            }
            ProcessState::Sleeping => {}
        }
    }
}

#[derive(Debug, Clone)]
pub struct ProcessRecord {
    pub pid: Pid,
    pub name: Option<String>,
    /// Current state while the trace is being reconstructed
    pub state: ProcessState,
    /// Time of the last state change, filled in by the statistics pass
    pub last_time: Timestamp,
    pub times: StateTimes,
    /// Set after the first transition; the inference only gets one chance
    pub init_state_inferred: bool,
    /// Best guess of the state before the first observed event
    pub init_state: ProcessState,
    /// Number of trace records this process appears in
    pub used: u32,
    /// Waveform signal identifier, assigned once the trace is complete
    pub signal_id: Option<String>,
}

impl ProcessRecord {
    pub fn new(pid: Pid, name: Option<String>) -> Self {
        Self {
            pid,
            name,
            state: ProcessState::Sleeping,
            last_time: Timestamp::default(),
            times: StateTimes::default(),
            init_state_inferred: false,
            init_state: ProcessState::Sleeping,
            used: 0,
            signal_id: None,
        }
    }

    pub fn is_used(&self) -> bool {
        self.used > 0
    }

    pub fn display_name(&self) -> String {
        self.name.clone().unwrap_or_else(|| self.pid.to_string())
    }

    /// Name restricted to the characters waveform viewers accept
    pub fn vcd_name(&self) -> String {
        match &self.name {
            Some(name) => sanitize_vcd_name(name),
            None => self.pid.to_string(),
        }
    }
}

/// Replace anything outside `[A-Za-z0-9_/\]` with an underscore
pub fn sanitize_vcd_name(name: &str) -> String {
    name.chars()
        .map(|c| if c.is_ascii_alphanumeric() || matches!(c, '_' | '/' | '\\') { c } else { '_' })
        .collect()
}

/// Build the `index`-th signal identifier: base-26 letters, least
/// significant letter first (`A`..`Z`, `AB`, `BB`, ...).
pub fn signal_id(index: usize) -> String {
    let mut id = String::new();
    let mut rest = index;
    loop {
        // rest % 26 always fits in a u8
        #[allow(clippy::cast_possible_truncation)]
        id.push(char::from(b'A' + (rest % 26) as u8));
        rest /= 26;
        if rest == 0 {
            break;
        }
    }
    id
}

/// Mapping from pid to its record, iterated in pid order
#[derive(Debug, Clone)]
pub struct ProcessTable {
    records: BTreeMap<Pid, ProcessRecord>,
}

impl Default for ProcessTable {
    fn default() -> Self {
        Self::new()
    }
}

impl ProcessTable {
    /// Create a table with the idle process pre-registered
    pub fn new() -> Self {
        let mut records = BTreeMap::new();
        records.insert(Pid::IDLE, ProcessRecord::new(Pid::IDLE, Some(IDLE_NAME.to_string())));
        Self { records }
    }

    /// Fetch the record for `pid`, creating it on first sighting
    pub fn get_or_insert(&mut self, pid: Pid, resolver: &dyn NameResolver) -> &mut ProcessRecord {
        self.records.entry(pid).or_insert_with(|| ProcessRecord::new(pid, resolver.resolve(pid)))
    }

    pub fn get(&self, pid: Pid) -> Option<&ProcessRecord> {
        self.records.get(&pid)
    }

    /// Remember the command name printed by the tracer, unless a name is
    /// already known
    pub fn set_name(&mut self, pid: Pid, comm: &str, resolver: &dyn NameResolver) {
        let record = self.get_or_insert(pid, resolver);
        if record.name.is_none() {
            record.name = Some(format!("{pid}-{comm}"));
        }
    }

    /// Number of records, including processes never used by an event
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ProcessRecord> {
        self.records.values()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut ProcessRecord> {
        self.records.values_mut()
    }

    /// Processes that appear in at least one record, in pid order
    pub fn used(&self) -> impl Iterator<Item = &ProcessRecord> {
        self.records.values().filter(|r| r.is_used())
    }

    /// Used processes, busiest first: run time, then wait time, then disk
    /// time (all descending), ties broken by pid.
    pub fn used_sorted(&self) -> Vec<&ProcessRecord> {
        let mut list: Vec<&ProcessRecord> = self.used().collect();
        list.sort_by(|a, b| {
            b.times
                .run
                .cmp(&a.times.run)
                .then(b.times.wait.cmp(&a.times.wait))
                .then(b.times.disk.cmp(&a.times.disk))
                .then(a.pid.cmp(&b.pid))
        });
        list
    }

    /// Give every used process its waveform identifier, in pid order
    pub(crate) fn assign_signal_ids(&mut self) {
        let mut next = 0;
        for record in self.records.values_mut().filter(|r| r.is_used()) {
            if record.signal_id.is_none() {
                record.signal_id = Some(signal_id(next));
            }
            next += 1;
        }
    }
}
