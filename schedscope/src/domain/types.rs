//! Domain types providing compile-time safety and self-documentation
//!
//! These newtype wrappers keep process ids, absolute trace times and
//! elapsed durations from being mixed up, and replace the single-character
//! scheduler state codes with an explicit enum.

use serde::Serialize;
use std::fmt;
use std::ops::Sub;

/// Process ID as reported by the kernel tracer
///
/// Pid 0 is the per-CPU idle task (`swapper`/`<idle>`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct Pid(pub u32);

impl Pid {
    /// The idle process, never counted as runnable-or-waiting
    pub const IDLE: Pid = Pid(0);

    #[must_use]
    pub fn is_idle(self) -> bool {
        self == Self::IDLE
    }
}

impl fmt::Display for Pid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for Pid {
    fn from(pid: u32) -> Self {
        Pid(pid)
    }
}

/// Timestamp in microseconds
///
/// Absolute time as printed by the tracer (seconds since boot), converted
/// to microseconds. Only differences between two timestamps of the same
/// trace are meaningful.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize)]
pub struct Timestamp(pub u64);

impl Timestamp {
    /// Convert to seconds (f64)
    #[allow(clippy::cast_precision_loss)]
    pub fn as_seconds(self) -> f64 {
        self.0 as f64 / 1_000_000.0
    }

    pub fn as_micros(self) -> u64 {
        self.0
    }
}

impl Sub for Timestamp {
    type Output = Duration;

    /// Elapsed time between two timestamps, saturating at zero
    fn sub(self, earlier: Timestamp) -> Duration {
        Duration(self.0.saturating_sub(earlier.0))
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:06}", self.0 / 1_000_000, self.0 % 1_000_000)
    }
}

/// Duration in microseconds
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize)]
pub struct Duration(pub u64);

impl Duration {
    pub const ZERO: Duration = Duration(0);

    pub fn as_micros(self) -> u64 {
        self.0
    }

    /// Convert to milliseconds (f64)
    #[allow(clippy::cast_precision_loss)]
    pub fn as_millis(self) -> f64 {
        self.0 as f64 / 1_000.0
    }

    /// Convert to seconds (f64)
    #[allow(clippy::cast_precision_loss)]
    pub fn as_seconds(self) -> f64 {
        self.0 as f64 / 1_000_000.0
    }

    /// Share of `total` in percent, 0.0 for an empty total
    #[allow(clippy::cast_precision_loss)]
    pub fn percent_of(self, total: Duration) -> f64 {
        if total.0 == 0 {
            0.0
        } else {
            self.0 as f64 * 100.0 / total.0 as f64
        }
    }
}

impl std::ops::AddAssign for Duration {
    fn add_assign(&mut self, rhs: Duration) {
        self.0 += rhs.0;
    }
}

impl std::iter::Sum for Duration {
    fn sum<I: Iterator<Item = Duration>>(iter: I) -> Self {
        Duration(iter.map(|d| d.0).sum())
    }
}

impl fmt::Display for Duration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let ms = self.as_millis();
        if ms >= 1000.0 {
            write!(f, "{:.2}s", self.as_seconds())
        } else {
            write!(f, "{ms:.2}ms")
        }
    }
}

/// Scheduler state of a process
///
/// Ordered from "least interesting" to "on CPU". `Sleeping` and
/// `DiskWait` form the inactive bucket, `RunnableWaiting` and `Running`
/// the active (runnable-or-waiting) bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcessState {
    #[default]
    Sleeping,
    DiskWait,
    RunnableWaiting,
    Running,
}

impl ProcessState {
    /// Map a tracer state character to a state.
    ///
    /// This is the only place raw state codes are interpreted: `R` is
    /// runnable but not on CPU, `D` is uninterruptible (I/O) sleep, and
    /// every other code is treated as an ordinary sleep.
    #[must_use]
    pub fn from_code(code: char) -> Self {
        match code {
            'R' => ProcessState::RunnableWaiting,
            'D' => ProcessState::DiskWait,
            _ => ProcessState::Sleeping,
        }
    }

    /// True for states counted as runnable-or-waiting
    #[must_use]
    pub fn is_active(self) -> bool {
        matches!(self, ProcessState::RunnableWaiting | ProcessState::Running)
    }

    /// Change of the runnable-or-waiting count when moving to `next`
    #[must_use]
    pub fn count_delta(self, next: ProcessState) -> i32 {
        match (self.is_active(), next.is_active()) {
            (false, true) => 1,
            (true, false) => -1,
            _ => 0,
        }
    }
}

impl fmt::Display for ProcessState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ProcessState::Sleeping => "SLEEPING",
            ProcessState::DiskWait => "DISK_WAIT",
            ProcessState::RunnableWaiting => "RUNNABLE_WAITING",
            ProcessState::Running => "RUNNING",
        };
        f.write_str(s)
    }
}

/// Kind of scheduler event carried by a trace line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    /// CPU handed from the outgoing to the incoming process
    ContextSwitch,
    /// Incoming process became runnable; the outgoing one keeps running
    Wakeup,
}

impl EventKind {
    /// State the incoming process moves into
    #[must_use]
    pub fn incoming_state(self) -> ProcessState {
        match self {
            EventKind::ContextSwitch => ProcessState::Running,
            EventKind::Wakeup => ProcessState::RunnableWaiting,
        }
    }
}
