//! Value Change Dump (VCD) waveform output, viewable in GTKWave.
//!
//! One 8-bit bus carries the runnable-or-waiting count, plus one 1-bit wire
//! per used process whose value encodes its state:
//!
//! | state             | level |
//! |-------------------|-------|
//! | sleeping          | `0`   |
//! | disk wait         | `Z`   |
//! | runnable, waiting | `W`   |
//! | running           | `X`   |
//!
//! The idle process only shows `X` (running) or `0`.

use log::info;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::analysis::walk::StateWalker;
use crate::domain::{ExportError, Pid, ProcessState};
use crate::trace_data::TraceData;

/// Width of the RUNWAIT bus
pub const RUNWAIT_BITS: u32 = 8;

const BUS_ID: &str = "RUNWAIT";
const BUS_NAME: &str = "Processes.Running.And.Waiting";
const SCOPE: &str = "mytrace";

/// Signal level of a process in a given state
pub fn level(pid: Pid, state: ProcessState) -> char {
    match state {
        ProcessState::Running => 'X',
        _ if pid.is_idle() => '0',
        ProcessState::RunnableWaiting => 'W',
        ProcessState::DiskWait => 'Z',
        ProcessState::Sleeping => '0',
    }
}

/// `value` as a fixed-width binary string, clamped to what fits
fn to_binary(value: i64, bits: u32) -> String {
    let max = (1_i64 << bits) - 1;
    let value = value.clamp(0, max);
    format!("{value:0width$b}", width = bits as usize)
}

/// Write the waveform for `data` to `out`.
///
/// The output only depends on `data`, so encoding the same trace twice
/// gives identical bytes.
///
/// # Errors
/// Returns an error if writing fails.
pub fn encode<W: Write>(data: &TraceData, mut out: W) -> Result<(), ExportError> {
    // Header
    writeln!(out, "$timescale 1us $end")?;
    writeln!(out, "$scope {SCOPE} $end")?;
    writeln!(out, "$var wire {RUNWAIT_BITS} {BUS_ID} {BUS_NAME} $end")?;
    for record in data.processes.used() {
        if let Some(id) = &record.signal_id {
            writeln!(out, "$var wire 1 {id} {} $end", record.vcd_name())?;
        }
    }
    writeln!(out, "$upscope $end")?;
    writeln!(out, "$enddefinitions $end")?;

    if data.is_empty() {
        return out.flush().map_err(ExportError::from);
    }

    // Initial values
    let start = data.start_time();
    writeln!(out, "#{}", start.as_micros())?;
    writeln!(out, "b{} {BUS_ID}", to_binary(0, RUNWAIT_BITS))?;
    let mut walker = StateWalker::new(data);
    for (pid, state, _) in walker.states() {
        if let Some(id) = signal_id(data, pid) {
            writeln!(out, "b{} {id}", level(pid, state))?;
        }
    }

    // Changes
    let mut last_time = start;
    let mut last_count = 0;
    for step in walker.by_ref() {
        let record = step.record;
        if record.time != last_time {
            last_time = record.time;
            writeln!(out, "#{}", record.time.as_micros())?;
        }
        if record.nr_run_wait != last_count {
            last_count = record.nr_run_wait;
            writeln!(out, "b{} {BUS_ID}", to_binary(last_count, RUNWAIT_BITS))?;
        }
        for transition in step.transitions() {
            let new_level = level(transition.pid, transition.to);
            if new_level == level(transition.pid, transition.from) {
                continue;
            }
            if let Some(id) = signal_id(data, transition.pid) {
                writeln!(out, "b{new_level} {id}")?;
            }
        }
    }

    out.flush()?;
    Ok(())
}

fn signal_id(data: &TraceData, pid: Pid) -> Option<&str> {
    data.processes.get(pid).and_then(|p| p.signal_id.as_deref())
}

/// Write the waveform to a file.
///
/// # Errors
/// Returns [`ExportError::WriteFailed`] naming the file if it cannot be
/// created or written.
pub fn write_vcd_file(data: &TraceData, path: &Path) -> Result<(), ExportError> {
    let failed = |error: String| ExportError::WriteFailed {
        what: "waveform",
        error: format!("{}: {error}", path.display()),
    };

    let file = File::create(path).map_err(|e| failed(e.to_string()))?;
    encode(data, BufWriter::new(file)).map_err(|e| failed(e.to_string()))?;
    info!("Waveform saved as {} (open it with GTKWave)", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::reconstructor::Reconstructor;
    use crate::domain::{EventKind, Timestamp};
    use crate::trace_data::{TaskRef, TraceEvent};

    fn encode_to_string(data: &TraceData) -> String {
        let mut buffer = Vec::new();
        encode(data, &mut buffer).unwrap();
        String::from_utf8(buffer).unwrap()
    }

    fn single_switch() -> TraceData {
        let mut reconstructor = Reconstructor::default();
        reconstructor.apply(TraceEvent {
            time: Timestamp(5_000_000),
            kind: EventKind::ContextSwitch,
            prev: TaskRef::new(Pid(0), None, ProcessState::RunnableWaiting),
            next: TaskRef::new(Pid(1), Some("init".into()), ProcessState::RunnableWaiting),
        });
        reconstructor.finish()
    }

    #[test]
    fn test_levels() {
        assert_eq!(level(Pid(5), ProcessState::Sleeping), '0');
        assert_eq!(level(Pid(5), ProcessState::DiskWait), 'Z');
        assert_eq!(level(Pid(5), ProcessState::RunnableWaiting), 'W');
        assert_eq!(level(Pid(5), ProcessState::Running), 'X');
        assert_eq!(level(Pid::IDLE, ProcessState::RunnableWaiting), '0');
        assert_eq!(level(Pid::IDLE, ProcessState::DiskWait), '0');
        assert_eq!(level(Pid::IDLE, ProcessState::Running), 'X');
    }

    #[test]
    fn test_to_binary_clamps() {
        assert_eq!(to_binary(0, 8), "00000000");
        assert_eq!(to_binary(5, 8), "00000101");
        assert_eq!(to_binary(300, 8), "11111111");
        assert_eq!(to_binary(-2, 8), "00000000");
    }

    #[test]
    fn test_single_switch_waveform() {
        let expected = "\
$timescale 1us $end
$scope mytrace $end
$var wire 8 RUNWAIT Processes.Running.And.Waiting $end
$var wire 1 A SLEEP $end
$var wire 1 B 1_init $end
$upscope $end
$enddefinitions $end
#5000000
b00000000 RUNWAIT
bX A
bW B
b00000001 RUNWAIT
b0 A
bX B
";
        assert_eq!(encode_to_string(&single_switch()), expected);
    }

    #[test]
    fn test_encoding_is_deterministic() {
        let data = single_switch();
        assert_eq!(encode_to_string(&data), encode_to_string(&data));
    }

    #[test]
    fn test_write_failure_names_file() {
        let err = write_vcd_file(&single_switch(), Path::new("/nonexistent-dir/trace.vcd")).unwrap_err();
        assert!(matches!(err, ExportError::WriteFailed { what: "waveform", .. }));
        assert!(err.to_string().contains("/nonexistent-dir/trace.vcd"));
    }
}
