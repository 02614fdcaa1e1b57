//! Statistics report: JSON for external report builders and plain-text
//! tables for the terminal.

use serde::Serialize;
use std::io::Write;

use crate::analysis::{HistogramRow, ProcessStats, Statistics};
use crate::domain::{Duration, ExportError};

/// Everything a report page needs about one trace
#[derive(Debug, Serialize)]
pub struct Report<'a> {
    pub duration_us: u64,
    pub processes: &'a [ProcessStats],
    pub histogram: &'a [HistogramRow],
}

impl<'a> Report<'a> {
    pub fn new(statistics: &'a Statistics, histogram: &'a [HistogramRow]) -> Self {
        Self { duration_us: statistics.duration_us, processes: &statistics.processes, histogram }
    }

    /// # Errors
    /// Returns an error if serialization or the writer fails.
    pub fn write_json<W: Write>(&self, writer: W) -> Result<(), ExportError> {
        serde_json::to_writer_pretty(writer, self)?;
        Ok(())
    }
}

/// Print the per-process table, busiest process first
///
/// # Errors
/// Returns an error if the writer fails.
pub fn write_statistics_table<W: Write>(mut out: W, statistics: &Statistics) -> Result<(), ExportError> {
    writeln!(out, "Process runtime statistics (total trace duration: {})", Duration(statistics.duration_us))?;
    writeln!(
        out,
        "{:<28} {:>10} {:>6} {:>10} {:>6} {:>8} {:>8} {:>9} {:>10} {:>6} {:>8} {:>8} {:>11}",
        "Name", "Run (us)", "%", "Wait (us)", "%", "Avg", "Max", "Wait/Run", "IOWait", "%", "Avg", "Max", "IOWait/Run"
    )?;

    for row in &statistics.processes {
        writeln!(
            out,
            "{:<28} {:>10} {:>6.1} {:>10} {:>6.1} {:>8} {:>8} {:>9.2} {:>10} {:>6.1} {:>8} {:>8} {:>11.2}",
            truncate(&row.name, 28),
            row.run_us,
            row.run_percentage,
            row.wait.total_us,
            row.wait.percentage,
            row.wait.avg_us,
            row.wait.max_us,
            row.wait.per_run,
            row.disk_wait.total_us,
            row.disk_wait.percentage,
            row.disk_wait.avg_us,
            row.disk_wait.max_us,
            row.disk_wait.per_run,
        )?;
    }

    // The idle process is listed but not counted
    let (mut total_run, mut total_wait, mut total_disk) = (0, 0, 0);
    for row in statistics.interesting() {
        total_run += row.run_us;
        total_wait += row.wait.total_us;
        total_disk += row.disk_wait.total_us;
    }

    writeln!(
        out,
        "{:<28} {:>10} {:>6} {:>10} {:>6} {:>8} {:>8} {:>9} {:>10}",
        "TOTAL", total_run, "", total_wait, "", "", "", "", total_disk
    )?;
    Ok(())
}

/// Print the parallel-process histogram
///
/// # Errors
/// Returns an error if the writer fails.
pub fn write_histogram_table<W: Write>(mut out: W, rows: &[HistogramRow]) -> Result<(), ExportError> {
    writeln!(out, "Processes running or waiting at the same time:")?;
    writeln!(out, "{:>28} {:>14} {:>8}", "Number of parallel processes", "Run time (us)", "%")?;
    for row in rows {
        writeln!(out, "{:>28} {:>14} {:>8.1}", row.label, row.total_us, row.percentage)?;
    }
    Ok(())
}

fn truncate(name: &str, width: usize) -> String {
    if name.chars().count() <= width {
        name.to_string()
    } else {
        let mut short: String = name.chars().take(width - 1).collect();
        short.push('…');
        short
    }
}
