//! Trace export functionality
//!
//! - [`vcd`]: waveform file for GTKWave
//! - [`chrome_trace`]: Chrome Trace Event Format for Perfetto / chrome://tracing
//! - [`report`]: JSON report and plain-text tables

pub mod chrome_trace;
pub mod report;
pub mod vcd;

pub use chrome_trace::ChromeTraceExporter;
pub use report::{write_histogram_table, write_statistics_table, Report};
pub use vcd::{write_vcd_file, RUNWAIT_BITS};
