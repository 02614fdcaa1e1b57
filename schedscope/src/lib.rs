//! # schedscope - Scheduler Trace Analyzer
//!
//! schedscope reads the text output of the Linux kernel's function tracer
//! (ftrace) recording scheduler events, reconstructs the state of every
//! process over time and reports how long each one spent running, waiting
//! for a CPU and waiting for disk IO.
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │          ftrace dump (bare, or a section of a bug report)       │
//! └───────────────────────┬─────────────────────────────────────────┘
//!                         │ lines
//!                         ▼
//! ┌─────────────────────────────────────────────────────────────────┐
//! │  Decoder (legacy sched_switch / annotated sched_switch+wakeup)  │
//! └───────────────────────┬─────────────────────────────────────────┘
//!                         │ TraceEvent
//!                         ▼
//! ┌─────────────────────────────────────────────────────────────────┐
//! │   Reconstructor ──▶ Timeline (records + run/wait snapshots)     │
//! │         │                                                       │
//! │         └────────▶ ProcessTable (names, initial states)         │
//! └───────────────────────┬─────────────────────────────────────────┘
//!                         │ TraceData
//!          ┌──────────────┼──────────────┬──────────────┐
//!          ▼              ▼              ▼              ▼
//!    ┌──────────┐   ┌──────────┐   ┌──────────┐   ┌──────────┐
//!    │Statistics│   │Histogram │   │   VCD    │   │  Charts  │
//!    └──────────┘   └──────────┘   └──────────┘   └──────────┘
//! ```
//!
//! ## Module Structure
//!
//! - [`decode`]: line grammars and grammar selection from the section header
//! - [`process_table`]: per-process records, names and waveform ids
//! - [`trace_data`]: events, records and the Timeline
//! - [`analysis`]: reconstruction, statistics and the parallel-process
//!   histogram
//! - [`export`]: VCD waveform, Chrome trace, JSON report and text tables
//! - [`charts`]: time bar, process strips, band chart and histogram drawn on a
//!   [`charts::Canvas`]
//! - [`section`]: bug report section extraction
//! - [`cli`]: command-line argument parsing
//! - [`domain`]: core types (Pid, Timestamp, Duration, `ProcessState`) and
//!   errors
//!
//! ## Typical Usage
//!
//! ```bash
//! # Statistics tables plus trace.vcd in the current directory
//! schedscope trace.txt
//!
//! # Analyse the FTRACE section of a bug report and draw charts
//! schedscope bugreport.txt --charts --out-dir report/
//! ```

pub mod analysis;
pub mod charts;
pub mod cli;
pub mod decode;
pub mod domain;
pub mod export;
pub mod process_table;
pub mod section;
pub mod trace_data;
