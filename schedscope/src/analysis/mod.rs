//! Analysis of decoded scheduler traces
//!
//! - [`reconstructor`]: events → Timeline + process table
//! - [`walk`]: replay of the finished Timeline as state transitions
//! - [`statistics`]: per-process run/wait/disk-wait accounting
//! - [`histogram`]: time spent with N processes running or waiting
//!
//! [`analyze`] ties the decoder and the reconstructor together for one
//! trace section.

pub mod histogram;
pub mod reconstructor;
pub mod statistics;
pub mod walk;

pub use histogram::{HistogramRow, ParallelHistogram, MAX_PARALLEL, TRACE_W};
pub use reconstructor::Reconstructor;
pub use statistics::{aggregate, ProcessStats, Statistics};
pub use walk::{StateWalker, Step, Transition};

use log::{debug, info};

use crate::decode::select_decoder;
use crate::domain::DecodeError;
use crate::process_table::NameResolver;
use crate::trace_data::TraceData;

/// Decode and reconstruct one trace section.
///
/// # Errors
/// - [`DecodeError::UnsupportedSection`] / [`DecodeError::EmptyBuffer`] when
///   no grammar applies
/// - [`DecodeError::Desync`] when a line breaks the committed grammar; the
///   partial result is discarded
/// - [`DecodeError::NoSchedulerEvents`] when nothing was modelled
pub fn analyze(lines: &[&str], resolver: &dyn NameResolver) -> Result<TraceData, DecodeError> {
    let mut decoder = select_decoder(lines)?;
    let mut reconstructor = Reconstructor::new(resolver);

    for (index, line) in lines.iter().enumerate() {
        let event = decoder.decode_line(line).map_err(|err| {
            debug!("{} decoder failed: {err}", decoder.name());
            DecodeError::Desync { line_no: index + 1, line: (*line).to_string() }
        })?;
        if let Some(event) = event {
            reconstructor.apply(event);
        }
    }

    if reconstructor.is_empty() {
        return Err(DecodeError::NoSchedulerEvents);
    }

    let data = reconstructor.finish();
    info!(
        "Reconstructed {} records for {} processes over {}",
        data.timeline.len(),
        data.processes.used().count(),
        data.duration()
    );
    Ok(data)
}
