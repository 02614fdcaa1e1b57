//! # Line Decoding
//!
//! Turns raw trace text into [`TraceEvent`]s. Two grammars are supported:
//!
//! - [`LegacyDecoder`]: the fixed-column output of the old `sched_switch`
//!   tracer (`0:140:R ==> [000] 123:120:R kworker`)
//! - [`AnnotatedDecoder`]: event-tagged lines (`sched_switch: prev_comm=...`,
//!   `sched_wakeup: comm=...`) as printed by the modern event tracer
//!
//! Decoders are tried in a fixed order and the first one whose header check
//! passes is committed for the whole section. After that, a line that does
//! not match the grammar aborts the trace with [`DecodeError::Desync`].
//! Lines for events the engine does not model are skipped, not errors.

pub mod annotated;
pub mod legacy;

pub use annotated::AnnotatedDecoder;
pub use legacy::LegacyDecoder;

use log::info;

use crate::domain::{DecodeError, Timestamp};
use crate::trace_data::TraceEvent;

/// Command name printed by the tracer when it does not know the name
pub const NO_PROC_NAME: &str = "<...>";

/// Sections with this many lines or fewer only hold the header
const MIN_SECTION_LINES: usize = 4;

/// One supported trace grammar
pub trait TraceDecoder {
    /// Short name used in log messages
    fn name(&self) -> &'static str;

    /// Whether this grammar can handle a section starting with `lines`
    fn accepts_header(&self, lines: &[&str]) -> bool;

    /// Decode one data line.
    ///
    /// `Ok(None)` means the line is valid but carries nothing to model
    /// (comment, blank line, uninteresting event).
    ///
    /// # Errors
    /// Returns an error if the line does not follow the grammar.
    fn decode_line(&mut self, line: &str) -> Result<Option<TraceEvent>, DecodeError>;
}

/// Fresh candidate decoders, in preference order
#[must_use]
pub fn candidates() -> Vec<Box<dyn TraceDecoder>> {
    vec![Box::new(LegacyDecoder::new()), Box::new(AnnotatedDecoder::new())]
}

/// Pick the decoder for a section.
///
/// # Errors
/// - [`DecodeError::UnsupportedSection`] if no grammar accepts the header
/// - [`DecodeError::EmptyBuffer`] if the section has no room for data lines
pub fn select_decoder(lines: &[&str]) -> Result<Box<dyn TraceDecoder>, DecodeError> {
    let decoder = candidates()
        .into_iter()
        .find(|decoder| decoder.accepts_header(lines))
        .ok_or_else(|| {
            DecodeError::UnsupportedSection(lines.first().copied().unwrap_or_default().to_string())
        })?;

    if lines.len() <= MIN_SECTION_LINES {
        return Err(DecodeError::EmptyBuffer);
    }

    info!("Decoding trace with the {} grammar", decoder.name());
    Ok(decoder)
}

/// Comments, blank lines and lines starting with a control character
pub(crate) fn is_comment(line: &str) -> bool {
    match line.chars().next() {
        None | Some('#') => true,
        Some(c) => c < ' ',
    }
}

/// Map the `<...>` placeholder to "unknown"
pub(crate) fn known_name(name: &str) -> Option<String> {
    let name = name.trim();
    if name == NO_PROC_NAME || name.is_empty() {
        None
    } else {
        Some(name.to_string())
    }
}

/// Split the common `<comm>-<pid>` prefix.
///
/// The command name is right-aligned in the first 16 columns, so it may
/// itself contain dashes and spaces. Returns `(comm, pid, rest)`.
///
/// Names with replaced invalid bytes no longer fill exactly 16 columns;
/// for those the first `-<digits>` followed by whitespace ends the name.
pub(crate) fn split_task_prefix(line: &str) -> Result<(&str, u32, &str), DecodeError> {
    let split = match line.get(16..) {
        Some(rest) if rest.starts_with('-') => Some(16),
        _ => find_pid_separator(line),
    };
    let at = split.ok_or(DecodeError::Malformed("task prefix"))?;

    let rest = &line[at + 1..];
    let digits = rest.find(|c: char| !c.is_ascii_digit()).unwrap_or(rest.len());
    let pid = parse_u32("pid", &rest[..digits])?;
    Ok((line[..at].trim_start(), pid, &rest[digits..]))
}

fn find_pid_separator(line: &str) -> Option<usize> {
    line.match_indices('-').map(|(at, _)| at).find(|&at| {
        let rest = &line[at + 1..];
        let digits = rest.find(|c: char| !c.is_ascii_digit()).unwrap_or(rest.len());
        at > 0 && digits > 0 && rest[digits..].starts_with(char::is_whitespace)
    })
}

pub(crate) fn parse_u32(field: &'static str, value: &str) -> Result<u32, DecodeError> {
    value
        .parse()
        .map_err(|_| DecodeError::InvalidField { field, value: value.to_string() })
}

/// Parse `seconds.fraction` into microseconds.
///
/// Integer arithmetic only: the fraction is padded or truncated to six
/// digits, so nanosecond-resolution timestamps are accepted too.
pub(crate) fn parse_timestamp(value: &str) -> Result<Timestamp, DecodeError> {
    let invalid = || DecodeError::InvalidField { field: "timestamp", value: value.to_string() };

    let (secs, frac) = value.split_once('.').unwrap_or((value, ""));
    if secs.is_empty() || !frac.chars().all(|c| c.is_ascii_digit()) {
        return Err(invalid());
    }
    let secs: u64 = secs.parse().map_err(|_| invalid())?;

    let mut micros: u64 = 0;
    for i in 0..6 {
        let digit = frac.as_bytes().get(i).map_or(0, |b| u64::from(b - b'0'));
        micros = micros * 10 + digit;
    }

    secs.checked_mul(1_000_000).and_then(|us| us.checked_add(micros)).map(Timestamp).ok_or_else(invalid)
}
