//! Bug report section extraction
//!
//! Android bug reports are one big text file split into sections by header
//! lines such as `------ FTRACE (/sys/kernel/debug/tracing/trace) ------`.
//! A section's name is the text between the dashes; the part in
//! parentheses is the command that produced it.

use log::debug;
use std::collections::BTreeMap;

use crate::domain::Pid;

/// Section holding the scheduler trace
pub const FTRACE_SECTION: &str = "FTRACE";

/// Section listing `pid name ...` for every process alive at dump time
pub const PROCESS_TIMES_SECTION: &str = "PROCESS TIMES";

const HEADER_START: &str = "------ ";
const HEADER_END: &str = " ------";

/// One named section of a bug report
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Section<'a> {
    pub name: &'a str,
    pub lines: Vec<&'a str>,
}

impl Section<'_> {
    /// `FTRACE` matches both `FTRACE` and `FTRACE (/sys/...)`
    pub fn is(&self, wanted: &str) -> bool {
        self.name == wanted
            || self.name.strip_prefix(wanted).is_some_and(|rest| rest.starts_with(" ("))
    }
}

/// Name of a section header line, if it is one
fn header_name(line: &str) -> Option<&str> {
    let rest = line.strip_prefix(HEADER_START)?;
    let end = rest.find(HEADER_END)?;
    Some(&rest[..end])
}

/// Split `text` into sections. Lines before the first header are dropped.
pub fn split_sections(text: &str) -> Vec<Section<'_>> {
    let mut sections: Vec<Section> = Vec::new();
    for line in text.lines() {
        if let Some(name) = header_name(line) {
            sections.push(Section { name, lines: Vec::new() });
        } else if let Some(current) = sections.last_mut() {
            current.lines.push(line);
        }
    }
    sections
}

/// Lines of the trace to analyse.
///
/// Text without any section header is taken to be a bare trace. Otherwise
/// the first section named `wanted` is returned, or `None` if there is
/// none.
pub fn extract_trace<'a>(text: &'a str, wanted: &str) -> Option<Vec<&'a str>> {
    let sections = split_sections(text);
    if sections.is_empty() {
        return Some(text.lines().collect());
    }
    sections.into_iter().find(|s| s.is(wanted)).map(|s| s.lines)
}

/// Known process names from the bug report's process list.
///
/// Only the first two columns (`pid name`) are read; lines that do not
/// start with a pid are ignored. Names are shaped like the ones taken from
/// the trace (`123-kworker/0:1`). Empty when the section is missing.
pub fn process_names(text: &str) -> BTreeMap<Pid, String> {
    let mut names = BTreeMap::new();
    let Some(section) = split_sections(text).into_iter().find(|s| s.is(PROCESS_TIMES_SECTION)) else {
        return names;
    };

    for line in section.lines {
        let mut columns = line.split_whitespace();
        match (columns.next().and_then(|c| c.parse::<u32>().ok()), columns.next()) {
            (Some(pid), Some(name)) => {
                names.insert(Pid(pid), format!("{pid}-{name}"));
            }
            _ => debug!("Skipping process list line {line:?}"),
        }
    }
    names
}
