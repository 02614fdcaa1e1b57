//! CLI argument definitions

use clap::Parser;
use std::path::{Path, PathBuf};

use crate::analysis::TRACE_W;
use crate::section::FTRACE_SECTION;

#[derive(Parser, Debug)]
#[command(
    name = "schedscope",
    version,
    about = "Per-process run, wait and IO-wait statistics from ftrace scheduler traces",
    after_help = "\
EXAMPLES:
    schedscope trace.txt                         Tables on stdout, trace.vcd in .
    schedscope bugreport.txt --charts -o out     Also draw SVG charts into out/
    schedscope trace.txt --json report.json      Machine-readable statistics"
)]
pub struct Args {
    /// Bare ftrace dump or a whole bug report containing one
    #[arg(value_name = "INPUT")]
    pub input: PathBuf,

    /// Directory for the waveform and the charts
    #[arg(short, long, value_name = "DIR", default_value = ".")]
    pub out_dir: PathBuf,

    /// Bug report section holding the trace
    #[arg(long, value_name = "NAME", default_value = FTRACE_SECTION)]
    pub section: String,

    /// Skip the VCD waveform
    #[arg(long)]
    pub no_vcd: bool,

    /// Draw per-process strips, the band chart and the histogram as SVG
    #[arg(long)]
    pub charts: bool,

    /// Export a Chrome trace (Perfetto, chrome://tracing)
    #[arg(long, value_name = "FILE")]
    pub chrome_trace: Option<PathBuf>,

    /// Write the statistics and the histogram as JSON
    #[arg(long, value_name = "FILE")]
    pub json: Option<PathBuf>,

    /// Width in pixels of the process strips and the band chart
    #[arg(long, value_name = "N", default_value_t = TRACE_W, value_parser = parse_width)]
    pub width: usize,

    /// Suppress non-essential output
    #[arg(short, long)]
    pub quiet: bool,
}

impl Args {
    /// Path of an artifact inside the output directory
    pub fn out_path(&self, file_name: impl AsRef<Path>) -> PathBuf {
        self.out_dir.join(file_name)
    }
}

fn parse_width(value: &str) -> Result<usize, String> {
    match value.parse::<usize>() {
        Ok(0) => Err("width must be at least 1 pixel".to_string()),
        Ok(width) => Ok(width),
        Err(e) => Err(e.to_string()),
    }
}
