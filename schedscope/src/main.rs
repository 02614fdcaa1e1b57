//! # schedscope - Main Entry Point
//!
//! Reads one ftrace dump (or the trace section of a bug report), prints the
//! per-process statistics and the parallel-process histogram, and writes
//! the requested artifacts:
//! - `trace.vcd` waveform (unless `--no-vcd`)
//! - SVG charts (`--charts`): time bar, process strips, band chart and
//!   histogram
//! - Chrome trace (`--chrome-trace FILE`) and JSON report (`--json FILE`)

use anyhow::{Context, Result};
use clap::Parser;
use log::{debug, error, info, warn};
use std::borrow::Cow;
use std::fs::{self, File};
use std::io::{self, BufWriter, Write};

use schedscope::analysis::{aggregate, analyze, ParallelHistogram};
use schedscope::charts::{
    draw_histogram_chart, draw_parallel_chart, draw_process_strip, draw_time_bar, SvgCanvas, HISTOGRAM_CHART_H,
    HISTOGRAM_CHART_W, PARALLEL_CHART_H, TIME_BAR_H, TRACE_H,
};
use schedscope::cli::Args;
use schedscope::export::{
    write_histogram_table, write_statistics_table, write_vcd_file, ChromeTraceExporter, Report,
};
use schedscope::section::{extract_trace, process_names};
use schedscope::trace_data::TraceData;

// Exit codes
const EXIT_SUCCESS: i32 = 0;
const EXIT_ERROR: i32 = 1;
const EXIT_USAGE: i32 = 2;

const VCD_FILE: &str = "trace.vcd";
const PARALLEL_CHART_FILE: &str = "par_proc.svg";
const HISTOGRAM_CHART_FILE: &str = "par_proc_hist.svg";
const TIME_BAR_FILE: &str = "ftrace_time.svg";

fn main() {
    env_logger::init();
    std::process::exit(match run() {
        Ok(()) => EXIT_SUCCESS,
        Err(e) => {
            let code = exit_code_for(&e);
            eprintln!("error: {e:#}");
            code
        }
    });
}

fn exit_code_for(err: &anyhow::Error) -> i32 {
    let missing_input = err
        .chain()
        .filter_map(|cause| cause.downcast_ref::<io::Error>())
        .any(|e| e.kind() == io::ErrorKind::NotFound);
    if missing_input {
        EXIT_USAGE
    } else {
        EXIT_ERROR
    }
}

fn run() -> Result<()> {
    let args = Args::parse();

    let bytes = fs::read(&args.input).with_context(|| format!("Failed to read input: {}", args.input.display()))?;
    // Truncated command names and other log sections may hold invalid UTF-8
    let text = String::from_utf8_lossy(&bytes);
    if matches!(text, Cow::Owned(_)) {
        warn!("{} is not valid UTF-8, invalid bytes replaced", args.input.display());
    }

    if !args.quiet {
        println!("schedscope v{}", env!("CARGO_PKG_VERSION"));
        println!("input: {}", args.input.display());
    }

    let Some(lines) = extract_trace(&text, &args.section) else {
        warn!("No \"{}\" section in {}, nothing to analyse", args.section, args.input.display());
        return Ok(());
    };

    let names = process_names(&text);
    let mut data = match analyze(&lines, &names) {
        Ok(data) => data,
        Err(e) if e.is_skippable() => {
            warn!("{e}, skipping trace");
            return Ok(());
        }
        Err(e) => return Err(e).context("Failed to analyse trace"),
    };

    let statistics = aggregate(&mut data);
    let histogram = ParallelHistogram::build(&data.timeline, args.width);
    let rows = histogram.rows();

    let mut stdout = io::stdout().lock();
    write_statistics_table(&mut stdout, &statistics)?;
    writeln!(stdout)?;
    write_histogram_table(&mut stdout, &rows)?;
    drop(stdout);

    if !args.no_vcd || args.charts {
        fs::create_dir_all(&args.out_dir)
            .with_context(|| format!("Failed to create output directory: {}", args.out_dir.display()))?;
    }

    // A missing waveform does not invalidate the statistics
    if !args.no_vcd {
        let path = args.out_path(VCD_FILE);
        match write_vcd_file(&data, &path) {
            Ok(()) if !args.quiet => println!("saved: {}", path.display()),
            Ok(()) => {}
            Err(e) => error!("{e}"),
        }
    }

    if args.charts {
        write_charts(&args, &data, &histogram)?;
    }

    if let Some(path) = &args.chrome_trace {
        let exporter = ChromeTraceExporter::from_trace(&data);
        let file = File::create(path).context("Failed to create Chrome trace file")?;
        exporter.export(BufWriter::new(file)).context("Failed to export Chrome trace")?;
        info!("Exported {} trace events", exporter.event_count());
        if !args.quiet {
            println!("saved: {}", path.display());
        }
    }

    if let Some(path) = &args.json {
        let file = File::create(path).context("Failed to create JSON report file")?;
        Report::new(&statistics, &rows)
            .write_json(BufWriter::new(file))
            .context("Failed to write JSON report")?;
        if !args.quiet {
            println!("saved: {}", path.display());
        }
    }

    Ok(())
}

/// Time bar, one strip per used process, the band chart and the histogram
fn write_charts(args: &Args, data: &TraceData, histogram: &ParallelHistogram) -> Result<()> {
    let width = u32::try_from(args.width).context("Chart width does not fit in 32 bits")?;

    let mut canvas = SvgCanvas::new(width, TIME_BAR_H);
    if draw_time_bar(&mut canvas, data.duration()) {
        canvas.save(&args.out_path(TIME_BAR_FILE))?;
    } else {
        debug!("Trace shorter than a millisecond, no time bar");
    }

    for record in data.processes.used() {
        let mut canvas = SvgCanvas::new(width, TRACE_H);
        draw_process_strip(&mut canvas, data, record.pid);
        canvas.save(&args.out_path(format!("ftrace_{}.svg", record.pid)))?;
    }

    let mut canvas = SvgCanvas::new(width, PARALLEL_CHART_H);
    draw_parallel_chart(&mut canvas, histogram);
    canvas.save(&args.out_path(PARALLEL_CHART_FILE))?;

    let mut canvas = SvgCanvas::new(HISTOGRAM_CHART_W, HISTOGRAM_CHART_H);
    draw_histogram_chart(&mut canvas, histogram);
    canvas.save(&args.out_path(HISTOGRAM_CHART_FILE))?;

    if !args.quiet {
        println!("charts: {}", args.out_dir.display());
    }
    Ok(())
}
