//! Human-Readable Output
//!
//! Terminal summary of a run: mean time per cell followed by the speedup
//! table grouped by mode.

use crate::report::RunReport;
use scalebench_core::Mode;
use std::collections::BTreeMap;

/// One progress line for a completed cell, e.g. `Parallel at 4 threads = 2.5000s`
pub fn format_cell_line(mode: Mode, threads: u32, mean_secs: f64) -> String {
    format!("{} at {} threads = {:.4}s", mode.label(), threads, mean_secs)
}

/// Format a report for terminal display
pub fn format_human_output(report: &RunReport) -> String {
    let mut output = String::new();

    output.push('\n');
    output.push_str("Scalebench Results\n");
    output.push_str(&"=".repeat(60));
    output.push('\n');
    output.push_str(&format!(
        "engine: {}  start: {}  depth: {}  trials/cell: {}\n\n",
        report.meta.engine, report.meta.start_token, report.meta.depth, report.meta.repeat
    ));

    output.push_str(&format!(
        "  {:<16} {:>8} {:>14}\n",
        "mode", "threads", "mean (s)"
    ));
    output.push_str(&"-".repeat(60));
    output.push('\n');
    for cell in &report.cells {
        output.push_str(&format!(
            "  {:<16} {:>8} {:>14.4}\n",
            cell.mode.label(),
            cell.threads,
            cell.mean_secs
        ));
    }

    let mut by_mode: BTreeMap<Mode, Vec<(u32, f64)>> = BTreeMap::new();
    for entry in &report.speedups {
        by_mode
            .entry(entry.mode)
            .or_default()
            .push((entry.threads, entry.speedup));
    }

    if !by_mode.is_empty() {
        output.push_str("\nSpeedup vs. Sequential\n");
        output.push_str(&"-".repeat(60));
        output.push('\n');
        for (mode, points) in by_mode {
            output.push_str(&format!("  {}\n", mode.label()));
            for (threads, speedup) in points {
                output.push_str(&format!("      {:>3} threads: {:.2}x\n", threads, speedup));
            }
        }
    }

    if let Some(chart) = &report.chart {
        output.push_str(&format!("\nChart: {}\n", chart));
    }

    output.push_str(&format!(
        "Total time: {:.2}s\n",
        report.meta.total_duration_secs
    ));

    output
}
