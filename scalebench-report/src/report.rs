//! Report Data Structures

use chrono::{DateTime, Utc};
use scalebench_core::{ConfigSpace, Mode};
use scalebench_stats::{ResultTable, SpeedupTable};
use serde::{Deserialize, Serialize};

/// Complete record of one experiment run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    /// Run metadata
    pub meta: ReportMeta,
    /// Every measured cell in execution order
    pub cells: Vec<CellResult>,
    /// Speedup of every non-baseline cell
    pub speedups: Vec<SpeedupEntry>,
    /// Path of the chart written for this run
    pub chart: Option<String>,
}

/// Run metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportMeta {
    /// Scalebench version
    pub version: String,
    /// When the report was assembled
    pub timestamp: DateTime<Utc>,
    /// Engine command line without the per-trial positional arguments
    pub engine: String,
    /// Start-position token passed to every trial
    pub start_token: String,
    /// Search depth passed to every trial
    pub depth: u32,
    /// Trials per cell
    pub repeat: u32,
    /// Wall-clock duration of the run
    pub total_duration_secs: f64,
}

/// Measured cell
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CellResult {
    /// Execution mode
    pub mode: Mode,
    /// Thread count
    pub threads: u32,
    /// Elapsed seconds of every trial, in run order
    pub trials_secs: Vec<f64>,
    /// Mean of the trials
    pub mean_secs: f64,
}

/// Speedup of one non-baseline cell
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpeedupEntry {
    /// Execution mode
    pub mode: Mode,
    /// Thread count
    pub threads: u32,
    /// Baseline mean divided by this cell's mean
    pub speedup: f64,
}

/// Assemble a report from the finished tables
pub fn build_report(
    space: &ConfigSpace,
    engine: &str,
    table: &ResultTable,
    speedups: &SpeedupTable,
    total_duration_secs: f64,
) -> RunReport {
    let cells = table
        .means()
        .into_iter()
        .map(|(cell, mean_secs)| CellResult {
            mode: cell.mode,
            threads: cell.threads,
            trials_secs: table.trials_of(&cell).to_vec(),
            mean_secs,
        })
        .collect();

    let speedups = speedups
        .iter()
        .map(|(cell, &speedup)| SpeedupEntry {
            mode: cell.mode,
            threads: cell.threads,
            speedup,
        })
        .collect();

    RunReport {
        meta: ReportMeta {
            version: env!("CARGO_PKG_VERSION").to_string(),
            timestamp: Utc::now(),
            engine: engine.to_string(),
            start_token: space.start_token().to_string(),
            depth: space.depth(),
            repeat: space.repeat(),
            total_duration_secs,
        },
        cells,
        speedups,
        chart: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use scalebench_core::ExperimentCell;
    use scalebench_stats::compute_speedups;

    #[test]
    fn test_build_report() {
        let space = ConfigSpace::builder()
            .modes([Mode::Sequential, Mode::Parallel])
            .thread_counts([2])
            .repeat(2)
            .build()
            .unwrap();
        let par2 = ExperimentCell::new(Mode::Parallel, 2);
        let mut table = ResultTable::new(2);
        table.record(ExperimentCell::BASELINE, 9.0).unwrap();
        table.record(ExperimentCell::BASELINE, 11.0).unwrap();
        table.record(par2, 4.0).unwrap();
        table.record(par2, 6.0).unwrap();
        let speedups = compute_speedups(&table).unwrap();

        let report = build_report(&space, "go run main.go", &table, &speedups, 30.0);

        assert_eq!(report.meta.engine, "go run main.go");
        assert_eq!(report.meta.repeat, 2);
        assert_eq!(report.meta.start_token, "f");
        assert_eq!(report.cells.len(), 2);
        assert_eq!(report.cells[0].mode, Mode::Sequential);
        assert_eq!(report.cells[0].trials_secs, vec![9.0, 11.0]);
        assert_eq!(report.cells[1].mean_secs, 5.0);
        assert_eq!(report.speedups.len(), 1);
        assert_eq!(report.speedups[0].threads, 2);
        assert_eq!(report.speedups[0].speedup, 2.0);
        assert!(report.chart.is_none());
    }
}
