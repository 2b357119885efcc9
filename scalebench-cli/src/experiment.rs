//! Experiment Loop
//!
//! Drives the whole measurement pipeline strictly sequentially:
//!
//! ```text
//! ConfigSpace
//!      │  cells in order
//!      ▼
//! ┌──────────────┐
//! │ EngineRunner │  one process at a time, R trials per cell
//! └──────┬───────┘
//!        ▼
//! ┌──────────────┐
//! │ parse_elapsed│  marker → seconds
//! └──────┬───────┘
//!        ▼
//! ┌──────────────┐
//! │ ResultTable  │  mean per cell
//! └──────┬───────┘
//!        ▼
//! ┌──────────────┐
//! │ Speedups     │  baseline / cell
//! └──────┬───────┘
//!        ▼
//! ┌──────────────┐
//! │ChartRenderer │  single artifact
//! └──────────────┘
//! ```
//!
//! Any failure aborts the run immediately. Nothing is retried or skipped and
//! the chart is only rendered once every cell has been measured.

use crate::parser::{ParseError, parse_elapsed};
use crate::runner::{EngineRunner, ProcessError};
use indicatif::{ProgressBar, ProgressStyle};
use scalebench_core::{ConfigSpace, ExperimentCell};
use scalebench_report::{ChartRenderer, RenderError, format_cell_line};
use scalebench_stats::{
    ResultTable, SpeedupError, SpeedupTable, TableError, compute_speedups,
};
use std::path::Path;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{debug, info};

/// Any failure that aborts an experiment
#[derive(Debug, Error)]
pub enum ExperimentError {
    /// The engine could not be launched, failed or timed out
    #[error("trial {trial} of {cell} failed: {source}")]
    Process {
        /// Cell being measured
        cell: ExperimentCell,
        /// 1-based trial number
        trial: u32,
        /// Underlying process failure
        #[source]
        source: ProcessError,
    },

    /// The engine output carried no usable timing
    #[error("trial {trial} of {cell} produced no timing: {source}")]
    Parse {
        /// Cell being measured
        cell: ExperimentCell,
        /// 1-based trial number
        trial: u32,
        /// Underlying parse failure
        #[source]
        source: ParseError,
    },

    /// A cell was recorded inconsistently
    #[error(transparent)]
    Table(#[from] TableError),

    /// Speedups could not be derived
    #[error(transparent)]
    Speedup(#[from] SpeedupError),

    /// Writing the chart failed
    #[error(transparent)]
    Render(#[from] RenderError),
}

/// Everything a finished experiment produced
#[derive(Debug, Clone)]
pub struct ExperimentOutcome {
    /// Per-cell trials and means
    pub table: ResultTable,
    /// Speedups of every non-baseline cell
    pub speedups: SpeedupTable,
    /// Wall-clock time of the measurement loop
    pub elapsed: Duration,
}

/// Sequential experiment driver over an immutable [`ConfigSpace`]
pub struct Experiment<'a> {
    space: &'a ConfigSpace,
    show_progress: bool,
}

impl<'a> Experiment<'a> {
    /// Create a driver for `space` with the progress bar disabled
    pub fn new(space: &'a ConfigSpace) -> Self {
        Self {
            space,
            show_progress: false,
        }
    }

    /// Show a progress bar across all trials
    pub fn progress(mut self, show: bool) -> Self {
        self.show_progress = show;
        self
    }

    fn progress_bar(&self) -> ProgressBar {
        if !self.show_progress {
            return ProgressBar::hidden();
        }
        let pb = ProgressBar::new(self.space.total_trials());
        pb.set_style(
            ProgressStyle::default_bar()
                .template(
                    "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}",
                )
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("#>-"),
        );
        pb
    }

    /// Run every trial of every cell and return the filled result table
    pub fn measure<R>(&self, runner: &mut R) -> Result<ResultTable, ExperimentError>
    where
        R: EngineRunner + ?Sized,
    {
        let mut table = ResultTable::new(self.space.repeat());
        let pb = self.progress_bar();

        for cell in self.space.cells() {
            for trial in 1..=self.space.repeat() {
                pb.set_message(format!("{} trial {}/{}", cell, trial, self.space.repeat()));

                let raw = runner
                    .run(cell, self.space.start_token(), self.space.depth())
                    .map_err(|source| ExperimentError::Process {
                        cell,
                        trial,
                        source,
                    })?;
                let elapsed = parse_elapsed(&raw, cell.mode).map_err(|source| {
                    ExperimentError::Parse {
                        cell,
                        trial,
                        source,
                    }
                })?;
                debug!(%cell, trial, elapsed, "trial recorded");

                table.record(cell, elapsed)?;
                pb.inc(1);
            }

            let mean = table.mean_of(&cell)?;
            info!(%cell, mean_secs = mean, "cell complete");
            let line = format_cell_line(cell.mode, cell.threads, mean);
            // A hidden bar swallows println
            if pb.is_hidden() {
                println!("{}", line);
            } else {
                pb.println(line);
            }
        }

        pb.finish_and_clear();
        Ok(table)
    }

    /// Measure, compute speedups, then render the chart exactly once
    pub fn run<R, C>(
        &self,
        runner: &mut R,
        renderer: &mut C,
        chart_path: &Path,
    ) -> Result<ExperimentOutcome, ExperimentError>
    where
        R: EngineRunner + ?Sized,
        C: ChartRenderer + ?Sized,
    {
        let start = Instant::now();
        let table = self.measure(runner)?;
        let elapsed = start.elapsed();

        let speedups = compute_speedups(&table)?;
        renderer.render(&speedups, chart_path)?;
        info!(path = %chart_path.display(), "chart written");

        Ok(ExperimentOutcome {
            table,
            speedups,
            elapsed,
        })
    }
}
