#![warn(missing_docs)]
//! # Scalebench
//!
//! Experiment harness that measures how an external, already-built engine
//! scales across execution modes and thread counts:
//! - **Fixed experiment space**: Sequential/1 baseline, then Parallel and
//!   Work-Stealing at every configured thread count
//! - **Process protocol**: the engine is launched once per trial with
//!   `mode threads start depth` and reports `S-TIME:`/`P-TIME:`/`WS-TIME:`
//! - **Plain statistics**: mean of R trials per cell, speedup = baseline / cell
//! - **Headless chart**: one speedup curve per mode written as a PNG
//!
//! The harness runs one engine process at a time and aborts on the first
//! failure; no chart is written for a failed run.
//!
//! ## Quick Start
//!
//! ```ignore
//! use scalebench::prelude::*;
//!
//! let space = ConfigSpace::default();
//! let mut runner = ProcessRunner::new(EngineCommand::default().in_dir("../main"));
//! let mut renderer = PngChartRenderer::new(ChartStyle::default());
//! let outcome = Experiment::new(&space)
//!     .progress(true)
//!     .run(&mut runner, &mut renderer, "speedup.png".as_ref())?;
//! ```

// Re-export core types
pub use scalebench_core::{
    ConfigError, ConfigSpace, ConfigSpaceBuilder, DEFAULT_DEPTH, DEFAULT_REPEAT,
    DEFAULT_START_TOKEN, DEFAULT_THREAD_COUNTS, ExperimentCell, Mode,
};

// Re-export stats
pub use scalebench_stats::{
    ResultTable, SpeedupError, SpeedupSeries, SpeedupTable, TableError, compute_speedups,
};

// Re-export report
pub use scalebench_report::{
    ChartRenderer, ChartStyle, OutputFormat, PngChartRenderer, RenderError, RunReport,
    build_report, format_human_output, generate_json_report,
};

// Re-export harness
pub use scalebench_cli::{
    EngineCommand, EngineRunner, Experiment, ExperimentError, ExperimentOutcome, ParseError,
    ProcessError, ProcessRunner, ScaleConfig, parse_elapsed, runner_fn,
};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::{
        ChartRenderer, ChartStyle, ConfigSpace, EngineCommand, EngineRunner, Experiment,
        ExperimentCell, Mode, PngChartRenderer, ProcessRunner,
    };
}

/// Run the Scalebench CLI.
///
/// Call this from a binary's `main()`:
/// ```ignore
/// fn main() -> anyhow::Result<()> {
///     scalebench::run()
/// }
/// ```
pub use scalebench_cli::run;
