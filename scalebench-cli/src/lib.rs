#![warn(missing_docs)]
//! Scalebench CLI Library
//!
//! Runs a thread-scaling experiment against an external engine and renders
//! the speedup chart. Use `scalebench::run()` (or `scalebench_cli::run()`) from
//! a `main` function to get the full command line.
//!
//! # Example
//!
//! ```ignore
//! fn main() -> anyhow::Result<()> {
//!     scalebench_cli::run()
//! }
//! ```

mod config;
mod experiment;
mod parser;
mod runner;

pub use config::*;
pub use experiment::{Experiment, ExperimentError, ExperimentOutcome};
pub use parser::{ParseError, parse_elapsed};
pub use runner::{EngineCommand, EngineRunner, FnRunner, ProcessError, ProcessRunner, runner_fn};

use clap::{Parser, Subcommand};
use scalebench_core::{ConfigSpace, Mode};
use scalebench_report::{
    OutputFormat, PngChartRenderer, build_report, format_human_output, generate_json_report,
};
use std::io::Write;
use std::path::PathBuf;
use std::time::Instant;
use tracing_subscriber::EnvFilter;

/// Scalebench CLI arguments
#[derive(Parser, Debug)]
#[command(name = "scalebench")]
#[command(author, version, about = "Scalebench - thread-scaling experiments for external engines")]
pub struct Cli {
    /// Optional subcommand (Run, Plan, Init); defaults to Run
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Configuration file (TOML); built-in defaults apply otherwise
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Engine executable
    #[arg(long)]
    pub program: Option<String>,

    /// Leading engine argument placed before mode/threads/start/depth (repeatable)
    #[arg(long = "engine-arg", allow_hyphen_values = true)]
    pub engine_args: Option<Vec<String>>,

    /// Directory the engine runs in
    #[arg(long)]
    pub workdir: Option<PathBuf>,

    /// Per-trial timeout, e.g. "90s" or "10m" (default: none)
    #[arg(long)]
    pub timeout: Option<String>,

    /// Modes to measure, comma separated: s,p,w
    #[arg(long, value_delimiter = ',')]
    pub modes: Option<Vec<Mode>>,

    /// Thread counts for the parallel modes, comma separated
    #[arg(long, value_delimiter = ',')]
    pub threads: Option<Vec<u32>>,

    /// Trials per cell
    #[arg(long, short = 'n')]
    pub repeat: Option<u32>,

    /// Start-position token passed to the engine
    #[arg(long)]
    pub start: Option<String>,

    /// Search depth passed to the engine
    #[arg(long)]
    pub depth: Option<u32>,

    /// Chart output path
    #[arg(long)]
    pub chart: Option<PathBuf>,

    /// Output format: human, json
    #[arg(long)]
    pub format: Option<String>,

    /// Report file (stdout if not specified)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Dry run - print the plan without invoking the engine
    #[arg(long)]
    pub dry_run: bool,

    /// Disable the progress bar
    #[arg(long)]
    pub no_progress: bool,

    /// Verbose output
    #[arg(short, long)]
    pub verbose: bool,
}

/// CLI subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the experiment (default)
    Run,
    /// Print the ordered experiment cells without running anything
    Plan,
    /// Print a default configuration file
    Init,
}

/// Run the Scalebench CLI with the process arguments.
///
/// # Returns
/// Returns `Ok(())` on success, or the error that aborted the experiment.
pub fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();
    run_with_cli(cli)
}

/// Run the Scalebench CLI with pre-parsed arguments.
pub fn run_with_cli(cli: Cli) -> anyhow::Result<()> {
    init_logging(cli.verbose);

    if let Some(Commands::Init) = cli.command {
        print!("{}", ScaleConfig::default_toml());
        return Ok(());
    }

    let config = resolve_config(&cli)?;
    let space = config.config_space()?;

    match cli.command {
        Some(Commands::Plan) => print_plan(&config, &space)?,
        Some(Commands::Run) => run_experiment(&cli, &config, &space)?,
        Some(Commands::Init) => {}
        None => {
            if cli.dry_run {
                print_plan(&config, &space)?;
            } else {
                run_experiment(&cli, &config, &space)?;
            }
        }
    }

    Ok(())
}

fn init_logging(verbose: bool) {
    let default_directive = if verbose {
        "scalebench=debug"
    } else {
        "scalebench=info"
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive));
    // A subscriber may already be installed when embedded in tests
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

/// Build the effective configuration by layering: defaults → config file → CLI flags.
pub fn resolve_config(cli: &Cli) -> anyhow::Result<ScaleConfig> {
    let mut config = match &cli.config {
        Some(path) => ScaleConfig::load(path)?,
        None => ScaleConfig::default(),
    };

    if let Some(program) = &cli.program {
        config.engine.program = program.clone();
    }
    if let Some(args) = &cli.engine_args {
        config.engine.args = args.clone();
    }
    if let Some(dir) = &cli.workdir {
        config.engine.working_dir = Some(dir.clone());
    }
    if let Some(timeout) = &cli.timeout {
        config.engine.timeout = Some(timeout.clone());
    }
    if let Some(modes) = &cli.modes {
        config.experiment.modes = modes.clone();
    }
    if let Some(threads) = &cli.threads {
        config.experiment.threads = threads.clone();
    }
    if let Some(repeat) = cli.repeat {
        config.experiment.repeat = repeat;
    }
    if let Some(start) = &cli.start {
        config.experiment.start_token = start.clone();
    }
    if let Some(depth) = cli.depth {
        config.experiment.depth = depth;
    }
    if let Some(chart) = &cli.chart {
        config.chart.output = chart.clone();
    }
    if let Some(format) = &cli.format {
        config.output.format = format.clone();
    }
    if let Some(output) = &cli.output {
        config.output.path = Some(output.clone());
    }

    Ok(config)
}

fn print_plan(config: &ScaleConfig, space: &ConfigSpace) -> anyhow::Result<()> {
    let engine = config.engine_command()?;
    println!("Scalebench Plan:");
    println!("engine: {}", engine);

    for mode in space.modes() {
        println!("├── {}", mode.label());
        for cell in space.cells().iter().filter(|c| c.mode == *mode) {
            let args = EngineCommand::trial_args(*cell, space.start_token(), space.depth());
            println!("│   ├── {} threads  [{}]", cell.threads, args.join(" "));
        }
    }

    println!(
        "{} cells x {} trials = {} engine invocations.",
        space.cells().len(),
        space.repeat(),
        space.total_trials()
    );
    Ok(())
}

fn run_experiment(cli: &Cli, config: &ScaleConfig, space: &ConfigSpace) -> anyhow::Result<()> {
    let format: OutputFormat = config
        .output
        .format
        .parse()
        .map_err(|e: String| anyhow::anyhow!(e))?;
    let engine = config.engine_command()?;
    let chart_path = config.chart.output.clone();

    println!(
        "Running {} cells x {} trials with `{}`...\n",
        space.cells().len(),
        space.repeat(),
        engine
    );

    let start_time = Instant::now();
    let mut runner = ProcessRunner::new(engine.clone());
    let mut renderer = PngChartRenderer::new(config.chart_style(space));
    let outcome = Experiment::new(space)
        .progress(!cli.no_progress)
        .run(&mut runner, &mut renderer, &chart_path)?;
    println!("Saved plot to {}", chart_path.display());

    let mut report = build_report(
        space,
        &engine.to_string(),
        &outcome.table,
        &outcome.speedups,
        start_time.elapsed().as_secs_f64(),
    );
    report.chart = Some(chart_path.display().to_string());

    let output = match format {
        OutputFormat::Json => generate_json_report(&report)?,
        OutputFormat::Human => format_human_output(&report),
    };

    if let Some(path) = &config.output.path {
        let mut file = std::fs::File::create(path)?;
        file.write_all(output.as_bytes())?;
        println!("Report written to: {}", path.display());
    } else {
        print!("{}", output);
    }

    Ok(())
}
