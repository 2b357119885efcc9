//! Configuration loading from TOML
//!
//! Every setting has a built-in default, so no file is needed. A file passed
//! with `--config` replaces defaults section by section, and CLI flags win
//! over both. The merged result is resolved once into an immutable
//! [`ConfigSpace`] and [`EngineCommand`] before the first trial runs.

use crate::runner::EngineCommand;
use scalebench_core::{
    ConfigError, ConfigSpace, DEFAULT_DEPTH, DEFAULT_REPEAT, DEFAULT_START_TOKEN,
    DEFAULT_THREAD_COUNTS, Mode,
};
use scalebench_report::ChartStyle;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Scalebench configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ScaleConfig {
    /// How to launch the engine
    #[serde(default)]
    pub engine: EngineConfig,
    /// Which cells to measure
    #[serde(default)]
    pub experiment: ExperimentConfig,
    /// Chart appearance and location
    #[serde(default)]
    pub chart: ChartConfig,
    /// Report output
    #[serde(default)]
    pub output: OutputConfig,
}

/// Engine launch configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Executable to launch
    #[serde(default = "default_program")]
    pub program: String,
    /// Arguments placed before the per-trial positional arguments
    #[serde(default = "default_args")]
    pub args: Vec<String>,
    /// Directory the engine is built in
    #[serde(default)]
    pub working_dir: Option<PathBuf>,
    /// Per-trial timeout (e.g., "90s", "5m"); unset means wait forever
    #[serde(default)]
    pub timeout: Option<String>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            program: default_program(),
            args: default_args(),
            working_dir: None,
            timeout: None,
        }
    }
}

fn default_program() -> String {
    "go".to_string()
}
fn default_args() -> Vec<String> {
    vec!["run".to_string(), "main.go".to_string()]
}

/// Experiment cell configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExperimentConfig {
    /// Modes to measure: "s", "p", "w"
    #[serde(default = "default_modes")]
    pub modes: Vec<Mode>,
    /// Thread counts for the parallel modes
    #[serde(default = "default_threads")]
    pub threads: Vec<u32>,
    /// Trials per cell
    #[serde(default = "default_repeat")]
    pub repeat: u32,
    /// Start-position token passed to the engine
    #[serde(default = "default_start_token")]
    pub start_token: String,
    /// Search depth passed to the engine
    #[serde(default = "default_depth")]
    pub depth: u32,
}

impl Default for ExperimentConfig {
    fn default() -> Self {
        Self {
            modes: default_modes(),
            threads: default_threads(),
            repeat: default_repeat(),
            start_token: default_start_token(),
            depth: default_depth(),
        }
    }
}

fn default_modes() -> Vec<Mode> {
    Mode::ALL.to_vec()
}
fn default_threads() -> Vec<u32> {
    DEFAULT_THREAD_COUNTS.to_vec()
}
fn default_repeat() -> u32 {
    DEFAULT_REPEAT
}
fn default_start_token() -> String {
    DEFAULT_START_TOKEN.to_string()
}
fn default_depth() -> u32 {
    DEFAULT_DEPTH
}

/// Chart configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChartConfig {
    /// Output image path
    #[serde(default = "default_chart_output")]
    pub output: PathBuf,
    /// Chart width in pixels
    #[serde(default = "default_width")]
    pub width: u32,
    /// Chart height in pixels
    #[serde(default = "default_height")]
    pub height: u32,
    /// Chart caption
    #[serde(default = "default_title")]
    pub title: String,
}

impl Default for ChartConfig {
    fn default() -> Self {
        Self {
            output: default_chart_output(),
            width: default_width(),
            height: default_height(),
            title: default_title(),
        }
    }
}

fn default_chart_output() -> PathBuf {
    PathBuf::from("speedup.png")
}
fn default_width() -> u32 {
    1000
}
fn default_height() -> u32 {
    600
}
fn default_title() -> String {
    "Speedup vs. Sequential".to_string()
}

/// Report output configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Report format: "human" or "json"
    #[serde(default = "default_format")]
    pub format: String,
    /// Report file (stdout if unset)
    #[serde(default)]
    pub path: Option<PathBuf>,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            format: default_format(),
            path: None,
        }
    }
}

fn default_format() -> String {
    "human".to_string()
}

impl ScaleConfig {
    /// Load configuration from a TOML file
    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("Failed to read config {}: {}", path.display(), e))?;
        let config: Self = toml::from_str(&content)
            .map_err(|e| anyhow::anyhow!("Invalid config {}: {}", path.display(), e))?;
        Ok(config)
    }

    /// Freeze the experiment section into a validated [`ConfigSpace`]
    pub fn config_space(&self) -> Result<ConfigSpace, ConfigError> {
        ConfigSpace::builder()
            .modes(self.experiment.modes.iter().copied())
            .thread_counts(self.experiment.threads.iter().copied())
            .repeat(self.experiment.repeat)
            .start_token(self.experiment.start_token.clone())
            .depth(self.experiment.depth)
            .build()
    }

    /// Resolve the engine section into an [`EngineCommand`]
    pub fn engine_command(&self) -> anyhow::Result<EngineCommand> {
        let mut command =
            EngineCommand::new(self.engine.program.clone()).with_args(self.engine.args.clone());
        if let Some(dir) = &self.engine.working_dir {
            command = command.in_dir(dir.clone());
        }
        if let Some(timeout) = &self.engine.timeout {
            command = command.with_timeout(Self::parse_duration(timeout)?);
        }
        Ok(command)
    }

    /// Chart appearance, with ticks taken from the experiment's thread counts
    pub fn chart_style(&self, space: &ConfigSpace) -> ChartStyle {
        ChartStyle {
            width: self.chart.width,
            height: self.chart.height,
            title: self.chart.title.clone(),
            ticks: space.chart_ticks(),
        }
    }

    /// Generate a default configuration as TOML string
    pub fn default_toml() -> String {
        r#"# Scalebench Configuration

[engine]
# Executable and leading arguments; mode, threads, start token and depth are appended
program = "go"
args = ["run", "main.go"]
# Directory the engine is built in (uncomment to enable)
# working_dir = "../main"
# Abort a trial that runs longer than this (uncomment to enable)
# timeout = "10m"

[experiment]
# Modes: "s" (sequential), "p" (parallel), "w" (work-stealing)
modes = ["s", "p", "w"]
# Thread counts for the parallel modes
threads = [2, 4, 6, 8, 12]
# Trials per cell
repeat = 3
# Start-position token passed to the engine
start_token = "f"
# Search depth passed to the engine
depth = 5

[chart]
output = "speedup.png"
width = 1000
height = 600
title = "Speedup vs. Sequential"

[output]
# Report format: human, json
format = "human"
# Report file (uncomment to enable, stdout otherwise)
# path = "scalebench.json"
"#
        .to_string()
    }

    /// Parse duration string (e.g., "3s", "500ms", "2m")
    pub fn parse_duration(s: &str) -> anyhow::Result<Duration> {
        let s = s.trim();
        if s.is_empty() {
            return Err(anyhow::anyhow!("Empty duration string"));
        }

        // Find where the number ends and unit begins
        let (num_part, unit_part) = s
            .char_indices()
            .find(|(_, c)| c.is_alphabetic())
            .map(|(i, _)| s.split_at(i))
            .unwrap_or((s, "s"));

        let value: f64 = num_part
            .trim()
            .parse()
            .map_err(|_| anyhow::anyhow!("Invalid duration number: {}", num_part))?;
        if !value.is_finite() || value < 0.0 {
            return Err(anyhow::anyhow!("Invalid duration: {}", s));
        }

        let seconds_per_unit = match unit_part.to_lowercase().as_str() {
            "ms" => 1e-3,
            "s" | "" => 1.0,
            "m" | "min" => 60.0,
            "h" => 3600.0,
            _ => return Err(anyhow::anyhow!("Unknown duration unit: {}", unit_part)),
        };

        Duration::try_from_secs_f64(value * seconds_per_unit)
            .map_err(|_| anyhow::anyhow!("Duration out of range: {}", s))
    }
}
