#![warn(missing_docs)]
//! Scalebench Report - Charts and Output
//!
//! - PNG speedup chart behind the [`ChartRenderer`] trait
//! - [`RunReport`] capturing one run's cells, means and speedups
//! - Human-readable and JSON renderings of that report

mod chart;
mod human;
mod json;
mod report;

pub use chart::{ChartRenderer, ChartStyle, PngChartRenderer, RenderError};
pub use human::{format_cell_line, format_human_output};
pub use json::generate_json_report;
pub use report::{CellResult, ReportMeta, RunReport, SpeedupEntry, build_report};

/// Output format selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    /// Human-readable terminal output
    #[default]
    Human,
    /// Pretty-printed JSON
    Json,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "json" => Ok(OutputFormat::Json),
            "human" | "text" => Ok(OutputFormat::Human),
            other => Err(format!("Unknown output format: {}", other)),
        }
    }
}
