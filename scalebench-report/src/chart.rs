//! Speedup Chart
//!
//! Draws one speedup-vs-threads curve per parallel mode and writes it as a
//! PNG. The bitmap backend needs no display and text is drawn with a bundled
//! DejaVu Sans face, so rendering works on headless machines without any
//! system font stack. The file at the output path is always overwritten.

use plotters::coord::Shift;
use plotters::prelude::*;
use plotters::style::{FontStyle, register_font};
use scalebench_core::Mode;
use scalebench_stats::SpeedupTable;
use std::path::Path;
use std::sync::OnceLock;
use thiserror::Error;

const FIGURE_BG: RGBColor = RGBColor(242, 242, 242);
const PLOT_BG: RGBColor = RGBColor(204, 204, 204);
const MARKER_SIZE: i32 = 4;

/// Family every chart label is drawn with
const FONT_FAMILY: &str = "sans-serif";
const FONT_BYTES: &[u8] = include_bytes!("../assets/DejaVuSans.ttf");

/// Errors raised while writing the chart
#[derive(Debug, Error)]
pub enum RenderError {
    /// The output location could not be prepared
    #[error("failed to prepare chart output: {0}")]
    Io(#[from] std::io::Error),

    /// The bundled font could not be loaded
    #[error("failed to load chart font: {0}")]
    Font(String),

    /// plotters rejected a drawing operation
    #[error("failed to draw chart: {0}")]
    Draw(String),
}

fn draw_error<E: std::fmt::Display>(e: E) -> RenderError {
    RenderError::Draw(e.to_string())
}

/// Register the bundled face under [`FONT_FAMILY`] once per process
fn ensure_font() -> Result<(), RenderError> {
    static REGISTERED: OnceLock<Result<(), String>> = OnceLock::new();
    REGISTERED
        .get_or_init(|| {
            register_font(FONT_FAMILY, FontStyle::Normal, FONT_BYTES)
                .map_err(|_| "bundled DejaVu Sans is not a valid TrueType face".to_string())
        })
        .clone()
        .map_err(RenderError::Font)
}

/// Sink for the final speedup table
///
/// The experiment pipeline calls `render` exactly once, after every cell has
/// been measured. Tests substitute a recording implementation.
pub trait ChartRenderer {
    /// Draw `speedups` and write the artifact to `output`
    fn render(&mut self, speedups: &SpeedupTable, output: &Path) -> Result<(), RenderError>;
}

/// Chart appearance
#[derive(Debug, Clone, PartialEq)]
pub struct ChartStyle {
    /// Image width in pixels
    pub width: u32,
    /// Image height in pixels
    pub height: u32,
    /// Chart caption
    pub title: String,
    /// X-axis tick positions (thread counts)
    pub ticks: Vec<u32>,
}

impl Default for ChartStyle {
    fn default() -> Self {
        Self {
            width: 1000,
            height: 600,
            title: "Speedup vs. Sequential".to_string(),
            ticks: vec![1, 2, 4, 6, 8, 12],
        }
    }
}

/// PNG renderer backed by the plotters bitmap backend
#[derive(Debug, Clone, Default)]
pub struct PngChartRenderer {
    style: ChartStyle,
}

impl PngChartRenderer {
    /// Create a renderer with the given appearance
    pub fn new(style: ChartStyle) -> Self {
        Self { style }
    }

    /// Appearance used for every render
    pub fn style(&self) -> &ChartStyle {
        &self.style
    }

    /// Draw the chart onto any plotters drawing area
    fn draw_chart<DB: DrawingBackend>(
        &self,
        root: &DrawingArea<DB, Shift>,
        speedups: &SpeedupTable,
    ) -> Result<(), RenderError> {
        ensure_font()?;
        root.fill(&FIGURE_BG).map_err(draw_error)?;

        let series = speedups.series();
        let max_thread = self
            .style
            .ticks
            .iter()
            .copied()
            .chain(series.iter().flat_map(|s| s.points.iter().map(|&(t, _)| t)))
            .max()
            .unwrap_or(1);
        let y_max = speedups
            .iter()
            .map(|(_, &s)| s)
            .filter(|s| s.is_finite())
            .fold(1.0_f64, f64::max)
            * 1.1;
        let key_points: Vec<i32> = self.style.ticks.iter().map(|&t| t as i32).collect();

        let mut chart = ChartBuilder::on(root)
            .caption(&self.style.title, (FONT_FAMILY, 28))
            .margin(20)
            .x_label_area_size(50)
            .y_label_area_size(60)
            .build_cartesian_2d(
                (0i32..max_thread as i32 + 1).with_key_points(key_points),
                0f64..y_max,
            )
            .map_err(draw_error)?;

        chart.plotting_area().fill(&PLOT_BG).map_err(draw_error)?;

        chart
            .configure_mesh()
            .x_desc("Number of Threads")
            .y_desc("Speedup")
            .label_style((FONT_FAMILY, 14))
            .axis_desc_style((FONT_FAMILY, 16))
            .bold_line_style(WHITE.mix(0.7))
            .light_line_style(WHITE.mix(0.3))
            .draw()
            .map_err(draw_error)?;

        for curve in &series {
            let color = series_color(curve.mode);
            let points: Vec<(i32, f64)> = curve
                .points
                .iter()
                .filter(|(_, s)| s.is_finite())
                .map(|&(t, s)| (t as i32, s))
                .collect();

            // Parallel: solid line + circles, work-stealing: dashed line + squares
            let anno = if curve.mode == Mode::WorkStealing {
                chart.draw_series(DashedLineSeries::new(
                    points.clone(),
                    10,
                    6,
                    color.stroke_width(2),
                ))
            } else {
                chart.draw_series(LineSeries::new(points.clone(), color.stroke_width(2)))
            }
            .map_err(draw_error)?;
            anno.label(curve.mode.legend()).legend(move |(x, y)| {
                PathElement::new(vec![(x, y), (x + 20, y)], color.stroke_width(2))
            });

            if curve.mode == Mode::WorkStealing {
                chart
                    .draw_series(points.iter().map(|&p| {
                        EmptyElement::at(p)
                            + Rectangle::new(
                                [(-MARKER_SIZE, -MARKER_SIZE), (MARKER_SIZE, MARKER_SIZE)],
                                color.filled(),
                            )
                    }))
                    .map_err(draw_error)?;
            } else {
                chart
                    .draw_series(
                        points
                            .iter()
                            .map(|&p| Circle::new(p, MARKER_SIZE, color.filled())),
                    )
                    .map_err(draw_error)?;
            }
        }

        if !series.is_empty() {
            chart
                .configure_series_labels()
                .position(SeriesLabelPosition::UpperLeft)
                .label_font((FONT_FAMILY, 14))
                .background_style(WHITE.mix(0.8))
                .border_style(BLACK)
                .draw()
                .map_err(draw_error)?;
        }

        root.present().map_err(draw_error)?;
        Ok(())
    }
}

fn series_color(mode: Mode) -> RGBColor {
    match mode {
        Mode::Sequential => RGBColor(44, 160, 44),
        Mode::Parallel => RGBColor(31, 119, 180),
        Mode::WorkStealing => RGBColor(255, 127, 14),
    }
}

impl ChartRenderer for PngChartRenderer {
    fn render(&mut self, speedups: &SpeedupTable, output: &Path) -> Result<(), RenderError> {
        if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let root =
            BitMapBackend::new(output, (self.style.width, self.style.height)).into_drawing_area();
        self.draw_chart(&root, speedups)
    }
}
