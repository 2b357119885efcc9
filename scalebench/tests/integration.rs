//! Integration tests for Scalebench
//!
//! These tests drive the full pipeline: stub and real engine processes,
//! parsing, aggregation, speedups and chart rendering.

use scalebench::{
    ChartRenderer, ChartStyle, ConfigSpace, EngineCommand, EngineRunner, Experiment,
    ExperimentCell, ExperimentError, Mode, PngChartRenderer, ProcessError, ProcessRunner,
    RenderError, SpeedupError, SpeedupTable, build_report, generate_json_report, runner_fn,
};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Renderer that remembers every table it was asked to draw
#[derive(Default)]
struct RecordingRenderer {
    calls: Vec<(SpeedupTable, PathBuf)>,
}

impl ChartRenderer for RecordingRenderer {
    fn render(&mut self, speedups: &SpeedupTable, output: &Path) -> Result<(), RenderError> {
        self.calls.push((speedups.clone(), output.to_path_buf()));
        Ok(())
    }
}

/// Engine script answering `mode threads start depth`: 12s sequentially,
/// `12 / threads` in parallel and `6 / threads` with work stealing.
const SCRIPTED_ENGINE: &str = r#"
echo "board for start=$3 depth=$4"
echo "searching..." >&2
case "$1" in
    s) echo "best e2e4 (eval 10)"; echo "S-TIME: 12.000000" ;;
    p) echo "P-TIME: $((12 / $2)).000000" ;;
    w) echo "WS-TIME: $((6 / $2)).000000" ;;
    *) echo "unknown mode $1" >&2; exit 2 ;;
esac
"#;

fn sh_engine(script: &str) -> EngineCommand {
    EngineCommand::new("sh").with_args(["-c", script, "engine"])
}

fn two_cell_space() -> ConfigSpace {
    ConfigSpace::builder()
        .modes([Mode::Sequential, Mode::Parallel])
        .thread_counts([2])
        .repeat(1)
        .build()
        .unwrap()
}

/// Stub engine with one sequential and one parallel cell
#[test]
fn test_end_to_end_with_stub_engine() {
    let space = two_cell_space();
    let mut runner = runner_fn(|cell: ExperimentCell, _: &str, _: u32| {
        Ok(match cell.mode {
            Mode::Sequential => "S-TIME: 10.0".to_string(),
            _ => "P-TIME: 5.0".to_string(),
        })
    });
    let mut renderer = RecordingRenderer::default();

    let outcome = Experiment::new(&space)
        .run(&mut runner, &mut renderer, Path::new("speedup.png"))
        .unwrap();

    let par2 = ExperimentCell::new(Mode::Parallel, 2);
    assert_eq!(outcome.speedups.len(), 1);
    assert_eq!(outcome.speedups.get(&par2), Some(2.0));

    assert_eq!(renderer.calls.len(), 1);
    let (rendered, path) = &renderer.calls[0];
    assert_eq!(rendered, &outcome.speedups);
    assert_eq!(path, Path::new("speedup.png"));
}

/// A nonzero exit aborts the run and leaves no chart behind
#[test]
fn test_nonzero_exit_aborts_before_render() {
    let dir = tempfile::tempdir().unwrap();
    let chart = dir.path().join("speedup.png");
    let space = two_cell_space();

    let mut runner = ProcessRunner::new(sh_engine(
        r#"if [ "$1" = p ]; then echo "crashed" >&2; exit 3; fi; echo "S-TIME: 1.0""#,
    ));
    let mut renderer = PngChartRenderer::new(ChartStyle::default());

    let err = Experiment::new(&space)
        .run(&mut runner, &mut renderer, &chart)
        .unwrap_err();

    match err {
        ExperimentError::Process {
            cell,
            trial,
            source: ProcessError::NonZeroExit { status, output, .. },
        } => {
            assert_eq!(cell, ExperimentCell::new(Mode::Parallel, 2));
            assert_eq!(trial, 1);
            assert_eq!(status, "exit code 3");
            assert!(output.contains("crashed"));
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(!chart.exists());
}

/// A failed run leaves an existing chart from an earlier run untouched
#[test]
fn test_failed_run_keeps_previous_chart() {
    let dir = tempfile::tempdir().unwrap();
    let chart = dir.path().join("speedup.png");
    std::fs::write(&chart, b"previous chart").unwrap();

    let mut runner = ProcessRunner::new(sh_engine("exit 1"));
    let mut renderer = PngChartRenderer::default();
    let result = Experiment::new(&two_cell_space()).run(&mut runner, &mut renderer, &chart);

    assert!(result.is_err());
    assert_eq!(std::fs::read(&chart).unwrap(), b"previous chart");
}

/// Real child processes through the whole pipeline, including the PNG
#[test]
fn test_end_to_end_with_real_processes() {
    let dir = tempfile::tempdir().unwrap();
    let chart = dir.path().join("speedup.png");
    let space = ConfigSpace::builder()
        .thread_counts([2, 4])
        .repeat(2)
        .start_token("b")
        .depth(3)
        .build()
        .unwrap();

    let mut runner = ProcessRunner::new(sh_engine(SCRIPTED_ENGINE));
    let mut renderer = PngChartRenderer::new(ChartStyle {
        width: 400,
        height: 240,
        ticks: space.chart_ticks(),
        ..Default::default()
    });

    let outcome = Experiment::new(&space)
        .run(&mut runner, &mut renderer, &chart)
        .unwrap();

    let speedup = |mode, threads| {
        outcome
            .speedups
            .get(&ExperimentCell::new(mode, threads))
            .unwrap()
    };
    assert!((speedup(Mode::Parallel, 2) - 2.0).abs() < 1e-6);
    assert!((speedup(Mode::Parallel, 4) - 4.0).abs() < 1e-6);
    assert!((speedup(Mode::WorkStealing, 2) - 4.0).abs() < 1e-6);
    assert!((speedup(Mode::WorkStealing, 4) - 12.0).abs() < 1e-6);

    for cell in space.cells() {
        assert_eq!(outcome.table.trials_of(&cell).len(), 2);
    }

    let bytes = std::fs::read(&chart).unwrap();
    assert!(bytes.starts_with(b"\x89PNG"));

    let report = build_report(&space, "sh -c <script>", &outcome.table, &outcome.speedups, 1.0);
    let json = generate_json_report(&report).unwrap();
    assert!(json.contains("\"start_token\": \"b\""));
    assert_eq!(report.cells.len(), 5);
    assert_eq!(report.speedups.len(), 4);
}

/// Each trial sees the four positional arguments in contract order
#[test]
fn test_engine_receives_positional_arguments() {
    let mut runner = ProcessRunner::new(sh_engine(r#"echo "$1|$2|$3|$4""#));
    let output = runner
        .run(ExperimentCell::new(Mode::WorkStealing, 12), "f", 5)
        .unwrap();
    assert_eq!(output.trim(), "w|12|f|5");
}

/// A marker written to stderr still counts
#[test]
fn test_marker_on_stderr() {
    let space = ConfigSpace::builder()
        .modes([Mode::Sequential])
        .repeat(3)
        .build()
        .unwrap();
    let mut runner = ProcessRunner::new(sh_engine("echo noise; echo 'S-TIME: 0.250000' >&2"));
    let table = Experiment::new(&space).measure(&mut runner).unwrap();
    assert_eq!(table.mean_of(&ExperimentCell::BASELINE).unwrap(), 0.25);
}

/// Engine output without a marker is a parse failure
#[test]
fn test_missing_marker_aborts() {
    let mut runner = ProcessRunner::new(sh_engine("echo 'best e2e4'"));
    let mut renderer = RecordingRenderer::default();
    let err = Experiment::new(&two_cell_space())
        .run(&mut runner, &mut renderer, Path::new("unused.png"))
        .unwrap_err();

    assert!(matches!(err, ExperimentError::Parse { .. }));
    assert!(renderer.calls.is_empty());
}

/// An engine that cannot be launched aborts the run
#[test]
fn test_unlaunchable_engine() {
    let mut runner = ProcessRunner::new(EngineCommand::new("/nonexistent/scalebench-engine"));
    let err = Experiment::new(&two_cell_space())
        .measure(&mut runner)
        .unwrap_err();
    assert!(matches!(
        err,
        ExperimentError::Process {
            source: ProcessError::SpawnFailed { .. },
            ..
        }
    ));
}

/// A configured timeout turns a hung engine into a failed run
#[test]
fn test_timeout_aborts_hung_engine() {
    let mut runner = ProcessRunner::new(
        sh_engine("sleep 30; echo 'S-TIME: 1.0'").with_timeout(Duration::from_millis(300)),
    );
    let err = Experiment::new(&two_cell_space())
        .measure(&mut runner)
        .unwrap_err();
    assert!(matches!(
        err,
        ExperimentError::Process {
            source: ProcessError::Timeout { .. },
            ..
        }
    ));
}

/// Without a sequential run there is nothing to compare against
#[test]
fn test_missing_baseline() {
    let space = ConfigSpace::builder()
        .modes([Mode::WorkStealing])
        .thread_counts([4])
        .repeat(1)
        .build()
        .unwrap();
    let mut runner = runner_fn(|_: ExperimentCell, _: &str, _: u32| Ok("WS-TIME: 2.0".into()));
    let mut renderer = RecordingRenderer::default();

    let err = Experiment::new(&space)
        .run(&mut runner, &mut renderer, Path::new("unused.png"))
        .unwrap_err();
    assert!(matches!(
        err,
        ExperimentError::Speedup(SpeedupError::MissingBaseline)
    ));
    assert!(renderer.calls.is_empty());
}

/// Trial values 1, 2, 3 average to exactly 2
#[test]
fn test_mean_of_repeated_trials() {
    let space = ConfigSpace::builder()
        .modes([Mode::Sequential])
        .repeat(3)
        .build()
        .unwrap();
    let mut next = 0.0;
    let mut runner = runner_fn(|_: ExperimentCell, _: &str, _: u32| {
        next += 1.0;
        Ok(format!("S-TIME: {next:.4}"))
    });
    let table = Experiment::new(&space).measure(&mut runner).unwrap();
    assert_eq!(table.mean_of(&ExperimentCell::BASELINE).unwrap(), 2.0);
}
