//! Speedup Computation
//!
//! Divides the baseline mean (Sequential/1) by every other cell's mean.
//! Ratios above 1.0 mean the cell is faster than the baseline. Values are not
//! clamped or sanity-checked.

use crate::table::{ResultTable, TableError};
use scalebench_core::{ExperimentCell, Mode};
use std::collections::BTreeMap;
use thiserror::Error;

/// Errors raised while computing speedups
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SpeedupError {
    /// The Sequential/1 cell has no complete mean
    #[error("no complete baseline measurement for {}", ExperimentCell::BASELINE)]
    MissingBaseline,

    /// Another cell is incomplete
    #[error(transparent)]
    Table(#[from] TableError),
}

/// Speedup of every non-baseline cell relative to the baseline
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SpeedupTable {
    baseline_secs: f64,
    entries: BTreeMap<ExperimentCell, f64>,
}

/// One mode's speedup curve: ascending (threads, speedup) points
#[derive(Debug, Clone, PartialEq)]
pub struct SpeedupSeries {
    /// Mode this curve belongs to
    pub mode: Mode,
    /// Points sorted by thread count
    pub points: Vec<(u32, f64)>,
}

impl SpeedupTable {
    /// Mean baseline time the ratios were derived from
    pub fn baseline_secs(&self) -> f64 {
        self.baseline_secs
    }

    /// Speedup for `cell`, if it was measured
    pub fn get(&self, cell: &ExperimentCell) -> Option<f64> {
        self.entries.get(cell).copied()
    }

    /// All (cell, speedup) pairs in cell order
    pub fn iter(&self) -> impl Iterator<Item = (&ExperimentCell, &f64)> {
        self.entries.iter()
    }

    /// Number of non-baseline cells
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether there are no non-baseline cells
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries grouped into one curve per mode, in mode order
    pub fn series(&self) -> Vec<SpeedupSeries> {
        let mut grouped: BTreeMap<Mode, Vec<(u32, f64)>> = BTreeMap::new();
        for (cell, &speedup) in &self.entries {
            grouped
                .entry(cell.mode)
                .or_default()
                .push((cell.threads, speedup));
        }
        grouped
            .into_iter()
            .map(|(mode, points)| SpeedupSeries { mode, points })
            .collect()
    }
}

/// Derive the speedup table from a fully measured result table
///
/// Fails with [`SpeedupError::MissingBaseline`] if the baseline cell has no
/// complete mean, and propagates [`TableError`] for any other incomplete cell.
pub fn compute_speedups(table: &ResultTable) -> Result<SpeedupTable, SpeedupError> {
    let baseline_secs = table
        .mean_of(&ExperimentCell::BASELINE)
        .map_err(|_| SpeedupError::MissingBaseline)?;

    let mut entries = BTreeMap::new();
    for cell in table.cells().filter(|c| !c.is_baseline()) {
        let mean = table.mean_of(cell)?;
        entries.insert(*cell, baseline_secs / mean);
    }

    Ok(SpeedupTable {
        baseline_secs,
        entries,
    })
}
