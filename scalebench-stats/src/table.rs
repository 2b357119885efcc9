//! Result Table
//!
//! Accumulates trial measurements per cell and reports the arithmetic mean
//! once a cell holds exactly R trials. No outlier rejection and no dispersion:
//! the plain mean is the only statistic this harness reports.

use scalebench_core::ExperimentCell;
use std::collections::BTreeMap;
use thiserror::Error;

/// Errors raised by [`ResultTable`]
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TableError {
    /// Fewer than R trials recorded
    #[error("cell {cell} is incomplete: {recorded} of {expected} trials recorded")]
    IncompleteCell {
        /// Cell that was queried
        cell: ExperimentCell,
        /// Trials recorded so far
        recorded: usize,
        /// Trials required (R)
        expected: usize,
    },

    /// A trial was recorded for a cell that already holds R
    #[error("cell {cell} already holds all {expected} trials")]
    CellFull {
        /// Cell that was written
        cell: ExperimentCell,
        /// Trials per cell (R)
        expected: usize,
    },
}

/// Per-cell trial measurements in seconds
#[derive(Debug, Clone)]
pub struct ResultTable {
    repeat: usize,
    trials: BTreeMap<ExperimentCell, Vec<f64>>,
}

impl ResultTable {
    /// Create an empty table expecting `repeat` trials per cell
    pub fn new(repeat: u32) -> Self {
        Self {
            repeat: repeat as usize,
            trials: BTreeMap::new(),
        }
    }

    /// Trials each cell must hold before it has a mean
    pub fn repeat(&self) -> usize {
        self.repeat
    }

    /// Append one trial measurement for `cell`
    pub fn record(&mut self, cell: ExperimentCell, elapsed_secs: f64) -> Result<(), TableError> {
        let trials = self.trials.entry(cell).or_default();
        if trials.len() >= self.repeat {
            return Err(TableError::CellFull {
                cell,
                expected: self.repeat,
            });
        }
        trials.push(elapsed_secs);
        Ok(())
    }

    /// Mean elapsed time of a complete cell
    pub fn mean_of(&self, cell: &ExperimentCell) -> Result<f64, TableError> {
        let trials = self.trials.get(cell).map(Vec::as_slice).unwrap_or(&[]);
        if trials.len() != self.repeat || trials.is_empty() {
            return Err(TableError::IncompleteCell {
                cell: *cell,
                recorded: trials.len(),
                expected: self.repeat,
            });
        }
        Ok(trials.iter().sum::<f64>() / trials.len() as f64)
    }

    /// Raw trials recorded so far for `cell`
    pub fn trials_of(&self, cell: &ExperimentCell) -> &[f64] {
        self.trials.get(cell).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Whether `cell` holds exactly R trials
    pub fn is_complete(&self, cell: &ExperimentCell) -> bool {
        self.repeat > 0 && self.trials_of(cell).len() == self.repeat
    }

    /// Every cell that has at least one trial, in cell order
    pub fn cells(&self) -> impl Iterator<Item = &ExperimentCell> {
        self.trials.keys()
    }

    /// Means of all complete cells, in cell order
    pub fn means(&self) -> BTreeMap<ExperimentCell, f64> {
        self.trials
            .keys()
            .filter_map(|cell| self.mean_of(cell).ok().map(|mean| (*cell, mean)))
            .collect()
    }

    /// Whether no trial has been recorded yet
    pub fn is_empty(&self) -> bool {
        self.trials.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use scalebench_core::Mode;

    #[test]
    fn test_mean_of_three_trials() {
        let cell = ExperimentCell::new(Mode::Parallel, 4);
        let mut table = ResultTable::new(3);
        for value in [1.0, 2.0, 3.0] {
            table.record(cell, value).unwrap();
        }
        assert_eq!(table.mean_of(&cell).unwrap(), 2.0);
        assert!(table.is_complete(&cell));
    }

    #[test]
    fn test_incomplete_cell() {
        let cell = ExperimentCell::new(Mode::WorkStealing, 2);
        let mut table = ResultTable::new(3);
        table.record(cell, 1.0).unwrap();
        table.record(cell, 2.0).unwrap();

        assert_eq!(
            table.mean_of(&cell),
            Err(TableError::IncompleteCell {
                cell,
                recorded: 2,
                expected: 3
            })
        );
        assert!(table.means().is_empty());
    }

    #[test]
    fn test_unknown_cell_is_incomplete() {
        let table = ResultTable::new(1);
        assert!(matches!(
            table.mean_of(&ExperimentCell::BASELINE),
            Err(TableError::IncompleteCell { recorded: 0, .. })
        ));
    }

    #[test]
    fn test_cell_is_write_once() {
        let mut table = ResultTable::new(1);
        table.record(ExperimentCell::BASELINE, 4.0).unwrap();
        assert!(matches!(
            table.record(ExperimentCell::BASELINE, 5.0),
            Err(TableError::CellFull { expected: 1, .. })
        ));
        assert_eq!(table.trials_of(&ExperimentCell::BASELINE), &[4.0]);
    }

    #[test]
    fn test_means_in_cell_order() {
        let mut table = ResultTable::new(1);
        let ws = ExperimentCell::new(Mode::WorkStealing, 2);
        let par = ExperimentCell::new(Mode::Parallel, 2);
        table.record(ws, 3.0).unwrap();
        table.record(par, 2.0).unwrap();
        table.record(ExperimentCell::BASELINE, 6.0).unwrap();

        let means: Vec<_> = table.means().into_iter().collect();
        assert_eq!(
            means,
            vec![(ExperimentCell::BASELINE, 6.0), (par, 2.0), (ws, 3.0)]
        );
    }
}
