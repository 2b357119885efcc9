//! Experiment Cells

use crate::mode::Mode;
use serde::{Deserialize, Serialize};

/// One measurement bucket: a mode paired with a thread count
///
/// Cells order by mode first, then by thread count, so maps keyed by cell
/// iterate in the same order the experiment runs them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ExperimentCell {
    /// Concurrency strategy
    pub mode: Mode,
    /// Number of engine threads
    pub threads: u32,
}

impl ExperimentCell {
    /// The reference cell every speedup is measured against
    pub const BASELINE: ExperimentCell = ExperimentCell {
        mode: Mode::Sequential,
        threads: 1,
    };

    /// Create a cell. Sequential cells always run on one thread.
    pub fn new(mode: Mode, threads: u32) -> Self {
        let threads = if mode.is_sequential() { 1 } else { threads };
        Self { mode, threads }
    }

    /// Whether this is the Sequential/1 baseline
    pub fn is_baseline(&self) -> bool {
        *self == Self::BASELINE
    }
}

impl std::fmt::Display for ExperimentCell {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.mode.label(), self.threads)
    }
}
