//! Configuration Space
//!
//! The immutable description of one experiment: which cells run, how many
//! trials each cell gets, and the constant engine parameters shared by every
//! trial. Built once through [`ConfigSpaceBuilder`] and passed by reference to
//! every component afterwards.

use crate::cell::ExperimentCell;
use crate::mode::Mode;
use thiserror::Error;

/// Default thread counts for the parallel modes
pub const DEFAULT_THREAD_COUNTS: [u32; 5] = [2, 4, 6, 8, 12];

/// Default number of trials per cell
pub const DEFAULT_REPEAT: u32 = 3;

/// Default start-position token (`f`: Fischer position)
pub const DEFAULT_START_TOKEN: &str = "f";

/// Default search depth in plies
pub const DEFAULT_DEPTH: u32 = 5;

/// Invalid experiment configuration
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// R is zero
    #[error("repeat count must be positive")]
    ZeroRepeat,

    /// Depth is zero
    #[error("search depth must be positive")]
    ZeroDepth,

    /// A thread count is zero
    #[error("thread counts must be positive")]
    ZeroThreads,

    /// Empty start-position token
    #[error("start token must not be empty")]
    EmptyStartToken,

    /// Mode list is empty
    #[error("no modes selected")]
    NoModes,

    /// A parallel mode was selected without thread counts
    #[error("mode {0} needs at least one thread count")]
    NoThreadCounts(Mode),
}

/// Immutable experiment configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigSpace {
    modes: Vec<Mode>,
    thread_counts: Vec<u32>,
    repeat: u32,
    start_token: String,
    depth: u32,
}

impl ConfigSpace {
    /// Start building a configuration from the defaults
    pub fn builder() -> ConfigSpaceBuilder {
        ConfigSpaceBuilder::default()
    }

    /// Selected modes in canonical order
    pub fn modes(&self) -> &[Mode] {
        &self.modes
    }

    /// Thread counts used by the parallel modes, ascending
    pub fn thread_counts(&self) -> &[u32] {
        &self.thread_counts
    }

    /// Trials per cell (R)
    pub fn repeat(&self) -> u32 {
        self.repeat
    }

    /// Opaque start-position token handed to the engine
    pub fn start_token(&self) -> &str {
        &self.start_token
    }

    /// Search depth handed to the engine
    pub fn depth(&self) -> u32 {
        self.depth
    }

    /// The baseline cell (Sequential/1)
    pub fn baseline(&self) -> ExperimentCell {
        ExperimentCell::BASELINE
    }

    /// All cells in execution order: Sequential/1 first, then each parallel
    /// mode across ascending thread counts.
    pub fn cells(&self) -> Vec<ExperimentCell> {
        self.modes
            .iter()
            .flat_map(|&mode| {
                if mode.is_sequential() {
                    vec![ExperimentCell::BASELINE]
                } else {
                    self.thread_counts
                        .iter()
                        .map(|&t| ExperimentCell::new(mode, t))
                        .collect()
                }
            })
            .collect()
    }

    /// Number of engine invocations the whole experiment makes
    pub fn total_trials(&self) -> u64 {
        self.cells().len() as u64 * self.repeat as u64
    }

    /// X-axis ticks for the speedup chart: the single-thread baseline followed
    /// by every configured thread count.
    pub fn chart_ticks(&self) -> Vec<u32> {
        let mut ticks = vec![1];
        ticks.extend(self.thread_counts.iter().copied().filter(|&t| t != 1));
        ticks
    }
}

impl Default for ConfigSpace {
    fn default() -> Self {
        Self {
            modes: Mode::ALL.to_vec(),
            thread_counts: DEFAULT_THREAD_COUNTS.to_vec(),
            repeat: DEFAULT_REPEAT,
            start_token: DEFAULT_START_TOKEN.to_string(),
            depth: DEFAULT_DEPTH,
        }
    }
}

/// Validating builder for [`ConfigSpace`]
#[derive(Debug, Clone)]
pub struct ConfigSpaceBuilder {
    modes: Vec<Mode>,
    thread_counts: Vec<u32>,
    repeat: u32,
    start_token: String,
    depth: u32,
}

impl Default for ConfigSpaceBuilder {
    fn default() -> Self {
        let space = ConfigSpace::default();
        Self {
            modes: space.modes,
            thread_counts: space.thread_counts,
            repeat: space.repeat,
            start_token: space.start_token,
            depth: space.depth,
        }
    }
}

impl ConfigSpaceBuilder {
    /// Select which modes run. Order is normalised to the canonical order.
    pub fn modes(mut self, modes: impl IntoIterator<Item = Mode>) -> Self {
        self.modes = modes.into_iter().collect();
        self
    }

    /// Thread counts for the parallel modes. Sorted and deduplicated on build.
    pub fn thread_counts(mut self, counts: impl IntoIterator<Item = u32>) -> Self {
        self.thread_counts = counts.into_iter().collect();
        self
    }

    /// Trials per cell
    pub fn repeat(mut self, repeat: u32) -> Self {
        self.repeat = repeat;
        self
    }

    /// Start-position token
    pub fn start_token(mut self, token: impl Into<String>) -> Self {
        self.start_token = token.into();
        self
    }

    /// Search depth
    pub fn depth(mut self, depth: u32) -> Self {
        self.depth = depth;
        self
    }

    /// Validate and freeze the configuration
    pub fn build(self) -> Result<ConfigSpace, ConfigError> {
        if self.repeat == 0 {
            return Err(ConfigError::ZeroRepeat);
        }
        if self.depth == 0 {
            return Err(ConfigError::ZeroDepth);
        }
        if self.start_token.trim().is_empty() {
            return Err(ConfigError::EmptyStartToken);
        }
        if self.thread_counts.contains(&0) {
            return Err(ConfigError::ZeroThreads);
        }

        let mut modes = self.modes;
        modes.sort();
        modes.dedup();
        if modes.is_empty() {
            return Err(ConfigError::NoModes);
        }

        let mut thread_counts = self.thread_counts;
        thread_counts.sort_unstable();
        thread_counts.dedup();
        if let Some(&mode) = modes.iter().find(|m| !m.is_sequential()) {
            if thread_counts.is_empty() {
                return Err(ConfigError::NoThreadCounts(mode));
            }
        }

        Ok(ConfigSpace {
            modes,
            thread_counts,
            repeat: self.repeat,
            start_token: self.start_token,
            depth: self.depth,
        })
    }
}
