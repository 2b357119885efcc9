#![warn(missing_docs)]
//! Scalebench Statistics
//!
//! Turns raw trial timings into the two tables the harness reports:
//! - [`ResultTable`]: arithmetic mean per cell over exactly R trials
//! - [`SpeedupTable`]: baseline mean divided by each other cell's mean

mod speedup;
mod table;

pub use speedup::{SpeedupError, SpeedupSeries, SpeedupTable, compute_speedups};
pub use table::{ResultTable, TableError};
