#![warn(missing_docs)]
//! Scalebench Core - Experiment Model
//!
//! This crate describes what an experiment measures:
//! - [`Mode`]: the closed set of engine concurrency strategies
//! - [`ExperimentCell`]: a (mode, thread count) measurement bucket
//! - [`ConfigSpace`]: the immutable, ordered set of cells plus the constant
//!   engine parameters (repeat count, start token, depth)

mod cell;
mod mode;
mod space;

pub use cell::ExperimentCell;
pub use mode::Mode;
pub use space::{
    ConfigError, ConfigSpace, ConfigSpaceBuilder, DEFAULT_DEPTH, DEFAULT_REPEAT,
    DEFAULT_START_TOKEN, DEFAULT_THREAD_COUNTS,
};
