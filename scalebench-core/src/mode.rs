//! Execution Modes
//!
//! The closed set of concurrency strategies the engine under test supports.
//! Each mode owns the token passed on the engine command line and the marker
//! the engine prints next to its elapsed time.

use serde::{Deserialize, Serialize};

/// Concurrency strategy of the engine under test
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Mode {
    /// Single-threaded reference run (the baseline)
    #[serde(rename = "s", alias = "sequential")]
    Sequential,
    /// Fixed thread-count parallel search
    #[serde(rename = "p", alias = "parallel")]
    Parallel,
    /// Work-stealing parallel search
    #[serde(rename = "w", alias = "work-stealing", alias = "workstealing")]
    WorkStealing,
}

impl Mode {
    /// All modes in canonical order
    pub const ALL: [Mode; 3] = [Mode::Sequential, Mode::Parallel, Mode::WorkStealing];

    /// Positional token understood by the engine (`s`, `p`, `w`)
    pub fn token(self) -> &'static str {
        match self {
            Mode::Sequential => "s",
            Mode::Parallel => "p",
            Mode::WorkStealing => "w",
        }
    }

    /// Marker preceding the elapsed time in engine output (without the colon)
    pub fn marker(self) -> &'static str {
        match self {
            Mode::Sequential => "S-TIME",
            Mode::Parallel => "P-TIME",
            Mode::WorkStealing => "WS-TIME",
        }
    }

    /// Long name used in progress lines
    pub fn label(self) -> &'static str {
        match self {
            Mode::Sequential => "Sequential",
            Mode::Parallel => "Parallel",
            Mode::WorkStealing => "Work-Stealing",
        }
    }

    /// Name shown in the chart legend
    pub fn legend(self) -> &'static str {
        match self {
            Mode::Sequential => "Sequential",
            Mode::Parallel => "Parallel Threads",
            Mode::WorkStealing => "Work Stealing",
        }
    }

    /// Whether this mode runs on exactly one thread
    pub fn is_sequential(self) -> bool {
        matches!(self, Mode::Sequential)
    }
}

impl std::fmt::Display for Mode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

impl std::str::FromStr for Mode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "s" | "seq" | "sequential" => Ok(Mode::Sequential),
            "p" | "par" | "parallel" => Ok(Mode::Parallel),
            "w" | "ws" | "work-stealing" | "workstealing" => Ok(Mode::WorkStealing),
            other => Err(format!("Unknown mode: {}", other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tokens_and_markers() {
        assert_eq!(Mode::Sequential.token(), "s");
        assert_eq!(Mode::Parallel.token(), "p");
        assert_eq!(Mode::WorkStealing.token(), "w");
        assert_eq!(Mode::Sequential.marker(), "S-TIME");
        assert_eq!(Mode::Parallel.marker(), "P-TIME");
        assert_eq!(Mode::WorkStealing.marker(), "WS-TIME");
    }

    #[test]
    fn test_parse_mode() {
        assert_eq!("s".parse::<Mode>().unwrap(), Mode::Sequential);
        assert_eq!("Parallel".parse::<Mode>().unwrap(), Mode::Parallel);
        assert_eq!("WORK-STEALING".parse::<Mode>().unwrap(), Mode::WorkStealing);
        assert!("x".parse::<Mode>().is_err());
    }

    #[test]
    fn test_canonical_order() {
        let mut modes = vec![Mode::WorkStealing, Mode::Sequential, Mode::Parallel];
        modes.sort();
        assert_eq!(modes, Mode::ALL.to_vec());
    }
}
