//! Engine Output Parsing
//!
//! Extracts the elapsed time from raw engine output. The engine may print any
//! amount of diagnostic text; only the first line carrying the mode's marker
//! (`S-TIME:`, `P-TIME:` or `WS-TIME:`) counts. Later markers are ignored.

use regex::Regex;
use scalebench_core::Mode;
use std::sync::OnceLock;
use thiserror::Error;

/// Engine output without a usable timing
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    /// The mode's marker never appears
    #[error("no `{marker}:` line in {mode} engine output")]
    MarkerNotFound {
        /// Mode whose marker was expected
        mode: Mode,
        /// The expected marker
        marker: &'static str,
    },

    /// The marker is followed by a negative or non-finite number
    #[error("`{marker}:` carries an unusable elapsed time `{value}`")]
    InvalidValue {
        /// Marker that matched
        marker: &'static str,
        /// Text captured after it
        value: String,
    },
}

/// Build the pattern for a marker. The marker must not be preceded by a word
/// character or hyphen, so `S-TIME:` never matches inside `WS-TIME:`.
fn marker_pattern(marker: &str) -> Regex {
    let pattern = format!(
        r"(?:^|[^\w-]){}:[ \t]*([-+]?\d+(?:\.\d+)?(?:[eE][-+]?\d+)?)",
        regex::escape(marker)
    );
    // Safety: the marker is escaped, so the pattern always compiles
    Regex::new(&pattern).unwrap()
}

fn pattern_for(mode: Mode) -> &'static Regex {
    static SEQUENTIAL_RE: OnceLock<Regex> = OnceLock::new();
    static PARALLEL_RE: OnceLock<Regex> = OnceLock::new();
    static WORK_STEALING_RE: OnceLock<Regex> = OnceLock::new();

    let cell = match mode {
        Mode::Sequential => &SEQUENTIAL_RE,
        Mode::Parallel => &PARALLEL_RE,
        Mode::WorkStealing => &WORK_STEALING_RE,
    };
    cell.get_or_init(|| marker_pattern(mode.marker()))
}

/// Parse the elapsed seconds reported for `mode` out of `raw`
pub fn parse_elapsed(raw: &str, mode: Mode) -> Result<f64, ParseError> {
    let marker = mode.marker();
    let captures = pattern_for(mode)
        .captures(raw)
        .ok_or(ParseError::MarkerNotFound { mode, marker })?;
    let value = &captures[1];

    match value.parse::<f64>() {
        Ok(secs) if secs.is_finite() && secs >= 0.0 => Ok(secs),
        _ => Err(ParseError::InvalidValue {
            marker,
            value: value.to_string(),
        }),
    }
}
