//! Production-speed parsing.
//!
//! Production details embed their duration as a literal marker, e.g.
//! `"BUDI selesai kopi (Durasi: 32s)"`. Parsing lives here, away from the
//! aggregation, so the marker format is testable in isolation.

use once_cell::sync::Lazy;
use regex::Regex;

static DURATION_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"Durasi: (\d+)s").expect("duration pattern is valid"));

/// Extracts the duration in seconds from a production detail line.
///
/// The marker is the first run of digits immediately after the literal
/// `Durasi: ` and immediately before a literal `s`. A missing or malformed
/// marker (including digits too large to represent) yields `None`, and the
/// record simply drops out of the speed average.
pub fn extract_duration_secs(detail: &str) -> Option<u64> {
    DURATION_RE
        .captures(detail)
        .and_then(|caps| caps.get(1))
        .and_then(|digits| digits.as_str().parse().ok())
}

/// Mean of the given durations, rounded half-up; zero when empty.
///
/// The sum is widened to `u128` so inputs near `u64::MAX`, which the
/// marker grammar happily produces, cannot overflow the accumulator.
pub fn mean_rounded(durations: &[u64]) -> u64 {
    if durations.is_empty() {
        return 0;
    }
    let sum: u128 = durations.iter().map(|&d| u128::from(d)).sum();
    (sum as f64 / durations.len() as f64).round() as u64
}
