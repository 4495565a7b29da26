//! Duration parsing for jstack header fields and the `--sample` flag.
//!
//! Accepts the grammar jstack emits for `cpu=` / `elapsed=` markers: one or
//! more `<decimal><unit>` components, e.g. `12.5ms`, `340ms`, `1m30s`.
//! Recognized units are `ns`, `us`/`µs`, `ms`, `s`, `m` and `h`.

use std::time::Duration;
use thiserror::Error;

/// Errors produced while parsing a duration string.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DurationError {
    #[error("empty duration")]
    Empty,

    #[error("negative duration \"{0}\"")]
    Negative(String),

    #[error("invalid number in duration \"{0}\"")]
    InvalidNumber(String),

    #[error("missing or unknown unit in duration \"{0}\"")]
    UnknownUnit(String),

    #[error("duration \"{0}\" out of range")]
    OutOfRange(String),
}

/// Parse a non-negative duration such as `2s`, `12.5ms` or `1m30s`.
pub fn parse_duration(input: &str) -> Result<Duration, DurationError> {
    let mut s = input;
    if s.is_empty() {
        return Err(DurationError::Empty);
    }
    if let Some(rest) = s.strip_prefix('+') {
        s = rest;
    }
    if s.starts_with('-') {
        return Err(DurationError::Negative(input.to_string()));
    }
    // A bare zero needs no unit.
    if s == "0" {
        return Ok(Duration::ZERO);
    }

    let mut total = 0.0_f64;
    while !s.is_empty() {
        let num_len = s
            .find(|c: char| !c.is_ascii_digit() && c != '.')
            .unwrap_or(s.len());
        let value: f64 = s[..num_len]
            .parse()
            .map_err(|_| DurationError::InvalidNumber(input.to_string()))?;
        s = &s[num_len..];

        // Longest unit first so "ms" is not read as "m".
        let (scale, unit_len) = if let Some(r) = s.strip_prefix("ns") {
            (1e-9, s.len() - r.len())
        } else if let Some(r) = s.strip_prefix("us").or_else(|| s.strip_prefix("µs")) {
            (1e-6, s.len() - r.len())
        } else if let Some(r) = s.strip_prefix("ms") {
            (1e-3, s.len() - r.len())
        } else if s.starts_with('s') {
            (1.0, 1)
        } else if s.starts_with('m') {
            (60.0, 1)
        } else if s.starts_with('h') {
            (3600.0, 1)
        } else {
            return Err(DurationError::UnknownUnit(input.to_string()));
        };
        total += value * scale;
        s = &s[unit_len..];
    }

    // A syntactically valid value can still exceed what Duration can hold
    // (e.g. an absurd hour count); surface that as an error, not a panic.
    Duration::try_from_secs_f64(total).map_err(|_| DurationError::OutOfRange(input.to_string()))
}
