//! ---
//! wtp_section: "00-shared-runtime"
//! wtp_subsection: "module"
//! wtp_type: "source"
//! wtp_scope: "code"
//! wtp_description: "Shared primitives and utilities for the simulator runtime."
//! wtp_version: "v0.0.0-prealpha"
//! wtp_owner: "tbd"
//! ---
//! Conversions between the simulated clock (`DateTime<Utc>`) and the
//! floating-point seconds the stage models integrate over.
use std::time::Duration;

use chrono::{DateTime, Utc};

/// Advance a simulated timestamp by `seconds`, rounded to the microsecond.
/// Non-finite or unrepresentable offsets leave the timestamp unchanged.
pub fn advance(at: DateTime<Utc>, seconds: f64) -> DateTime<Utc> {
    checked_advance(at, seconds).unwrap_or(at)
}

/// Like [`advance`], but `None` when `seconds` is not finite or the result
/// falls outside the representable calendar range.
pub fn checked_advance(at: DateTime<Utc>, seconds: f64) -> Option<DateTime<Utc>> {
    if !seconds.is_finite() {
        return None;
    }
    let micros = (seconds * 1_000_000.0).round();
    if micros.abs() >= i64::MAX as f64 {
        return None;
    }
    at.checked_add_signed(chrono::Duration::microseconds(micros as i64))
}

/// Signed seconds from `earlier` to `later`.
pub fn seconds_between(earlier: DateTime<Utc>, later: DateTime<Utc>) -> f64 {
    let delta = later - earlier;
    match delta.num_microseconds() {
        Some(us) => us as f64 / 1_000_000.0,
        None => delta.num_milliseconds() as f64 / 1_000.0,
    }
}

/// Convert a duration into microseconds, saturating at `u64::MAX`.
pub fn duration_to_micros(duration: Duration) -> u64 {
    duration
        .as_secs()
        .saturating_mul(1_000_000)
        .saturating_add(u64::from(duration.subsec_micros()))
}

/// Signed difference between an observed and expected interval, in microseconds.
pub fn jitter_us(actual: Duration, expected: Duration) -> i64 {
    let actual_us = actual.as_secs_f64() * 1_000_000.0;
    let expected_us = expected.as_secs_f64() * 1_000_000.0;
    (actual_us - expected_us).round() as i64
}
