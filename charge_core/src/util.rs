//! Current, power and time helpers for the scheduler.

use std::time::Duration;

use chrono::{DateTime, DurationRound, TimeDelta, Utc};

/// Clamp `amps` into `[min, max]`. `min > max` is rejected at build time.
#[inline]
pub fn clamp_current(amps: u32, min: u32, max: u32) -> u32 {
    amps.max(min).min(max)
}

/// Current assumed for estimation when nothing is delivered yet:
/// `clamp(round(max * utilization), min, max)`.
/// Non-finite products fall back to `min`.
#[inline]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn start_current(min: u32, max: u32, utilization: f64) -> u32 {
    let scaled = (f64::from(max) * utilization).round();
    let amps = if !scaled.is_finite() || scaled <= 0.0 {
        0
    } else if scaled >= f64::from(u32::MAX) {
        u32::MAX
    } else {
        scaled as u32
    };
    clamp_current(amps, min, max)
}

/// Instantaneous power in watts for `amps` on `phases` at `voltage`.
#[inline]
pub fn power_w(amps: u32, phases: u32, voltage: f64) -> f64 {
    f64::from(amps) * f64::from(phases) * voltage
}

/// Round to the nearest whole minute; exact half minutes round up.
#[inline]
pub fn round_to_minute(t: DateTime<Utc>) -> DateTime<Utc> {
    t.duration_round(TimeDelta::minutes(1)).unwrap_or(t)
}

/// `now + remaining`, rounded to the minute.
///
/// Durations past the representable range saturate to `DateTime::MAX_UTC`,
/// which compares after any deadline.
pub fn finish_at(now: DateTime<Utc>, remaining: Duration) -> DateTime<Utc> {
    TimeDelta::from_std(remaining)
        .ok()
        .and_then(|d| now.checked_add_signed(d))
        .map_or(DateTime::<Utc>::MAX_UTC, round_to_minute)
}
