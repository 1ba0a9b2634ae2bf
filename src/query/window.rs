//! Recency filtering over a time-ordered series

use crate::core::sample::Sample;
use crate::core::temporal::Timestamp;
use chrono::Duration;

/// Window the dashboard charts by default
pub const DASHBOARD_WINDOW_HOURS: i64 = 120;

/// Longest look-back accepted from the command line, about a century
pub const MAX_LOOKBACK_HOURS: i64 = 24 * 36_525;

/// Look-back of `hours`, or `None` outside `1..=MAX_LOOKBACK_HOURS`
pub fn lookback_hours(hours: i64) -> Option<Duration> {
    if !(1..=MAX_LOOKBACK_HOURS).contains(&hours) {
        return None;
    }
    Duration::try_hours(hours)
}

/// Look-back of `days`, bounded like [`lookback_hours`]
pub fn lookback_days(days: i64) -> Option<Duration> {
    days.checked_mul(24).and_then(lookback_hours)
}

/// Keep samples strictly younger than `window` as seen from `now`.
///
/// Samples stamped after `now` (sensor clock ahead) are kept.
pub fn within(samples: &[Sample], now: Timestamp, window: Duration) -> Vec<Sample> {
    samples
        .iter()
        .filter(|s| now.since(s.timestamp()) < window)
        .copied()
        .collect()
}

/// Most recent sample of a chronologically sorted series
pub fn latest(samples: &[Sample]) -> Option<&Sample> {
    samples.last()
}
