//! Misc utilities.

use chrono::{DateTime, Utc};

/// Renders a timestamp relative to now, such as "3 days ago".
pub fn last_seen(timestamp: DateTime<Utc>) -> String {
    last_seen_at(timestamp, Utc::now())
}

/// Renders `timestamp` relative to `now`.
///
/// Timestamps in the future are treated as happening just now.
pub fn last_seen_at(timestamp: DateTime<Utc>, now: DateTime<Utc>) -> String {
    const MINUTE: i64 = 60;
    const HOUR: i64 = 60 * MINUTE;
    const DAY: i64 = 24 * HOUR;
    const MONTH: i64 = 30 * DAY;
    const YEAR: i64 = 365 * DAY;

    let secs = (now - timestamp).num_seconds();

    let (count, unit) = match secs {
        s if s < 10 => return "just now".to_string(),
        s if s < MINUTE => (s, "second"),
        s if s < HOUR => (s / MINUTE, "minute"),
        s if s < DAY => (s / HOUR, "hour"),
        s if s < MONTH => (s / DAY, "day"),
        s if s < YEAR => (s / MONTH, "month"),
        s => (s / YEAR, "year"),
    };

    if count == 1 {
        format!("1 {} ago", unit)
    } else {
        format!("{} {}s ago", count, unit)
    }
}
