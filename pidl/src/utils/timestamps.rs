//! UTC timestamps and millisecond durations for events and context stamps.

use chrono::{DateTime, Utc};
use std::time::Instant;

/// The timestamp type stamped into the context as `run_date`.
pub type Timestamp = DateTime<Utc>;

/// Returns the current UTC time as an ISO 8601 formatted string:
/// `YYYY-MM-DDTHH:MM:SS.ffffff+00:00`.
#[must_use]
pub fn iso_timestamp() -> String {
    Utc::now().format("%Y-%m-%dT%H:%M:%S%.6f+00:00").to_string()
}

/// Returns the current UTC timestamp.
#[must_use]
pub fn now_utc() -> Timestamp {
    Utc::now()
}

/// Returns the whole milliseconds elapsed since `start`.
///
/// Event payloads carry durations as integers; fractional milliseconds are
/// truncated.
#[must_use]
pub fn duration_ms(start: Instant) -> u64 {
    u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_iso_timestamp_is_utc() {
        let ts = iso_timestamp();
        assert!(ts.ends_with("+00:00"));
    }

    #[test]
    fn test_duration_ms_truncates() {
        let start = Instant::now() - Duration::from_micros(2500);
        assert!(duration_ms(start) >= 2);
    }
}
