//! Timestamp value object for immutable points in time.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Immutable point in time, always UTC.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Timestamp(DateTime<Utc>);

impl Timestamp {
    /// Creates a timestamp for the current moment.
    pub fn now() -> Self {
        Self(Utc::now())
    }

    /// Creates a timestamp from a DateTime<Utc>.
    pub fn from_datetime(dt: DateTime<Utc>) -> Self {
        Self(dt)
    }

    /// Returns the duration from another timestamp to this one.
    ///
    /// Returns negative duration if other is after self.
    pub fn duration_since(&self, other: &Timestamp) -> Duration {
        self.0.signed_duration_since(other.0)
    }

    /// Creates a new timestamp by adding the specified number of seconds.
    pub fn plus_secs(&self, secs: u64) -> Self {
        Self(self.0 + Duration::seconds(secs as i64))
    }

    /// Returns the timestamp as Unix seconds.
    pub fn as_unix_secs(&self) -> u64 {
        self.0.timestamp().max(0) as u64
    }

    /// Calendar date as `yyyy-mm-dd`.
    ///
    /// Extraction prompts use this as the reference date for date math.
    pub fn iso_date(&self) -> String {
        self.0.format("%Y-%m-%d").to_string()
    }

    /// Calendar date in long form, e.g. `Monday, October 19, 2026`.
    pub fn long_date(&self) -> String {
        self.0.format("%A, %B %-d, %Y").to_string()
    }
}

impl Default for Timestamp {
    fn default() -> Self {
        Self::now()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn fixed() -> Timestamp {
        Timestamp::from_datetime(Utc.with_ymd_and_hms(2026, 10, 19, 14, 30, 0).unwrap())
    }

    #[test]
    fn iso_date_formats_calendar_day() {
        assert_eq!(fixed().iso_date(), "2026-10-19");
    }

    #[test]
    fn long_date_includes_weekday_and_month() {
        assert_eq!(fixed().long_date(), "Monday, October 19, 2026");
    }

    #[test]
    fn plus_secs_moves_forward() {
        let ts = fixed();
        let later = ts.plus_secs(900);
        assert_eq!(later.duration_since(&ts), Duration::seconds(900));
        assert_eq!(later.as_unix_secs() - ts.as_unix_secs(), 900);
    }

    #[test]
    fn timestamps_order_chronologically() {
        let ts = fixed();
        assert!(ts < ts.plus_secs(1));
    }
}
