//! Calendar windows for quota counting
//!
//! Days start at local midnight; weeks start at local midnight on Monday.

use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveTime, TimeZone};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Window {
    Day,
    Week,
}

impl Window {
    fn first_day(&self, date: NaiveDate) -> NaiveDate {
        match self {
            Window::Day => date,
            Window::Week => date - Duration::days(date.weekday().num_days_from_monday() as i64),
        }
    }

    fn length(&self) -> Duration {
        match self {
            Window::Day => Duration::days(1),
            Window::Week => Duration::days(7),
        }
    }

    /// Start of the window containing `now`, in the zone of `now`.
    pub fn start<Tz: TimeZone>(&self, now: &DateTime<Tz>) -> DateTime<Tz> {
        midnight(&now.timezone(), self.first_day(now.date_naive()))
    }

    /// Start of the window following the one containing `now`.
    pub fn next_start<Tz: TimeZone>(&self, now: &DateTime<Tz>) -> DateTime<Tz> {
        midnight(
            &now.timezone(),
            self.first_day(now.date_naive()) + self.length(),
        )
    }
}

fn midnight<Tz: TimeZone>(tz: &Tz, date: NaiveDate) -> DateTime<Tz> {
    let naive = date.and_time(NaiveTime::MIN);
    // Zones that jump over midnight have no local 00:00 on that day.
    tz.from_local_datetime(&naive)
        .earliest()
        .unwrap_or_else(|| tz.from_utc_datetime(&naive))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{FixedOffset, Utc, Weekday};

    #[test]
    fn test_day_window_start() {
        let now = Utc.with_ymd_and_hms(2026, 10, 14, 15, 30, 0).unwrap();
        let start = Window::Day.start(&now);
        assert_eq!(start, Utc.with_ymd_and_hms(2026, 10, 14, 0, 0, 0).unwrap());
        assert_eq!(
            Window::Day.next_start(&now),
            Utc.with_ymd_and_hms(2026, 10, 15, 0, 0, 0).unwrap()
        );
    }

    #[test]
    fn test_week_window_is_monday_anchored() {
        // 2026-10-14 is a Wednesday
        let now = Utc.with_ymd_and_hms(2026, 10, 14, 9, 0, 0).unwrap();
        let start = Window::Week.start(&now);
        assert_eq!(start.weekday(), Weekday::Mon);
        assert_eq!(start, Utc.with_ymd_and_hms(2026, 10, 12, 0, 0, 0).unwrap());
        assert_eq!(
            Window::Week.next_start(&now),
            Utc.with_ymd_and_hms(2026, 10, 19, 0, 0, 0).unwrap()
        );
    }

    #[test]
    fn test_week_window_on_sunday_and_monday() {
        let sunday = Utc.with_ymd_and_hms(2026, 10, 18, 23, 59, 59).unwrap();
        assert_eq!(
            Window::Week.start(&sunday),
            Utc.with_ymd_and_hms(2026, 10, 12, 0, 0, 0).unwrap()
        );

        let monday = Utc.with_ymd_and_hms(2026, 10, 19, 0, 0, 0).unwrap();
        assert_eq!(Window::Week.start(&monday), monday);
    }

    #[test]
    fn test_window_uses_local_offset() {
        let tz = FixedOffset::east_opt(9 * 3600).unwrap();
        // 20:00 UTC on the 13th is already the 14th in UTC+9
        let now = Utc
            .with_ymd_and_hms(2026, 10, 13, 20, 0, 0)
            .unwrap()
            .with_timezone(&tz);
        let start = Window::Day.start(&now);
        assert_eq!(start, tz.with_ymd_and_hms(2026, 10, 14, 0, 0, 0).unwrap());
        assert_eq!(
            start.with_timezone(&Utc),
            Utc.with_ymd_and_hms(2026, 10, 13, 15, 0, 0).unwrap()
        );
    }
}
