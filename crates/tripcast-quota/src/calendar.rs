// SPDX-FileCopyrightText: 2026 Tripcast Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The calendar day a daily limit applies to.
//!
//! Gateways reset their counters at local midnight of the account's
//! timezone, not UTC midnight. All "today" computations go through
//! [`QuotaCalendar`].

use chrono::{DateTime, Duration, FixedOffset, NaiveDate, TimeZone, Utc};
use tripcast_core::{TripcastError, format_timestamp};

/// Fixed UTC offset calendar.
#[derive(Debug, Clone, Copy)]
pub struct QuotaCalendar {
    offset: FixedOffset,
}

impl QuotaCalendar {
    /// Builds a calendar `utc_offset_minutes` east of UTC.
    pub fn new(utc_offset_minutes: i32) -> Result<Self, TripcastError> {
        let offset = FixedOffset::east_opt(utc_offset_minutes * 60).ok_or_else(|| {
            TripcastError::Config(format!("invalid UTC offset: {utc_offset_minutes} minutes"))
        })?;
        Ok(Self { offset })
    }

    /// Calendar date of `at` in this calendar.
    pub fn date_of(&self, at: DateTime<Utc>) -> NaiveDate {
        at.with_timezone(&self.offset).date_naive()
    }

    /// Today's date in this calendar.
    pub fn today(&self) -> NaiveDate {
        self.date_of(Utc::now())
    }

    /// UTC timestamp bounds `[start, end)` of `date`, formatted like stored
    /// timestamps so they can be compared as text.
    pub fn day_bounds(&self, date: NaiveDate) -> (String, String) {
        let start_local = date.and_hms_opt(0, 0, 0).unwrap_or_default();
        let start = self
            .offset
            .from_local_datetime(&start_local)
            .single()
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or_else(|| Utc.from_utc_datetime(&start_local));
        let end = start + Duration::days(1);
        (format_timestamp(start), format_timestamp(end))
    }
}

/// Parses a `YYYY-MM-DD` date argument.
pub fn parse_date(raw: &str) -> Result<NaiveDate, TripcastError> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .map_err(|_| TripcastError::Validation(format!("`{raw}` is not a YYYY-MM-DD date")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ist_day_starts_before_utc_midnight() {
        let calendar = QuotaCalendar::new(330).unwrap();
        // 20:00 UTC on Mar 1 is 01:30 IST on Mar 2.
        let at = Utc.with_ymd_and_hms(2026, 3, 1, 20, 0, 0).unwrap();
        assert_eq!(calendar.date_of(at), NaiveDate::from_ymd_opt(2026, 3, 2).unwrap());
    }

    #[test]
    fn day_bounds_are_shifted_by_offset() {
        let calendar = QuotaCalendar::new(330).unwrap();
        let (start, end) = calendar.day_bounds(NaiveDate::from_ymd_opt(2026, 3, 2).unwrap());
        assert_eq!(start, "2026-03-01T18:30:00.000Z");
        assert_eq!(end, "2026-03-02T18:30:00.000Z");
    }

    #[test]
    fn utc_calendar_bounds() {
        let calendar = QuotaCalendar::new(0).unwrap();
        let (start, end) = calendar.day_bounds(NaiveDate::from_ymd_opt(2026, 3, 2).unwrap());
        assert_eq!(start, "2026-03-02T00:00:00.000Z");
        assert_eq!(end, "2026-03-03T00:00:00.000Z");
    }

    #[test]
    fn out_of_range_offset_is_config_error() {
        assert!(matches!(
            QuotaCalendar::new(24 * 60),
            Err(TripcastError::Config(_))
        ));
    }

    #[test]
    fn parse_date_rejects_garbage() {
        assert!(parse_date("2026-03-02").is_ok());
        assert!(matches!(parse_date("yesterday"), Err(TripcastError::Validation(_))));
    }
}
