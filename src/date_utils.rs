use std::fmt;

use chrono::{DateTime, Datelike, Duration, NaiveDate};
use serde::Serialize;

use crate::error::{AppError, AppResult};

/// Calendar years accepted anywhere a date or year comes in. Dates outside
/// this window do not round-trip through `YYYY-MM-DD` text.
pub const MIN_YEAR: i32 = 1;
pub const MAX_YEAR: i32 = 9999;

pub const MONTH_NAMES: [&str; 12] = [
    "January",
    "February",
    "March",
    "April",
    "May",
    "June",
    "July",
    "August",
    "September",
    "October",
    "November",
    "December",
];

/// Inclusive date window.
///
/// `start <= end` is not enforced; a reversed range simply matches nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DateRange {
    #[serde(rename = "startDate")]
    pub start: NaiveDate,
    #[serde(rename = "endDate")]
    pub end: NaiveDate,
}

impl DateRange {
    pub fn from_dates(start: NaiveDate, end: NaiveDate) -> Self {
        Self { start, end }
    }

    /// The `days` calendar days ending on `end`, inclusive of both bounds.
    pub fn trailing_days(end: NaiveDate, days: u32) -> Self {
        let span = i64::from(days.max(1)) - 1;
        Self {
            start: end - Duration::days(span),
            end,
        }
    }

    /// January 1st through December 31st of `year`.
    pub fn for_year(year: i32) -> Option<Self> {
        Self::for_years(year, year)
    }

    /// January 1st of `start_year` through December 31st of `end_year`, or
    /// `None` when either year is outside `MIN_YEAR..=MAX_YEAR`.
    pub fn for_years(start_year: i32, end_year: i32) -> Option<Self> {
        if !is_supported_year(start_year) || !is_supported_year(end_year) {
            return None;
        }
        Some(Self {
            start: NaiveDate::from_ymd_opt(start_year, 1, 1)?,
            end: NaiveDate::from_ymd_opt(end_year, 12, 31)?,
        })
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }

    /// Every day in the range, oldest first. Empty when the range is reversed.
    pub fn days(&self) -> impl Iterator<Item = NaiveDate> {
        let end = self.end;
        self.start.iter_days().take_while(move |d| *d <= end)
    }

    pub fn start_str(&self) -> String {
        self.start.format("%Y-%m-%d").to_string()
    }

    pub fn end_str(&self) -> String {
        self.end.format("%Y-%m-%d").to_string()
    }
}

impl fmt::Display for DateRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} to {}", self.start_str(), self.end_str())
    }
}

pub fn is_supported_year(year: i32) -> bool {
    (MIN_YEAR..=MAX_YEAR).contains(&year)
}

/// Parse a request date. Accepts `YYYY-MM-DD` or an RFC 3339 timestamp, in
/// which case only the date part is kept. Years outside `MIN_YEAR..=MAX_YEAR`
/// are rejected.
pub fn parse_date(value: &str) -> AppResult<NaiveDate> {
    let trimmed = value.trim();
    NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")
        .ok()
        .or_else(|| {
            DateTime::parse_from_rfc3339(trimmed)
                .ok()
                .map(|dt| dt.date_naive())
        })
        .filter(|date| is_supported_year(date.year()))
        .ok_or_else(|| AppError::Validation(format!("Invalid date '{}'", value)))
}

pub fn month_name(month: u32) -> &'static str {
    MONTH_NAMES
        .get(month.saturating_sub(1) as usize)
        .copied()
        .unwrap_or("Unknown")
}

/// `(year, month)` key used for calendar-month buckets.
pub fn month_key(date: NaiveDate) -> (i32, u32) {
    (date.year(), date.month())
}

/// Every `(year, month)` from `first` to `last`, inclusive, in calendar order.
pub fn months_between(first: (i32, u32), last: (i32, u32)) -> Vec<(i32, u32)> {
    let mut months = Vec::new();
    let (mut year, mut month) = first;
    while (year, month) <= last {
        months.push((year, month));
        if month == 12 {
            year += 1;
            month = 1;
        } else {
            month += 1;
        }
    }
    months
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_trailing_days_is_inclusive() {
        let range = DateRange::trailing_days(date(2024, 3, 3), 7);
        assert_eq!(range.start, date(2024, 2, 26));
        let days: Vec<_> = range.days().collect();
        assert_eq!(days.len(), 7);
        assert_eq!(days[0], date(2024, 2, 26));
        assert_eq!(days[6], date(2024, 3, 3));
    }

    #[test]
    fn test_reversed_range_has_no_days() {
        let range = DateRange::from_dates(date(2024, 2, 1), date(2024, 1, 1));
        assert_eq!(range.days().count(), 0);
        assert!(!range.contains(date(2024, 1, 15)));
    }

    #[test]
    fn test_parse_date_formats() {
        assert_eq!(parse_date("2024-05-17").unwrap(), date(2024, 5, 17));
        assert_eq!(
            parse_date("2024-05-17T10:30:00Z").unwrap(),
            date(2024, 5, 17)
        );
        assert!(parse_date("17/05/2024").is_err());
        assert!(parse_date("").is_err());
    }

    #[test]
    fn test_parse_date_rejects_years_past_four_digits() {
        assert!(parse_date("+10000-06-01").is_err());
        assert!(parse_date("0000-06-01").is_err());
        assert!(parse_date("-0001-06-01").is_err());
        assert_eq!(parse_date("9999-12-31").unwrap(), date(9999, 12, 31));
        assert_eq!(parse_date("0001-01-01").unwrap(), date(1, 1, 1));
    }

    #[test]
    fn test_year_ranges_stay_in_calendar() {
        assert!(DateRange::for_years(9990, 10010).is_none());
        assert!(DateRange::for_years(0, 5).is_none());
        assert!(DateRange::for_year(10_000).is_none());
        let range = DateRange::for_years(2020, 2021).unwrap();
        assert_eq!(range.to_string(), "2020-01-01 to 2021-12-31");
    }

    #[test]
    fn test_months_between_crosses_year() {
        let months = months_between((2023, 11), (2024, 2));
        assert_eq!(months, vec![(2023, 11), (2023, 12), (2024, 1), (2024, 2)]);
        assert!(months_between((2024, 2), (2023, 11)).is_empty());
    }

    #[test]
    fn test_month_name() {
        assert_eq!(month_name(1), "January");
        assert_eq!(month_name(12), "December");
        assert_eq!(month_name(13), "Unknown");
    }
}
