//! Date parsing helpers shared by the year filter and the updaters.

use crate::error::{NbdtError, Result};
use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime};

/// Layout of PLOS ONE `Publication Date` cells
pub const PLOS_TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

/// Month-first layouts tried by [`parse_generic_date`] (date-only)
const GENERIC_DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d", "%Y/%m/%d", "%m/%d/%Y", "%d %b %Y", "%d %B %Y", "%b %d, %Y", "%B %d, %Y",
];

/// Layouts with a time component tried by [`parse_generic_date`]
const GENERIC_DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
];

/// Day-first layouts accepted for update boundaries. Numeric layouts always
/// read day before month; spelled-out months may lead.
const DAY_FIRST_FORMATS: &[&str] = &[
    "%d-%m-%Y", "%d/%m/%Y", "%d.%m.%Y", "%d %m %Y", "%d-%b-%Y", "%d %b %Y", "%d %B %Y", "%B %d, %Y",
    "%b %d, %Y",
];

/// Parse a date cell written in any of the common layouts.
///
/// Timezone-qualified timestamps keep their local calendar date.
pub fn parse_generic_date(value: &str) -> Option<NaiveDate> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.date_naive());
    }
    if let Ok(dt) = DateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S%:z") {
        return Some(dt.date_naive());
    }
    for fmt in GENERIC_DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(value, fmt) {
            return Some(dt.date());
        }
    }
    GENERIC_DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(value, fmt).ok())
}

/// Parse a fixed-layout timestamp such as PLOS ONE's `2021-03-04T00:00:00Z`
pub fn parse_with_format(value: &str, format: &str) -> Option<NaiveDate> {
    NaiveDateTime::parse_from_str(value.trim(), format)
        .ok()
        .map(|dt| dt.date())
}

/// Parse a user-supplied day-first date such as `15-06-2023`.
pub fn parse_day_first(value: &str) -> Result<NaiveDate> {
    let trimmed = value.trim();
    DAY_FIRST_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(trimmed, fmt).ok())
        .ok_or_else(|| {
            NbdtError::Validation(format!("'{}' is not a date (expected dd-mm-yyyy)", value))
        })
}

/// Last calendar day of `date`'s month
pub fn end_of_month(date: NaiveDate) -> NaiveDate {
    let (year, month) = if date.month() == 12 {
        (date.year() + 1, 1)
    } else {
        (date.year(), date.month() + 1)
    };
    NaiveDate::from_ymd_opt(year, month, 1)
        .and_then(|first| first.pred_opt())
        .unwrap_or(date)
}

/// Parse a day-first date and advance it to the end of its month.
pub fn month_end_boundary(value: &str) -> Result<NaiveDate> {
    parse_day_first(value).map(end_of_month)
}

/// Month number from a three-letter English month abbreviation (`Mar`).
/// Full names and seasons are not months here.
pub fn parse_month_name(token: &str) -> Option<u32> {
    let token = token.trim();
    if token.chars().count() != 3 {
        return None;
    }
    token.parse::<chrono::Month>().ok().map(|m| m.number_from_month())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_generic_date_layouts() {
        assert_eq!(parse_generic_date("2019-05-07"), Some(ymd(2019, 5, 7)));
        assert_eq!(parse_generic_date("2020-01-02T10:00:00Z"), Some(ymd(2020, 1, 2)));
        assert_eq!(parse_generic_date("2021-12-31 23:00:00+00:00"), Some(ymd(2021, 12, 31)));
        assert_eq!(parse_generic_date("03/04/2022"), Some(ymd(2022, 3, 4)));
        assert_eq!(parse_generic_date("not a date"), None);
        assert_eq!(parse_generic_date(""), None);
    }

    #[test]
    fn test_plos_timestamp() {
        assert_eq!(parse_with_format("2018-07-01T00:00:00Z", PLOS_TIMESTAMP_FORMAT), Some(ymd(2018, 7, 1)));
        assert_eq!(parse_with_format("2018-07-01", PLOS_TIMESTAMP_FORMAT), None);
    }

    #[test]
    fn test_day_first() {
        assert_eq!(parse_day_first("05-06-2023").unwrap(), ymd(2023, 6, 5));
        assert_eq!(parse_day_first("5/6/2023").unwrap(), ymd(2023, 6, 5));
        assert_eq!(parse_day_first("June 15, 2023").unwrap(), ymd(2023, 6, 15));
        assert_eq!(parse_day_first("15 Jun 2023").unwrap(), ymd(2023, 6, 15));
        // year-first input is not a day-first date
        assert!(parse_day_first("2023-06-05").is_err());
        assert!(matches!(parse_day_first("yesterday"), Err(NbdtError::Validation(_))));
    }

    #[test]
    fn test_end_of_month() {
        assert_eq!(end_of_month(ymd(2023, 2, 10)), ymd(2023, 2, 28));
        assert_eq!(end_of_month(ymd(2024, 2, 1)), ymd(2024, 2, 29));
        assert_eq!(end_of_month(ymd(2023, 12, 5)), ymd(2023, 12, 31));
        assert_eq!(month_end_boundary("15-04-2023").unwrap(), ymd(2023, 4, 30));
    }

    #[test]
    fn test_month_name() {
        assert_eq!(parse_month_name("Jan"), Some(1));
        assert_eq!(parse_month_name("sep"), Some(9));
        assert_eq!(parse_month_name("Spring"), None);
        assert_eq!(parse_month_name("March"), None);
        assert_eq!(parse_month_name("Sept"), None);
    }
}
