use chrono::{Days, NaiveDate};
use thiserror::Error;

/// Smallest year accepted in `M/D/YYYY` vendor dates.
pub const MIN_VENDOR_YEAR: i32 = 2000;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DateError {
    #[error("invalid date '{0}'")]
    InvalidDate(String),
    #[error("invalid date format '{0}', expected YYYYMMDD")]
    InvalidDateFormat(String),
    #[error("invalid month {month} in '{raw}'")]
    InvalidMonth { raw: String, month: u32 },
    #[error("invalid day {day} in '{raw}'")]
    InvalidDay { raw: String, day: u32 },
}

/// Parse a vendor date in `M/D/YYYY` form.
pub fn parse_slash_date(raw: &str) -> Result<NaiveDate, DateError> {
    let invalid = || DateError::InvalidDate(raw.to_string());
    let trimmed = raw.trim();
    let mut parts = trimmed.split('/');
    let (Some(m), Some(d), Some(y), None) = (parts.next(), parts.next(), parts.next(), parts.next())
    else {
        return Err(invalid());
    };
    let month: u32 = m.trim().parse().map_err(|_| invalid())?;
    let day: u32 = d.trim().parse().map_err(|_| invalid())?;
    let year: i32 = y.trim().parse().map_err(|_| invalid())?;
    if !(1..=12).contains(&month) || !(1..=31).contains(&day) || year < MIN_VENDOR_YEAR {
        return Err(invalid());
    }
    local_date(year, month, day).ok_or_else(invalid)
}

/// Parse a product date in compact `YYYYMMDD` form.
pub fn parse_compact_date(raw: &str) -> Result<NaiveDate, DateError> {
    let trimmed = raw.trim();
    if trimmed.len() != 8 || !trimmed.bytes().all(|b| b.is_ascii_digit()) {
        return Err(DateError::InvalidDateFormat(raw.to_string()));
    }
    // All ASCII digits, so the slices and parses cannot fail.
    let year: i32 = trimmed[0..4].parse().unwrap_or_default();
    let month: u32 = trimmed[4..6].parse().unwrap_or_default();
    let day: u32 = trimmed[6..8].parse().unwrap_or_default();
    if !(1..=12).contains(&month) {
        return Err(DateError::InvalidMonth {
            raw: raw.to_string(),
            month,
        });
    }
    if !(1..=31).contains(&day) {
        return Err(DateError::InvalidDay {
            raw: raw.to_string(),
            day,
        });
    }
    local_date(year, month, day).ok_or_else(|| DateError::InvalidDateFormat(raw.to_string()))
}

/// Component-wise date construction: days past the end of the month roll into the next one
/// (Feb 31 becomes Mar 3 in a common year). Month and day are range-checked by callers.
fn local_date(year: i32, month: u32, day: u32) -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(year, month, 1)?.checked_add_days(Days::new(u64::from(day - 1)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn slash_dates_parse_without_padding() {
        assert_eq!(parse_slash_date("3/7/2021").unwrap(), ymd(2021, 3, 7));
        assert_eq!(parse_slash_date("12/31/2000").unwrap(), ymd(2000, 12, 31));
    }

    #[test]
    fn slash_dates_reject_out_of_range_components() {
        for raw in ["13/1/2020", "0/1/2020", "1/32/2020", "1/0/2020", "1/1/1999"] {
            assert!(
                matches!(parse_slash_date(raw), Err(DateError::InvalidDate(_))),
                "{raw} should be rejected"
            );
        }
    }

    #[test]
    fn slash_dates_reject_garbage() {
        for raw in ["", "2020-01-01", "1/1", "1/1/2020/1", "a/b/c"] {
            assert!(parse_slash_date(raw).is_err(), "{raw} should be rejected");
        }
    }

    #[test]
    fn compact_dates_parse() {
        assert_eq!(parse_compact_date("20230115").unwrap(), ymd(2023, 1, 15));
    }

    #[test]
    fn compact_dates_signal_each_failure_distinctly() {
        assert!(matches!(
            parse_compact_date("2023011"),
            Err(DateError::InvalidDateFormat(_))
        ));
        assert!(matches!(
            parse_compact_date("2023-1-1"),
            Err(DateError::InvalidDateFormat(_))
        ));
        assert!(matches!(
            parse_compact_date("20231301"),
            Err(DateError::InvalidMonth { month: 13, .. })
        ));
        assert!(matches!(
            parse_compact_date("20230232"),
            Err(DateError::InvalidDay { day: 32, .. })
        ));
        assert!(matches!(
            parse_compact_date("20230100"),
            Err(DateError::InvalidDay { day: 0, .. })
        ));
    }

    #[test]
    fn day_past_month_end_is_accepted_and_rolls_over() {
        // Feb 31 passes the 1..=31 range check; no days-in-month validation happens.
        assert_eq!(parse_compact_date("20230231").unwrap(), ymd(2023, 3, 3));
        assert_eq!(parse_slash_date("4/31/2022").unwrap(), ymd(2022, 5, 1));
    }
}
