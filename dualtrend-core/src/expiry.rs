//! Option expiry date input.
//!
//! Accepted forms: `Jan 23`, `23 Jan`, `January 23`, `Jan 23 2026`,
//! `23 Jan 2026`, `2026-01-23`, `23-01-2026`, `23/01/2026`, `01/23/2026`.
//! Forms without a year take `default_year`. Day-first wins for slash dates
//! that are valid both ways.

use chrono::NaiveDate;
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum ExpiryParseError {
    #[error("expiry date is required")]
    Empty,

    #[error("unrecognised expiry date {0:?} (try \"Jan 23\", \"23 Jan 2026\" or \"2026-01-23\")")]
    Unrecognised(String),
}

const WITH_YEAR: &[&str] = &[
    "%b %d %Y", "%d %b %Y", "%Y-%m-%d", "%d-%m-%Y", "%d/%m/%Y", "%m/%d/%Y",
];

const WITHOUT_YEAR: &[&str] = &["%b %d %Y", "%d %b %Y"];

pub fn parse_expiry_date(input: &str, default_year: i32) -> Result<NaiveDate, ExpiryParseError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(ExpiryParseError::Empty);
    }
    let normalized = trimmed.split_whitespace().collect::<Vec<_>>().join(" ");

    if let Some(date) = WITH_YEAR
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(&normalized, fmt).ok())
    {
        return Ok(date);
    }

    let with_year = format!("{normalized} {default_year}");
    WITHOUT_YEAR
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(&with_year, fmt).ok())
        .ok_or_else(|| ExpiryParseError::Unrecognised(trimmed.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn yearless_forms_use_default_year() {
        assert_eq!(parse_expiry_date("Jan 23", 2026).unwrap(), d(2026, 1, 23));
        assert_eq!(parse_expiry_date("23 Jan", 2026).unwrap(), d(2026, 1, 23));
        assert_eq!(parse_expiry_date("January 23", 2026).unwrap(), d(2026, 1, 23));
        assert_eq!(parse_expiry_date("  feb 3 ", 2027).unwrap(), d(2027, 2, 3));
    }

    #[test]
    fn explicit_year_forms() {
        assert_eq!(parse_expiry_date("Jan 23 2026", 2000).unwrap(), d(2026, 1, 23));
        assert_eq!(parse_expiry_date("23 Jan 2026", 2000).unwrap(), d(2026, 1, 23));
        assert_eq!(parse_expiry_date("2026-01-23", 2000).unwrap(), d(2026, 1, 23));
        assert_eq!(parse_expiry_date("23-01-2026", 2000).unwrap(), d(2026, 1, 23));
        assert_eq!(parse_expiry_date("23/01/2026", 2000).unwrap(), d(2026, 1, 23));
        assert_eq!(parse_expiry_date("01/23/2026", 2000).unwrap(), d(2026, 1, 23));
    }

    #[test]
    fn ambiguous_slash_date_is_day_first() {
        assert_eq!(parse_expiry_date("02/03/2026", 2000).unwrap(), d(2026, 3, 2));
    }

    #[test]
    fn rejects_garbage_and_empty() {
        assert_eq!(parse_expiry_date("  ", 2026), Err(ExpiryParseError::Empty));
        assert!(matches!(
            parse_expiry_date("next thursday", 2026),
            Err(ExpiryParseError::Unrecognised(_))
        ));
        assert!(parse_expiry_date("Feb 29", 2026).is_err());
    }
}
