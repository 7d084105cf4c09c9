//! HTTP handlers, one module per resource.

pub mod accounting;
pub mod dispatch;
pub mod health;
pub mod metrics;
pub mod orders;
pub mod production;
pub mod reports;

use std::str::FromStr;

use chrono::NaiveDate;

use crate::error::ApiError;

/// Parses an id path segment.
pub(crate) fn parse_id<T: FromStr>(raw: &str, what: &str) -> Result<T, ApiError> {
    raw.parse()
        .map_err(|_| ApiError::BadRequest(format!("Invalid {what}: {raw}")))
}

/// Parses a date given as `YYYY-MM-DD` or `DD/MM/YYYY`.
pub(crate) fn parse_date(raw: &str) -> Result<NaiveDate, ApiError> {
    let raw = raw.trim();
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(raw, "%d/%m/%Y"))
        .map_err(|_| ApiError::BadRequest(format!("Invalid date: {raw}")))
}

pub(crate) fn parse_optional_date(raw: Option<&str>) -> Result<Option<NaiveDate>, ApiError> {
    raw.filter(|r| !r.trim().is_empty()).map(parse_date).transpose()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dates_in_both_formats() {
        let expected = NaiveDate::from_ymd_opt(2026, 3, 9).unwrap();
        assert_eq!(parse_date("2026-03-09").unwrap(), expected);
        assert_eq!(parse_date("09/03/2026").unwrap(), expected);
        assert!(parse_date("March 9").is_err());
        assert_eq!(parse_optional_date(Some(" ")).unwrap(), None);
    }
}
