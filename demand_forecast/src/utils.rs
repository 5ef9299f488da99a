//! Utility functions for the demand_forecast crate

use chrono::NaiveDate;

/// Consecutive calendar days following `last`
pub fn future_dates(last: NaiveDate, horizon: usize) -> Vec<NaiveDate> {
    last.iter_days().skip(1).take(horizon).collect()
}

/// Lenient date parsing for the formats found in demand exports
pub mod date_parser {
    use crate::data::CellValue;
    use crate::error::{ForecastError, Result};
    use chrono::{DateTime, NaiveDate, NaiveDateTime};

    const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d", "%m/%d/%Y", "%d.%m.%Y"];

    const DATETIME_FORMATS: &[&str] = &[
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%dT%H:%M",
        "%Y-%m-%d %H:%M",
        "%m/%d/%Y %H:%M:%S",
        "%m/%d/%Y %H:%M",
    ];

    /// Parse a calendar date, dropping any time-of-day component
    pub fn parse_date(text: &str) -> Result<NaiveDate> {
        let text = text.trim();
        if text.is_empty() {
            return Err(ForecastError::ParseError("Empty date".to_string()));
        }

        if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
            return Ok(dt.date_naive());
        }
        if let Some(date) = DATE_FORMATS
            .iter()
            .find_map(|fmt| NaiveDate::parse_from_str(text, fmt).ok())
        {
            return Ok(date);
        }
        if let Some(dt) = DATETIME_FORMATS
            .iter()
            .find_map(|fmt| NaiveDateTime::parse_from_str(text, fmt).ok())
        {
            return Ok(dt.date());
        }

        Err(ForecastError::ParseError(format!(
            "Unrecognized date '{}'",
            text
        )))
    }

    /// Interpret a cell as a date.
    ///
    /// Text goes through [`parse_date`]; numbers are read as Unix epoch
    /// milliseconds. Anything else, or a failed parse, is `None`.
    pub fn parse_cell(cell: &CellValue) -> Option<NaiveDate> {
        match cell {
            CellValue::Text(text) => parse_date(text).ok(),
            CellValue::Number(ms) if ms.is_finite() => {
                DateTime::from_timestamp_millis(*ms as i64).map(|dt| dt.date_naive())
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_future_dates_cross_month() {
        let last = NaiveDate::from_ymd_opt(2024, 2, 27).unwrap();
        let dates = future_dates(last, 3);
        assert_eq!(
            dates,
            vec![
                NaiveDate::from_ymd_opt(2024, 2, 28).unwrap(),
                NaiveDate::from_ymd_opt(2024, 2, 29).unwrap(),
                NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
            ]
        );
        assert!(future_dates(last, 0).is_empty());
    }
}
