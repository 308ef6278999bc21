//! Typed bind parameters and request-input parsing
//!
//! Request inputs arrive as loose JSON strings. Everything here turns them
//! into `BindValue`s or fails with `QueryError::InvalidParameter`, always
//! before a query is sent.

use std::fmt;

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime};
use serde::Serialize;

use crate::error::{QueryError, Result};

const DATE_FORMAT: &str = "%Y-%m-%d";

const TIMESTAMP_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
];

/// Wire kind of a bind parameter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BindKind {
    Date,
    Timestamp,
    String,
    Int,
    IntArray,
    StringArray,
}

impl BindKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Date => "date",
            Self::Timestamp => "timestamp",
            Self::String => "string",
            Self::Int => "int",
            Self::IntArray => "int_array",
            Self::StringArray => "string_array",
        }
    }
}

impl fmt::Display for BindKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A typed value carried next to the query text
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum BindValue {
    Date(NaiveDate),
    Timestamp(NaiveDateTime),
    String(String),
    Int(i64),
    IntArray(Vec<i64>),
    StringArray(Vec<String>),
}

impl BindValue {
    pub fn kind(&self) -> BindKind {
        match self {
            Self::Date(_) => BindKind::Date,
            Self::Timestamp(_) => BindKind::Timestamp,
            Self::String(_) => BindKind::String,
            Self::Int(_) => BindKind::Int,
            Self::IntArray(_) => BindKind::IntArray,
            Self::StringArray(_) => BindKind::StringArray,
        }
    }
}

/// Named bind parameter, referenced from SQL as `@name`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Param {
    pub name: &'static str,
    pub value: BindValue,
}

impl Param {
    pub fn new(name: &'static str, value: BindValue) -> Self {
        Self { name, value }
    }

    pub fn date(name: &'static str, value: NaiveDate) -> Self {
        Self::new(name, BindValue::Date(value))
    }

    pub fn timestamp(name: &'static str, value: NaiveDateTime) -> Self {
        Self::new(name, BindValue::Timestamp(value))
    }

    pub fn string(name: &'static str, value: impl Into<String>) -> Self {
        Self::new(name, BindValue::String(value.into()))
    }

    pub fn int(name: &'static str, value: i64) -> Self {
        Self::new(name, BindValue::Int(value))
    }

    pub fn int_array(name: &'static str, values: Vec<i64>) -> Self {
        Self::new(name, BindValue::IntArray(values))
    }

    pub fn string_array(name: &'static str, values: Vec<String>) -> Self {
        Self::new(name, BindValue::StringArray(values))
    }

    pub fn kind(&self) -> BindKind {
        self.value.kind()
    }
}

/// Treat blank strings as absent input.
pub fn present(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// Parse a `YYYY-MM-DD` calendar date.
pub fn parse_date(field: &str, value: &str) -> Result<NaiveDate> {
    let trimmed = value.trim();
    NaiveDate::parse_from_str(trimmed, DATE_FORMAT).map_err(|_| {
        QueryError::invalid(field, format!("'{}' is not a date (expected YYYY-MM-DD)", trimmed))
    })
}

/// Parse a timestamp.
///
/// Accepts `YYYY-MM-DD HH:MM:SS` (optionally with `T` and fractional
/// seconds), RFC 3339 (converted to UTC) and a bare date (midnight).
pub fn parse_timestamp(field: &str, value: &str) -> Result<NaiveDateTime> {
    let trimmed = value.trim();

    for format in TIMESTAMP_FORMATS {
        if let Ok(ts) = NaiveDateTime::parse_from_str(trimmed, format) {
            return Ok(ts);
        }
    }

    if let Ok(ts) = DateTime::parse_from_rfc3339(trimmed) {
        return Ok(ts.naive_utc());
    }

    if let Ok(date) = NaiveDate::parse_from_str(trimmed, DATE_FORMAT) {
        return Ok(date.and_time(NaiveTime::MIN));
    }

    Err(QueryError::invalid(
        field,
        format!("'{}' is not a timestamp (expected YYYY-MM-DD HH:MM:SS)", trimmed),
    ))
}

/// Parse a comma separated list of integer ids.
///
/// Entries are trimmed and keep their order; empty segments are skipped.
/// Any entry that is not an integer fails the whole list.
pub fn parse_id_list(field: &str, value: &str) -> Result<Vec<i64>> {
    value
        .split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(|entry| {
            entry
                .parse::<i64>()
                .map_err(|_| QueryError::invalid(field, format!("'{}' is not an integer id", entry)))
        })
        .collect()
}

/// Reject a range whose end lies before its start.
pub fn ensure_ordered<T>(start_field: &str, start: &T, end_field: &str, end: &T) -> Result<()>
where
    T: PartialOrd + fmt::Display,
{
    if end < start {
        return Err(QueryError::invalid(
            end_field,
            format!("{} ({}) is before {} ({})", end_field, end, start_field, start),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn id_list_trims_and_keeps_order() {
        assert_eq!(parse_id_list("site_ids", "5, 12, 7").unwrap(), vec![5, 12, 7]);
        assert_eq!(parse_id_list("site_ids", " 3 ,,4 ").unwrap(), vec![3, 4]);
        assert!(parse_id_list("site_ids", " , ").unwrap().is_empty());
    }

    #[test]
    fn id_list_rejects_non_numeric_entry() {
        let err = parse_id_list("site_ids", "5,abc").unwrap_err();
        assert_eq!(
            err,
            QueryError::invalid("site_ids", "'abc' is not an integer id")
        );
    }

    #[test]
    fn dates_parse_strictly() {
        assert_eq!(
            parse_date("start_date", "2024-03-01").unwrap(),
            NaiveDate::from_ymd_opt(2024, 3, 1).unwrap()
        );
        assert!(parse_date("start_date", "2024-13-01").is_err());
        assert!(parse_date("start_date", "03/01/2024").is_err());
    }

    #[test]
    fn timestamps_accept_common_shapes() {
        let expected = NaiveDate::from_ymd_opt(2024, 3, 1)
            .unwrap()
            .and_hms_opt(10, 30, 0)
            .unwrap();

        assert_eq!(parse_timestamp("t", "2024-03-01 10:30:00").unwrap(), expected);
        assert_eq!(parse_timestamp("t", "2024-03-01T10:30:00").unwrap(), expected);
        assert_eq!(parse_timestamp("t", "2024-03-01T12:30:00+02:00").unwrap(), expected);
        assert_eq!(
            parse_timestamp("t", "2024-03-01").unwrap(),
            NaiveDate::from_ymd_opt(2024, 3, 1).unwrap().and_time(NaiveTime::MIN)
        );
        assert!(parse_timestamp("t", "yesterday").is_err());
    }

    #[test]
    fn blank_input_is_absent() {
        assert_eq!(present(None), None);
        assert_eq!(present(Some("   ")), None);
        assert_eq!(present(Some(" x ")), Some("x"));
    }

    #[test]
    fn reversed_range_is_rejected() {
        let start = NaiveDate::from_ymd_opt(2024, 3, 10).unwrap();
        let end = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();

        assert!(ensure_ordered("start_date", &start, "end_date", &start).is_ok());
        let err = ensure_ordered("start_date", &start, "end_date", &end).unwrap_err();
        assert!(err.is_input_error());
        assert!(err.to_string().contains("end_date"));
    }

    #[test]
    fn bind_value_serializes_with_kind() {
        let param = Param::int_array("site_ids", vec![1, 2]);
        let json = serde_json::to_value(&param).unwrap();
        assert_eq!(json["name"], "site_ids");
        assert_eq!(json["value"]["kind"], "int_array");
        assert_eq!(json["value"]["value"], serde_json::json!([1, 2]));
    }
}
