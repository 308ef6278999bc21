//! Request field parsing shared by the report definitions
//!
//! Blank strings count as absent. Anything present but malformed is an
//! `InvalidParameter` naming the field.

use chrono::{NaiveDate, NaiveDateTime};

use salesctl_core::params::{ensure_ordered, parse_date, parse_id_list, parse_timestamp, present};
use salesctl_core::QueryError;

pub fn optional_date(field: &str, raw: Option<&str>) -> Result<Option<NaiveDate>, QueryError> {
    present(raw).map(|v| parse_date(field, v)).transpose()
}

pub fn optional_timestamp(field: &str, raw: Option<&str>) -> Result<Option<NaiveDateTime>, QueryError> {
    present(raw).map(|v| parse_timestamp(field, v)).transpose()
}

/// Comma separated ids; a list with no entries counts as absent.
pub fn optional_ids(field: &str, raw: Option<&str>) -> Result<Option<Vec<i64>>, QueryError> {
    let ids = present(raw).map(|v| parse_id_list(field, v)).transpose()?;
    Ok(ids.filter(|ids| !ids.is_empty()))
}

pub fn required_date(field: &str, raw: &str) -> Result<NaiveDate, QueryError> {
    optional_date(field, Some(raw))?.ok_or_else(|| QueryError::invalid(field, "is required"))
}

/// Validate a range where either bound may be missing.
pub fn optional_range<T>(
    start_field: &str,
    start: Option<&T>,
    end_field: &str,
    end: Option<&T>,
) -> Result<(), QueryError>
where
    T: PartialOrd + std::fmt::Display,
{
    match (start, end) {
        (Some(start), Some(end)) => ensure_ordered(start_field, start, end_field, end),
        _ => Ok(()),
    }
}

/// A window needs both bounds or neither.
pub fn paired_window(
    start_field: &str,
    start: Option<&str>,
    end_field: &str,
    end: Option<&str>,
) -> Result<Option<(NaiveDateTime, NaiveDateTime)>, QueryError> {
    let start_ts = optional_timestamp(start_field, start)?;
    let end_ts = optional_timestamp(end_field, end)?;

    match (start_ts, end_ts) {
        (Some(s), Some(e)) => {
            ensure_ordered(start_field, &s, end_field, &e)?;
            Ok(Some((s, e)))
        }
        (None, None) => Ok(None),
        (Some(_), None) => Err(QueryError::invalid(end_field, format!("required when {} is set", start_field))),
        (None, Some(_)) => Err(QueryError::invalid(start_field, format!("required when {} is set", end_field))),
    }
}
