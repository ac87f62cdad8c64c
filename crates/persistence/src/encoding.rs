// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! Text encodings for values stored in `SQLite` TEXT columns.
//!
//! Timestamps are RFC 3339 in UTC with a fixed nine-digit fraction and dates
//! are `YYYY-MM-DD`. Both are fixed width, so they sort and compare correctly
//! as strings.

use num_traits::ToPrimitive;
use time::format_description::well_known::Rfc3339;
use time::format_description::BorrowedFormatItem;
use time::macros::format_description;
use time::{Date, OffsetDateTime, UtcOffset};

use crate::error::PersistenceError;

/// Stored timestamp layout. `Rfc3339` trims trailing fractional zeros, which
/// breaks string ordering within a second.
const TIMESTAMP_FORMAT: &[BorrowedFormatItem<'static>] = format_description!(
    "[year]-[month]-[day]T[hour]:[minute]:[second].[subsecond digits:9]Z"
);

/// Formats a timestamp as fixed-width RFC 3339 in UTC.
///
/// # Errors
///
/// Returns an error if the timestamp cannot be formatted.
pub fn format_timestamp(value: OffsetDateTime) -> Result<String, PersistenceError> {
    value
        .to_offset(UtcOffset::UTC)
        .format(TIMESTAMP_FORMAT)
        .map_err(|e| PersistenceError::SerializationError(format!("timestamp: {e}")))
}

/// Parses a stored RFC 3339 timestamp of any fraction width.
///
/// # Errors
///
/// Returns an error if the stored text is not RFC 3339.
pub fn parse_timestamp(value: &str) -> Result<OffsetDateTime, PersistenceError> {
    OffsetDateTime::parse(value, &Rfc3339)
        .map_err(|e| PersistenceError::SerializationError(format!("timestamp '{value}': {e}")))
}

/// Returns the current time formatted for storage.
///
/// # Errors
///
/// Returns an error if the timestamp cannot be formatted.
pub fn now_timestamp() -> Result<String, PersistenceError> {
    format_timestamp(OffsetDateTime::now_utc())
}

/// Formats a date as `YYYY-MM-DD`.
///
/// # Errors
///
/// Returns an error if the date cannot be formatted.
pub fn format_date(value: Date) -> Result<String, PersistenceError> {
    value
        .format(format_description!("[year]-[month]-[day]"))
        .map_err(|e| PersistenceError::SerializationError(format!("date: {e}")))
}

/// Parses a stored `YYYY-MM-DD` date.
///
/// # Errors
///
/// Returns an error if the stored text is not a valid date.
pub fn parse_date(value: &str) -> Result<Date, PersistenceError> {
    Date::parse(value, format_description!("[year]-[month]-[day]"))
        .map_err(|e| PersistenceError::SerializationError(format!("date '{value}': {e}")))
}

/// Narrows a stored count or quota to `u32`.
///
/// # Errors
///
/// Returns an error if the value is negative or too large.
pub fn to_count(value: i64, what: &str) -> Result<u32, PersistenceError> {
    value
        .to_u32()
        .ok_or_else(|| PersistenceError::DatabaseError(format!("{what} conversion failed")))
}

/// Parses a stored enum column through its `FromStr` implementation.
///
/// # Errors
///
/// Returns an error if the stored text is not a known variant.
pub fn parse_stored<T>(value: &str) -> Result<T, PersistenceError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    value
        .parse::<T>()
        .map_err(|e| PersistenceError::SerializationError(e.to_string()))
}

