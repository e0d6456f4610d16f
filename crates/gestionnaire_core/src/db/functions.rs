//! Scalar SQL functions registered on every connection.
//!
//! SQLite parses `X REGEXP Y` but ships no implementation; document filters
//! use it for case-insensitive substring matching.

use regex::Regex;
use rusqlite::functions::FunctionFlags;
use rusqlite::types::ValueRef;
use rusqlite::{Connection, Error};
use std::sync::Arc;

type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Registers `regexp(pattern, text)`.
///
/// Non-text operands (NULL, numbers, blobs) never match. The compiled pattern
/// is cached per statement through SQLite auxiliary data.
pub(crate) fn register_regexp(conn: &Connection) -> rusqlite::Result<()> {
    conn.create_scalar_function(
        "regexp",
        2,
        FunctionFlags::SQLITE_UTF8 | FunctionFlags::SQLITE_DETERMINISTIC,
        move |ctx| {
            let pattern: Arc<Regex> = ctx.get_or_create_aux(0, |raw| -> Result<_, BoxError> {
                Ok(Regex::new(raw.as_str()?)?)
            })?;
            let is_match = match ctx.get_raw(1) {
                ValueRef::Text(bytes) => std::str::from_utf8(bytes)
                    .map(|text| pattern.is_match(text))
                    .map_err(|err| Error::UserFunctionError(err.into()))?,
                _ => false,
            };
            Ok(is_match)
        },
    )
}
