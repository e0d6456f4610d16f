//! Connection bootstrap for the document store.
//!
//! # Responsibility
//! - Hand out SQLite connections that are configured, extended with the
//!   `regexp` function and migrated to the latest `documents` schema.
//! - Classify low-level failures so the gateway can tell an unreachable
//!   database from a broken request.
//!
//! # Invariants
//! - Schema version lives in `PRAGMA user_version`.
//! - No document is read or written on a connection that failed migration.

use rusqlite::ErrorCode;
use std::error::Error;
use std::fmt::{Display, Formatter};

mod functions;
pub mod migrations;
mod open;

pub use open::{open_db, open_db_in_memory};

pub type DbResult<T> = Result<T, DbError>;

#[derive(Debug)]
pub enum DbError {
    Sqlite(rusqlite::Error),
    /// The file was written by a newer build.
    UnsupportedSchemaVersion {
        db_version: u32,
        latest_supported: u32,
    },
    /// One migration step failed; the schema stayed at its previous version.
    Migration {
        version: u32,
        name: &'static str,
        source: rusqlite::Error,
    },
}

impl DbError {
    /// Whether the database itself could not be reached (cannot open, busy,
    /// locked), as opposed to a failing statement.
    pub fn is_unavailable(&self) -> bool {
        let Self::Sqlite(err) = self else {
            return false;
        };
        matches!(
            err.sqlite_error_code(),
            Some(ErrorCode::CannotOpen | ErrorCode::DatabaseBusy | ErrorCode::DatabaseLocked)
        )
    }
}

impl Display for DbError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sqlite(err) => write!(f, "{err}"),
            Self::UnsupportedSchemaVersion {
                db_version,
                latest_supported,
            } => write!(
                f,
                "documents schema version {db_version} is newer than supported {latest_supported}"
            ),
            Self::Migration {
                version,
                name,
                source,
            } => write!(f, "migration {version} ({name}) failed: {source}"),
        }
    }
}

impl Error for DbError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Sqlite(err) | Self::Migration { source: err, .. } => Some(err),
            Self::UnsupportedSchemaVersion { .. } => None,
        }
    }
}

impl From<rusqlite::Error> for DbError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Sqlite(value)
    }
}

#[cfg(test)]
mod tests {
    use super::DbError;
    use rusqlite::ffi;

    #[test]
    fn busy_and_locked_are_unavailable_but_constraint_errors_are_not() {
        let busy = DbError::Sqlite(rusqlite::Error::SqliteFailure(
            ffi::Error::new(ffi::SQLITE_BUSY),
            None,
        ));
        assert!(busy.is_unavailable());

        let constraint = DbError::Sqlite(rusqlite::Error::SqliteFailure(
            ffi::Error::new(ffi::SQLITE_CONSTRAINT),
            None,
        ));
        assert!(!constraint.is_unavailable());

        let too_new = DbError::UnsupportedSchemaVersion {
            db_version: 9,
            latest_supported: 2,
        };
        assert!(!too_new.is_unavailable());
    }
}
