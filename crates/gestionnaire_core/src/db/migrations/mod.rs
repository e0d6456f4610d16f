//! Ordered schema migrations for the `documents` table.
//!
//! Pending steps run in one SQLite transaction together with their
//! `user_version` bumps, so a failing step leaves the schema where it was.
//! Migrations shape the table only; document bodies are never rewritten.

use crate::db::{DbError, DbResult};
use log::debug;
use rusqlite::Connection;

struct Migration {
    version: u32,
    name: &'static str,
    sql: &'static str,
}

const MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        name: "documents",
        sql: include_str!("0001_documents.sql"),
    },
    Migration {
        version: 2,
        name: "collection_scan_index",
        sql: include_str!("0002_collection_scan_index.sql"),
    },
];

/// Schema versions before and after [`apply_migrations`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MigrationOutcome {
    pub from_version: u32,
    pub to_version: u32,
}

impl MigrationOutcome {
    pub fn applied(&self) -> u32 {
        self.to_version - self.from_version
    }
}

/// Latest schema version this build can write.
pub fn latest_version() -> u32 {
    MIGRATIONS.last().map_or(0, |migration| migration.version)
}

/// Version recorded in `PRAGMA user_version`.
pub fn schema_version(conn: &Connection) -> DbResult<u32> {
    Ok(conn.pragma_query_value(None, "user_version", |row| row.get(0))?)
}

/// Brings the connection's schema up to [`latest_version`].
///
/// # Errors
/// - `UnsupportedSchemaVersion` when the database is newer than this build.
/// - `Migration` naming the first step that failed.
pub fn apply_migrations(conn: &mut Connection) -> DbResult<MigrationOutcome> {
    let from_version = schema_version(conn)?;
    let latest = latest_version();
    if from_version > latest {
        return Err(DbError::UnsupportedSchemaVersion {
            db_version: from_version,
            latest_supported: latest,
        });
    }

    let pending: Vec<&Migration> = MIGRATIONS
        .iter()
        .skip_while(|migration| migration.version <= from_version)
        .collect();
    let Some(last) = pending.last() else {
        return Ok(MigrationOutcome {
            from_version,
            to_version: from_version,
        });
    };
    let to_version = last.version;

    let tx = conn.transaction()?;
    for migration in pending {
        tx.execute_batch(migration.sql)
            .and_then(|()| tx.pragma_update(None, "user_version", migration.version))
            .map_err(|source| DbError::Migration {
                version: migration.version,
                name: migration.name,
                source,
            })?;
        debug!(
            "event=db_migrate module=db status=ok version={} name={}",
            migration.version, migration.name
        );
    }
    tx.commit()?;

    Ok(MigrationOutcome {
        from_version,
        to_version,
    })
}
