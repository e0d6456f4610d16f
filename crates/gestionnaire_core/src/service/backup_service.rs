//! Bulk import and snapshot export.
//!
//! # Invariants
//! - Import runs users, then projets, then taches; it is not atomic across
//!   collections and stops at the first failure.
//! - Imported documents are stored verbatim apart from a generated `_id`
//!   when none is given.
//! - Export never writes to disk itself; the sink owns durable storage.

use crate::error::CoreResult;
use crate::model::document::Document;
use crate::model::timestamp::now_iso8601;
use crate::repo::document_store::{Collection, DocumentStore, FindQuery};
use crate::repo::filter::Filter;
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::error::Error;

/// Bulk import payload. Absent collections are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ImportBundle {
    #[serde(default)]
    pub users: Option<Vec<Document>>,
    #[serde(default)]
    pub projets: Option<Vec<Document>>,
    #[serde(default)]
    pub taches: Option<Vec<Document>>,
}

/// Inserted document counts per collection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ImportSummary {
    pub users: usize,
    pub projets: usize,
    pub taches: usize,
}

/// Full copy of every collection at one instant.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BackupSnapshot {
    pub timestamp: String,
    pub users: Vec<Document>,
    pub projets: Vec<Document>,
    pub taches: Vec<Document>,
}

/// Result of an export attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BackupOutcome {
    pub success: bool,
    pub error: Option<String>,
    pub name: String,
    pub timestamp: String,
}

/// Destination for exported snapshots.
pub trait ExportSink {
    fn persist(
        &self,
        name: &str,
        snapshot: &BackupSnapshot,
    ) -> Result<(), Box<dyn Error + Send + Sync>>;
}

pub struct BackupService<S: DocumentStore> {
    store: S,
}

impl<S: DocumentStore> BackupService<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Inserts every bundled document, collection by collection.
    ///
    /// Collections imported before a failure stay imported.
    pub fn import_bundle(&self, bundle: ImportBundle) -> CoreResult<ImportSummary> {
        let mut summary = ImportSummary::default();
        let batches = [
            (Collection::Users, bundle.users),
            (Collection::Projets, bundle.projets),
            (Collection::Taches, bundle.taches),
        ];
        for (collection, documents) in batches {
            let Some(documents) = documents else {
                continue;
            };
            let inserted = match self.store.insert_many(collection, documents) {
                Ok(ids) => ids.len(),
                Err(err) => {
                    warn!(
                        "event=import module=service status=error collection={} error={}",
                        collection, err
                    );
                    return Err(err.into());
                }
            };
            info!(
                "event=import module=service status=ok collection={} inserted={}",
                collection, inserted
            );
            match collection {
                Collection::Users => summary.users = inserted,
                Collection::Projets => summary.projets = inserted,
                Collection::Taches => summary.taches = inserted,
            }
        }
        Ok(summary)
    }

    /// Reads all collections and hands the snapshot to `sink`.
    ///
    /// Read and sink failures are reported in the outcome, not as `Err`.
    pub fn export_snapshot(&self, sink: &dyn ExportSink) -> BackupOutcome {
        let timestamp = now_iso8601();
        let name = format!("backup-{timestamp}");
        let result = self
            .snapshot(&timestamp)
            .map_err(|err| err.to_string())
            .and_then(|snapshot| sink.persist(&name, &snapshot).map_err(|err| err.to_string()));

        match result {
            Ok(()) => {
                info!("event=export module=service status=ok name={name}");
                BackupOutcome {
                    success: true,
                    error: None,
                    name,
                    timestamp,
                }
            }
            Err(error) => {
                warn!("event=export module=service status=error name={name} error={error}");
                BackupOutcome {
                    success: false,
                    error: Some(error),
                    name,
                    timestamp,
                }
            }
        }
    }

    fn snapshot(&self, timestamp: &str) -> CoreResult<BackupSnapshot> {
        let all = FindQuery::new(Filter::All);
        Ok(BackupSnapshot {
            timestamp: timestamp.to_string(),
            users: self.store.find(Collection::Users, &all)?,
            projets: self.store.find(Collection::Projets, &all)?,
            taches: self.store.find(Collection::Taches, &all)?,
        })
    }
}
