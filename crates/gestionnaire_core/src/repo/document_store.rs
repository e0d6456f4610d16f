//! Storage gateway contract and its SQLite implementation.
//!
//! # Responsibility
//! - Expose logical document operations (find, count, insert, patch,
//!   aggregate, transaction) over the three named collections.
//! - Keep SQL details inside the persistence boundary.
//!
//! # Invariants
//! - Every stored document has a native `_id`; one is generated when absent.
//! - `find` and `aggregate` return documents in storage (insertion) order
//!   unless a pipeline sorts them.
//! - A session is opened per `transaction` call and released exactly once:
//!   committed when the work succeeds, rolled back on every other path.
//! - Connection lifecycle belongs to the caller; the store only borrows.

use super::filter::Filter;
use super::pipeline::{execute, split_leading_match, Stage};
use crate::db::DbError;
use crate::model::document::{
    document_id, json_path, object_id_value, path_touches, Document, ID_FIELD,
};
use crate::model::object_id::ObjectId;
use log::{debug, warn};
use rusqlite::types::Value as SqlValue;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension};
use rusqlite::{Transaction, TransactionBehavior};
use serde::Serialize;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::atomic::{AtomicU64, Ordering};

pub type StoreResult<T> = Result<T, StoreError>;

static SESSION_SEQ: AtomicU64 = AtomicU64::new(1);

/// Named collections known to the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Collection {
    Users,
    Projets,
    Taches,
}

impl Collection {
    pub const ALL: [Collection; 3] = [Self::Users, Self::Projets, Self::Taches];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Users => "users",
            Self::Projets => "projets",
            Self::Taches => "taches",
        }
    }
}

impl Display for Collection {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Gateway failure.
#[derive(Debug)]
pub enum StoreError {
    /// Database could not be reached (cannot open, busy, locked).
    Unavailable(DbError),
    /// Any other database failure.
    Db(DbError),
    /// Required table is missing; the connection was not migrated.
    SchemaNotReady(&'static str),
    /// Filter or pipeline cannot be executed as written.
    InvalidQuery(String),
    /// Stored or supplied document breaks a storage rule.
    InvalidData(String),
    Serialization(serde_json::Error),
}

impl Display for StoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unavailable(err) => write!(f, "storage unavailable: {err}"),
            Self::Db(err) => write!(f, "{err}"),
            Self::SchemaNotReady(table) => {
                write!(f, "storage schema not ready: missing table `{table}`")
            }
            Self::InvalidQuery(message) => write!(f, "invalid query: {message}"),
            Self::InvalidData(message) => write!(f, "invalid document data: {message}"),
            Self::Serialization(err) => write!(f, "document serialization failed: {err}"),
        }
    }
}

impl Error for StoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Unavailable(err) | Self::Db(err) => Some(err),
            Self::Serialization(err) => Some(err),
            Self::SchemaNotReady(_) | Self::InvalidQuery(_) | Self::InvalidData(_) => None,
        }
    }
}

impl From<DbError> for StoreError {
    fn from(value: DbError) -> Self {
        if value.is_unavailable() {
            Self::Unavailable(value)
        } else {
            Self::Db(value)
        }
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(value: rusqlite::Error) -> Self {
        Self::from(DbError::Sqlite(value))
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(value: serde_json::Error) -> Self {
        Self::Serialization(value)
    }
}

/// Bounded or unbounded read over one collection.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FindQuery {
    pub filter: Filter,
    pub skip: u64,
    pub limit: Option<u64>,
}

impl FindQuery {
    pub fn new(filter: Filter) -> Self {
        Self {
            filter,
            skip: 0,
            limit: None,
        }
    }

    pub fn skip(mut self, skip: u64) -> Self {
        self.skip = skip;
        self
    }

    pub fn limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }
}

/// Logical operations the core issues against storage.
pub trait DocumentStore {
    /// Inserts one document and returns its `_id`.
    fn insert_one(&self, collection: Collection, document: Document) -> StoreResult<ObjectId>;

    /// Inserts documents one by one; stops at the first failure.
    fn insert_many(
        &self,
        collection: Collection,
        documents: Vec<Document>,
    ) -> StoreResult<Vec<ObjectId>> {
        documents
            .into_iter()
            .map(|document| self.insert_one(collection, document))
            .collect()
    }

    fn find(&self, collection: Collection, query: &FindQuery) -> StoreResult<Vec<Document>>;

    fn find_by_id(&self, collection: Collection, id: &ObjectId) -> StoreResult<Option<Document>>;

    fn count(&self, collection: Collection, filter: &Filter) -> StoreResult<u64>;

    /// Replaces the given top-level (or dotted) fields in one document.
    ///
    /// Returns the document after the change, or `None` when `id` is absent.
    /// An empty `fields` map is a read.
    fn update_fields(
        &self,
        collection: Collection,
        id: &ObjectId,
        fields: &Document,
    ) -> StoreResult<Option<Document>>;

    fn aggregate(&self, collection: Collection, pipeline: &[Stage]) -> StoreResult<Vec<Document>>;

    /// Runs `work` inside one all-or-nothing session.
    ///
    /// Sessions do not nest; `work` must not call `transaction` again.
    fn transaction<T, E, F>(&self, work: F) -> Result<T, E>
    where
        Self: Sized,
        F: FnOnce(&Self) -> Result<T, E>,
        E: From<StoreError>;
}

/// SQLite-backed document store.
#[derive(Clone, Copy)]
pub struct SqliteDocumentStore<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteDocumentStore<'conn> {
    /// Wraps a migrated connection. Fails when the schema is missing.
    pub fn try_new(conn: &'conn Connection) -> StoreResult<Self> {
        let exists: i64 = conn.query_row(
            "SELECT EXISTS(
                SELECT 1
                FROM sqlite_master
                WHERE type = 'table' AND name = 'documents'
            );",
            [],
            |row| row.get(0),
        )?;
        if exists != 1 {
            return Err(StoreError::SchemaNotReady("documents"));
        }
        Ok(Self { conn })
    }

    fn select_bodies(
        &self,
        collection: Collection,
        filter: &Filter,
        skip: u64,
        limit: Option<u64>,
    ) -> StoreResult<Vec<Document>> {
        let fragment = filter.to_sql()?;
        let mut sql = format!(
            "SELECT body FROM documents WHERE collection = ? AND {} ORDER BY seq ASC",
            fragment.sql
        );
        let mut bind_values = Vec::with_capacity(fragment.params.len() + 3);
        bind_values.push(SqlValue::Text(collection.as_str().to_string()));
        bind_values.extend(fragment.params);

        match limit {
            Some(limit) => {
                sql.push_str(" LIMIT ? OFFSET ?");
                bind_values.push(SqlValue::Integer(to_sql_int(limit)));
                bind_values.push(SqlValue::Integer(to_sql_int(skip)));
            }
            None if skip > 0 => {
                sql.push_str(" LIMIT -1 OFFSET ?");
                bind_values.push(SqlValue::Integer(to_sql_int(skip)));
            }
            None => {}
        }

        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(bind_values))?;
        let mut documents = Vec::new();
        while let Some(row) = rows.next()? {
            let body: String = row.get(0)?;
            documents.push(parse_body(collection, &body)?);
        }
        Ok(documents)
    }
}

impl DocumentStore for SqliteDocumentStore<'_> {
    fn insert_one(&self, collection: Collection, mut document: Document) -> StoreResult<ObjectId> {
        let id = match document.get(ID_FIELD) {
            None => {
                let id = ObjectId::new();
                document.insert(ID_FIELD.to_string(), object_id_value(&id));
                id
            }
            Some(_) => {
                let id = document_id(&document).ok_or_else(|| {
                    StoreError::InvalidData(format!(
                        "`{ID_FIELD}` in {collection} must be an object id"
                    ))
                })?;
                // Stored hex is always lowercase.
                document.insert(ID_FIELD.to_string(), object_id_value(&id));
                id
            }
        };

        let body = serde_json::to_string(&document)?;
        self.conn.execute(
            "INSERT INTO documents (collection, doc_id, body) VALUES (?1, ?2, ?3);",
            params![collection.as_str(), id.to_hex(), body],
        )?;
        Ok(id)
    }

    fn find(&self, collection: Collection, query: &FindQuery) -> StoreResult<Vec<Document>> {
        self.select_bodies(collection, &query.filter, query.skip, query.limit)
    }

    fn find_by_id(&self, collection: Collection, id: &ObjectId) -> StoreResult<Option<Document>> {
        let body: Option<String> = self
            .conn
            .query_row(
                "SELECT body FROM documents WHERE collection = ?1 AND doc_id = ?2;",
                params![collection.as_str(), id.to_hex()],
                |row| row.get(0),
            )
            .optional()?;
        body.map(|body| parse_body(collection, &body)).transpose()
    }

    fn count(&self, collection: Collection, filter: &Filter) -> StoreResult<u64> {
        let fragment = filter.to_sql()?;
        let sql = format!(
            "SELECT COUNT(*) FROM documents WHERE collection = ? AND {}",
            fragment.sql
        );
        let mut bind_values = vec![SqlValue::Text(collection.as_str().to_string())];
        bind_values.extend(fragment.params);
        let total: i64 = self
            .conn
            .query_row(&sql, params_from_iter(bind_values), |row| row.get(0))?;
        Ok(u64::try_from(total).unwrap_or(0))
    }

    fn update_fields(
        &self,
        collection: Collection,
        id: &ObjectId,
        fields: &Document,
    ) -> StoreResult<Option<Document>> {
        if fields.is_empty() {
            return self.find_by_id(collection, id);
        }
        if let Some(path) = fields.keys().find(|path| path_touches(path, ID_FIELD)) {
            return Err(StoreError::InvalidQuery(format!(
                "`{path}` cannot be updated: `{ID_FIELD}` is immutable"
            )));
        }

        let mut assignments = Vec::with_capacity(fields.len());
        let mut bind_values = Vec::with_capacity(fields.len() * 2 + 2);
        for (field, value) in fields {
            assignments.push("?, json(?)");
            bind_values.push(SqlValue::Text(json_path(field)));
            bind_values.push(SqlValue::Text(serde_json::to_string(value)?));
        }
        bind_values.push(SqlValue::Text(collection.as_str().to_string()));
        bind_values.push(SqlValue::Text(id.to_hex()));

        // Single statement: the patch is atomic per document.
        let sql = format!(
            "UPDATE documents
             SET body = json_set(body, {})
             WHERE collection = ? AND doc_id = ?
             RETURNING body;",
            assignments.join(", ")
        );
        let body: Option<String> = self
            .conn
            .query_row(&sql, params_from_iter(bind_values), |row| row.get(0))
            .optional()?;
        body.map(|body| parse_body(collection, &body)).transpose()
    }

    fn aggregate(&self, collection: Collection, pipeline: &[Stage]) -> StoreResult<Vec<Document>> {
        let (filter, remaining) = split_leading_match(pipeline);
        let documents = self.select_bodies(collection, &filter, 0, None)?;
        execute(documents, remaining, |from, field, value| {
            self.find(from, &FindQuery::new(Filter::eq(field, value.clone())))
        })
    }

    fn transaction<T, E, F>(&self, work: F) -> Result<T, E>
    where
        F: FnOnce(&Self) -> Result<T, E>,
        E: From<StoreError>,
    {
        let session = Session::begin(self.conn).map_err(E::from)?;
        let output = work(self)?;
        session.commit().map_err(E::from)?;
        Ok(output)
    }
}

/// Scoped SQLite transaction with release logging.
struct Session<'conn> {
    id: u64,
    tx: Option<Transaction<'conn>>,
}

impl<'conn> Session<'conn> {
    fn begin(conn: &'conn Connection) -> StoreResult<Self> {
        let tx = Transaction::new_unchecked(conn, TransactionBehavior::Immediate)?;
        let id = SESSION_SEQ.fetch_add(1, Ordering::Relaxed);
        debug!("event=session_begin module=repo status=ok session={id}");
        Ok(Self { id, tx: Some(tx) })
    }

    fn commit(mut self) -> StoreResult<()> {
        let Some(tx) = self.tx.take() else {
            return Ok(());
        };
        match tx.commit() {
            Ok(()) => {
                debug!(
                    "event=session_end module=repo status=ok session={} outcome=commit",
                    self.id
                );
                Ok(())
            }
            Err(err) => {
                // A failed commit has already rolled back.
                warn!(
                    "event=session_end module=repo status=error session={} outcome=commit_failed error={}",
                    self.id, err
                );
                Err(err.into())
            }
        }
    }
}

impl Drop for Session<'_> {
    fn drop(&mut self) {
        if let Some(tx) = self.tx.take() {
            let outcome = match tx.rollback() {
                Ok(()) => "rollback",
                Err(_) => "rollback_failed",
            };
            debug!(
                "event=session_end module=repo status=ok session={} outcome={}",
                self.id, outcome
            );
        }
    }
}

fn parse_body(collection: Collection, body: &str) -> StoreResult<Document> {
    serde_json::from_str::<Document>(body).map_err(|err| {
        StoreError::InvalidData(format!("unreadable document body in {collection}: {err}"))
    })
}

fn to_sql_int(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}
