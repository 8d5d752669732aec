//! Animal shelter repository contract and store-backed implementation.
//!
//! # Responsibility
//! - Expose `create`, `read`, `update`, `delete`, `close` over the
//!   configured collection.
//! - Split caller contract violations from backend failures.
//!
//! # Invariants
//! - `create(None)` and `delete(None)` are hard failures.
//! - Backend failures are logged and mapped to `false`, an empty list or
//!   `None`; they are never returned as errors.
//! - `update` with an empty query matches zero records.
//! - The connection is owned for the repository lifetime and released by
//!   `close()` or on drop.

use crate::config::StoreConfig;
use crate::db::{open_store, open_store_in_memory, DbResult, DEFAULT_BUSY_TIMEOUT};
use crate::model::record::{Query, Record, UpdateSet};
use crate::repo::collection::{Collection, StoreError, StoreResult, UpdateCounts};
use log::{debug, info, warn};
use rusqlite::Connection;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Caller omitted a required argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArgumentError {
    /// `create` was called without a record.
    EmptyInput,
    /// `delete` was called without a query.
    EmptyQuery,
}

impl Display for ArgumentError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyInput => write!(f, "data cannot be empty"),
            Self::EmptyQuery => write!(f, "query cannot be empty"),
        }
    }
}

impl Error for ArgumentError {}

/// Data-access contract for shelter records.
pub trait AnimalRepository {
    /// Inserts one record. `Ok(true)` iff a document was stored.
    fn create(&self, record: Option<&Record>) -> Result<bool, ArgumentError>;
    /// Returns matching records; `None` or an empty query returns all.
    fn read(&self, query: Option<&Query>) -> Vec<Record>;
    /// Merges `update` into every match. `None` is the empty descriptor.
    fn update(&self, query: &Query, update: Option<&UpdateSet>) -> Option<UpdateCounts>;
    /// Removes the first match. `Ok(true)` iff one record was removed.
    fn delete(&self, query: Option<&Query>) -> Result<bool, ArgumentError>;
    /// Releases the connection. Safe to call more than once.
    fn close(&mut self);
}

/// Repository over the embedded document store.
pub struct AnimalShelter {
    conn: Option<Connection>,
    collection: String,
}

impl AnimalShelter {
    /// Opens the configured store file; failure is fatal for callers.
    pub fn open(config: &StoreConfig) -> DbResult<Self> {
        let conn = open_store(config.database_path(), config.busy_timeout)?;
        info!(
            "event=repo_connect module=repo status=ok database={} collection={}",
            config.database, config.collection
        );
        Ok(Self::from_connection(conn, config.collection.clone()))
    }

    /// Opens a private in-memory store, mainly for tests.
    pub fn open_in_memory(collection: impl Into<String>) -> DbResult<Self> {
        let conn = open_store_in_memory(DEFAULT_BUSY_TIMEOUT)?;
        Ok(Self::from_connection(conn, collection))
    }

    /// Wraps an already migrated connection.
    pub fn from_connection(conn: Connection, collection: impl Into<String>) -> Self {
        Self {
            conn: Some(conn),
            collection: collection.into(),
        }
    }

    pub fn is_open(&self) -> bool {
        self.conn.is_some()
    }

    pub fn collection_name(&self) -> &str {
        &self.collection
    }

    /// Counts matching documents, surfacing backend errors to the caller.
    pub fn count(&self, query: &Query) -> StoreResult<u64> {
        self.with_collection(|collection| collection.count_documents(query))
    }

    fn with_collection<T>(
        &self,
        op: impl FnOnce(&Collection<'_>) -> StoreResult<T>,
    ) -> StoreResult<T> {
        let conn = self.conn.as_ref().ok_or(StoreError::Closed)?;
        op(&Collection::new(conn, &self.collection))
    }
}

impl AnimalRepository for AnimalShelter {
    fn create(&self, record: Option<&Record>) -> Result<bool, ArgumentError> {
        let record = record.ok_or(ArgumentError::EmptyInput)?;

        match self.with_collection(|collection| collection.insert_one(record)) {
            Ok(doc_id) => {
                debug!("event=repo_create module=repo status=ok doc_id={doc_id}");
                Ok(!doc_id.is_empty())
            }
            Err(err) => {
                warn!("event=repo_create module=repo status=error error={err}");
                Ok(false)
            }
        }
    }

    fn read(&self, query: Option<&Query>) -> Vec<Record> {
        let all = Query::new();
        let query = query.unwrap_or(&all);

        match self.with_collection(|collection| collection.find(query)) {
            Ok(records) => {
                debug!(
                    "event=repo_read module=repo status=ok filters={} count={}",
                    query.len(),
                    records.len()
                );
                records
            }
            Err(err) => {
                warn!("event=repo_read module=repo status=error error={err}");
                Vec::new()
            }
        }
    }

    fn update(&self, query: &Query, update: Option<&UpdateSet>) -> Option<UpdateCounts> {
        let Some(update) = update else {
            warn!("event=repo_update module=repo status=skipped reason=missing_update_set");
            return None;
        };
        if query.is_empty() {
            warn!("event=repo_update module=repo status=skipped reason=empty_query");
            return Some(UpdateCounts::default());
        }

        match self.with_collection(|collection| collection.update_many(query, update)) {
            Ok(counts) => {
                debug!(
                    "event=repo_update module=repo status=ok matched={} modified={}",
                    counts.matched_count, counts.modified_count
                );
                Some(counts)
            }
            Err(err) => {
                warn!("event=repo_update module=repo status=error error={err}");
                None
            }
        }
    }

    fn delete(&self, query: Option<&Query>) -> Result<bool, ArgumentError> {
        let query = query.ok_or(ArgumentError::EmptyQuery)?;

        match self.with_collection(|collection| collection.delete_one(query)) {
            Ok(deleted) => {
                debug!("event=repo_delete module=repo status=ok deleted={deleted}");
                Ok(deleted > 0)
            }
            Err(err) => {
                warn!("event=repo_delete module=repo status=error error={err}");
                Ok(false)
            }
        }
    }

    fn close(&mut self) {
        let Some(conn) = self.conn.take() else {
            return;
        };
        match conn.close() {
            Ok(()) => info!("event=repo_close module=repo status=ok"),
            Err((_conn, err)) => {
                warn!("event=repo_close module=repo status=error error={err}");
            }
        }
    }
}

impl Drop for AnimalShelter {
    fn drop(&mut self) {
        self.close();
    }
}
