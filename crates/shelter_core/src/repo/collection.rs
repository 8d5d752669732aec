//! Driver-level document collection on SQLite.
//!
//! # Responsibility
//! - Provide `insert_one`, `find`, `update_many`, `delete_one` over one
//!   named collection of JSON documents.
//! - Translate equality queries into `json_extract` filters.
//!
//! # Invariants
//! - Document order is insertion order (`seq`).
//! - The `_id` identifier lives outside the body and is never returned.
//! - A busy or locked store after the busy timeout surfaces as `Timeout`.

use crate::db::DbError;
use crate::model::record::{FieldValue, Query, Record, UpdateSet, ID_FIELD};
use log::warn;
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, ErrorCode};
use serde::Serialize;
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

pub type StoreResult<T> = Result<T, StoreError>;

/// Backend failure raised by collection operations.
#[derive(Debug)]
pub enum StoreError {
    Db(DbError),
    /// The store stayed busy or locked past the configured timeout.
    Timeout,
    /// The owning connection was already closed.
    Closed,
    InvalidQuery(String),
    InvalidData(String),
    DuplicateId(String),
}

impl Display for StoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::Timeout => write!(f, "store call timed out"),
            Self::Closed => write!(f, "store connection is closed"),
            Self::InvalidQuery(message) => write!(f, "invalid query: {message}"),
            Self::InvalidData(message) => write!(f, "invalid stored document: {message}"),
            Self::DuplicateId(id) => write!(f, "duplicate document id: {id}"),
        }
    }
}

impl Error for StoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            _ => None,
        }
    }
}

impl From<DbError> for StoreError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(value: rusqlite::Error) -> Self {
        match value.sqlite_error_code() {
            Some(ErrorCode::DatabaseBusy | ErrorCode::DatabaseLocked) => Self::Timeout,
            _ => Self::Db(DbError::Sqlite(value)),
        }
    }
}

/// Result descriptor of a merge update.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct UpdateCounts {
    pub matched_count: u64,
    /// Documents whose body actually changed.
    pub modified_count: u64,
}

/// One named collection inside the document store.
pub struct Collection<'conn> {
    conn: &'conn Connection,
    name: &'conn str,
}

impl<'conn> Collection<'conn> {
    pub fn new(conn: &'conn Connection, name: &'conn str) -> Self {
        Self { conn, name }
    }

    pub fn name(&self) -> &str {
        self.name
    }

    /// Inserts one document and returns its identifier.
    ///
    /// A caller-provided non-null `_id` is used as the identifier; otherwise
    /// a UUID v4 is generated.
    pub fn insert_one(&self, record: &Record) -> StoreResult<String> {
        let mut body = record.clone();
        let doc_id = match body.remove(ID_FIELD) {
            Some(FieldValue::Null) | None => Uuid::new_v4().to_string(),
            Some(value) => value.to_string(),
        };
        let body_json = encode_body(&body)?;

        let inserted = self.conn.execute(
            "INSERT INTO documents (collection, doc_id, body) VALUES (?1, ?2, ?3);",
            params![self.name, doc_id.as_str(), body_json],
        );
        match inserted {
            Ok(_) => Ok(doc_id),
            Err(err) if err.sqlite_error_code() == Some(ErrorCode::ConstraintViolation) => {
                Err(StoreError::DuplicateId(doc_id))
            }
            Err(err) => Err(err.into()),
        }
    }

    /// Returns every document matching `query` in insertion order.
    ///
    /// Stored documents that do not decode as flat records are skipped.
    pub fn find(&self, query: &Query) -> StoreResult<Vec<Record>> {
        let filter = Filter::build(query)?;
        let sql = format!(
            "SELECT seq, body FROM documents WHERE collection = ?{} ORDER BY seq ASC;",
            filter.sql
        );

        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(filter.bind_values(self.name)))?;
        let mut records = Vec::new();
        while let Some(row) = rows.next()? {
            let seq: i64 = row.get(0)?;
            let body: String = row.get(1)?;
            match decode_body(&body) {
                Ok(record) => records.push(record),
                Err(err) => warn!(
                    "event=store_find module=repo status=skipped collection={} seq={seq} error={err}",
                    self.name
                ),
            }
        }

        Ok(records)
    }

    pub fn count_documents(&self, query: &Query) -> StoreResult<u64> {
        let filter = Filter::build(query)?;
        let sql = format!(
            "SELECT COUNT(*) FROM documents WHERE collection = ?{};",
            filter.sql
        );
        let count = self.conn.query_row(
            &sql,
            params_from_iter(filter.bind_values(self.name)),
            |row| row.get::<_, i64>(0),
        )?;
        Ok(u64::try_from(count).unwrap_or(0))
    }

    /// Merges `update` into every matching document in one transaction.
    pub fn update_many(&self, query: &Query, update: &UpdateSet) -> StoreResult<UpdateCounts> {
        if update.is_empty() {
            return Err(StoreError::InvalidQuery(
                "update set cannot be empty".to_string(),
            ));
        }
        if update.contains_field(ID_FIELD) {
            return Err(StoreError::InvalidQuery(format!(
                "`{ID_FIELD}` cannot be updated"
            )));
        }

        let filter = Filter::build(query)?;
        let tx = self.conn.unchecked_transaction()?;

        let matched = {
            let sql = format!(
                "SELECT seq, body FROM documents WHERE collection = ?{} ORDER BY seq ASC;",
                filter.sql
            );
            let mut stmt = tx.prepare(&sql)?;
            let mut rows = stmt.query(params_from_iter(filter.bind_values(self.name)))?;
            let mut matched = Vec::new();
            while let Some(row) = rows.next()? {
                matched.push((row.get::<_, i64>(0)?, row.get::<_, String>(1)?));
            }
            matched
        };

        let mut counts = UpdateCounts {
            matched_count: matched.len() as u64,
            modified_count: 0,
        };
        for (seq, body) in matched {
            let mut record = decode_body(&body)?;
            if !record.merge(update) {
                continue;
            }
            tx.execute(
                "UPDATE documents
                 SET
                    body = ?1,
                    updated_at = (strftime('%s', 'now') * 1000)
                 WHERE seq = ?2;",
                params![encode_body(&record)?, seq],
            )?;
            counts.modified_count += 1;
        }
        tx.commit()?;

        Ok(counts)
    }

    /// Removes the first matching document and returns the removed count.
    pub fn delete_one(&self, query: &Query) -> StoreResult<u64> {
        let filter = Filter::build(query)?;
        let sql = format!(
            "DELETE FROM documents
             WHERE seq = (
                SELECT seq FROM documents
                WHERE collection = ?{}
                ORDER BY seq ASC
                LIMIT 1
             );",
            filter.sql
        );
        let deleted = self
            .conn
            .execute(&sql, params_from_iter(filter.bind_values(self.name)))?;
        Ok(deleted as u64)
    }
}

/// SQL predicate fragment plus positional bind values for one query.
struct Filter {
    sql: String,
    values: Vec<Value>,
}

impl Filter {
    fn build(query: &Query) -> StoreResult<Self> {
        let mut filter = Self {
            sql: String::new(),
            values: Vec::new(),
        };

        for (field, expected) in query {
            if field == ID_FIELD {
                filter.push_id(expected);
                continue;
            }

            let path = json_path_literal(field)?;
            match expected {
                FieldValue::Null => filter.sql.push_str(&format!(
                    " AND (json_type(body, {path}) IS NULL OR json_type(body, {path}) = 'null')"
                )),
                FieldValue::Bool(value) => filter.sql.push_str(&format!(
                    " AND json_type(body, {path}) = '{}'",
                    if *value { "true" } else { "false" }
                )),
                FieldValue::Integer(value) => {
                    filter.push_number(&path);
                    filter.values.push(Value::Integer(*value));
                }
                FieldValue::Float(value) => {
                    filter.push_number(&path);
                    filter.values.push(Value::Real(*value));
                }
                FieldValue::Text(value) => {
                    filter.sql.push_str(&format!(
                        " AND json_type(body, {path}) = 'text' AND json_extract(body, {path}) = ?"
                    ));
                    filter.values.push(Value::Text(value.clone()));
                }
            }
        }

        Ok(filter)
    }

    fn push_id(&mut self, expected: &FieldValue) {
        if expected.is_null() {
            self.sql.push_str(" AND 0");
            return;
        }
        self.sql.push_str(" AND doc_id = ?");
        self.values.push(Value::Text(expected.to_string()));
    }

    fn push_number(&mut self, path: &str) {
        self.sql.push_str(&format!(
            " AND json_type(body, {path}) IN ('integer', 'real') AND json_extract(body, {path}) = ?"
        ));
    }

    fn bind_values(&self, collection: &str) -> Vec<Value> {
        std::iter::once(Value::Text(collection.to_string()))
            .chain(self.values.iter().cloned())
            .collect()
    }
}

/// Builds a quoted SQL literal for the JSON path of `field`.
///
/// Plain identifiers use the `$.field` form so expression indexes apply.
fn json_path_literal(field: &str) -> StoreResult<String> {
    if field.is_empty() || field.contains('"') {
        return Err(StoreError::InvalidQuery(format!(
            "unsupported field name `{field}`"
        )));
    }

    let simple = field
        .chars()
        .next()
        .is_some_and(|first| first.is_ascii_alphabetic() || first == '_')
        && field
            .chars()
            .all(|ch| ch.is_ascii_alphanumeric() || ch == '_');
    let path = if simple {
        format!("$.{field}")
    } else {
        format!("$.\"{field}\"")
    };

    Ok(format!("'{}'", path.replace('\'', "''")))
}

fn encode_body(record: &Record) -> StoreResult<String> {
    serde_json::to_string(record)
        .map_err(|err| StoreError::InvalidData(format!("cannot encode document: {err}")))
}

fn decode_body(body: &str) -> StoreResult<Record> {
    serde_json::from_str(body)
        .map_err(|err| StoreError::InvalidData(format!("cannot decode document: {err}")))
}
