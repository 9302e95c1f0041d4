//! Storage traits and error types
//!
//! This module defines the record-store interface and the query type used
//! to select records by field equality.

use serde_json::{Map, Value};
use std::collections::BTreeMap;
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Invalid record: {0}")]
    InvalidRecord(String),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Selects records of one category whose fields equal every given value
#[derive(Debug, Clone, PartialEq)]
pub struct RecordQuery {
    pub category: String,
    pub fields: BTreeMap<String, Value>,
}

impl RecordQuery {
    /// Matches every record of a category
    pub fn category(category: impl Into<String>) -> Self {
        Self {
            category: category.into(),
            fields: BTreeMap::new(),
        }
    }

    /// Adds an equality constraint
    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(key.into(), value.into());
        self
    }

    /// Whether a record carries every queried field with an equal value
    pub fn matches(&self, record: &Map<String, Value>) -> bool {
        self.fields
            .iter()
            .all(|(key, value)| record.get(key) == Some(value))
    }
}

/// Trait for record storage backends
///
/// Records are JSON objects appended to named categories. Nothing is ever
/// deleted; `update` merges fields into existing records.
pub trait RecordStore {
    /// Appends a record to a category
    ///
    /// # Returns
    ///
    /// The row id of the stored record, or `InvalidRecord` if `record` is
    /// not a JSON object or `category` is empty.
    fn save(&mut self, record: &Value, category: &str) -> StorageResult<i64>;

    /// Records matching the query, in insertion order
    fn retrieve(&self, query: &RecordQuery) -> StorageResult<Vec<Value>>;

    /// Merges `patch` into every record matching the query
    ///
    /// Returns how many records were updated.
    fn update(&mut self, query: &RecordQuery, patch: &Map<String, Value>) -> StorageResult<usize>;

    /// Number of records in a category
    fn count(&self, category: &str) -> StorageResult<u64>;

    /// Categories holding at least one record, sorted
    fn categories(&self) -> StorageResult<Vec<String>>;
}
