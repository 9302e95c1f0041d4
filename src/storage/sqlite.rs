//! SQLite storage implementation
//!
//! This module provides a SQLite-based implementation of the RecordStore trait.

use crate::storage::schema::initialize_schema;
use crate::storage::traits::{RecordQuery, RecordStore, StorageError, StorageResult};
use chrono::Utc;
use rusqlite::{params, Connection};
use serde_json::{Map, Value};
use std::path::Path;

/// SQLite storage backend
pub struct SqliteStorage {
    conn: Connection,
}

impl SqliteStorage {
    /// Creates a new SqliteStorage instance
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the SQLite database file
    ///
    /// # Returns
    ///
    /// * `Ok(SqliteStorage)` - Successfully opened/created database
    /// * `Err(StorageError)` - Failed to open database
    pub fn new(path: &Path) -> StorageResult<Self> {
        let conn = Connection::open(path)?;

        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA temp_store = MEMORY;
        ",
        )?;

        initialize_schema(&conn)?;

        Ok(Self { conn })
    }

    /// Creates an in-memory database
    pub fn new_in_memory() -> StorageResult<Self> {
        let conn = Connection::open_in_memory()?;
        initialize_schema(&conn)?;
        Ok(Self { conn })
    }

    /// All rows of a category as (id, object), in insertion order
    fn load_category(&self, category: &str) -> StorageResult<Vec<(i64, Map<String, Value>)>> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, data FROM records WHERE category = ?1 ORDER BY id")?;

        let rows = stmt
            .query_map(params![category], |row| {
                Ok((row.get::<_, i64>(0)?, row.get::<_, String>(1)?))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        rows.into_iter()
            .map(|(id, data)| match serde_json::from_str::<Value>(&data)? {
                Value::Object(map) => Ok((id, map)),
                _ => Err(StorageError::InvalidRecord(format!(
                    "row {} in {} is not a JSON object",
                    id, category
                ))),
            })
            .collect()
    }
}

impl RecordStore for SqliteStorage {
    fn save(&mut self, record: &Value, category: &str) -> StorageResult<i64> {
        if category.trim().is_empty() {
            return Err(StorageError::InvalidRecord(
                "category must not be empty".to_string(),
            ));
        }
        if !record.is_object() {
            return Err(StorageError::InvalidRecord(
                "record must be a JSON object".to_string(),
            ));
        }

        let data = serde_json::to_string(record)?;
        self.conn.execute(
            "INSERT INTO records (category, data, created_at) VALUES (?1, ?2, ?3)",
            params![category, data, Utc::now().to_rfc3339()],
        )?;

        tracing::debug!("Saved record to category {}", category);
        Ok(self.conn.last_insert_rowid())
    }

    fn retrieve(&self, query: &RecordQuery) -> StorageResult<Vec<Value>> {
        Ok(self
            .load_category(&query.category)?
            .into_iter()
            .filter(|(_, record)| query.matches(record))
            .map(|(_, record)| Value::Object(record))
            .collect())
    }

    fn update(&mut self, query: &RecordQuery, patch: &Map<String, Value>) -> StorageResult<usize> {
        let matching: Vec<(i64, Map<String, Value>)> = self
            .load_category(&query.category)?
            .into_iter()
            .filter(|(_, record)| query.matches(record))
            .collect();

        let now = Utc::now().to_rfc3339();
        let tx = self.conn.transaction()?;
        for (id, mut record) in matching.iter().cloned() {
            for (key, value) in patch {
                record.insert(key.clone(), value.clone());
            }
            tx.execute(
                "UPDATE records SET data = ?1, updated_at = ?2 WHERE id = ?3",
                params![serde_json::to_string(&record)?, now, id],
            )?;
        }
        tx.commit()?;

        tracing::debug!(
            "Updated {} record(s) in category {}",
            matching.len(),
            query.category
        );
        Ok(matching.len())
    }

    fn count(&self, category: &str) -> StorageResult<u64> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM records WHERE category = ?1",
            params![category],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }

    fn categories(&self) -> StorageResult<Vec<String>> {
        let mut stmt = self
            .conn
            .prepare("SELECT DISTINCT category FROM records ORDER BY category")?;
        let categories = stmt
            .query_map([], |row| row.get(0))?
            .collect::<Result<Vec<String>, _>>()?;
        Ok(categories)
    }
}
