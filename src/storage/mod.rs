//! Storage module for persisting crawl records
//!
//! This module handles all database operations for the crawler, including:
//! - SQLite database initialization and schema management
//! - Appending categorized crawl records
//! - Field-equality retrieval and in-place updates

mod schema;
mod sqlite;
mod traits;

pub use sqlite::SqliteStorage;
pub use traits::{RecordQuery, RecordStore, StorageError, StorageResult};

use crate::analysis::CrawlSuggestions;
use crate::state::TaskId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::Path;

/// Initializes or opens a storage database
///
/// # Arguments
///
/// * `path` - Path to the SQLite database file
///
/// # Returns
///
/// * `Ok(SqliteStorage)` - Successfully initialized storage
/// * `Err(StorageError)` - Failed to initialize storage
pub fn open_storage(path: &Path) -> StorageResult<SqliteStorage> {
    SqliteStorage::new(path)
}

/// Represents a processed page as stored in its category
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CrawlRecord {
    pub url: String,
    pub title: Option<String>,
    pub category: String,
    pub crawled_at: DateTime<Utc>,

    /// Visible text of the page
    pub text: String,

    pub link_count: usize,
    pub suggestions: CrawlSuggestions,

    /// Scheduler id when the page came from a scheduled task
    #[serde(skip_serializing_if = "Option::is_none")]
    pub task_id: Option<TaskId>,

    /// Task payload carried through unchanged
    #[serde(default)]
    pub payload: BTreeMap<String, Value>,
}

impl CrawlRecord {
    /// JSON object form handed to a `RecordStore`
    pub fn to_value(&self) -> StorageResult<Value> {
        Ok(serde_json::to_value(self)?)
    }
}
