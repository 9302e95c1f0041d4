use crate::url::validate_url;
use crate::CrawlError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

/// Identifier minted by the scheduler for a scheduled task
///
/// Ids come from a monotonic counter and are never reused for the lifetime
/// of a scheduler, even after the task is cancelled or dispatched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TaskId(pub u64);

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A unit of crawl work
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    /// Set by the scheduler when the task was scheduled
    pub id: Option<TaskId>,

    /// Page to crawl
    pub url: String,

    /// Caller annotations carried through to the crawl record
    #[serde(default)]
    pub payload: BTreeMap<String, Value>,

    /// When the task was scheduled to run, for deferred tasks
    pub schedule_time: Option<DateTime<Utc>>,
}

impl Task {
    /// Creates an immediate task for a URL
    ///
    /// # Returns
    ///
    /// * `Ok(Task)` - The URL is crawlable
    /// * `Err(CrawlError::Validation)` - The URL is malformed or not http(s)
    pub fn new(url: impl Into<String>) -> Result<Self, CrawlError> {
        let url = url.into();
        if !validate_url(&url) {
            return Err(CrawlError::Validation { url });
        }

        Ok(Self {
            id: None,
            url,
            payload: BTreeMap::new(),
            schedule_time: None,
        })
    }

    /// Adds a payload field, replacing any previous value under the same key
    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.payload.insert(key.into(), value.into());
        self
    }
}
