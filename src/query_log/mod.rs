//! Persistence of asked questions and their answers.
//!
//! Logging is optional and never part of the answer path: a session writes a
//! [`QueryRecord`] only after the answer exists, and a failed write is reported
//! next to the answer instead of replacing it.

mod memory;
mod sqlite;

pub use memory::MemoryQueryLog;
pub use sqlite::SqliteQueryLog;

use crate::error::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One question/answer pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryRecord {
    /// Unique record ID.
    pub id: Uuid,
    /// Document the question was asked about.
    pub document_id: String,
    pub query: String,
    pub answer: String,
    /// Full prompt sent to the model.
    pub prompt: String,
    pub created_at: DateTime<Utc>,
}

impl QueryRecord {
    pub fn new(document_id: &str, query: &str, answer: &str, prompt: &str) -> Self {
        Self {
            id: Uuid::new_v4(),
            document_id: document_id.to_string(),
            query: query.to_string(),
            answer: answer.to_string(),
            prompt: prompt.to_string(),
            created_at: Utc::now(),
        }
    }
}

/// Trait for query log backends.
#[async_trait]
pub trait QueryLog: Send + Sync {
    /// Store a record. Failures are reported as [`crate::TubeqaError::Persistence`].
    async fn record(&self, record: &QueryRecord) -> Result<()>;

    /// Most recent records first.
    async fn recent(&self, limit: usize) -> Result<Vec<QueryRecord>>;

    /// Total number of records.
    async fn count(&self) -> Result<usize>;
}
