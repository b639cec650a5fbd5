//! In-memory query log.
//!
//! Useful for testing and for programs that only need the log for the current run.

use super::{QueryLog, QueryRecord};
use crate::error::{Result, TubeqaError};
use async_trait::async_trait;
use std::sync::RwLock;

/// In-memory query log.
pub struct MemoryQueryLog {
    records: RwLock<Vec<QueryRecord>>,
}

impl MemoryQueryLog {
    pub fn new() -> Self {
        Self {
            records: RwLock::new(Vec::new()),
        }
    }

    /// All records in insertion order.
    pub fn records(&self) -> Vec<QueryRecord> {
        self.records.read().map(|r| r.clone()).unwrap_or_default()
    }
}

impl Default for MemoryQueryLog {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl QueryLog for MemoryQueryLog {
    async fn record(&self, record: &QueryRecord) -> Result<()> {
        let mut records = self
            .records
            .write()
            .map_err(|e| TubeqaError::Persistence(format!("Failed to acquire lock: {}", e)))?;
        records.push(record.clone());
        Ok(())
    }

    async fn recent(&self, limit: usize) -> Result<Vec<QueryRecord>> {
        let records = self
            .records
            .read()
            .map_err(|e| TubeqaError::Persistence(format!("Failed to acquire lock: {}", e)))?;

        let mut recent: Vec<QueryRecord> = records.iter().rev().take(limit).cloned().collect();
        recent.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(recent)
    }

    async fn count(&self) -> Result<usize> {
        let records = self
            .records
            .read()
            .map_err(|e| TubeqaError::Persistence(format!("Failed to acquire lock: {}", e)))?;
        Ok(records.len())
    }
}
