//! SQLite-backed query log.

use super::{QueryLog, QueryRecord};
use crate::error::{Result, TubeqaError};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};
use std::path::Path;
use std::sync::Mutex;
use tracing::{debug, info, instrument};

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS query_log (
    id TEXT PRIMARY KEY,
    document_id TEXT NOT NULL,
    query TEXT NOT NULL,
    answer TEXT NOT NULL,
    prompt TEXT NOT NULL,
    created_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_query_log_document_id ON query_log(document_id);
CREATE INDEX IF NOT EXISTS idx_query_log_created_at ON query_log(created_at);
"#;

/// Query log stored in a SQLite database.
pub struct SqliteQueryLog {
    conn: Mutex<Connection>,
}

impl SqliteQueryLog {
    /// Open (or create) a query log at the given path.
    #[instrument(skip_all)]
    pub fn new(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)?;

        // Enable WAL mode for better concurrent performance
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;
        conn.execute_batch(SCHEMA)?;

        info!("Initialized SQLite query log at {:?}", path);

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Create an in-memory query log (useful for testing).
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(SCHEMA)?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| TubeqaError::Persistence(format!("Failed to acquire lock: {}", e)))
    }

    fn row_to_record(row: &rusqlite::Row<'_>) -> rusqlite::Result<(String, QueryRecordRow)> {
        Ok((
            row.get(0)?,
            QueryRecordRow {
                document_id: row.get(1)?,
                query: row.get(2)?,
                answer: row.get(3)?,
                prompt: row.get(4)?,
                created_at: row.get(5)?,
            },
        ))
    }
}

/// Raw column values before ID and timestamp parsing.
struct QueryRecordRow {
    document_id: String,
    query: String,
    answer: String,
    prompt: String,
    created_at: String,
}

#[async_trait]
impl QueryLog for SqliteQueryLog {
    #[instrument(skip(self, record), fields(id = %record.id))]
    async fn record(&self, record: &QueryRecord) -> Result<()> {
        let conn = self.lock()?;

        conn.execute(
            r#"
            INSERT INTO query_log (id, document_id, query, answer, prompt, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
            params![
                record.id.to_string(),
                record.document_id,
                record.query,
                record.answer,
                record.prompt,
                record.created_at.to_rfc3339(),
            ],
        )
        .map_err(|e| TubeqaError::Persistence(format!("Failed to store query: {}", e)))?;

        debug!("Stored query record");
        Ok(())
    }

    async fn recent(&self, limit: usize) -> Result<Vec<QueryRecord>> {
        let conn = self.lock()?;

        let mut stmt = conn.prepare(
            "SELECT id, document_id, query, answer, prompt, created_at FROM query_log ORDER BY created_at DESC LIMIT ?1",
        )?;

        let rows = stmt.query_map(params![limit as i64], Self::row_to_record)?;

        let mut records = Vec::new();
        for row in rows {
            let (id, row) = row?;
            let id: uuid::Uuid = id
                .parse()
                .map_err(|e| TubeqaError::Persistence(format!("Invalid record id {}: {}", id, e)))?;
            let created_at = DateTime::parse_from_rfc3339(&row.created_at)
                .map(|dt| dt.with_timezone(&Utc))
                .map_err(|e| TubeqaError::Persistence(format!("Invalid timestamp: {}", e)))?;

            records.push(QueryRecord {
                id,
                document_id: row.document_id,
                query: row.query,
                answer: row.answer,
                prompt: row.prompt,
                created_at,
            });
        }

        Ok(records)
    }

    async fn count(&self) -> Result<usize> {
        let conn = self.lock()?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM query_log", [], |row| row.get(0))?;
        Ok(count as usize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_record_and_read_back() {
        let log = SqliteQueryLog::in_memory().unwrap();

        let mut first = QueryRecord::new("abc123", "What is said first?", "Hello.", "prompt 1");
        first.created_at = Utc::now() - chrono::Duration::seconds(10);
        let second = QueryRecord::new("abc123", "What is said at the end?", "Goodbye.", "prompt 2");

        log.record(&first).await.unwrap();
        log.record(&second).await.unwrap();

        assert_eq!(log.count().await.unwrap(), 2);

        let recent = log.recent(10).await.unwrap();
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].id, second.id);
        assert_eq!(recent[1].query, "What is said first?");

        assert_eq!(log.recent(1).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_duplicate_id_is_persistence_error() {
        let log = SqliteQueryLog::in_memory().unwrap();
        let record = QueryRecord::new("abc123", "q", "a", "p");

        log.record(&record).await.unwrap();
        let err = log.record(&record).await.unwrap_err();
        assert!(matches!(err, TubeqaError::Persistence(_)));
    }

    #[tokio::test]
    async fn test_file_backed_log() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("logs").join("queries.db");

        {
            let log = SqliteQueryLog::new(&path).unwrap();
            log.record(&QueryRecord::new("abc123", "q", "a", "p")).await.unwrap();
        }

        let reopened = SqliteQueryLog::new(&path).unwrap();
        assert_eq!(reopened.count().await.unwrap(), 1);
    }
}
