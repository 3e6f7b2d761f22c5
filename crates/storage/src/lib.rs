use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use sqlx::{Row, SqlitePool};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use triage_core::Category;
use uuid::Uuid;

pub const DEFAULT_FEEDBACK_FILE: &str = "feedback.jsonl";

/// One operator correction. Field names match the JSON-lines log format.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedbackRecord {
    pub feedback_id: String,
    #[serde(rename = "ts")]
    pub created_at: DateTime<Utc>,
    pub subject: String,
    pub body: String,
    pub predicted: Category,
    #[serde(rename = "correct")]
    pub corrected: Category,
}

impl FeedbackRecord {
    pub fn new(subject: String, body: String, predicted: Category, corrected: Category) -> Self {
        Self {
            feedback_id: Uuid::new_v4().to_string(),
            created_at: Utc::now(),
            subject,
            body,
            predicted,
            corrected,
        }
    }
}

/// Append-only feedback sink. Records are never updated or deleted.
pub trait FeedbackRepository: Send + Sync {
    async fn append(&self, record: &FeedbackRecord) -> Result<()>;
    /// Newest first.
    async fn recent(&self, limit: usize) -> Result<Vec<FeedbackRecord>>;
    async fn count(&self) -> Result<u64>;
}

#[derive(Clone, Default)]
pub struct MemoryStore {
    feedback: Arc<RwLock<Vec<FeedbackRecord>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl FeedbackRepository for MemoryStore {
    async fn append(&self, record: &FeedbackRecord) -> Result<()> {
        self.feedback.write().push(record.clone());
        Ok(())
    }

    async fn recent(&self, limit: usize) -> Result<Vec<FeedbackRecord>> {
        Ok(self
            .feedback
            .read()
            .iter()
            .rev()
            .take(limit)
            .cloned()
            .collect())
    }

    async fn count(&self) -> Result<u64> {
        Ok(self.feedback.read().len() as u64)
    }
}

/// JSON-lines file, one record per line.
#[derive(Clone)]
pub struct JsonlStore {
    path: PathBuf,
    write_lock: Arc<Mutex<()>>,
}

impl JsonlStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Arc::new(Mutex::new(())),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn read_all(&self) -> Result<Vec<FeedbackRecord>> {
        let raw = match tokio::fs::read_to_string(&self.path).await {
            Ok(raw) => raw,
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(error) => {
                return Err(error)
                    .with_context(|| format!("failed reading {}", self.path.display()))
            }
        };

        let mut records = Vec::new();
        for (line_no, line) in raw.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<FeedbackRecord>(line) {
                Ok(record) => records.push(record),
                Err(error) => tracing::warn!(
                    path = %self.path.display(),
                    line = line_no + 1,
                    %error,
                    "skipping malformed feedback line"
                ),
            }
        }
        Ok(records)
    }
}

impl FeedbackRepository for JsonlStore {
    async fn append(&self, record: &FeedbackRecord) -> Result<()> {
        let mut line = serde_json::to_string(record)?;
        line.push('\n');

        let _guard = self.write_lock.lock().await;
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await
            .with_context(|| format!("failed opening {}", self.path.display()))?;
        file.write_all(line.as_bytes()).await?;
        file.flush().await?;
        Ok(())
    }

    async fn recent(&self, limit: usize) -> Result<Vec<FeedbackRecord>> {
        let mut records = self.read_all().await?;
        records.reverse();
        records.truncate(limit);
        Ok(records)
    }

    async fn count(&self) -> Result<u64> {
        Ok(self.read_all().await?.len() as u64)
    }
}

#[derive(Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = SqlitePool::connect(database_url)
            .await
            .with_context(|| format!("failed connecting to sqlite at {}", database_url))?;

        let store = Self { pool };
        store.ensure_schema().await?;
        Ok(store)
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    async fn ensure_schema(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS feedback (
              feedback_id TEXT PRIMARY KEY,
              created_at TEXT NOT NULL,
              subject TEXT NOT NULL,
              body TEXT NOT NULL,
              predicted TEXT NOT NULL,
              corrected TEXT NOT NULL
            );
            "#,
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

impl FeedbackRepository for SqliteStore {
    async fn append(&self, record: &FeedbackRecord) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO feedback (feedback_id, created_at, subject, body, predicted, corrected)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
        )
        .bind(&record.feedback_id)
        .bind(record.created_at.to_rfc3339())
        .bind(&record.subject)
        .bind(&record.body)
        .bind(record.predicted.as_str())
        .bind(record.corrected.as_str())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn recent(&self, limit: usize) -> Result<Vec<FeedbackRecord>> {
        let rows = sqlx::query(
            r#"
            SELECT feedback_id, created_at, subject, body, predicted, corrected
            FROM feedback
            ORDER BY created_at DESC, rowid DESC
            LIMIT ?1
            "#,
        )
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;

        let mut records = Vec::with_capacity(rows.len());
        for row in rows {
            let feedback_id: String = row.get("feedback_id");
            let predicted: String = row.get("predicted");
            let corrected: String = row.get("corrected");
            let (Some(predicted), Some(corrected)) =
                (Category::parse(&predicted), Category::parse(&corrected))
            else {
                tracing::warn!(feedback_id = %feedback_id, "skipping feedback row with unknown label");
                continue;
            };

            let raw_created_at: String = row.get("created_at");
            let created_at = match DateTime::parse_from_rfc3339(&raw_created_at) {
                Ok(parsed) => parsed.with_timezone(&Utc),
                Err(error) => {
                    tracing::warn!(
                        feedback_id = %feedback_id,
                        error = %error,
                        "skipping feedback row with invalid timestamp"
                    );
                    continue;
                }
            };

            records.push(FeedbackRecord {
                created_at,
                feedback_id,
                subject: row.get("subject"),
                body: row.get("body"),
                predicted,
                corrected,
            });
        }

        Ok(records)
    }

    async fn count(&self) -> Result<u64> {
        let row = sqlx::query("SELECT COUNT(*) AS total FROM feedback")
            .fetch_one(&self.pool)
            .await?;
        Ok(row.get::<i64, _>("total") as u64)
    }
}

#[derive(Clone)]
pub enum Store {
    Memory(MemoryStore),
    Jsonl(JsonlStore),
    Sqlite(SqliteStore),
}

impl Store {
    pub fn memory() -> Self {
        Self::Memory(MemoryStore::new())
    }

    pub fn jsonl(path: impl Into<PathBuf>) -> Self {
        Self::Jsonl(JsonlStore::new(path))
    }

    pub async fn sqlite(database_url: &str) -> Result<Self> {
        let sqlite = SqliteStore::connect(database_url).await?;
        Ok(Self::Sqlite(sqlite))
    }

    pub fn backend_name(&self) -> &'static str {
        match self {
            Store::Memory(_) => "memory",
            Store::Jsonl(_) => "jsonl",
            Store::Sqlite(_) => "sqlite",
        }
    }
}

impl FeedbackRepository for Store {
    async fn append(&self, record: &FeedbackRecord) -> Result<()> {
        match self {
            Store::Memory(store) => store.append(record).await,
            Store::Jsonl(store) => store.append(record).await,
            Store::Sqlite(store) => store.append(record).await,
        }
    }

    async fn recent(&self, limit: usize) -> Result<Vec<FeedbackRecord>> {
        match self {
            Store::Memory(store) => store.recent(limit).await,
            Store::Jsonl(store) => store.recent(limit).await,
            Store::Sqlite(store) => store.recent(limit).await,
        }
    }

    async fn count(&self) -> Result<u64> {
        match self {
            Store::Memory(store) => store.count().await,
            Store::Jsonl(store) => store.count().await,
            Store::Sqlite(store) => store.count().await,
        }
    }
}
