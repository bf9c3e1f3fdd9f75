//! Job log repository.
//!
//! Log lines are written by the execution units themselves; the orchestrator
//! only reads them back.

use async_trait::async_trait;
use bzk_core::ResourceId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;

use crate::DbResult;

/// A log line emitted while running a job.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct LogEntry {
    pub id: uuid::Uuid,
    pub job_id: uuid::Uuid,
    /// Image of the step that produced the line.
    pub image: String,
    pub level: String,
    pub message: String,
    pub time: DateTime<Utc>,
}

#[async_trait]
pub trait LogRepo: Send + Sync {
    /// All log lines of a job, oldest first.
    async fn list_for_job(&self, job_id: ResourceId) -> DbResult<Vec<LogEntry>>;
}

/// PostgreSQL implementation of LogRepo.
pub struct PgLogRepo {
    pool: PgPool,
}

impl PgLogRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl LogRepo for PgLogRepo {
    async fn list_for_job(&self, job_id: ResourceId) -> DbResult<Vec<LogEntry>> {
        let entries = sqlx::query_as::<_, LogEntry>(
            r#"
            SELECT id, job_id, image, level, message, time
            FROM job_logs
            WHERE job_id = $1
            ORDER BY time ASC
            "#,
        )
        .bind(job_id.as_uuid())
        .fetch_all(&self.pool)
        .await?;
        Ok(entries)
    }
}
