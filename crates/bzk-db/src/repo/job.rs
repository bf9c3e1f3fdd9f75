//! Job repository.

use async_trait::async_trait;
use bzk_core::ResourceId;
use bzk_core::job::{Job, JobStatus};
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::{DbError, DbResult};

#[derive(Debug, sqlx::FromRow)]
struct JobRow {
    id: uuid::Uuid,
    project_id: uuid::Uuid,
    started: DateTime<Utc>,
    parameters: Vec<String>,
    orchestration_id: Option<String>,
    status: String,
    exit_code: Option<i64>,
    finished: Option<DateTime<Utc>>,
}

impl TryFrom<JobRow> for Job {
    type Error = DbError;

    fn try_from(row: JobRow) -> DbResult<Self> {
        let status: JobStatus = row
            .status
            .parse()
            .map_err(|e| DbError::InvalidRow(format!("job {}: {}", row.id, e)))?;
        Ok(Job {
            id: ResourceId::from_uuid(row.id),
            project_id: ResourceId::from_uuid(row.project_id),
            started: row.started,
            parameters: row.parameters,
            orchestration_id: row.orchestration_id,
            status,
            exit_code: row.exit_code,
            finished: row.finished,
        })
    }
}

fn into_jobs(rows: Vec<JobRow>) -> DbResult<Vec<Job>> {
    rows.into_iter().map(Job::try_from).collect()
}

#[async_trait]
pub trait JobRepo: Send + Sync {
    async fn create(&self, job: &Job) -> DbResult<()>;
    async fn get_by_id(&self, id: ResourceId) -> DbResult<Job>;
    /// Jobs of one project, newest first.
    async fn list_by_project(&self, project_id: ResourceId) -> DbResult<Vec<Job>>;
    /// All jobs, newest first.
    async fn list_all(&self) -> DbResult<Vec<Job>>;
    /// Record the execution unit launched for a job and mark it running.
    ///
    /// The linkage is written once: `Duplicate` if the job is already linked.
    /// A terminal status recorded before the link is kept.
    async fn link_execution(&self, id: ResourceId, orchestration_id: &str) -> DbResult<()>;
    /// Write a terminal status observed by the lifecycle monitor.
    async fn record_outcome(
        &self,
        id: ResourceId,
        status: JobStatus,
        exit_code: Option<i64>,
    ) -> DbResult<()>;
}

/// PostgreSQL implementation of JobRepo.
pub struct PgJobRepo {
    pool: PgPool,
}

impl PgJobRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl JobRepo for PgJobRepo {
    async fn create(&self, job: &Job) -> DbResult<()> {
        sqlx::query(
            r#"
            INSERT INTO jobs (id, project_id, started, parameters, orchestration_id, status, exit_code, finished)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(job.id.as_uuid())
        .bind(job.project_id.as_uuid())
        .bind(job.started)
        .bind(&job.parameters)
        .bind(&job.orchestration_id)
        .bind(job.status.as_str())
        .bind(job.exit_code)
        .bind(job.finished)
        .execute(&self.pool)
        .await
        .map_err(|e| DbError::from_insert(e, format!("job {}", job.id)))?;
        Ok(())
    }

    async fn get_by_id(&self, id: ResourceId) -> DbResult<Job> {
        let row = sqlx::query_as::<_, JobRow>("SELECT * FROM jobs WHERE id = $1")
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| DbError::NotFound(format!("job {}", id)))?;
        row.try_into()
    }

    async fn list_by_project(&self, project_id: ResourceId) -> DbResult<Vec<Job>> {
        let rows = sqlx::query_as::<_, JobRow>(
            "SELECT * FROM jobs WHERE project_id = $1 ORDER BY started DESC",
        )
        .bind(project_id.as_uuid())
        .fetch_all(&self.pool)
        .await?;
        into_jobs(rows)
    }

    async fn list_all(&self) -> DbResult<Vec<Job>> {
        let rows = sqlx::query_as::<_, JobRow>("SELECT * FROM jobs ORDER BY started DESC")
            .fetch_all(&self.pool)
            .await?;
        into_jobs(rows)
    }

    async fn link_execution(&self, id: ResourceId, orchestration_id: &str) -> DbResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE jobs
            SET orchestration_id = $2,
                status = CASE WHEN status = 'started' THEN 'running' ELSE status END
            WHERE id = $1 AND orchestration_id IS NULL
            "#,
        )
        .bind(id.as_uuid())
        .bind(orchestration_id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 1 {
            return Ok(());
        }

        let exists: bool = sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM jobs WHERE id = $1)")
            .bind(id.as_uuid())
            .fetch_one(&self.pool)
            .await?;
        if exists {
            Err(DbError::Duplicate(format!("job {} is already linked", id)))
        } else {
            Err(DbError::NotFound(format!("job {}", id)))
        }
    }

    async fn record_outcome(
        &self,
        id: ResourceId,
        status: JobStatus,
        exit_code: Option<i64>,
    ) -> DbResult<()> {
        let result = sqlx::query(
            "UPDATE jobs SET status = $2, exit_code = $3, finished = NOW() WHERE id = $1",
        )
        .bind(id.as_uuid())
        .bind(status.as_str())
        .bind(exit_code)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::NotFound(format!("job {}", id)));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(status: &str) -> JobRow {
        JobRow {
            id: uuid::Uuid::now_v7(),
            project_id: uuid::Uuid::now_v7(),
            started: Utc::now(),
            parameters: vec!["B=2".to_string(), "A=1".to_string()],
            orchestration_id: Some("c0ffee".to_string()),
            status: status.to_string(),
            exit_code: None,
            finished: None,
        }
    }

    #[test]
    fn test_row_conversion_keeps_parameter_order() {
        let job = Job::try_from(row("running")).unwrap();
        assert_eq!(job.parameters, vec!["B=2", "A=1"]);
        assert_eq!(job.status, JobStatus::Running);
        assert_eq!(job.orchestration_id.as_deref(), Some("c0ffee"));
    }

    #[test]
    fn test_row_with_unknown_status_is_rejected() {
        let err = Job::try_from(row("exploded")).unwrap_err();
        assert!(matches!(err, DbError::InvalidRow(_)));
    }
}
