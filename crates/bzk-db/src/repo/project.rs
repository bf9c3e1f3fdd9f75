//! Project repository.

use async_trait::async_trait;
use bzk_core::ResourceId;
use bzk_core::project::Project;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use sqlx::types::Json;
use std::collections::BTreeMap;

use crate::{DbError, DbResult};

#[derive(Debug, sqlx::FromRow)]
struct ProjectRow {
    id: uuid::Uuid,
    name: String,
    scm_type: String,
    scm_uri: String,
    config: Json<BTreeMap<String, String>>,
    created_at: DateTime<Utc>,
}

impl From<ProjectRow> for Project {
    fn from(row: ProjectRow) -> Self {
        Project {
            id: ResourceId::from_uuid(row.id),
            name: row.name,
            scm_type: row.scm_type,
            scm_uri: row.scm_uri,
            config: row.config.0,
            created_at: row.created_at,
        }
    }
}

#[async_trait]
pub trait ProjectRepo: Send + Sync {
    /// Insert a project. `Duplicate` if the name or scm location is taken.
    async fn create(&self, project: &Project) -> DbResult<()>;
    async fn get_by_id(&self, id: ResourceId) -> DbResult<Project>;
    async fn list(&self) -> DbResult<Vec<Project>>;
    async fn exists_by_name(&self, name: &str) -> DbResult<bool>;
    async fn exists_by_scm(&self, scm_type: &str, scm_uri: &str) -> DbResult<bool>;
    async fn set_config_key(&self, id: ResourceId, key: &str, value: &str) -> DbResult<()>;
    async fn unset_config_key(&self, id: ResourceId, key: &str) -> DbResult<()>;
}

/// PostgreSQL implementation of ProjectRepo.
pub struct PgProjectRepo {
    pool: PgPool,
}

impl PgProjectRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ProjectRepo for PgProjectRepo {
    async fn create(&self, project: &Project) -> DbResult<()> {
        sqlx::query(
            r#"
            INSERT INTO projects (id, name, scm_type, scm_uri, config, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(project.id.as_uuid())
        .bind(&project.name)
        .bind(&project.scm_type)
        .bind(&project.scm_uri)
        .bind(Json(&project.config))
        .bind(project.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| DbError::from_insert(e, format!("project {}", project.name)))?;
        Ok(())
    }

    async fn get_by_id(&self, id: ResourceId) -> DbResult<Project> {
        let row = sqlx::query_as::<_, ProjectRow>("SELECT * FROM projects WHERE id = $1")
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| DbError::NotFound(format!("project {}", id)))?;
        Ok(row.into())
    }

    async fn list(&self) -> DbResult<Vec<Project>> {
        let rows = sqlx::query_as::<_, ProjectRow>("SELECT * FROM projects ORDER BY name")
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(Project::from).collect())
    }

    async fn exists_by_name(&self, name: &str) -> DbResult<bool> {
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM projects WHERE name = $1)")
                .bind(name)
                .fetch_one(&self.pool)
                .await?;
        Ok(exists)
    }

    async fn exists_by_scm(&self, scm_type: &str, scm_uri: &str) -> DbResult<bool> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS (SELECT 1 FROM projects WHERE scm_type = $1 AND scm_uri = $2)",
        )
        .bind(scm_type)
        .bind(scm_uri)
        .fetch_one(&self.pool)
        .await?;
        Ok(exists)
    }

    async fn set_config_key(&self, id: ResourceId, key: &str, value: &str) -> DbResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE projects SET config = config || jsonb_build_object($2::text, $3::text)
            WHERE id = $1
            "#,
        )
        .bind(id.as_uuid())
        .bind(key)
        .bind(value)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::NotFound(format!("project {}", id)));
        }
        Ok(())
    }

    async fn unset_config_key(&self, id: ResourceId, key: &str) -> DbResult<()> {
        let result = sqlx::query("UPDATE projects SET config = config - $2::text WHERE id = $1")
            .bind(id.as_uuid())
            .bind(key)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::NotFound(format!("project {}", id)));
        }
        Ok(())
    }
}
