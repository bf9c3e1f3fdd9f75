//! Per-project secret material.

use async_trait::async_trait;
use bzk_core::ResourceId;
use bzk_core::secret::{SecretKind, SecretMaterial};
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::{DbError, DbResult};

#[derive(Debug, sqlx::FromRow)]
struct SecretRow {
    project_id: uuid::Uuid,
    kind: String,
    content: Vec<u8>,
    created_at: DateTime<Utc>,
}

impl TryFrom<SecretRow> for SecretMaterial {
    type Error = DbError;

    fn try_from(row: SecretRow) -> DbResult<Self> {
        let kind: SecretKind = row.kind.parse().map_err(DbError::InvalidRow)?;
        Ok(SecretMaterial {
            project_id: ResourceId::from_uuid(row.project_id),
            kind,
            content: row.content,
            created_at: row.created_at,
        })
    }
}

#[async_trait]
pub trait SecretRepo: Send + Sync {
    /// Fetch a project's secret of the given kind.
    ///
    /// Absence is reported as `NotFound`, which callers treat as a normal
    /// branch rather than a failure.
    async fn get(&self, project_id: ResourceId, kind: SecretKind) -> DbResult<SecretMaterial>;

    /// Store a secret. `Duplicate` if the project already has one of that kind.
    async fn create(&self, secret: &SecretMaterial) -> DbResult<()>;
}

/// PostgreSQL implementation of SecretRepo.
pub struct PgSecretRepo {
    pool: PgPool,
}

impl PgSecretRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SecretRepo for PgSecretRepo {
    async fn get(&self, project_id: ResourceId, kind: SecretKind) -> DbResult<SecretMaterial> {
        let row = sqlx::query_as::<_, SecretRow>(
            "SELECT * FROM project_secrets WHERE project_id = $1 AND kind = $2",
        )
        .bind(project_id.as_uuid())
        .bind(kind.as_str())
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| DbError::NotFound(format!("{} key for project {}", kind, project_id)))?;
        row.try_into()
    }

    async fn create(&self, secret: &SecretMaterial) -> DbResult<()> {
        sqlx::query(
            r#"
            INSERT INTO project_secrets (project_id, kind, content, created_at)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(secret.project_id.as_uuid())
        .bind(secret.kind.as_str())
        .bind(&secret.content)
        .bind(secret.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            DbError::from_insert(
                e,
                format!("{} key for project {}", secret.kind, secret.project_id),
            )
        })?;
        Ok(())
    }
}
