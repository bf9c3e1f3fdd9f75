//! Image repository: logical names (e.g. `orchestration`, `scm/fetch/git`)
//! mapped to runnable container images.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;

use crate::{DbError, DbResult};

/// A registered image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Image {
    pub name: String,
    pub image: String,
    pub updated_at: DateTime<Utc>,
}

#[async_trait]
pub trait ImageRepo: Send + Sync {
    /// Resolve a logical name to its image reference.
    async fn get(&self, name: &str) -> DbResult<String>;
    async fn exists(&self, name: &str) -> DbResult<bool>;
    async fn list(&self) -> DbResult<Vec<Image>>;
    /// Register or replace an image.
    async fn set(&self, name: &str, image: &str) -> DbResult<()>;
}

/// PostgreSQL implementation of ImageRepo.
pub struct PgImageRepo {
    pool: PgPool,
}

impl PgImageRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ImageRepo for PgImageRepo {
    async fn get(&self, name: &str) -> DbResult<String> {
        let image: Option<String> = sqlx::query_scalar("SELECT image FROM images WHERE name = $1")
            .bind(name)
            .fetch_optional(&self.pool)
            .await?;
        image.ok_or_else(|| DbError::NotFound(format!("image {}", name)))
    }

    async fn exists(&self, name: &str) -> DbResult<bool> {
        let exists: bool = sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM images WHERE name = $1)")
            .bind(name)
            .fetch_one(&self.pool)
            .await?;
        Ok(exists)
    }

    async fn list(&self) -> DbResult<Vec<Image>> {
        let images = sqlx::query_as::<_, Image>("SELECT * FROM images ORDER BY name")
            .fetch_all(&self.pool)
            .await?;
        Ok(images)
    }

    async fn set(&self, name: &str, image: &str) -> DbResult<()> {
        sqlx::query(
            r#"
            INSERT INTO images (name, image, updated_at)
            VALUES ($1, $2, NOW())
            ON CONFLICT (name) DO UPDATE SET image = EXCLUDED.image, updated_at = NOW()
            "#,
        )
        .bind(name)
        .bind(image)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}
