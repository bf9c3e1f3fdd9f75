//! Persistence layer for the bzk job orchestrator.
//!
//! Provides repository traits and PostgreSQL implementations.

pub mod error;
pub mod repo;

pub use error::{DbError, DbResult};
pub use repo::*;

use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;

/// The full set of repositories, shared by the orchestrator and the API.
#[derive(Clone)]
pub struct Repositories {
    pub projects: Arc<dyn ProjectRepo>,
    pub jobs: Arc<dyn JobRepo>,
    pub secrets: Arc<dyn SecretRepo>,
    pub images: Arc<dyn ImageRepo>,
    pub logs: Arc<dyn LogRepo>,
}

impl Repositories {
    /// PostgreSQL-backed repositories sharing one pool.
    pub fn postgres(pool: PgPool) -> Self {
        Self {
            projects: Arc::new(PgProjectRepo::new(pool.clone())),
            jobs: Arc::new(PgJobRepo::new(pool.clone())),
            secrets: Arc::new(PgSecretRepo::new(pool.clone())),
            images: Arc::new(PgImageRepo::new(pool.clone())),
            logs: Arc::new(PgLogRepo::new(pool)),
        }
    }
}

/// Create a new database connection pool.
pub async fn create_pool(database_url: &str) -> DbResult<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(database_url)
        .await?;
    Ok(pool)
}

/// Run database migrations.
pub async fn run_migrations(pool: &PgPool) -> DbResult<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}
