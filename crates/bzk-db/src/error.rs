//! Database error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum DbError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("duplicate: {0}")]
    Duplicate(String),

    #[error("invalid row: {0}")]
    InvalidRow(String),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
}

impl DbError {
    /// Map a unique-index violation to `Duplicate`, anything else to `Database`.
    pub(crate) fn from_insert(err: sqlx::Error, what: impl Into<String>) -> Self {
        match &err {
            sqlx::Error::Database(db) if db.is_unique_violation() => DbError::Duplicate(what.into()),
            _ => DbError::Database(err),
        }
    }
}

pub type DbResult<T> = std::result::Result<T, DbError>;

impl From<DbError> for bzk_core::Error {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NotFound(msg) => bzk_core::Error::NotFound(msg),
            DbError::Duplicate(msg) => bzk_core::Error::Conflict(msg),
            other => bzk_core::Error::Persistence(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_core_error_mapping() {
        let err: bzk_core::Error = DbError::NotFound("project x".into()).into();
        assert!(matches!(err, bzk_core::Error::NotFound(_)));

        let err: bzk_core::Error = DbError::Duplicate("name".into()).into();
        assert!(matches!(err, bzk_core::Error::Conflict(_)));

        let err: bzk_core::Error = DbError::Database(sqlx::Error::PoolTimedOut).into();
        assert!(matches!(err, bzk_core::Error::Persistence(_)));
    }

    #[test]
    fn test_non_unique_insert_error_stays_database() {
        let err = DbError::from_insert(sqlx::Error::RowNotFound, "project");
        assert!(matches!(err, DbError::Database(_)));
    }
}
