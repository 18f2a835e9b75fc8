//! Database-specific error types and conversions.

use doorman_core::error::DoormanError;

/// Database-layer error type.
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    #[error("SurrealDB error: {0}")]
    Surreal(#[from] surrealdb::Error),

    #[error("Unique constraint violated: {entity}")]
    Duplicate { entity: String },

    #[error("Record not found: {entity} with id {id}")]
    NotFound { entity: String, id: String },

    #[error("Migration failed: {0}")]
    Migration(String),
}

impl From<DbError> for DoormanError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::Duplicate { entity } => DoormanError::AlreadyExists { entity },
            DbError::NotFound { entity, id } => DoormanError::NotFound { entity, id },
            other => DoormanError::Database(other.to_string()),
        }
    }
}
