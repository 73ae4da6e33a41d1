use crate::classify::ClassifiedError;
use core_types::{CoreError, ErrorCategory};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DbError {
    #[error("Invalid query request: {0}")]
    InvalidRequest(#[from] CoreError),

    #[error("Database query failed after {attempts} attempt(s): {message}")]
    QueryFailed {
        attempts: u32,
        /// The message of the last underlying failure.
        message: String,
        diagnosis: ClassifiedError,
    },

    #[error("Database migration failed: {0}")]
    MigrationError(#[from] sqlx::migrate::MigrateError),

    #[error("Failed to connect to the database: {0}")]
    ConnectionError(#[from] sqlx::Error),
}

impl DbError {
    /// The classified diagnosis for this error, suitable for logs and API bodies.
    pub fn diagnosis(&self) -> ClassifiedError {
        match self {
            DbError::QueryFailed { diagnosis, .. } => diagnosis.clone(),
            DbError::InvalidRequest(e) => ClassifiedError {
                message: e.to_string(),
                code: None,
                category: ErrorCategory::Query,
                table: None,
                column: None,
                explanation: Some("The query was rejected before it reached the database".to_string()),
                suggested_fix: Some("Provide non-empty query text.".to_string()),
            },
            DbError::MigrationError(e) => crate::process_db_error(e.to_string()),
            DbError::ConnectionError(e) => crate::process_db_error(e),
        }
    }

    /// The category of the diagnosis.
    pub fn category(&self) -> ErrorCategory {
        self.diagnosis().category
    }
}
