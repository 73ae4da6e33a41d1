use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use core_types::ErrorCategory;
use serde_json::json;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] database::DbError),
    #[error("Not found: {0}")]
    NotFound(String),
}

/// Converts our custom `AppError` into an HTTP response.
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match self {
            AppError::Database(db_err) => {
                let diagnosis = db_err.diagnosis();
                tracing::error!(error = %db_err, category = %diagnosis.category, "Database error.");
                let status = match diagnosis.category {
                    ErrorCategory::Connection => StatusCode::SERVICE_UNAVAILABLE,
                    _ => StatusCode::INTERNAL_SERVER_ERROR,
                };
                let body = Json(json!({
                    "success": false,
                    "error": "A database error occurred",
                    "diagnosis": diagnosis,
                }));
                (status, body).into_response()
            }
            AppError::NotFound(message) => {
                let body = Json(json!({ "success": false, "error": message }));
                (StatusCode::NOT_FOUND, body).into_response()
            }
        }
    }
}
