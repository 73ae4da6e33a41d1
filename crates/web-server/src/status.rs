//! GET /api/status/database - connectivity and schema completeness.

use crate::AppState;
use axum::{extract::State, Json};
use core_types::DataSource;
use database::{schema::missing_from, ClassifiedError, PoolFactory};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Tables the dashboard queries read from.
pub const EXPECTED_TABLES: &[&str] = &["departments", "interns", "housing_units"];

#[derive(Debug, Serialize, Deserialize)]
pub struct SchemaStatus {
    pub tables: Vec<String>,
    pub missing_tables: Vec<String>,
    pub complete: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DatabaseStatus {
    pub success: bool,
    pub connected: bool,
    /// Where dashboard data will come from right now.
    pub source: DataSource,
    pub target: String,
    pub pool_builds: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schema: Option<SchemaStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ClassifiedError>,
}

pub async fn get_database_status<F: PoolFactory>(
    State(state): State<Arc<AppState<F>>>,
) -> Json<DatabaseStatus> {
    let mut status = DatabaseStatus {
        success: true,
        connected: false,
        source: DataSource::Sample,
        target: state.db_target.clone(),
        pool_builds: state.db_repo.pools().builds(),
        schema: None,
        error: None,
    };

    if state.sample_mode {
        return Json(status);
    }

    status.connected = state.db_repo.test_connection().await;
    if !status.connected {
        status.source = DataSource::Fallback;
        status.pool_builds = state.db_repo.pools().builds();
        return Json(status);
    }

    status.source = DataSource::Database;
    match state.db_repo.list_tables().await {
        Ok(tables) => {
            let missing_tables = missing_from(&tables, EXPECTED_TABLES);
            if !missing_tables.is_empty() {
                tracing::warn!(missing = ?missing_tables, "Database schema is incomplete.");
            }
            status.schema = Some(SchemaStatus { complete: missing_tables.is_empty(), tables, missing_tables });
        }
        Err(e) => {
            status.success = false;
            status.error = Some(e.diagnosis());
        }
    }
    status.pool_builds = state.db_repo.pools().builds();
    Json(status)
}
