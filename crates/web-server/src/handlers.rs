use crate::{error::AppError, queries, sample, AppState};
use axum::{
    extract::{Path, Query, State},
    Json,
};
use core_types::{DataSource, QueryParam, QueryRequest, Row, Rows, Sourced};
use database::{EmptyResult, PoolFactory};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// The envelope every analytics endpoint answers with. `source` tells the UI
/// whether to show the "demo data" banner.
#[derive(Debug, Serialize, Deserialize)]
pub struct DataResponse<T> {
    pub success: bool,
    pub source: DataSource,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub count: Option<usize>,
    pub data: T,
}

impl From<Sourced<Rows>> for DataResponse<Rows> {
    fn from(sourced: Sourced<Rows>) -> Self {
        Self { success: true, source: sourced.source, count: Some(sourced.data.len()), data: sourced.data }
    }
}

impl From<Sourced<Rows>> for DataResponse<Row> {
    fn from(sourced: Sourced<Rows>) -> Self {
        let first = sourced.map(|rows| rows.into_iter().next().unwrap_or_default());
        Self { success: true, source: first.source, count: None, data: first.data }
    }
}

#[derive(Debug, Deserialize)]
pub struct InternFilter {
    pub department: Option<String>,
}

/// Serves sample data in sample mode, otherwise queries with `fallback` as the safety net.
async fn load<F: PoolFactory>(
    state: &AppState<F>,
    request: QueryRequest,
    fallback: Rows,
    on_empty: EmptyResult,
) -> Sourced<Rows> {
    if state.sample_mode {
        return Sourced::sample(fallback);
    }
    state.db_repo.execute_with_fallback(&request, Some(fallback), on_empty).await
}

/// # GET /api/departments
pub async fn get_departments<F: PoolFactory>(
    State(state): State<Arc<AppState<F>>>,
) -> Json<DataResponse<Rows>> {
    let sourced = load(&state, QueryRequest::new(queries::DEPARTMENTS), sample::departments(), EmptyResult::Keep).await;
    Json(sourced.into())
}

/// # GET /api/interns?department=...
pub async fn get_interns<F: PoolFactory>(
    State(state): State<Arc<AppState<F>>>,
    Query(filter): Query<InternFilter>,
) -> Json<DataResponse<Rows>> {
    let department = filter.department.filter(|d| !d.trim().is_empty());
    let fallback = match &department {
        Some(name) => sample::interns_in(name),
        None => sample::interns(),
    };
    let request = QueryRequest::with_params(queries::INTERNS, vec![QueryParam::from(department)]);
    let sourced = load(&state, request, fallback, EmptyResult::Keep).await;
    Json(sourced.into())
}

/// # GET /api/interns/:id
/// Detail lookups go straight to the executor: a missing or unreachable
/// record is reported, not papered over with sample data.
pub async fn get_intern<F: PoolFactory>(
    State(state): State<Arc<AppState<F>>>,
    Path(id): Path<i64>,
) -> Result<Json<DataResponse<Row>>, AppError> {
    let sourced = if state.sample_mode {
        Sourced::sample(sample::intern(id).into_iter().collect())
    } else {
        let request = QueryRequest::new(queries::INTERN_BY_ID).bind(id);
        Sourced::database(state.db_repo.execute_query(&request).await?)
    };

    if sourced.data.is_empty() {
        return Err(AppError::NotFound(format!("Intern {id} not found")));
    }
    Ok(Json(sourced.into()))
}

/// # GET /api/housing
pub async fn get_housing<F: PoolFactory>(
    State(state): State<Arc<AppState<F>>>,
) -> Json<DataResponse<Rows>> {
    let sourced = load(&state, QueryRequest::new(queries::HOUSING), sample::housing(), EmptyResult::Keep).await;
    Json(sourced.into())
}

/// # GET /api/analytics/summary
pub async fn get_summary<F: PoolFactory>(
    State(state): State<Arc<AppState<F>>>,
) -> Json<DataResponse<Row>> {
    let sourced = load(&state, QueryRequest::new(queries::SUMMARY), sample::summary(), EmptyResult::UseFallback).await;
    Json(sourced.into())
}

/// # GET /api/analytics/department-distribution
/// An empty live result also falls back, so a fresh install still shows a chart.
pub async fn get_department_distribution<F: PoolFactory>(
    State(state): State<Arc<AppState<F>>>,
) -> Json<DataResponse<Rows>> {
    let sourced = load(
        &state,
        QueryRequest::new(queries::DEPARTMENT_DISTRIBUTION),
        sample::department_distribution(),
        EmptyResult::UseFallback,
    )
    .await;
    Json(sourced.into())
}
