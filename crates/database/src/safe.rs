//! The boundary where query failures are swallowed and replaced by fallback data.

use crate::error::DbError;
use crate::executor::{execute_query, RetryPolicy};
use crate::pool::{PoolFactory, PoolManager};
use core_types::{QueryRequest, Rows, Sourced};

/// What to do when the live query succeeds but returns no rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EmptyResult {
    /// Return the empty result as live data.
    #[default]
    Keep,
    /// Substitute the fallback, if one was supplied.
    UseFallback,
}

/// Maps an executor result to rows plus their provenance. Never fails.
pub fn resolve_with_fallback(
    result: Result<Rows, DbError>,
    fallback: Option<Rows>,
    on_empty: EmptyResult,
) -> Sourced<Rows> {
    match result {
        Ok(rows) if rows.is_empty() && on_empty == EmptyResult::UseFallback && fallback.is_some() => {
            tracing::info!("Query returned no rows; serving fallback data.");
            Sourced::fallback(fallback.unwrap_or_default())
        }
        Ok(rows) => Sourced::database(rows),
        Err(err) => {
            let diagnosis = err.diagnosis();
            tracing::warn!(
                category = %diagnosis.category,
                code = diagnosis.code.as_deref().unwrap_or("-"),
                table = diagnosis.table.as_deref().unwrap_or("-"),
                explanation = diagnosis.explanation.as_deref().unwrap_or(""),
                suggested_fix = diagnosis.suggested_fix.as_deref().unwrap_or(""),
                has_fallback = fallback.is_some(),
                "Query failed; serving fallback data."
            );
            Sourced::fallback(fallback.unwrap_or_default())
        }
    }
}

/// Runs the query and reports where the returned rows came from.
pub async fn execute_with_fallback<F: PoolFactory>(
    pools: &PoolManager<F>,
    policy: &RetryPolicy,
    request: &QueryRequest,
    fallback: Option<Rows>,
    on_empty: EmptyResult,
) -> Sourced<Rows> {
    let result = execute_query(pools, policy, request).await;
    resolve_with_fallback(result, fallback, on_empty)
}

/// Runs the query, returning the live rows on success and `fallback` (or an
/// empty sequence) on any failure.
pub async fn safe_execute_query<F: PoolFactory>(
    pools: &PoolManager<F>,
    policy: &RetryPolicy,
    request: &QueryRequest,
    fallback: Option<Rows>,
) -> Rows {
    execute_with_fallback(pools, policy, request, fallback, EmptyResult::Keep).await.data
}
