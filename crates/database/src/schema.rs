//! Read-only `information_schema` introspection for status reporting.

use crate::error::DbError;
use crate::executor::{execute_query, RetryPolicy};
use crate::pool::{PoolFactory, PoolManager};
use core_types::{QueryRequest, Row};
use serde::{Deserialize, Serialize};

pub const DEFAULT_SCHEMA: &str = "public";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnInfo {
    pub name: String,
    pub data_type: String,
    pub nullable: bool,
}

fn text(row: &Row, column: &str) -> Option<String> {
    row.get(column).and_then(|v| v.as_str()).map(str::to_string)
}

/// Base tables in `schema`, ordered by name.
pub async fn list_tables<F: PoolFactory>(
    pools: &PoolManager<F>,
    policy: &RetryPolicy,
    schema: &str,
) -> Result<Vec<String>, DbError> {
    // The information_schema domains are cast to text so they decode as strings.
    let request = QueryRequest::new(
        "SELECT table_name::text AS table_name \
         FROM information_schema.tables \
         WHERE table_schema = $1 AND table_type = 'BASE TABLE' \
         ORDER BY table_name",
    )
    .bind(schema);

    let rows = execute_query(pools, policy, &request).await?;
    Ok(rows.iter().filter_map(|row| text(row, "table_name")).collect())
}

/// Columns of `schema.table` in ordinal order. Empty if the table does not exist.
pub async fn list_columns<F: PoolFactory>(
    pools: &PoolManager<F>,
    policy: &RetryPolicy,
    schema: &str,
    table: &str,
) -> Result<Vec<ColumnInfo>, DbError> {
    let request = QueryRequest::new(
        "SELECT column_name::text AS column_name, data_type::text AS data_type, \
                (is_nullable = 'YES') AS nullable \
         FROM information_schema.columns \
         WHERE table_schema = $1 AND table_name = $2 \
         ORDER BY ordinal_position",
    )
    .bind(schema)
    .bind(table);

    let rows = execute_query(pools, policy, &request).await?;
    Ok(rows
        .iter()
        .filter_map(|row| {
            Some(ColumnInfo {
                name: text(row, "column_name")?,
                data_type: text(row, "data_type")?,
                nullable: row.get("nullable").and_then(|v| v.as_bool()).unwrap_or(true),
            })
        })
        .collect())
}

/// The entries of `expected` that are not in `present`, in `expected` order.
pub fn missing_from(present: &[String], expected: &[&str]) -> Vec<String> {
    expected
        .iter()
        .filter(|name| !present.iter().any(|p| p == *name))
        .map(|name| name.to_string())
        .collect()
}

/// Which of the `expected` tables are absent from `schema`.
pub async fn missing_tables<F: PoolFactory>(
    pools: &PoolManager<F>,
    policy: &RetryPolicy,
    schema: &str,
    expected: &[&str],
) -> Result<Vec<String>, DbError> {
    let present = list_tables(pools, policy, schema).await?;
    Ok(missing_from(&present, expected))
}
