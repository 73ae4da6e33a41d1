use crate::connection::PgPoolFactory;
use crate::error::DbError;
use crate::executor::{self, RetryPolicy};
use crate::pool::{PoolFactory, PoolManager};
use crate::safe::{self, EmptyResult};
use crate::schema::{self, ColumnInfo, DEFAULT_SCHEMA};
use crate::probe;
use configuration::DatabaseSettings;
use core_types::{QueryRequest, Rows, Sourced};
use std::sync::Arc;

/// The `DbRepository` is the single entry point HTTP handlers and the CLI use
/// to reach the database. It bundles the shared pool manager with the retry
/// policy applied to every query.
pub struct DbRepository<F: PoolFactory = PgPoolFactory> {
    pools: Arc<PoolManager<F>>,
    retry: RetryPolicy,
}

impl<F: PoolFactory> Clone for DbRepository<F> {
    fn clone(&self) -> Self {
        Self { pools: Arc::clone(&self.pools), retry: self.retry }
    }
}

impl DbRepository<PgPoolFactory> {
    /// Creates a repository backed by a lazily-connecting PostgreSQL pool.
    /// Nothing touches the network until the first query.
    pub fn connect_lazy(settings: &DatabaseSettings) -> Self {
        Self::new(Arc::new(PoolManager::new(PgPoolFactory::new(settings))))
    }
}

impl<F: PoolFactory> DbRepository<F> {
    /// Creates a new `DbRepository` over a shared pool manager.
    pub fn new(pools: Arc<PoolManager<F>>) -> Self {
        Self { pools, retry: RetryPolicy::default() }
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn pools(&self) -> &Arc<PoolManager<F>> {
        &self.pools
    }

    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry
    }

    /// Executes a query with retries, surfacing the failure once they run out.
    pub async fn execute_query(&self, request: &QueryRequest) -> Result<Rows, DbError> {
        executor::execute_query(&self.pools, &self.retry, request).await
    }

    /// Executes a query, falling back to `fallback` (or nothing) on any failure.
    pub async fn safe_execute_query(&self, request: &QueryRequest, fallback: Option<Rows>) -> Rows {
        safe::safe_execute_query(&self.pools, &self.retry, request, fallback).await
    }

    /// Like [`safe_execute_query`](Self::safe_execute_query) but also reports
    /// where the rows came from.
    pub async fn execute_with_fallback(
        &self,
        request: &QueryRequest,
        fallback: Option<Rows>,
        on_empty: EmptyResult,
    ) -> Sourced<Rows> {
        safe::execute_with_fallback(&self.pools, &self.retry, request, fallback, on_empty).await
    }

    pub async fn test_connection(&self) -> bool {
        probe::test_connection(&self.pools).await
    }

    pub async fn list_tables(&self) -> Result<Vec<String>, DbError> {
        schema::list_tables(&self.pools, &self.retry, DEFAULT_SCHEMA).await
    }

    pub async fn list_columns(&self, table: &str) -> Result<Vec<ColumnInfo>, DbError> {
        schema::list_columns(&self.pools, &self.retry, DEFAULT_SCHEMA, table).await
    }

    pub async fn missing_tables(&self, expected: &[&str]) -> Result<Vec<String>, DbError> {
        schema::missing_tables(&self.pools, &self.retry, DEFAULT_SCHEMA, expected).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::failure::{codes, DbFailure};
    use crate::testing::ScriptedFactory;

    #[tokio::test(start_paused = true)]
    async fn clones_share_one_pool_manager() {
        let factory = ScriptedFactory::default()
            .queue([Err(DbFailure::new("read ECONNRESET").with_code(codes::CONNECTION_RESET))]);
        let repo = DbRepository::new(Arc::new(PoolManager::new(factory.clone())));
        let other = repo.clone();

        repo.execute_query(&QueryRequest::new("SELECT 1")).await.unwrap();
        other.execute_query(&QueryRequest::new("SELECT 1")).await.unwrap();

        assert!(Arc::ptr_eq(repo.pools(), other.pools()));
        assert_eq!(factory.built(), 2);
        assert_eq!(factory.calls(), 3);
    }
}
