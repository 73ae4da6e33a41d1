//! Query execution with bounded, fixed-delay retries.

use crate::classify::process_db_error;
use crate::error::DbError;
use crate::pool::{ConnectionPool, PoolFactory, PoolManager};
use core_types::{ErrorCategory, QueryRequest, Rows};
use std::time::Duration;

/// Total attempts per query: the first try plus two retries.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;
pub const DEFAULT_BACKOFF: Duration = Duration::from_secs(1);

/// Which failures are worth another attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RetryScope {
    /// Retry every failure, including ones a retry cannot fix (syntax, privilege).
    #[default]
    AllErrors,
    /// Retry only failures classified as `connection`.
    ConnectionOnly,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    /// Fixed delay between attempts. No growth, no jitter.
    pub backoff: Duration,
    pub scope: RetryScope,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self { max_attempts: DEFAULT_MAX_ATTEMPTS, backoff: DEFAULT_BACKOFF, scope: RetryScope::default() }
    }
}

impl RetryPolicy {
    pub fn with_scope(mut self, scope: RetryScope) -> Self {
        self.scope = scope;
        self
    }

    fn permits(&self, category: ErrorCategory) -> bool {
        match self.scope {
            RetryScope::AllErrors => true,
            RetryScope::ConnectionOnly => category == ErrorCategory::Connection,
        }
    }
}

/// Executes `request` and returns its rows, retrying on failure.
///
/// Each attempt fetches the current pool from `pools`; a failure that points at
/// a broken pool (reset, DNS, timeout) retires it so the next attempt runs on a
/// freshly built one. Once attempts run out the last failure is returned.
pub async fn execute_query<F: PoolFactory>(
    pools: &PoolManager<F>,
    policy: &RetryPolicy,
    request: &QueryRequest,
) -> Result<Rows, DbError> {
    request.validate()?;

    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 0;
    loop {
        attempt += 1;
        let pool = pools.get_pool();
        let outcome = pool.fetch_all(request).await;

        let failure = match outcome {
            Ok(rows) => {
                if attempt > 1 {
                    tracing::info!(attempt, rows = rows.len(), "Query succeeded after retrying.");
                }
                return Ok(rows);
            }
            Err(failure) => failure,
        };

        let diagnosis = process_db_error(&failure);
        tracing::warn!(
            attempt,
            max_attempts,
            code = failure.code().unwrap_or("-"),
            category = %diagnosis.category,
            error = %failure.message,
            "Database query attempt failed."
        );

        if failure.invalidates_pool() {
            pools.retire(&pool);
        }
        drop(pool);

        if attempt >= max_attempts || !policy.permits(diagnosis.category) {
            tracing::error!(
                attempts = attempt,
                category = %diagnosis.category,
                explanation = diagnosis.explanation.as_deref().unwrap_or(""),
                "Giving up on database query."
            );
            return Err(DbError::QueryFailed { attempts: attempt, message: failure.message, diagnosis });
        }

        tokio::time::sleep(policy.backoff).await;
    }
}
