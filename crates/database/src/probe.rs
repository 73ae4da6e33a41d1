use crate::pool::{ConnectionPool, PoolFactory, PoolManager};

/// Checks that a connection can be acquired and answers a trivial query.
///
/// Any failure retires the pool, since not even the simplest query succeeded.
/// The connection checked out by the ping is always returned to the pool.
pub async fn test_connection<F: PoolFactory>(pools: &PoolManager<F>) -> bool {
    let pool = pools.get_pool();
    match pool.ping().await {
        Ok(()) => {
            tracing::debug!("Database connectivity check succeeded.");
            true
        }
        Err(failure) => {
            let diagnosis = crate::process_db_error(&failure);
            tracing::warn!(
                category = %diagnosis.category,
                code = failure.code().unwrap_or("-"),
                error = %failure.message,
                "Database connectivity check failed; discarding pool."
            );
            pools.retire(&pool);
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::failure::{codes, DbFailure};
    use crate::testing::ScriptedFactory;

    #[tokio::test]
    async fn healthy_pool_passes() {
        let manager = PoolManager::new(ScriptedFactory::default());
        assert!(test_connection(&manager).await);
        assert!(manager.has_pool());
    }

    #[tokio::test]
    async fn unreachable_host_fails_and_clears_the_pool() {
        let unreachable = DbFailure::new("getaddrinfo ENOTFOUND db.invalid").with_code(codes::HOST_NOT_FOUND);
        let factory = ScriptedFactory::default().pings([Err(unreachable)]);
        let manager = PoolManager::new(factory.clone());

        assert!(!test_connection(&manager).await);
        assert!(!manager.has_pool());
        assert_eq!(factory.closed(), 1);
    }

    #[tokio::test]
    async fn any_failure_clears_the_pool() {
        let denied = DbFailure::new("permission denied").with_code(codes::INSUFFICIENT_PRIVILEGE);
        let manager = PoolManager::new(ScriptedFactory::default().pings([Err(denied)]));

        assert!(!test_connection(&manager).await);
        assert!(!manager.has_pool());

        // The next check starts from a freshly built pool.
        assert!(test_connection(&manager).await);
        assert_eq!(manager.builds(), 2);
    }
}
