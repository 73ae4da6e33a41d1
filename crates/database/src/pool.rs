//! The shared pool slot and the seam between it and the driver.

use crate::failure::DbFailure;
use async_trait::async_trait;
use core_types::{QueryRequest, Rows};
use parking_lot::RwLock;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// A pool of live database connections.
///
/// Each call checks out its own connection and returns it before completing,
/// on every path.
#[async_trait]
pub trait ConnectionPool: Send + Sync + 'static {
    /// Runs one parameterized statement and returns every row it produced.
    async fn fetch_all(&self, request: &QueryRequest) -> Result<Rows, DbFailure>;

    /// Checks out one connection and runs a trivial liveness query on it.
    async fn ping(&self) -> Result<(), DbFailure>;

    /// Starts shutting the pool down. Users still holding the pool finish (or
    /// fail) on their own.
    fn close(&self);

    fn is_closed(&self) -> bool;
}

/// Builds pools. Building must not fail: real connection attempts are
/// deferred until the pool is first used.
pub trait PoolFactory: Send + Sync + 'static {
    type Pool: ConnectionPool;

    fn build(&self) -> Self::Pool;
}

/// Owns the single process-wide pool.
///
/// The pool is created on first use and replaced wholesale when it is retired.
/// Callers always go through [`get_pool`](Self::get_pool) for each attempt and
/// never hold on to a handle across retries.
pub struct PoolManager<F: PoolFactory> {
    factory: F,
    current: RwLock<Option<Arc<F::Pool>>>,
    builds: AtomicU64,
}

impl<F: PoolFactory> PoolManager<F> {
    pub fn new(factory: F) -> Self {
        Self { factory, current: RwLock::new(None), builds: AtomicU64::new(0) }
    }

    /// Returns the current pool, building a fresh one if there is none or if
    /// the held one has been closed underneath us.
    pub fn get_pool(&self) -> Arc<F::Pool> {
        if let Some(pool) = self.current.read().as_ref() {
            if !pool.is_closed() {
                return Arc::clone(pool);
            }
        }

        let mut slot = self.current.write();
        // Another caller may have rebuilt it while we waited for the lock.
        if let Some(pool) = slot.as_ref() {
            if !pool.is_closed() {
                return Arc::clone(pool);
            }
            tracing::warn!("Database pool was closed unexpectedly; rebuilding.");
        }

        let pool = Arc::new(self.factory.build());
        let generation = self.builds.fetch_add(1, Ordering::SeqCst) + 1;
        tracing::debug!(generation, "Built database pool.");
        *slot = Some(Arc::clone(&pool));
        pool
    }

    /// Closes and clears the current pool, whatever it is.
    pub fn invalidate(&self) {
        let retired = self.current.write().take();
        if let Some(pool) = retired {
            tracing::info!("Database pool invalidated; it will be rebuilt on next use.");
            pool.close();
        }
    }

    /// Closes `pool` and clears the slot if it still holds that same pool.
    ///
    /// A pool that has already been replaced by a concurrent caller is closed
    /// but its replacement is left alone.
    pub fn retire(&self, pool: &Arc<F::Pool>) {
        {
            let mut slot = self.current.write();
            if slot.as_ref().is_some_and(|current| Arc::ptr_eq(current, pool)) {
                *slot = None;
                tracing::info!("Database pool retired; it will be rebuilt on next use.");
            }
        }
        pool.close();
    }

    /// Whether a pool is currently held.
    pub fn has_pool(&self) -> bool {
        self.current.read().is_some()
    }

    /// How many pools have been built over the manager's lifetime.
    pub fn builds(&self) -> u64 {
        self.builds.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ScriptedFactory;

    #[tokio::test]
    async fn pool_is_created_lazily_and_reused() {
        let factory = ScriptedFactory::default();
        let manager = PoolManager::new(factory.clone());
        assert!(!manager.has_pool());
        assert_eq!(manager.builds(), 0);

        let first = manager.get_pool();
        let second = manager.get_pool();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(manager.builds(), 1);
        assert_eq!(factory.built(), 1);
    }

    #[tokio::test]
    async fn invalidate_forces_a_rebuild() {
        let manager = PoolManager::new(ScriptedFactory::default());
        let first = manager.get_pool();
        manager.invalidate();
        assert!(!manager.has_pool());
        assert!(first.is_closed());

        let second = manager.get_pool();
        assert!(!Arc::ptr_eq(&first, &second));
        assert_eq!(manager.builds(), 2);
    }

    #[tokio::test]
    async fn closed_pool_is_replaced_on_next_get() {
        let manager = PoolManager::new(ScriptedFactory::default());
        let first = manager.get_pool();
        first.close();

        let second = manager.get_pool();
        assert!(!second.is_closed());
        assert_eq!(manager.builds(), 2);
    }

    #[tokio::test]
    async fn retiring_a_stale_pool_keeps_its_replacement() {
        let manager = PoolManager::new(ScriptedFactory::default());
        let stale = manager.get_pool();
        manager.invalidate();
        let fresh = manager.get_pool();

        manager.retire(&stale);
        assert!(manager.has_pool());
        assert!(Arc::ptr_eq(&manager.get_pool(), &fresh));
    }
}
