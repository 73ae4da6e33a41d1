use crate::error::DbError;
use crate::failure::DbFailure;
use crate::pool::{ConnectionPool, PoolFactory};
use crate::rows::{bind_params, row_to_json};
use async_trait::async_trait;
use configuration::{DatabaseSettings, PoolSettings, SslMode};
use core_types::{QueryRequest, Rows};
use sqlx::postgres::{PgConnectOptions, PgPoolOptions, PgSslMode};
use sqlx::PgPool;

/// Builds lazily-connecting PostgreSQL pools from [`DatabaseSettings`].
///
/// Building never touches the network; the first connection is opened when
/// the pool is first used.
#[derive(Debug, Clone)]
pub struct PgPoolFactory {
    connect_options: PgConnectOptions,
    pool: PoolSettings,
}

impl PgPoolFactory {
    pub fn new(settings: &DatabaseSettings) -> Self {
        let ssl_mode = match settings.ssl_mode {
            SslMode::Disable => PgSslMode::Disable,
            SslMode::Prefer => PgSslMode::Prefer,
            SslMode::Require => PgSslMode::Require,
        };

        let statement_timeout_ms = settings.pool.statement_timeout.as_millis().to_string();
        let connect_options = PgConnectOptions::new()
            .host(&settings.host)
            .port(settings.port)
            .database(&settings.database)
            .username(&settings.user)
            .password(&settings.password)
            .ssl_mode(ssl_mode)
            .application_name("opsdash")
            .options([("statement_timeout", statement_timeout_ms.as_str())]);

        Self { connect_options, pool: settings.pool }
    }
}

impl PoolFactory for PgPoolFactory {
    type Pool = PgPool;

    fn build(&self) -> PgPool {
        tracing::info!(
            host = self.connect_options.get_host(),
            port = self.connect_options.get_port(),
            max_connections = self.pool.max_connections,
            "Creating database connection pool."
        );
        PgPoolOptions::new()
            .max_connections(self.pool.max_connections)
            .min_connections(self.pool.min_connections)
            .idle_timeout(Some(self.pool.idle_timeout))
            .acquire_timeout(self.pool.connect_timeout)
            // Idle connections are pinged before being handed out, so a dead
            // socket is discarded instead of failing the caller's query.
            .test_before_acquire(self.pool.keep_alive)
            .connect_lazy_with(self.connect_options.clone())
    }
}

#[async_trait]
impl ConnectionPool for PgPool {
    async fn fetch_all(&self, request: &QueryRequest) -> Result<Rows, DbFailure> {
        let query = bind_params(sqlx::query(request.text()), request.params());
        // The connection goes back to the pool as soon as the rows are buffered.
        let rows = query.fetch_all(self).await.map_err(|e| DbFailure::from(&e))?;
        Ok(rows.iter().map(row_to_json).collect())
    }

    async fn ping(&self) -> Result<(), DbFailure> {
        let mut conn = self.acquire().await.map_err(|e| DbFailure::from(&e))?;
        sqlx::query("SELECT NOW()")
            .execute(&mut *conn)
            .await
            .map_err(|e| DbFailure::from(&e))?;
        Ok(())
    }

    fn close(&self) {
        let pool = self.clone();
        tokio::spawn(async move {
            pool.close().await;
            tracing::debug!("Retired database pool closed.");
        });
    }

    fn is_closed(&self) -> bool {
        sqlx::Pool::is_closed(self)
    }
}

/// A utility function to run database migrations.
///
/// Applied on demand through the CLI rather than at server startup, so that
/// the dashboard can still come up (on fallback data) when the database is down.
pub async fn run_migrations(pool: &PgPool) -> Result<(), DbError> {
    // Use a relative path from the crate root
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::PoolManager;
    use core_types::QueryParam;

    // Integration tests require a real database
    // Run with: PGHOST=... PGDATABASE=... cargo test -p database -- --ignored

    fn settings_from_env() -> DatabaseSettings {
        configuration::load_settings().expect("settings").database
    }

    #[tokio::test]
    async fn building_a_pool_does_not_connect() {
        let settings = DatabaseSettings { host: "db.invalid".to_string(), ..DatabaseSettings::default() };
        let manager = PoolManager::new(PgPoolFactory::new(&settings));
        let pool = manager.get_pool();
        assert!(!ConnectionPool::is_closed(pool.as_ref()));
        assert_eq!(manager.builds(), 1);
    }

    #[tokio::test]
    async fn unreachable_host_fails_the_probe_and_clears_the_pool() {
        let settings = DatabaseSettings {
            host: "127.0.0.1".to_string(),
            port: 1,
            ssl_mode: SslMode::Disable,
            ..DatabaseSettings::default()
        };
        let manager = PoolManager::new(PgPoolFactory::new(&settings));
        assert!(!crate::probe::test_connection(&manager).await);
        assert!(!manager.has_pool());
    }

    #[tokio::test]
    #[ignore = "requires database"]
    async fn live_query_returns_json_rows() {
        let manager = PoolManager::new(PgPoolFactory::new(&settings_from_env()));
        let request = QueryRequest::new("SELECT $1::int AS n, $2::text AS label, NULL::text AS missing")
            .bind(7)
            .bind("interns");
        let rows = manager.get_pool().fetch_all(&request).await.expect("query failed");
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["n"], serde_json::json!(7));
        assert_eq!(rows[0]["label"], serde_json::json!("interns"));
        assert_eq!(rows[0]["missing"], serde_json::Value::Null);
    }

    #[tokio::test]
    #[ignore = "requires database"]
    async fn live_missing_table_is_classified() {
        let manager = PoolManager::new(PgPoolFactory::new(&settings_from_env()));
        let failure = manager
            .get_pool()
            .fetch_all(&QueryRequest::new("SELECT * FROM widgets_that_do_not_exist"))
            .await
            .unwrap_err();
        let classified = crate::process_db_error(failure);
        assert_eq!(classified.table.as_deref(), Some("widgets_that_do_not_exist"));
        assert_eq!(classified.category, core_types::ErrorCategory::Query);
    }

    #[tokio::test]
    #[ignore = "requires database"]
    async fn live_null_binds_to_date_and_integer_targets() {
        let manager = PoolManager::new(PgPoolFactory::new(&settings_from_env()));
        let request = QueryRequest::new(
            "SELECT (DATE '2024-06-03' = $1) IS NULL AS date_is_null, (1 = $2) IS NULL AS int_is_null",
        )
        .bind(QueryParam::Null)
        .bind(None::<i64>);
        let rows = manager.get_pool().fetch_all(&request).await.expect("query failed");
        assert_eq!(rows[0]["date_is_null"], serde_json::json!(true));
        assert_eq!(rows[0]["int_is_null"], serde_json::json!(true));
    }
}
