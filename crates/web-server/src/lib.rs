use axum::{routing::get, Router};
use configuration::Settings;
use database::{DbRepository, PgPoolFactory, PoolFactory};
use std::sync::Arc;
use tower_http::{
    cors::{AllowHeaders, AllowOrigin, Any, CorsLayer, ExposeHeaders},
    trace::TraceLayer,
};
// Note: Tracing is handled by the main application configuration

pub mod error;
pub mod handlers;
pub mod queries;
pub mod sample;
pub mod status;

pub use status::EXPECTED_TABLES;

/// The shared application state that all handlers can access.
pub struct AppState<F: PoolFactory = PgPoolFactory> {
    pub db_repo: DbRepository<F>,
    /// Serve sample data without touching the database.
    pub sample_mode: bool,
    /// `host:port/database`, for the status endpoint.
    pub db_target: String,
}

/// Builds the application router over the given state.
pub fn build_router<F: PoolFactory>(state: Arc<AppState<F>>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::any())
        .allow_methods(Any)
        .allow_headers(AllowHeaders::any())
        .expose_headers(ExposeHeaders::any());

    // --- DEFINE THE APPLICATION ROUTES ---
    Router::new()
        .route("/api/health", get(|| async { "OK" }))
        .route("/api/status/database", get(status::get_database_status::<F>))
        .route("/api/departments", get(handlers::get_departments::<F>))
        .route("/api/interns", get(handlers::get_interns::<F>))
        .route("/api/interns/:id", get(handlers::get_intern::<F>))
        .route("/api/housing", get(handlers::get_housing::<F>))
        .route("/api/analytics/summary", get(handlers::get_summary::<F>))
        .route(
            "/api/analytics/department-distribution",
            get(handlers::get_department_distribution::<F>),
        )
        .with_state(state)
        .layer(cors)
        // This middleware will automatically log information about every incoming request.
        .layer(TraceLayer::new_for_http())
}

/// The main function to configure and run the web server.
///
/// The database is not contacted here: the pool connects on first use, so the
/// server comes up (serving fallback data) even when the database is down.
pub async fn run_server(settings: Settings) -> anyhow::Result<()> {
    let db_repo = DbRepository::connect_lazy(&settings.database);
    let app_state = Arc::new(AppState {
        db_repo: db_repo.clone(),
        sample_mode: settings.server.sample_mode,
        db_target: settings.database.display_target(),
    });

    if settings.server.sample_mode {
        tracing::warn!("Sample mode is on; the database will not be queried.");
    }

    let app = build_router(app_state);

    let addr = settings.server.addr;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("Web server started and listening on {}", addr);

    axum::serve(listener, app).with_graceful_shutdown(shutdown_signal()).await?;

    db_repo.pools().invalidate();
    tracing::info!("Web server stopped.");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal.");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received.");
}
