pub mod request_id;

use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use crate::controllers::{health, job::JobController};
use crate::infrastructure::config::Config;
use crate::infrastructure::repositories::TtsRepository;

pub use request_id::{request_id_middleware, RequestId, X_REQUEST_ID};

/// Build the application router with all routes configured
pub fn create_router(
    job_controller: Arc<JobController>,
    tts_repo: Arc<dyn TtsRepository>,
) -> Router {
    // Job routes
    let job_routes = Router::new()
        .route("/api/v1/jobs", post(JobController::submit))
        .route("/api/v1/jobs/:job_id", get(JobController::get_status))
        .route(
            "/api/v1/jobs/:job_id/artifact",
            get(JobController::get_artifact),
        )
        .with_state(job_controller);

    // Option catalogs (stateless)
    let catalog_routes = Router::new()
        .route("/api/v1/modes", get(JobController::list_modes))
        .route("/api/v1/categories", get(JobController::list_categories));

    Router::new()
        .route("/health", get(health::health))
        .route("/health/ready", get(health::health_ready))
        .with_state(tts_repo)
        .merge(job_routes)
        .merge(catalog_routes)
        .layer(middleware::from_fn(request_id_middleware))
        .layer(TraceLayer::new_for_http())
}

/// Start the HTTP server with all routes configured
pub async fn start_http_server(
    config: Arc<Config>,
    job_controller: Arc<JobController>,
    tts_repo: Arc<dyn TtsRepository>,
) -> Result<(), Box<dyn std::error::Error>> {
    let app = create_router(job_controller, tts_repo);

    let listener =
        tokio::net::TcpListener::bind(format!("{}:{}", config.host, config.port)).await?;

    tracing::info!("Server listening on {}", listener.local_addr()?);

    axum::serve(listener, app).await?;

    Ok(())
}
