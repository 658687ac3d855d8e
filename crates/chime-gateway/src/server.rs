//! HTTP server implementation using Axum.

use axum::{
    Router,
    routing::{get, post},
};
use chime_core::config::GatewayConfig;
use chime_registry::{Resource, Runtime};
use chime_rules::{Rule, Trigger};
use chime_scheduler::Job;
use std::future::Future;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use super::routes;

/// Shared state for the admin API.
#[derive(Clone)]
pub struct AppState {
    pub runtime: Runtime,
    pub start_time: std::time::Instant,
}

impl AppState {
    pub fn new(runtime: Runtime) -> Self {
        Self {
            runtime,
            start_time: std::time::Instant::now(),
        }
    }
}

/// Build the Axum router with all routes.
pub fn build_router(state: AppState) -> Router {
    let shared = Arc::new(state);

    Router::new()
        .route("/health", get(routes::health_check))
        .route("/api/v1/info", get(routes::system_info))
        // Group tree
        .route(
            "/api/v1/groups",
            get(routes::list_groups).post(routes::create_group),
        )
        .route(
            "/api/v1/groups/{id}",
            get(routes::get_group)
                .put(routes::update_group)
                .delete(routes::delete_group),
        )
        .route("/api/v1/groups/{id}/import", post(routes::import_entry))
        .route("/api/v1/entries/{id}/export", get(routes::export_entry))
        // Leaf entries
        .route(
            "/api/v1/rules",
            get(routes::list_entries::<Rule>).post(routes::create_entry::<Rule>),
        )
        .route(
            "/api/v1/rules/{id}",
            get(routes::get_entry::<Rule>)
                .put(routes::update_entry::<Rule>)
                .delete(routes::delete_entry::<Rule>),
        )
        .route(
            "/api/v1/triggers",
            get(routes::list_entries::<Trigger>).post(routes::create_entry::<Trigger>),
        )
        .route(
            "/api/v1/triggers/{id}",
            get(routes::get_entry::<Trigger>)
                .put(routes::update_entry::<Trigger>)
                .delete(routes::delete_entry::<Trigger>),
        )
        .route(
            "/api/v1/jobs",
            get(routes::list_entries::<Job>).post(routes::create_entry::<Job>),
        )
        .route(
            "/api/v1/jobs/{id}",
            get(routes::get_entry::<Job>)
                .put(routes::update_entry::<Job>)
                .delete(routes::delete_entry::<Job>),
        )
        .route(
            "/api/v1/resources",
            get(routes::list_entries::<Resource>).post(routes::create_entry::<Resource>),
        )
        .route(
            "/api/v1/resources/{id}",
            get(routes::get_entry::<Resource>)
                .put(routes::update_entry::<Resource>)
                .delete(routes::delete_entry::<Resource>),
        )
        // Event ingress from the chat network
        .route("/api/v1/events/message", post(routes::post_message))
        .route("/api/v1/events/notice", post(routes::post_notice))
        .layer({
            let cors = CorsLayer::new()
                .allow_methods([
                    axum::http::Method::GET,
                    axum::http::Method::POST,
                    axum::http::Method::PUT,
                    axum::http::Method::DELETE,
                    axum::http::Method::OPTIONS,
                ])
                .allow_headers(Any)
                .max_age(std::time::Duration::from_secs(3600));

            // Example: CHIME_CORS_ORIGINS=https://admin.example.org,http://localhost:5173
            if let Ok(origins_str) = std::env::var("CHIME_CORS_ORIGINS") {
                let origins: Vec<_> = origins_str
                    .split(',')
                    .filter_map(|s| s.trim().parse::<axum::http::HeaderValue>().ok())
                    .collect();
                cors.allow_origin(origins)
            } else {
                cors.allow_origin(Any)
            }
        })
        .layer(TraceLayer::new_for_http())
        .with_state(shared)
}

/// Bind the admin API and serve until `shutdown` resolves.
pub async fn start(
    config: &GatewayConfig,
    runtime: Runtime,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> anyhow::Result<()> {
    let app = build_router(AppState::new(runtime));
    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("🌐 Admin API listening on http://{addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await?;
    tracing::info!("👋 Admin API stopped");
    Ok(())
}
