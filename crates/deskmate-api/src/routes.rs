//! Router setup with all API routes and middleware.
//!
//! Configures the axum Router with CORS, tracing, compression,
//! authentication, rate limiting and all endpoint handlers.

use axum::extract::DefaultBodyLimit;
use axum::http::{header, HeaderValue, Method};
use axum::middleware::{from_fn, from_fn_with_state};
use axum::routing::{delete, get, post};
use axum::Router;
use tower_http::compression::CompressionLayer;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;

use deskmate_core::config::DeskmateConfig;
use deskmate_core::error::DeskmateError;

use crate::auth::{require_admin, require_auth};
use crate::handlers;
use crate::rate_limit::rate_limit_middleware;
use crate::state::AppState;

fn cors_layer(port: u16) -> CorsLayer {
    let origins: Vec<HeaderValue> = [
        format!("http://127.0.0.1:{}", port),
        format!("http://localhost:{}", port),
    ]
    .iter()
    .filter_map(|origin| origin.parse().ok())
    .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION, header::ACCEPT])
}

/// Create the axum Router with all routes and middleware.
pub fn create_router(state: AppState) -> Router {
    let cors = cors_layer(state.config.server.port);

    // Routes that do NOT require authentication.
    let public_routes = Router::new().route("/health", get(handlers::health));

    let admin_routes = Router::new()
        .route(
            "/knowledge/{key}",
            get(handlers::get_knowledge).post(handlers::put_knowledge),
        )
        .route("/admin/learning", get(handlers::learning_analysis))
        .route("/admin/report", get(handlers::weekly_report))
        .route_layer(from_fn(require_admin));

    // Auth runs first, then the limiter.
    let protected_routes = Router::new()
        .route(
            "/session",
            post(handlers::start_session).delete(handlers::end_session),
        )
        .route("/ask", post(handlers::ask))
        .route("/history", get(handlers::history))
        .route(
            "/shortcuts",
            get(handlers::list_shortcuts).post(handlers::add_shortcut),
        )
        .route("/shortcuts/{id}", delete(handlers::delete_shortcut))
        .route("/feedback", post(handlers::submit_feedback))
        .route("/personalization/profile", get(handlers::interest_profile))
        .route("/personalization/suggestions", get(handlers::suggestions))
        .route("/personalization/interest", post(handlers::record_interest))
        .merge(admin_routes)
        .route_layer(from_fn_with_state(state.clone(), rate_limit_middleware))
        .route_layer(from_fn_with_state(state.clone(), require_auth));

    public_routes
        .merge(protected_routes)
        .layer(DefaultBodyLimit::max(1024 * 1024)) // 1MB global limit
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Start the HTTP server on the configured host and port.
pub async fn start_server(config: &DeskmateConfig, state: AppState) -> Result<(), DeskmateError> {
    let addr = format!("{}:{}", config.server.host, config.server.port);

    let router = create_router(state);

    tracing::info!("Starting API server on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| DeskmateError::Http(format!("Failed to bind {}: {}", addr, e)))?;

    axum::serve(listener, router)
        .await
        .map_err(|e| DeskmateError::Http(format!("Server error: {}", e)))?;

    Ok(())
}
