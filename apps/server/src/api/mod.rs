//! API layer - routes, handlers, and middleware

pub mod extractors;
pub mod handlers;
pub mod middleware;
pub mod routes;

use crate::state::AppState;
use axum::{
    extract::{DefaultBodyLimit, State},
    http::StatusCode,
    response::{IntoResponse, Json},
    routing::get,
    Router,
};
use serde_json::json;
use tower::ServiceBuilder;

/// Create the main application router
pub fn create_router(state: AppState) -> Router {
    let max_body_size = state.config.server.max_request_body_size;
    let cors_origins = state.config.server.cors_origins.clone();
    let auth_state = state.clone();

    // Identity is resolved for every API route; handlers decide whether it is required.
    let api_router = routes::questions::question_routes()
        .merge(routes::tags::tag_routes())
        .layer(axum::middleware::from_fn_with_state(
            auth_state,
            crate::auth::auth_middleware,
        ));

    Router::new()
        .route("/health", get(health_check))
        .route("/", get(root))
        .merge(routes::metrics::metrics_routes())
        .merge(api_router)
        .with_state(state)
        // Outermost first
        .layer(
            ServiceBuilder::new()
                .layer(DefaultBodyLimit::max(max_body_size))
                .layer(middleware::cors(&cors_origins))
                .layer(middleware::compression())
                .layer(axum::middleware::from_fn(middleware::metrics_middleware))
                .layer(axum::middleware::from_fn(middleware::request_id_middleware))
                .layer(axum::middleware::from_fn(
                    middleware::security_headers_middleware,
                )),
        )
}

/// Liveness plus a database round trip when the postgres backend is in use.
async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    let database = match &state.db_pool {
        None => "not_configured",
        Some(pool) => match sqlx::query("SELECT 1").execute(pool).await {
            Ok(_) => "ok",
            Err(e) => {
                tracing::warn!(error = %e, "Health check database ping failed");
                "unavailable"
            }
        },
    };

    let status = if database == "unavailable" {
        StatusCode::SERVICE_UNAVAILABLE
    } else {
        StatusCode::OK
    };

    (
        status,
        Json(json!({
            "status": if status == StatusCode::OK { "ok" } else { "degraded" },
            "service": "question-service",
            "database": database,
        })),
    )
}

async fn root() -> impl IntoResponse {
    Json(json!({
        "server": "Question Service",
        "version": env!("CARGO_PKG_VERSION"),
        "status": "running"
    }))
}
