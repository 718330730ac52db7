use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json},
    routing::get,
    Router,
};
use serde_json::json;
use std::sync::Arc;
use std::time::Instant;

use crate::AppState;

pub fn health_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(root))
        .route("/health", get(health_check))
        .route("/health/ready", get(readiness_check))
}

async fn root() -> impl IntoResponse {
    Json(json!({ "message": "ESHOP API" }))
}

/// Liveness probe: fixed payload, no dependency checks.
async fn health_check() -> impl IntoResponse {
    Json(json!({ "status": "healthy" }))
}

/// Readiness probe: pings the database and reports per-component detail.
async fn readiness_check(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let start = Instant::now();
    let db_result = crate::db::check_connection(&state.db).await;
    let db_latency = start.elapsed().as_millis() as u64;

    match db_result {
        Ok(()) => (
            StatusCode::OK,
            Json(json!({
                "status": "ready",
                "checks": {
                    "database": { "status": "up", "latency_ms": db_latency }
                }
            })),
        ),
        Err(_) => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({
                "status": "not_ready",
                "checks": {
                    "database": { "status": "down", "latency_ms": db_latency }
                }
            })),
        ),
    }
}
