use axum::{
    extract::{Json, State},
    routing::post,
    Router,
};
use std::sync::Arc;

use crate::handlers::common::{created_response, map_service_error, success_response};
use crate::{
    errors::ApiError,
    schemas::user::{UserCreate, UserLogin},
    AppState,
};

pub fn auth_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
}

/// Register a new account
async fn register(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<UserCreate>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let user = state
        .services
        .users
        .register(payload)
        .await
        .map_err(map_service_error)?;

    Ok(created_response(user))
}

/// Exchange credentials for an access token
async fn login(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<UserLogin>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let token = state
        .services
        .users
        .login(payload)
        .await
        .map_err(map_service_error)?;

    Ok(success_response(token))
}
