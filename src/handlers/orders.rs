use axum::{
    extract::{Json, Path, Query, State},
    routing::{get, post, put},
    Router,
};
use serde::Deserialize;
use std::sync::Arc;
use uuid::Uuid;

use crate::handlers::common::{created_response, map_service_error, success_response};
use crate::{
    auth::AuthenticatedUser,
    errors::{ApiError, ServiceError},
    schemas::order::{OrderCreate, OrderUpdate},
    AppState,
};

pub fn orders_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", post(create_order))
        .route("/", get(list_orders))
        .route("/:id", get(get_order))
        .route("/:id", put(update_order))
        .route("/:id/cancel", post(cancel_order))
}

#[derive(Debug, Deserialize)]
struct OrderListQuery {
    #[serde(default = "default_page")]
    page: u64,
    #[serde(default = "default_per_page")]
    per_page: u64,
    /// Admins may list another user's orders.
    user_id: Option<Uuid>,
}

fn default_page() -> u64 {
    1
}

fn default_per_page() -> u64 {
    20
}

/// Place an order for the authenticated user
async fn create_order(
    State(state): State<Arc<AppState>>,
    auth: AuthenticatedUser,
    Json(payload): Json<OrderCreate>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let order = state
        .services
        .orders
        .create_order(&auth, payload)
        .await
        .map_err(map_service_error)?;

    Ok(created_response(order))
}

/// List orders (own by default; admins may target any user)
async fn list_orders(
    State(state): State<Arc<AppState>>,
    auth: AuthenticatedUser,
    Query(query): Query<OrderListQuery>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let target = query.user_id.unwrap_or(auth.user_id);
    if !auth.can_access(target) {
        return Err(ApiError::ServiceError(ServiceError::Forbidden(
            "cannot list another user's orders".to_string(),
        )));
    }

    let orders = state
        .services
        .orders
        .list_orders_for_user(target, query.page, query.per_page)
        .await
        .map_err(map_service_error)?;

    Ok(success_response(orders))
}

/// Fetch an order with its items
async fn get_order(
    State(state): State<Arc<AppState>>,
    auth: AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let order = state
        .services
        .orders
        .get_order(&auth, id)
        .await
        .map_err(map_service_error)?;

    Ok(success_response(order))
}

/// Update status and/or shipping address
async fn update_order(
    State(state): State<Arc<AppState>>,
    auth: AuthenticatedUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<OrderUpdate>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let order = state
        .services
        .orders
        .update_order(&auth, id, payload)
        .await
        .map_err(map_service_error)?;

    Ok(success_response(order))
}

/// Cancel a pending or confirmed order, restocking its lines
async fn cancel_order(
    State(state): State<Arc<AppState>>,
    auth: AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let order = state
        .services
        .orders
        .cancel_order(&auth, id)
        .await
        .map_err(map_service_error)?;

    Ok(success_response(order))
}
