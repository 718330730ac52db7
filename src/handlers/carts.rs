use axum::{
    extract::{Json, Path, State},
    routing::{delete, get, post, put},
    Router,
};
use std::sync::Arc;
use uuid::Uuid;

use crate::handlers::common::{map_service_error, no_content_response, success_response};
use crate::{
    auth::AuthenticatedUser,
    errors::ApiError,
    schemas::cart::{CartItemAdd, CartItemUpdate},
    AppState,
};

/// Cart routes. The cart is keyed by the authenticated user; there is no
/// cart id in the URL.
pub fn carts_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(get_cart))
        .route("/", delete(clear_cart))
        .route("/items", post(add_item))
        .route("/items/:product_id", put(update_item))
        .route("/items/:product_id", delete(remove_item))
}

/// The authenticated user's cart (empty if none exists)
async fn get_cart(
    State(state): State<Arc<AppState>>,
    auth: AuthenticatedUser,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let cart = state
        .services
        .cart
        .get_cart(auth.user_id)
        .await
        .map_err(map_service_error)?;

    Ok(success_response(cart))
}

/// Add a product to the cart, merging quantities
async fn add_item(
    State(state): State<Arc<AppState>>,
    auth: AuthenticatedUser,
    Json(payload): Json<CartItemAdd>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let cart = state
        .services
        .cart
        .add_item(auth.user_id, payload)
        .await
        .map_err(map_service_error)?;

    Ok(success_response(cart))
}

/// Set a cart line's quantity (0 removes the line)
async fn update_item(
    State(state): State<Arc<AppState>>,
    auth: AuthenticatedUser,
    Path(product_id): Path<Uuid>,
    Json(payload): Json<CartItemUpdate>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let cart = state
        .services
        .cart
        .update_item(auth.user_id, product_id, payload)
        .await
        .map_err(map_service_error)?;

    Ok(success_response(cart))
}

/// Remove one product from the cart
async fn remove_item(
    State(state): State<Arc<AppState>>,
    auth: AuthenticatedUser,
    Path(product_id): Path<Uuid>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    state
        .services
        .cart
        .remove_item(auth.user_id, product_id)
        .await
        .map_err(map_service_error)?;

    Ok(no_content_response())
}

/// Drop the whole cart
async fn clear_cart(
    State(state): State<Arc<AppState>>,
    auth: AuthenticatedUser,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    state
        .services
        .cart
        .clear(auth.user_id)
        .await
        .map_err(map_service_error)?;

    Ok(no_content_response())
}
