use axum::{
    extract::{Json, Path, Query, State},
    routing::{delete, get, post, put},
    Router,
};
use serde::Deserialize;
use std::sync::Arc;
use uuid::Uuid;

use crate::handlers::common::{created_response, map_service_error, success_response};
use crate::{
    auth::AuthenticatedUser,
    errors::{ApiError, ServiceError},
    schemas::product::{ProductCreate, ProductUpdate},
    services::products::ProductFilter,
    AppState,
};

pub fn products_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", post(create_product))
        .route("/", get(list_products))
        .route("/:id", get(get_product))
        .route("/:id", put(update_product))
        .route("/:id", delete(deactivate_product))
}

#[derive(Debug, Deserialize)]
struct ProductListQuery {
    #[serde(default = "default_page")]
    page: u64,
    #[serde(default = "default_per_page")]
    per_page: u64,
    category_id: Option<Uuid>,
    #[serde(default)]
    include_inactive: bool,
}

fn default_page() -> u64 {
    1
}

fn default_per_page() -> u64 {
    20
}

fn require_admin(auth: &AuthenticatedUser) -> Result<(), ApiError> {
    if auth.is_admin() {
        Ok(())
    } else {
        Err(ApiError::ServiceError(ServiceError::Forbidden(
            "admin role required".to_string(),
        )))
    }
}

/// Create a product (admin only)
async fn create_product(
    State(state): State<Arc<AppState>>,
    auth: AuthenticatedUser,
    Json(payload): Json<ProductCreate>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    require_admin(&auth)?;

    let product = state
        .services
        .products
        .create(payload)
        .await
        .map_err(map_service_error)?;

    Ok(created_response(product))
}

/// Paginated product listing (public, active products by default)
async fn list_products(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ProductListQuery>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let filter = ProductFilter {
        category_id: query.category_id,
        include_inactive: query.include_inactive,
    };

    let products = state
        .services
        .products
        .list(filter, query.page, query.per_page)
        .await
        .map_err(map_service_error)?;

    Ok(success_response(products))
}

/// Fetch one product (public)
async fn get_product(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let product = state
        .services
        .products
        .get(id)
        .await
        .map_err(map_service_error)?;

    Ok(success_response(product))
}

/// Partial update (admin only)
async fn update_product(
    State(state): State<Arc<AppState>>,
    auth: AuthenticatedUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<ProductUpdate>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    require_admin(&auth)?;

    let product = state
        .services
        .products
        .update(id, payload)
        .await
        .map_err(map_service_error)?;

    Ok(success_response(product))
}

/// Soft delete: deactivate instead of removing the row (admin only)
async fn deactivate_product(
    State(state): State<Arc<AppState>>,
    auth: AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    require_admin(&auth)?;

    let product = state
        .services
        .products
        .deactivate(id)
        .await
        .map_err(map_service_error)?;

    Ok(success_response(product))
}
