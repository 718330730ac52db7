use axum::{
    extract::{Json, Path, State},
    routing::{delete, get, post, put},
    Router,
};
use std::sync::Arc;
use uuid::Uuid;

use crate::handlers::common::{
    created_response, map_service_error, no_content_response, success_response,
};
use crate::{
    auth::AuthenticatedUser,
    errors::{ApiError, ServiceError},
    schemas::category::{CategoryCreate, CategoryUpdate},
    AppState,
};

pub fn categories_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", post(create_category))
        .route("/", get(list_categories))
        .route("/:id", get(get_category))
        .route("/:id", put(update_category))
        .route("/:id", delete(delete_category))
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

/// Create a category (admin only)
async fn create_category(
    State(state): State<Arc<AppState>>,
    auth: AuthenticatedUser,
    Json(payload): Json<CategoryCreate>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    require_admin(&auth)?;

    let category = state
        .services
        .categories
        .create(payload)
        .await
        .map_err(map_service_error)?;

    Ok(created_response(category))
}

/// List all categories (public)
async fn list_categories(
    State(state): State<Arc<AppState>>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let categories = state
        .services
        .categories
        .list()
        .await
        .map_err(map_service_error)?;

    Ok(success_response(categories))
}

/// Fetch one category (public)
async fn get_category(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let category = state
        .services
        .categories
        .get(id)
        .await
        .map_err(map_service_error)?;

    Ok(success_response(category))
}

/// Partial update (admin only)
async fn update_category(
    State(state): State<Arc<AppState>>,
    auth: AuthenticatedUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<CategoryUpdate>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    require_admin(&auth)?;

    let category = state
        .services
        .categories
        .update(id, payload)
        .await
        .map_err(map_service_error)?;

    Ok(success_response(category))
}

/// Delete an empty category (admin only)
async fn delete_category(
    State(state): State<Arc<AppState>>,
    auth: AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    require_admin(&auth)?;

    state
        .services
        .categories
        .delete(id)
        .await
        .map_err(map_service_error)?;

    Ok(no_content_response())
}
