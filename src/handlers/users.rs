use axum::{
    extract::{Json, Path, Query, State},
    routing::{get, put},
    Router,
};
use std::sync::Arc;
use uuid::Uuid;

use crate::handlers::common::{map_service_error, success_response, PaginationParams};
use crate::{
    auth::AuthenticatedUser,
    errors::{ApiError, ServiceError},
    schemas::user::UserUpdate,
    AppState,
};

pub fn users_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(list_users))
        .route("/me", get(get_me))
        .route("/:id", get(get_user))
        .route("/:id", put(update_user))
}

/// List users (admin only)
async fn list_users(
    State(state): State<Arc<AppState>>,
    auth: AuthenticatedUser,
    Query(pagination): Query<PaginationParams>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    if !auth.is_admin() {
        return Err(ApiError::ServiceError(ServiceError::Forbidden(
            "admin role required".to_string(),
        )));
    }

    let users = state
        .services
        .users
        .list_users(pagination.page, pagination.per_page)
        .await
        .map_err(map_service_error)?;

    Ok(success_response(users))
}

/// The authenticated user's own record
async fn get_me(
    State(state): State<Arc<AppState>>,
    auth: AuthenticatedUser,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let user = state
        .services
        .users
        .get_user(auth.user_id)
        .await
        .map_err(map_service_error)?;

    Ok(success_response(user))
}

/// Fetch a user (self or admin)
async fn get_user(
    State(state): State<Arc<AppState>>,
    auth: AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    if !auth.can_access(id) {
        return Err(ApiError::ServiceError(ServiceError::Forbidden(
            "cannot read another user".to_string(),
        )));
    }

    let user = state
        .services
        .users
        .get_user(id)
        .await
        .map_err(map_service_error)?;

    Ok(success_response(user))
}

/// Partial update of a user (self or admin; role changes admin only)
async fn update_user(
    State(state): State<Arc<AppState>>,
    auth: AuthenticatedUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UserUpdate>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    if !auth.can_access(id) {
        return Err(ApiError::ServiceError(ServiceError::Forbidden(
            "cannot update another user".to_string(),
        )));
    }
    if payload.role.is_some() && !auth.is_admin() {
        return Err(ApiError::ServiceError(ServiceError::Forbidden(
            "only admins can change roles".to_string(),
        )));
    }

    let user = state
        .services
        .users
        .update_user(id, payload)
        .await
        .map_err(map_service_error)?;

    Ok(success_response(user))
}
