pub mod auth;
pub mod carts;
pub mod categories;
pub mod common;
pub mod health;
pub mod orders;
pub mod products;
pub mod users;

use axum::Router;
use std::sync::Arc;

use crate::AppState;

/// The full `/api/v1` surface.
pub fn api_v1_routes() -> Router<Arc<AppState>> {
    Router::new()
        .nest("/auth", auth::auth_routes())
        .nest("/users", users::users_routes())
        .nest("/categories", categories::categories_routes())
        .nest("/products", products::products_routes())
        .nest("/orders", orders::orders_routes())
        .nest("/cart", carts::carts_routes())
}
