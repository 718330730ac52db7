pub mod carts;
pub mod categories;
pub mod order_status;
pub mod orders;
pub mod products;
pub mod users;

use std::sync::Arc;

use sea_orm::DatabaseConnection;

use crate::auth::AuthService;
use crate::config::AppConfig;
use crate::events::EventSender;

pub use carts::CartService;
pub use categories::CategoryService;
pub use orders::OrderService;
pub use products::ProductService;
pub use users::UserService;

/// Aggregate of the services the HTTP handlers use, shared through
/// `AppState`.
#[derive(Clone)]
pub struct AppServices {
    pub auth: Arc<AuthService>,
    pub users: Arc<UserService>,
    pub categories: Arc<CategoryService>,
    pub products: Arc<ProductService>,
    pub orders: Arc<OrderService>,
    pub cart: Arc<CartService>,
}

impl AppServices {
    pub fn new(
        db: Arc<DatabaseConnection>,
        event_sender: EventSender,
        redis: Arc<redis::Client>,
        cfg: &AppConfig,
    ) -> Self {
        let auth = Arc::new(AuthService::new(&cfg.jwt_secret, cfg.jwt_expiration_secs));
        Self {
            users: Arc::new(UserService::new(
                db.clone(),
                event_sender.clone(),
                auth.clone(),
            )),
            categories: Arc::new(CategoryService::new(db.clone(), event_sender.clone())),
            products: Arc::new(ProductService::new(db.clone(), event_sender.clone())),
            orders: Arc::new(OrderService::new(db.clone(), event_sender.clone())),
            cart: Arc::new(CartService::new(
                db,
                redis,
                event_sender,
                cfg.cart_ttl_secs,
            )),
            auth,
        }
    }
}
