use std::sync::Arc;

use chrono::{Duration, Utc};
use redis::AsyncCommands;
use sea_orm::{DatabaseConnection, EntityTrait};
use tracing::{info, instrument};
use uuid::Uuid;
use validator::Validate;

use crate::{
    entities::product::Entity as ProductEntity,
    errors::ServiceError,
    events::{Event, EventSender},
    schemas::cart::{Cart, CartItem, CartItemAdd, CartItemUpdate},
};

/// Shopping cart service over the Redis TTL store.
///
/// The cart is one JSON value per user under `cart:{user_id}`. Expiry is
/// enforced by Redis itself (`SET ... EX`); every write refreshes the TTL
/// and recomputes the mirrored `expires_at` timestamp. Reading a missing
/// or expired key yields an empty cart.
#[derive(Clone)]
pub struct CartService {
    db: Arc<DatabaseConnection>,
    redis: Arc<redis::Client>,
    event_sender: EventSender,
    ttl_secs: u64,
}

impl CartService {
    pub fn new(
        db: Arc<DatabaseConnection>,
        redis: Arc<redis::Client>,
        event_sender: EventSender,
        ttl_secs: u64,
    ) -> Self {
        Self {
            db,
            redis,
            event_sender,
            ttl_secs,
        }
    }

    fn key(user_id: Uuid) -> String {
        format!("cart:{user_id}")
    }

    fn fresh_expiry(&self) -> chrono::DateTime<Utc> {
        Utc::now() + Duration::seconds(self.ttl_secs as i64)
    }

    async fn connection(&self) -> Result<redis::aio::Connection, ServiceError> {
        Ok(self.redis.get_async_connection().await?)
    }

    async fn load(&self, user_id: Uuid) -> Result<Cart, ServiceError> {
        let mut conn = self.connection().await?;
        let raw: Option<String> = conn.get(Self::key(user_id)).await?;
        match raw {
            Some(json) => Ok(serde_json::from_str(&json)?),
            None => Ok(Cart::empty(user_id, self.fresh_expiry())),
        }
    }

    /// Persists the cart and refreshes the TTL.
    async fn store(&self, cart: &Cart) -> Result<(), ServiceError> {
        let mut conn = self.connection().await?;
        let json = serde_json::to_string(cart)?;
        let _: () = conn
            .set_ex(Self::key(cart.user_id), json, self.ttl_secs as usize)
            .await?;
        Ok(())
    }

    pub async fn get_cart(&self, user_id: Uuid) -> Result<Cart, ServiceError> {
        self.load(user_id).await
    }

    /// Adds a product to the cart, merging quantities when the product is
    /// already present. The product must exist and be active.
    #[instrument(skip(self, request), fields(user_id = %user_id, product_id = %request.product_id))]
    pub async fn add_item(&self, user_id: Uuid, request: CartItemAdd) -> Result<Cart, ServiceError> {
        request.validate()?;

        let product = ProductEntity::find_by_id(request.product_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| {
                ServiceError::ReferenceError(format!(
                    "product {} does not exist",
                    request.product_id
                ))
            })?;
        if !product.is_active {
            return Err(ServiceError::ValidationError(format!(
                "product {} is not available",
                request.product_id
            )));
        }

        let mut cart = self.load(user_id).await?;
        match cart
            .items
            .iter_mut()
            .find(|item| item.product_id == request.product_id)
        {
            Some(item) => item.quantity += request.quantity,
            None => cart.items.push(CartItem {
                product_id: request.product_id,
                quantity: request.quantity,
                added_at: Utc::now(),
            }),
        }
        cart.expires_at = self.fresh_expiry();
        self.store(&cart).await?;

        self.event_sender
            .send_or_log(Event::CartItemAdded {
                user_id,
                product_id: request.product_id,
            })
            .await;
        info!(user_id = %user_id, "cart item added");
        Ok(cart)
    }

    /// Sets the quantity of a cart line; quantity 0 removes the line.
    #[instrument(skip(self, request), fields(user_id = %user_id, product_id = %product_id))]
    pub async fn update_item(
        &self,
        user_id: Uuid,
        product_id: Uuid,
        request: CartItemUpdate,
    ) -> Result<Cart, ServiceError> {
        request.validate()?;

        let mut cart = self.load(user_id).await?;
        let position = cart
            .items
            .iter()
            .position(|item| item.product_id == product_id)
            .ok_or_else(|| {
                ServiceError::NotFound(format!("product {product_id} is not in the cart"))
            })?;

        if request.quantity == 0 {
            cart.items.remove(position);
        } else {
            cart.items[position].quantity = request.quantity;
        }
        cart.expires_at = self.fresh_expiry();
        self.store(&cart).await?;
        Ok(cart)
    }

    pub async fn remove_item(&self, user_id: Uuid, product_id: Uuid) -> Result<Cart, ServiceError> {
        self.update_item(user_id, product_id, CartItemUpdate { quantity: 0 })
            .await
    }

    /// Drops the whole cart key.
    #[instrument(skip(self), fields(user_id = %user_id))]
    pub async fn clear(&self, user_id: Uuid) -> Result<(), ServiceError> {
        let mut conn = self.connection().await?;
        let _: () = conn.del(Self::key(user_id)).await?;
        self.event_sender.send_or_log(Event::CartCleared(user_id)).await;
        info!(user_id = %user_id, "cart cleared");
        Ok(())
    }
}
