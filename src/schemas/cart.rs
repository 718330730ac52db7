use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

/// One cart line. Carts reference products by id only; prices are resolved
/// at checkout, not stored here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CartItem {
    pub product_id: Uuid,
    pub quantity: i32,
    pub added_at: DateTime<Utc>,
}

/// The full cart value as stored in Redis and returned to the client.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Cart {
    pub user_id: Uuid,
    #[serde(default)]
    pub items: Vec<CartItem>,
    pub expires_at: DateTime<Utc>,
}

impl Cart {
    pub fn empty(user_id: Uuid, expires_at: DateTime<Utc>) -> Self {
        Self {
            user_id,
            items: Vec::new(),
            expires_at,
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct CartItemAdd {
    pub product_id: Uuid,
    #[validate(range(min = 1, message = "Quantity must be at least 1"))]
    #[serde(default = "default_quantity")]
    pub quantity: i32,
}

fn default_quantity() -> i32 {
    1
}

#[derive(Debug, Deserialize, Validate)]
pub struct CartItemUpdate {
    #[validate(range(min = 0))]
    pub quantity: i32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_defaults_quantity_to_one() {
        let payload: CartItemAdd = serde_json::from_str(
            r#"{"product_id": "550e8400-e29b-41d4-a716-446655440000"}"#,
        )
        .unwrap();
        assert_eq!(payload.quantity, 1);
        assert!(payload.validate().is_ok());
    }

    #[test]
    fn add_rejects_zero_quantity() {
        let payload = CartItemAdd {
            product_id: Uuid::new_v4(),
            quantity: 0,
        };
        assert!(payload.validate().is_err());
    }

    #[test]
    fn cart_roundtrips_through_json() {
        let cart = Cart {
            user_id: Uuid::new_v4(),
            items: vec![CartItem {
                product_id: Uuid::new_v4(),
                quantity: 2,
                added_at: Utc::now(),
            }],
            expires_at: Utc::now(),
        };
        let json = serde_json::to_string(&cart).unwrap();
        let back: Cart = serde_json::from_str(&json).unwrap();
        assert_eq!(back.user_id, cart.user_id);
        assert_eq!(back.items.len(), 1);
        assert_eq!(back.items[0].quantity, 2);
    }
}
