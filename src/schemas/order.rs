use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::entities::order::{self, OrderStatus};
use crate::entities::order_item;

/// One requested order line. Price fields are server-computed snapshots and
/// deliberately absent here.
#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct OrderItemCreate {
    pub product_id: Uuid,
    #[validate(range(min = 1, message = "Quantity must be at least 1"))]
    pub quantity: i32,
}

#[derive(Debug, Deserialize, Validate)]
pub struct OrderCreate {
    #[validate(length(min = 1, message = "Shipping address is required"))]
    pub shipping_address: String,
    // Per-line quantity bounds are re-checked in the service, which also
    // resolves each product_id.
    #[validate(length(min = 1, message = "An order needs at least one item"))]
    pub items: Vec<OrderItemCreate>,
}

/// Post-creation update surface: only the status and shipping address are
/// mutable, item composition is not.
#[derive(Debug, Default, Deserialize, Validate)]
pub struct OrderUpdate {
    pub status: Option<OrderStatus>,
    #[validate(length(min = 1))]
    pub shipping_address: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderItemResponse {
    pub id: Uuid,
    pub order_id: Uuid,
    pub product_id: Uuid,
    pub quantity: i32,
    pub unit_price: Decimal,
    pub subtotal: Decimal,
}

impl From<order_item::Model> for OrderItemResponse {
    fn from(model: order_item::Model) -> Self {
        Self {
            id: model.id,
            order_id: model.order_id,
            product_id: model.product_id,
            quantity: model.quantity,
            unit_price: model.unit_price,
            subtotal: model.subtotal,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderResponse {
    pub id: Uuid,
    pub user_id: Uuid,
    pub total_amount: Decimal,
    pub status: OrderStatus,
    pub shipping_address: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
    pub items: Vec<OrderItemResponse>,
}

impl OrderResponse {
    pub fn from_parts(order: order::Model, items: Vec<order_item::Model>) -> Self {
        Self {
            id: order.id,
            user_id: order.user_id,
            total_amount: order.total_amount,
            status: order.status,
            shipping_address: order.shipping_address,
            created_at: order.created_at,
            updated_at: order.updated_at,
            items: items.into_iter().map(OrderItemResponse::from).collect(),
        }
    }
}

/// Reduced shape for order enumeration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderListItem {
    pub id: Uuid,
    pub total_amount: Decimal,
    pub status: OrderStatus,
    pub created_at: DateTime<Utc>,
}

impl From<order::Model> for OrderListItem {
    fn from(model: order::Model) -> Self {
        Self {
            id: model.id,
            total_amount: model.total_amount,
            status: model.status,
            created_at: model.created_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct OrderListResponse {
    pub orders: Vec<OrderListItem>,
    pub total: u64,
    pub page: u64,
    pub per_page: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn create_requires_at_least_one_item() {
        let payload = OrderCreate {
            shipping_address: "1 Main St".into(),
            items: vec![],
        };
        assert!(payload.validate().is_err());
    }

    #[test]
    fn item_rejects_zero_quantity() {
        let line = OrderItemCreate {
            product_id: Uuid::new_v4(),
            quantity: 0,
        };
        assert!(line.validate().is_err());
    }

    #[test]
    fn status_is_not_settable_at_creation() {
        // A payload smuggling a status field still deserializes, with the
        // unknown field ignored; status is server-assigned.
        let payload: OrderCreate = serde_json::from_str(
            r#"{
                "shipping_address": "1 Main St",
                "status": "delivered",
                "items": [{"product_id": "550e8400-e29b-41d4-a716-446655440000", "quantity": 1}]
            }"#,
        )
        .unwrap();
        assert!(payload.validate().is_ok());
    }

    #[test]
    fn response_assembles_items() {
        let order_id = Uuid::new_v4();
        let order = order::Model {
            id: order_id,
            user_id: Uuid::new_v4(),
            total_amount: dec!(30.00),
            status: OrderStatus::Pending,
            shipping_address: "1 Main St".into(),
            created_at: Utc::now(),
            updated_at: None,
        };
        let items = vec![order_item::Model {
            id: Uuid::new_v4(),
            order_id,
            product_id: Uuid::new_v4(),
            quantity: 2,
            unit_price: dec!(15.00),
            subtotal: dec!(30.00),
        }];
        let response = OrderResponse::from_parts(order, items);
        assert_eq!(response.items.len(), 1);
        assert_eq!(response.total_amount, dec!(30.00));
        assert_eq!(response.items[0].subtotal, dec!(30.00));
    }

    #[test]
    fn status_serializes_as_string_tag() {
        let json = serde_json::to_string(&OrderStatus::Pending).unwrap();
        assert_eq!(json, "\"pending\"");
        let back: OrderStatus = serde_json::from_str("\"cancelled\"").unwrap();
        assert_eq!(back, OrderStatus::Cancelled);
    }
}
