use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use super::validate_money;
use crate::entities::product;

#[derive(Debug, Deserialize, Validate)]
pub struct ProductCreate {
    #[validate(length(min = 1, message = "Name is required"))]
    pub name: String,
    pub description: Option<String>,
    #[validate(custom = "validate_money")]
    pub price: Decimal,
    #[validate(range(min = 0))]
    #[serde(default)]
    pub stock_quantity: i32,
    pub category_id: Uuid,
    pub image_url: Option<String>,
    #[serde(default = "default_active")]
    pub is_active: bool,
}

fn default_active() -> bool {
    true
}

/// Partial update; `None` leaves the column unchanged.
#[derive(Debug, Default, Deserialize, Validate)]
pub struct ProductUpdate {
    #[validate(length(min = 1))]
    pub name: Option<String>,
    pub description: Option<String>,
    #[validate(custom = "validate_money")]
    pub price: Option<Decimal>,
    #[validate(range(min = 0))]
    pub stock_quantity: Option<i32>,
    pub category_id: Option<Uuid>,
    pub image_url: Option<String>,
    pub is_active: Option<bool>,
}

/// Full public product shape.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductResponse {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub price: Decimal,
    pub stock_quantity: i32,
    pub category_id: Uuid,
    pub image_url: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl From<product::Model> for ProductResponse {
    fn from(model: product::Model) -> Self {
        Self {
            id: model.id,
            name: model.name,
            description: model.description,
            price: model.price,
            stock_quantity: model.stock_quantity,
            category_id: model.category_id,
            image_url: model.image_url,
            is_active: model.is_active,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

/// Reduced shape for enumeration endpoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductListItem {
    pub id: Uuid,
    pub name: String,
    pub price: Decimal,
    pub image_url: Option<String>,
    pub is_active: bool,
}

impl From<product::Model> for ProductListItem {
    fn from(model: product::Model) -> Self {
        Self {
            id: model.id,
            name: model.name,
            price: model.price,
            image_url: model.image_url,
            is_active: model.is_active,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ProductListResponse {
    pub products: Vec<ProductListItem>,
    pub total: u64,
    pub page: u64,
    pub per_page: u64,
}
