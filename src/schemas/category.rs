use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::entities::category;

#[derive(Debug, Deserialize, Validate)]
pub struct CategoryCreate {
    #[validate(length(min = 1, message = "Name is required"))]
    pub name: String,
    pub description: Option<String>,
    pub parent_id: Option<Uuid>,
}

/// Partial update; `None` leaves the column unchanged. Because of that,
/// re-parenting to "no parent" is expressed by moving the category under a
/// root category rather than clearing the field.
#[derive(Debug, Default, Deserialize, Validate)]
pub struct CategoryUpdate {
    #[validate(length(min = 1))]
    pub name: Option<String>,
    pub description: Option<String>,
    pub parent_id: Option<Uuid>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategoryResponse {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub parent_id: Option<Uuid>,
}

impl From<category::Model> for CategoryResponse {
    fn from(model: category::Model) -> Self {
        Self {
            id: model.id,
            name: model.name,
            description: model.description,
            parent_id: model.parent_id,
        }
    }
}
