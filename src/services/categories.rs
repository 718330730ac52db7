use std::sync::Arc;

use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, ModelTrait, PaginatorTrait,
    QueryFilter, QueryOrder, Set,
};
use tracing::{info, instrument};
use uuid::Uuid;
use validator::Validate;

use crate::{
    entities::category::{self, Entity as CategoryEntity},
    entities::product::{self, Entity as ProductEntity},
    errors::ServiceError,
    events::{Event, EventSender},
    schemas::category::{CategoryCreate, CategoryResponse, CategoryUpdate},
};

#[derive(Clone)]
pub struct CategoryService {
    db: Arc<DatabaseConnection>,
    event_sender: EventSender,
}

impl CategoryService {
    pub fn new(db: Arc<DatabaseConnection>, event_sender: EventSender) -> Self {
        Self { db, event_sender }
    }

    /// Creates a category. A supplied `parent_id` must resolve to an
    /// existing category.
    #[instrument(skip(self, request), fields(name = %request.name))]
    pub async fn create(&self, request: CategoryCreate) -> Result<CategoryResponse, ServiceError> {
        request.validate()?;

        if let Some(parent_id) = request.parent_id {
            self.require_exists(parent_id).await?;
        }

        let category_id = Uuid::new_v4();
        let model = category::ActiveModel {
            id: Set(category_id),
            name: Set(request.name),
            description: Set(request.description),
            parent_id: Set(request.parent_id),
        }
        .insert(&*self.db)
        .await?;

        self.event_sender.send_or_log(Event::CategoryCreated(category_id)).await;
        info!(category_id = %category_id, "category created");
        Ok(model.into())
    }

    pub async fn get(&self, category_id: Uuid) -> Result<CategoryResponse, ServiceError> {
        CategoryEntity::find_by_id(category_id)
            .one(&*self.db)
            .await?
            .map(CategoryResponse::from)
            .ok_or_else(|| ServiceError::NotFound(format!("Category {category_id} not found")))
    }

    pub async fn list(&self) -> Result<Vec<CategoryResponse>, ServiceError> {
        Ok(CategoryEntity::find()
            .order_by_asc(category::Column::Name)
            .all(&*self.db)
            .await?
            .into_iter()
            .map(CategoryResponse::from)
            .collect())
    }

    /// Partial update. Re-parenting re-validates the reference and walks
    /// the proposed ancestor chain so the category cannot become its own
    /// ancestor.
    #[instrument(skip(self, request), fields(category_id = %category_id))]
    pub async fn update(
        &self,
        category_id: Uuid,
        request: CategoryUpdate,
    ) -> Result<CategoryResponse, ServiceError> {
        request.validate()?;

        let category = CategoryEntity::find_by_id(category_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Category {category_id} not found")))?;

        if let Some(parent_id) = request.parent_id {
            if parent_id == category_id {
                return Err(ServiceError::ValidationError(
                    "a category cannot be its own parent".to_string(),
                ));
            }
            self.require_exists(parent_id).await?;
            self.reject_cycle(category_id, parent_id).await?;
        }

        let mut active: category::ActiveModel = category.into();
        if let Some(name) = request.name {
            active.name = Set(name);
        }
        if let Some(description) = request.description {
            active.description = Set(Some(description));
        }
        if let Some(parent_id) = request.parent_id {
            active.parent_id = Set(Some(parent_id));
        }

        let updated = active.update(&*self.db).await?;
        self.event_sender.send_or_log(Event::CategoryUpdated(category_id)).await;
        Ok(updated.into())
    }

    /// Deletes a category, refusing while products or child categories
    /// still reference it.
    #[instrument(skip(self), fields(category_id = %category_id))]
    pub async fn delete(&self, category_id: Uuid) -> Result<(), ServiceError> {
        let category = CategoryEntity::find_by_id(category_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Category {category_id} not found")))?;

        let product_count = ProductEntity::find()
            .filter(product::Column::CategoryId.eq(category_id))
            .count(&*self.db)
            .await?;
        if product_count > 0 {
            return Err(ServiceError::Conflict(format!(
                "category {category_id} still has {product_count} products"
            )));
        }

        let child_count = CategoryEntity::find()
            .filter(category::Column::ParentId.eq(category_id))
            .count(&*self.db)
            .await?;
        if child_count > 0 {
            return Err(ServiceError::Conflict(format!(
                "category {category_id} still has {child_count} child categories"
            )));
        }

        category.delete(&*self.db).await?;
        self.event_sender.send_or_log(Event::CategoryDeleted(category_id)).await;
        info!(category_id = %category_id, "category deleted");
        Ok(())
    }

    async fn require_exists(&self, category_id: Uuid) -> Result<(), ServiceError> {
        let found = CategoryEntity::find_by_id(category_id).one(&*self.db).await?;
        if found.is_none() {
            return Err(ServiceError::ReferenceError(format!(
                "parent category {category_id} does not exist"
            )));
        }
        Ok(())
    }

    /// Walks the parent chain upward from `new_parent`; reaching
    /// `category_id` would close a cycle. The walk is bounded so a
    /// pre-existing corrupt chain cannot loop forever.
    async fn reject_cycle(&self, category_id: Uuid, new_parent: Uuid) -> Result<(), ServiceError> {
        const MAX_DEPTH: usize = 64;
        let mut cursor = Some(new_parent);
        for _ in 0..MAX_DEPTH {
            let Some(current) = cursor else {
                return Ok(());
            };
            if current == category_id {
                return Err(ServiceError::ValidationError(
                    "category parent chain would form a cycle".to_string(),
                ));
            }
            cursor = CategoryEntity::find_by_id(current)
                .one(&*self.db)
                .await?
                .and_then(|c| c.parent_id);
        }
        Err(ServiceError::ValidationError(
            "category parent chain too deep".to_string(),
        ))
    }
}
