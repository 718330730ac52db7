use std::sync::Arc;

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, Set,
};
use tracing::{info, instrument};
use uuid::Uuid;
use validator::Validate;

use crate::{
    entities::category::Entity as CategoryEntity,
    entities::product::{self, Entity as ProductEntity},
    errors::ServiceError,
    events::{Event, EventSender},
    schemas::product::{
        ProductCreate, ProductListItem, ProductListResponse, ProductResponse, ProductUpdate,
    },
};

/// Listing filter. `include_inactive` defaults to false so soft-deleted
/// products stay out of storefront enumeration.
#[derive(Debug, Default, Clone)]
pub struct ProductFilter {
    pub category_id: Option<Uuid>,
    pub include_inactive: bool,
}

#[derive(Clone)]
pub struct ProductService {
    db: Arc<DatabaseConnection>,
    event_sender: EventSender,
}

impl ProductService {
    pub fn new(db: Arc<DatabaseConnection>, event_sender: EventSender) -> Self {
        Self { db, event_sender }
    }

    /// Creates a product; `category_id` must resolve.
    #[instrument(skip(self, request), fields(name = %request.name))]
    pub async fn create(&self, request: ProductCreate) -> Result<ProductResponse, ServiceError> {
        request.validate()?;
        self.require_category(request.category_id).await?;

        let product_id = Uuid::new_v4();
        let model = product::ActiveModel {
            id: Set(product_id),
            name: Set(request.name),
            description: Set(request.description),
            price: Set(request.price),
            stock_quantity: Set(request.stock_quantity),
            category_id: Set(request.category_id),
            image_url: Set(request.image_url),
            is_active: Set(request.is_active),
            created_at: Set(Utc::now()),
            updated_at: Set(None),
        }
        .insert(&*self.db)
        .await?;

        self.event_sender.send_or_log(Event::ProductCreated(product_id)).await;
        info!(product_id = %product_id, "product created");
        Ok(model.into())
    }

    pub async fn get(&self, product_id: Uuid) -> Result<ProductResponse, ServiceError> {
        ProductEntity::find_by_id(product_id)
            .one(&*self.db)
            .await?
            .map(ProductResponse::from)
            .ok_or_else(|| ServiceError::NotFound(format!("Product {product_id} not found")))
    }

    /// Paginated listing in the reduced `ProductListItem` shape.
    #[instrument(skip(self))]
    pub async fn list(
        &self,
        filter: ProductFilter,
        page: u64,
        per_page: u64,
    ) -> Result<ProductListResponse, ServiceError> {
        let mut query = ProductEntity::find().order_by_desc(product::Column::CreatedAt);
        if !filter.include_inactive {
            query = query.filter(product::Column::IsActive.eq(true));
        }
        if let Some(category_id) = filter.category_id {
            query = query.filter(product::Column::CategoryId.eq(category_id));
        }

        let paginator = query.paginate(&*self.db, per_page.max(1));
        let total = paginator.num_items().await?;
        let products = paginator
            .fetch_page(page.saturating_sub(1))
            .await?
            .into_iter()
            .map(ProductListItem::from)
            .collect();

        Ok(ProductListResponse {
            products,
            total,
            page,
            per_page,
        })
    }

    /// Partial update: absent fields leave columns unchanged; a new
    /// `category_id` is re-validated.
    #[instrument(skip(self, request), fields(product_id = %product_id))]
    pub async fn update(
        &self,
        product_id: Uuid,
        request: ProductUpdate,
    ) -> Result<ProductResponse, ServiceError> {
        request.validate()?;

        let product = ProductEntity::find_by_id(product_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Product {product_id} not found")))?;

        if let Some(category_id) = request.category_id {
            self.require_category(category_id).await?;
        }

        let mut active: product::ActiveModel = product.into();
        if let Some(name) = request.name {
            active.name = Set(name);
        }
        if let Some(description) = request.description {
            active.description = Set(Some(description));
        }
        if let Some(price) = request.price {
            active.price = Set(price);
        }
        if let Some(stock_quantity) = request.stock_quantity {
            active.stock_quantity = Set(stock_quantity);
        }
        if let Some(category_id) = request.category_id {
            active.category_id = Set(category_id);
        }
        if let Some(image_url) = request.image_url {
            active.image_url = Set(Some(image_url));
        }
        if let Some(is_active) = request.is_active {
            active.is_active = Set(is_active);
        }
        active.updated_at = Set(Some(Utc::now()));

        let updated = active.update(&*self.db).await?;
        self.event_sender.send_or_log(Event::ProductUpdated(product_id)).await;
        Ok(updated.into())
    }

    /// Soft delete: flips `is_active` off, keeping the row for order-item
    /// history.
    #[instrument(skip(self), fields(product_id = %product_id))]
    pub async fn deactivate(&self, product_id: Uuid) -> Result<ProductResponse, ServiceError> {
        let product = ProductEntity::find_by_id(product_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Product {product_id} not found")))?;

        let mut active: product::ActiveModel = product.into();
        active.is_active = Set(false);
        active.updated_at = Set(Some(Utc::now()));

        let updated = active.update(&*self.db).await?;
        self.event_sender.send_or_log(Event::ProductDeactivated(product_id)).await;
        info!(product_id = %product_id, "product deactivated");
        Ok(updated.into())
    }

    async fn require_category(&self, category_id: Uuid) -> Result<(), ServiceError> {
        let found = CategoryEntity::find_by_id(category_id).one(&*self.db).await?;
        if found.is_none() {
            return Err(ServiceError::ReferenceError(format!(
                "category {category_id} does not exist"
            )));
        }
        Ok(())
    }
}
