use std::sync::Arc;

use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{
    sea_query::Expr, ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, Set, TransactionTrait,
};
use tracing::{info, instrument, warn};
use uuid::Uuid;
use validator::Validate;

use crate::{
    auth::AuthenticatedUser,
    entities::order::{self, Entity as OrderEntity, OrderStatus},
    entities::order_item::{self, Entity as OrderItemEntity},
    entities::product::{self, Entity as ProductEntity},
    errors::ServiceError,
    events::{Event, EventSender},
    schemas::order::{OrderCreate, OrderListItem, OrderListResponse, OrderResponse, OrderUpdate},
    services::order_status,
};

#[derive(Clone)]
pub struct OrderService {
    db: Arc<DatabaseConnection>,
    event_sender: EventSender,
}

impl OrderService {
    pub fn new(db: Arc<DatabaseConnection>, event_sender: EventSender) -> Self {
        Self { db, event_sender }
    }

    /// Places an order as a single atomic unit.
    ///
    /// For every line the product is resolved, must be active, and must
    /// have enough stock; `unit_price` is snapshotted from the product and
    /// `subtotal = unit_price * quantity`. Stock is decremented inside the
    /// same transaction with a guarded update (`stock_quantity >= qty` in
    /// the filter), so concurrent orders for the last unit cannot both
    /// succeed: the loser sees zero rows affected and the whole
    /// transaction rolls back with `InsufficientStock`, leaving no order,
    /// no items, and no stock change behind.
    #[instrument(skip(self, request), fields(user_id = %requester.user_id, lines = request.items.len()))]
    pub async fn create_order(
        &self,
        requester: &AuthenticatedUser,
        request: OrderCreate,
    ) -> Result<OrderResponse, ServiceError> {
        request.validate()?;

        let now = Utc::now();
        let order_id = Uuid::new_v4();
        let txn = self.db.begin().await?;

        let mut item_models = Vec::with_capacity(request.items.len());
        let mut total_amount = Decimal::ZERO;

        for line in &request.items {
            if line.quantity < 1 {
                return Err(ServiceError::ValidationError(format!(
                    "quantity for product {} must be at least 1",
                    line.product_id
                )));
            }

            let product = ProductEntity::find_by_id(line.product_id)
                .one(&txn)
                .await?
                .ok_or_else(|| {
                    ServiceError::ReferenceError(format!(
                        "product {} does not exist",
                        line.product_id
                    ))
                })?;

            if !product.is_active {
                return Err(ServiceError::ValidationError(format!(
                    "product {} is not available",
                    line.product_id
                )));
            }
            if product.stock_quantity < line.quantity {
                return Err(ServiceError::InsufficientStock(format!(
                    "product {} has {} in stock, {} requested",
                    line.product_id, product.stock_quantity, line.quantity
                )));
            }

            // Guarded decrement: the stock check above is advisory, this
            // filter is the arbiter under concurrency.
            let decremented = ProductEntity::update_many()
                .col_expr(
                    product::Column::StockQuantity,
                    Expr::col(product::Column::StockQuantity).sub(line.quantity),
                )
                .filter(product::Column::Id.eq(line.product_id))
                .filter(product::Column::StockQuantity.gte(line.quantity))
                .exec(&txn)
                .await?;
            if decremented.rows_affected == 0 {
                warn!(product_id = %line.product_id, "lost stock race, aborting order");
                return Err(ServiceError::InsufficientStock(format!(
                    "product {} no longer has {} in stock",
                    line.product_id, line.quantity
                )));
            }

            let unit_price = product.price;
            let subtotal = unit_price * Decimal::from(line.quantity);
            total_amount += subtotal;

            item_models.push(order_item::ActiveModel {
                id: Set(Uuid::new_v4()),
                order_id: Set(order_id),
                product_id: Set(line.product_id),
                quantity: Set(line.quantity),
                unit_price: Set(unit_price),
                subtotal: Set(subtotal),
            });
        }

        let order_model = order::ActiveModel {
            id: Set(order_id),
            user_id: Set(requester.user_id),
            total_amount: Set(total_amount),
            status: Set(OrderStatus::Pending),
            shipping_address: Set(request.shipping_address),
            created_at: Set(now),
            updated_at: Set(None),
        }
        .insert(&txn)
        .await?;

        let mut items = Vec::with_capacity(item_models.len());
        for item in item_models {
            items.push(item.insert(&txn).await?);
        }

        txn.commit().await?;

        self.event_sender.send_or_log(Event::OrderCreated(order_id)).await;
        info!(order_id = %order_id, total = %total_amount, "order created");
        Ok(OrderResponse::from_parts(order_model, items))
    }

    /// Fetches an order with its items. Customers see only their own
    /// orders, admins see all.
    #[instrument(skip(self, requester), fields(order_id = %order_id))]
    pub async fn get_order(
        &self,
        requester: &AuthenticatedUser,
        order_id: Uuid,
    ) -> Result<OrderResponse, ServiceError> {
        let order = OrderEntity::find_by_id(order_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Order {order_id} not found")))?;

        if !requester.can_access(order.user_id) {
            return Err(ServiceError::Forbidden(
                "order belongs to another user".to_string(),
            ));
        }

        let items = OrderItemEntity::find()
            .filter(order_item::Column::OrderId.eq(order_id))
            .all(&*self.db)
            .await?;

        Ok(OrderResponse::from_parts(order, items))
    }

    /// Lists a user's orders, newest first, in the reduced list shape.
    #[instrument(skip(self))]
    pub async fn list_orders_for_user(
        &self,
        user_id: Uuid,
        page: u64,
        per_page: u64,
    ) -> Result<OrderListResponse, ServiceError> {
        let paginator = OrderEntity::find()
            .filter(order::Column::UserId.eq(user_id))
            .order_by_desc(order::Column::CreatedAt)
            .paginate(&*self.db, per_page.max(1));

        let total = paginator.num_items().await?;
        let orders = paginator
            .fetch_page(page.saturating_sub(1))
            .await?
            .into_iter()
            .map(OrderListItem::from)
            .collect();

        Ok(OrderListResponse {
            orders,
            total,
            page,
            per_page,
        })
    }

    /// Post-creation update. `status` moves through the transition table;
    /// `shipping_address` is only mutable before shipment. Item
    /// composition is immutable. Cancelling restocks every line in the
    /// same transaction.
    #[instrument(skip(self, requester, request), fields(order_id = %order_id))]
    pub async fn update_order(
        &self,
        requester: &AuthenticatedUser,
        order_id: Uuid,
        request: OrderUpdate,
    ) -> Result<OrderResponse, ServiceError> {
        request.validate()?;

        let txn = self.db.begin().await?;

        let order = OrderEntity::find_by_id(order_id)
            .one(&txn)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Order {order_id} not found")))?;

        if !requester.can_access(order.user_id) {
            return Err(ServiceError::Forbidden(
                "order belongs to another user".to_string(),
            ));
        }

        let old_status = order.status;

        if request.shipping_address.is_some()
            && !matches!(old_status, OrderStatus::Pending | OrderStatus::Confirmed)
        {
            return Err(ServiceError::ValidationError(format!(
                "shipping address cannot change once the order is {}",
                old_status.as_str()
            )));
        }

        if let Some(new_status) = request.status {
            order_status::check_transition(old_status, new_status)?;
            if new_status == OrderStatus::Cancelled && order_status::cancellation_restocks(old_status)
            {
                self.restock_items(&txn, order_id).await?;
            }
        }

        let mut active: order::ActiveModel = order.into();
        if let Some(new_status) = request.status {
            active.status = Set(new_status);
        }
        if let Some(address) = request.shipping_address {
            active.shipping_address = Set(address);
        }
        active.updated_at = Set(Some(Utc::now()));

        let updated = active.update(&txn).await?;

        let items = OrderItemEntity::find()
            .filter(order_item::Column::OrderId.eq(order_id))
            .all(&txn)
            .await?;

        txn.commit().await?;

        if let Some(new_status) = request.status {
            self.event_sender
                .send_or_log(Event::OrderStatusChanged {
                    order_id,
                    old_status,
                    new_status,
                })
                .await;
            if new_status == OrderStatus::Cancelled {
                self.event_sender.send_or_log(Event::OrderCancelled(order_id)).await;
            }
            info!(
                order_id = %order_id,
                from = old_status.as_str(),
                to = new_status.as_str(),
                "order status changed"
            );
        }

        Ok(OrderResponse::from_parts(updated, items))
    }

    /// Cancels an order (pending or confirmed only) and restocks its lines.
    pub async fn cancel_order(
        &self,
        requester: &AuthenticatedUser,
        order_id: Uuid,
    ) -> Result<OrderResponse, ServiceError> {
        self.update_order(
            requester,
            order_id,
            OrderUpdate {
                status: Some(OrderStatus::Cancelled),
                shipping_address: None,
            },
        )
        .await
    }

    async fn restock_items(
        &self,
        txn: &sea_orm::DatabaseTransaction,
        order_id: Uuid,
    ) -> Result<(), ServiceError> {
        let items = OrderItemEntity::find()
            .filter(order_item::Column::OrderId.eq(order_id))
            .all(txn)
            .await?;

        for item in items {
            ProductEntity::update_many()
                .col_expr(
                    product::Column::StockQuantity,
                    Expr::col(product::Column::StockQuantity).add(item.quantity),
                )
                .filter(product::Column::Id.eq(item.product_id))
                .exec(txn)
                .await?;
        }
        Ok(())
    }
}
