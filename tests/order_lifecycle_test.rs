mod common;

use common::TestApp;
use eshop_api::{
    entities::order::OrderStatus,
    entities::{Order as OrderEntity, OrderItem as OrderItemEntity},
    errors::ServiceError,
    schemas::category::CategoryCreate,
    schemas::order::{OrderCreate, OrderItemCreate, OrderUpdate},
    schemas::product::ProductCreate,
    schemas::user::UserCreate,
};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use sea_orm::{EntityTrait, PaginatorTrait};
use uuid::Uuid;

struct Fixture {
    app: TestApp,
    user_id: Uuid,
    product_id: Uuid,
}

/// Seeds a customer, a category, and one product (price 19.99, stock 5).
async fn fixture() -> Fixture {
    let app = TestApp::new().await;

    let user = app
        .state
        .services
        .users
        .register(UserCreate {
            email: "buyer@example.com".to_string(),
            name: "Buyer".to_string(),
            role: None,
            password: "correct-horse-battery".to_string(),
        })
        .await
        .unwrap();

    let category = app
        .state
        .services
        .categories
        .create(CategoryCreate {
            name: "Mugs".to_string(),
            description: None,
            parent_id: None,
        })
        .await
        .unwrap();

    let product = app
        .state
        .services
        .products
        .create(ProductCreate {
            name: "Enamel mug".to_string(),
            description: None,
            price: dec!(19.99),
            stock_quantity: 5,
            category_id: category.id,
            image_url: None,
            is_active: true,
        })
        .await
        .unwrap();

    Fixture {
        user_id: user.id,
        product_id: product.id,
        app,
    }
}

fn order_for(product_id: Uuid, quantity: i32) -> OrderCreate {
    OrderCreate {
        shipping_address: "1 Main St, Springfield".to_string(),
        items: vec![OrderItemCreate {
            product_id,
            quantity,
        }],
    }
}

#[tokio::test]
async fn totals_equal_sum_of_line_subtotals() {
    let fx = fixture().await;
    let requester = fx.app.customer(fx.user_id);

    let order = fx
        .app
        .state
        .services
        .orders
        .create_order(&requester, order_for(fx.product_id, 3))
        .await
        .expect("order creation failed");

    assert_eq!(order.status, OrderStatus::Pending);
    assert_eq!(order.items.len(), 1);
    let line = &order.items[0];
    assert_eq!(line.unit_price, dec!(19.99));
    assert_eq!(line.subtotal, line.unit_price * Decimal::from(line.quantity));
    assert_eq!(
        order.total_amount,
        order.items.iter().map(|i| i.subtotal).sum::<Decimal>()
    );
    assert_eq!(order.total_amount, dec!(59.97));

    // Stock decremented at creation time.
    let product = fx.app.state.services.products.get(fx.product_id).await.unwrap();
    assert_eq!(product.stock_quantity, 2);
}

#[tokio::test]
async fn insufficient_stock_persists_nothing() {
    let fx = fixture().await;
    let requester = fx.app.customer(fx.user_id);

    let err = fx
        .app
        .state
        .services
        .orders
        .create_order(&requester, order_for(fx.product_id, 6))
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::InsufficientStock(_)));

    let orders = OrderEntity::find().count(&*fx.app.state.db).await.unwrap();
    let items = OrderItemEntity::find().count(&*fx.app.state.db).await.unwrap();
    assert_eq!(orders, 0);
    assert_eq!(items, 0);

    let product = fx.app.state.services.products.get(fx.product_id).await.unwrap();
    assert_eq!(product.stock_quantity, 5);
}

#[tokio::test]
async fn inactive_product_cannot_be_ordered() {
    let fx = fixture().await;
    let requester = fx.app.customer(fx.user_id);

    fx.app
        .state
        .services
        .products
        .deactivate(fx.product_id)
        .await
        .unwrap();

    let err = fx
        .app
        .state
        .services
        .orders
        .create_order(&requester, order_for(fx.product_id, 1))
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::ValidationError(_)));
}

#[tokio::test]
async fn zero_quantity_line_is_rejected() {
    let fx = fixture().await;
    let requester = fx.app.customer(fx.user_id);

    let err = fx
        .app
        .state
        .services
        .orders
        .create_order(&requester, order_for(fx.product_id, 0))
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::ValidationError(_)));
}

#[tokio::test]
async fn unknown_product_is_a_reference_error() {
    let fx = fixture().await;
    let requester = fx.app.customer(fx.user_id);

    let err = fx
        .app
        .state
        .services
        .orders
        .create_order(&requester, order_for(Uuid::new_v4(), 1))
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::ReferenceError(_)));
}

#[tokio::test]
async fn last_unit_goes_to_exactly_one_of_two_buyers() {
    let fx = fixture().await;

    // Drain stock down to one unit.
    let requester = fx.app.customer(fx.user_id);
    fx.app
        .state
        .services
        .orders
        .create_order(&requester, order_for(fx.product_id, 4))
        .await
        .unwrap();

    let service = fx.app.state.services.orders.clone();
    let a = {
        let service = service.clone();
        let requester = fx.app.customer(fx.user_id);
        let product_id = fx.product_id;
        tokio::spawn(async move { service.create_order(&requester, order_for(product_id, 1)).await })
    };
    let b = {
        let requester = fx.app.customer(fx.user_id);
        let product_id = fx.product_id;
        tokio::spawn(async move { service.create_order(&requester, order_for(product_id, 1)).await })
    };

    let (a, b) = (a.await.unwrap(), b.await.unwrap());
    let successes = [&a, &b].iter().filter(|r| r.is_ok()).count();
    assert_eq!(successes, 1, "exactly one of the two orders may win");
    let loser = if a.is_err() { a } else { b };
    assert!(matches!(
        loser.unwrap_err(),
        ServiceError::InsufficientStock(_)
    ));

    let product = fx.app.state.services.products.get(fx.product_id).await.unwrap();
    assert_eq!(product.stock_quantity, 0);
}

#[tokio::test]
async fn status_walks_the_transition_table_only() {
    let fx = fixture().await;
    let requester = fx.app.customer(fx.user_id);
    let admin = fx.app.admin();

    let order = fx
        .app
        .state
        .services
        .orders
        .create_order(&requester, order_for(fx.product_id, 1))
        .await
        .unwrap();

    // pending -> shipped skips confirmation.
    let err = fx
        .app
        .state
        .services
        .orders
        .update_order(
            &admin,
            order.id,
            OrderUpdate {
                status: Some(OrderStatus::Shipped),
                shipping_address: None,
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::InvalidTransition(_)));

    for status in [
        OrderStatus::Confirmed,
        OrderStatus::Shipped,
        OrderStatus::Delivered,
    ] {
        fx.app
            .state
            .services
            .orders
            .update_order(
                &admin,
                order.id,
                OrderUpdate {
                    status: Some(status),
                    shipping_address: None,
                },
            )
            .await
            .expect("legal transition failed");
    }

    // delivered -> pending is dead.
    let err = fx
        .app
        .state
        .services
        .orders
        .update_order(
            &admin,
            order.id,
            OrderUpdate {
                status: Some(OrderStatus::Pending),
                shipping_address: None,
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::InvalidTransition(_)));
}

#[tokio::test]
async fn cancelling_a_pending_order_restocks() {
    let fx = fixture().await;
    let requester = fx.app.customer(fx.user_id);

    let order = fx
        .app
        .state
        .services
        .orders
        .create_order(&requester, order_for(fx.product_id, 2))
        .await
        .unwrap();

    let before = fx.app.state.services.products.get(fx.product_id).await.unwrap();
    assert_eq!(before.stock_quantity, 3);

    let cancelled = fx
        .app
        .state
        .services
        .orders
        .cancel_order(&requester, order.id)
        .await
        .expect("cancellation failed");
    assert_eq!(cancelled.status, OrderStatus::Cancelled);

    let after = fx.app.state.services.products.get(fx.product_id).await.unwrap();
    assert_eq!(after.stock_quantity, 5);
}

#[tokio::test]
async fn orders_are_private_to_their_owner() {
    let fx = fixture().await;
    let owner = fx.app.customer(fx.user_id);
    let stranger = fx.app.customer(Uuid::new_v4());

    let order = fx
        .app
        .state
        .services
        .orders
        .create_order(&owner, order_for(fx.product_id, 1))
        .await
        .unwrap();

    let err = fx
        .app
        .state
        .services
        .orders
        .get_order(&stranger, order.id)
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::Forbidden(_)));

    // Admins see everything.
    let admin_view = fx
        .app
        .state
        .services
        .orders
        .get_order(&fx.app.admin(), order.id)
        .await
        .unwrap();
    assert_eq!(admin_view.id, order.id);
}

#[tokio::test]
async fn shipping_address_frozen_after_shipment() {
    let fx = fixture().await;
    let requester = fx.app.customer(fx.user_id);
    let admin = fx.app.admin();

    let order = fx
        .app
        .state
        .services
        .orders
        .create_order(&requester, order_for(fx.product_id, 1))
        .await
        .unwrap();

    for status in [OrderStatus::Confirmed, OrderStatus::Shipped] {
        fx.app
            .state
            .services
            .orders
            .update_order(
                &admin,
                order.id,
                OrderUpdate {
                    status: Some(status),
                    shipping_address: None,
                },
            )
            .await
            .unwrap();
    }

    let err = fx
        .app
        .state
        .services
        .orders
        .update_order(
            &requester,
            order.id,
            OrderUpdate {
                status: None,
                shipping_address: Some("2 Elm St".to_string()),
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::ValidationError(_)));
}

#[tokio::test]
async fn listing_uses_the_reduced_shape() {
    let fx = fixture().await;
    let requester = fx.app.customer(fx.user_id);

    fx.app
        .state
        .services
        .orders
        .create_order(&requester, order_for(fx.product_id, 1))
        .await
        .unwrap();
    fx.app
        .state
        .services
        .orders
        .create_order(&requester, order_for(fx.product_id, 2))
        .await
        .unwrap();

    let listing = fx
        .app
        .state
        .services
        .orders
        .list_orders_for_user(fx.user_id, 1, 10)
        .await
        .unwrap();

    assert_eq!(listing.total, 2);
    assert_eq!(listing.orders.len(), 2);
    let json = serde_json::to_value(&listing.orders[0]).unwrap();
    assert!(json.get("items").is_none());
    assert!(json.get("shipping_address").is_none());
}
