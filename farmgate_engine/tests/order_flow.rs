use farmgate_engine::{
    catalog_objects::ProductUpdate,
    db_types::{NewUser, OrderStatusType, Role},
    order_objects::{LineItemRequest, OrderAmendment, OrderRequest},
    CatalogApi,
    DeliveryManagement,
    MarketplaceDatabase,
    OrderFlowApi,
    OrderFlowError,
    SqliteDatabase,
    UserManagement,
};
use fgp_common::{Money, Quantity};
use sqlx::{migrate::MigrateDatabase, Sqlite};
use tokio::runtime::Runtime;

mod support;
use support::prepare_env::{prepare_test_env, random_db_path, seed_product, seed_users};

async fn setup(url: &str) -> SqliteDatabase {
    prepare_test_env(url).await;
    SqliteDatabase::new_with_url(url, 5).await.expect("Error creating database")
}

async fn tear_down(mut db: SqliteDatabase, url: &str) {
    db.close().await.expect("Error closing database");
    Sqlite::drop_database(url).await.unwrap();
}

#[test]
fn order_totals_are_frozen_at_placement_time() {
    let rt = Runtime::new().unwrap();
    rt.block_on(async move {
        let url = random_db_path();
        let db = setup(&url).await;
        let (farmer, shop, _admin) = seed_users(&db).await;
        let tomatoes = seed_product(&db, farmer.id, "Tomatoes", 12_000, 20).await;
        let orders = OrderFlowApi::new(db.clone());
        let catalog = CatalogApi::new(db.clone());

        let request = OrderRequest::new(farmer.id, vec![LineItemRequest {
            product_id: tomatoes.id,
            quantity: "2.50".parse().unwrap(),
        }]);
        let placed = orders.place_order(shop.id, request.clone()).await.expect("Error placing order");
        assert_eq!(placed.order.total_amount, Money::from_som(30_000));
        assert_eq!(placed.lines[0].unit_price, Money::from_som(12_000));

        // The farmer raises the price afterwards. The stored order must not move.
        let update = ProductUpdate { price: Some(Money::from_som(15_000)), ..ProductUpdate::default() };
        catalog.update_product(farmer.id, tomatoes.id, update).await.expect("Error updating price");

        let fetched = orders.fetch_full_order(shop.id, placed.order.id).await.expect("Error fetching order");
        assert_eq!(fetched.order.total_amount, Money::from_som(30_000));
        assert_eq!(fetched.lines[0].unit_price, Money::from_som(12_000));

        // A fresh order sees the new price.
        let second = orders.place_order(shop.id, request).await.expect("Error placing second order");
        assert_eq!(second.order.total_amount, Money::from_som(37_500));

        tear_down(db, &url).await;
    });
}

#[test]
fn order_requests_are_validated_before_any_write() {
    let rt = Runtime::new().unwrap();
    rt.block_on(async move {
        let url = random_db_path();
        let db = setup(&url).await;
        let (farmer, shop, _admin) = seed_users(&db).await;
        let other_farmer = db
            .upsert_user(NewUser::new("+998905556677", "Dilnoza Rahimova", Role::Farmer))
            .await
            .expect("Error seeding second farmer");
        let tomatoes = seed_product(&db, farmer.id, "Tomatoes", 12_000, 20).await;
        let api = OrderFlowApi::new(db.clone());
        let one_tomato_line =
            || vec![LineItemRequest { product_id: tomatoes.id, quantity: Quantity::from_whole_units(1) }];

        // Farmers do not buy.
        let err = api.place_order(farmer.id, OrderRequest::new(farmer.id, one_tomato_line())).await.unwrap_err();
        assert!(matches!(err, OrderFlowError::Forbidden(_)), "got {err}");

        // The seller must be a farmer that exists.
        let err = api.place_order(shop.id, OrderRequest::new(999, one_tomato_line())).await.unwrap_err();
        assert!(matches!(err, OrderFlowError::NotFound(_)), "got {err}");
        let err = api.place_order(shop.id, OrderRequest::new(shop.id, one_tomato_line())).await.unwrap_err();
        assert!(matches!(err, OrderFlowError::NotFound(_)), "got {err}");

        // No lines, no order.
        let err = api.place_order(shop.id, OrderRequest::new(farmer.id, vec![])).await.unwrap_err();
        assert!(matches!(err, OrderFlowError::Validation(_)), "got {err}");

        // Zero and negative quantities are refused.
        let zero = vec![LineItemRequest { product_id: tomatoes.id, quantity: Quantity::ZERO }];
        let err = api.place_order(shop.id, OrderRequest::new(farmer.id, zero)).await.unwrap_err();
        assert!(matches!(err, OrderFlowError::Validation(_)), "got {err}");

        // Unknown product.
        let missing = vec![LineItemRequest { product_id: 404, quantity: Quantity::from_whole_units(1) }];
        let err = api.place_order(shop.id, OrderRequest::new(farmer.id, missing)).await.unwrap_err();
        assert!(matches!(err, OrderFlowError::NotFound(_)), "got {err}");

        // A line must belong to the seller named on the order.
        let err =
            api.place_order(shop.id, OrderRequest::new(other_farmer.id, one_tomato_line())).await.unwrap_err();
        assert!(matches!(err, OrderFlowError::Validation(_)), "got {err}");

        // Free-text fields are length-capped.
        let request = OrderRequest::new(farmer.id, one_tomato_line()).with_notes("x".repeat(1001));
        let err = api.place_order(shop.id, request).await.unwrap_err();
        assert!(matches!(err, OrderFlowError::Validation(_)), "got {err}");

        // Inactive products cannot be ordered.
        let catalog = CatalogApi::new(db.clone());
        let retire = ProductUpdate { is_active: Some(false), ..ProductUpdate::default() };
        catalog.update_product(farmer.id, tomatoes.id, retire).await.expect("Error retiring product");
        let err = api.place_order(shop.id, OrderRequest::new(farmer.id, one_tomato_line())).await.unwrap_err();
        assert!(matches!(err, OrderFlowError::Validation(_)), "got {err}");

        // None of the rejected requests left an order behind.
        let orders = api.orders_for_actor(shop.id, None).await.expect("Error listing orders");
        assert!(orders.is_empty());

        tear_down(db, &url).await;
    });
}

#[test]
fn lifecycle_transitions_are_role_gated() {
    let rt = Runtime::new().unwrap();
    rt.block_on(async move {
        let url = random_db_path();
        let db = setup(&url).await;
        let (farmer, shop, _admin) = seed_users(&db).await;
        let apples = seed_product(&db, farmer.id, "Apples", 9_000, 50).await;
        let api = OrderFlowApi::new(db.clone());

        let request = OrderRequest::new(farmer.id, vec![LineItemRequest {
            product_id: apples.id,
            quantity: Quantity::from_whole_units(5),
        }])
        .with_delivery_address("12 Bodomzor Street, Tashkent");
        let placed = api.place_order(shop.id, request).await.expect("Error placing order");
        let order_id = placed.order.id;
        let set_status = |actor: i64, status: OrderStatusType| {
            let api = OrderFlowApi::new(db.clone());
            async move { api.amend_order(actor, order_id, OrderAmendment::default().with_status(status)).await }
        };

        // The buyer cannot confirm its own order.
        let err = set_status(shop.id, OrderStatusType::Confirmed).await.unwrap_err();
        assert!(matches!(err, OrderFlowError::Forbidden(_)), "got {err}");

        // The farmer confirms; a delivery record appears with it.
        let confirmed = set_status(farmer.id, OrderStatusType::Confirmed).await.expect("Error confirming");
        assert_eq!(confirmed.status, OrderStatusType::Confirmed);
        let delivery = db.fetch_delivery_for_order(order_id).await.expect("Error fetching delivery");
        assert!(delivery.is_some(), "confirmation must create the delivery record");

        // Jumping backwards or re-confirming is refused.
        let err = set_status(farmer.id, OrderStatusType::Confirmed).await.unwrap_err();
        assert!(matches!(err, OrderFlowError::InvalidTransition { .. }), "got {err}");

        // Progress is the seller's (or an admin's) business.
        let err = set_status(shop.id, OrderStatusType::Shipped).await.unwrap_err();
        assert!(matches!(err, OrderFlowError::Forbidden(_)), "got {err}");
        set_status(farmer.id, OrderStatusType::Processing).await.expect("Error moving to processing");
        set_status(farmer.id, OrderStatusType::Shipped).await.expect("Error moving to shipped");

        // Once shipped, the buyer may no longer cancel.
        let err = set_status(shop.id, OrderStatusType::Cancelled).await.unwrap_err();
        assert!(matches!(err, OrderFlowError::Forbidden(_)), "got {err}");

        let delivered = set_status(farmer.id, OrderStatusType::Delivered).await.expect("Error delivering");
        assert_eq!(delivered.status, OrderStatusType::Delivered);
        let delivery = db
            .fetch_delivery_for_order(order_id)
            .await
            .expect("Error fetching delivery")
            .expect("Delivery disappeared");
        assert!(delivery.delivered_at.is_some(), "delivery completion must be stamped");

        // Terminal means terminal, for status changes and field edits alike.
        let err = set_status(farmer.id, OrderStatusType::Processing).await.unwrap_err();
        assert!(matches!(err, OrderFlowError::InvalidTransition { .. }), "got {err}");
        let err = api
            .amend_order(shop.id, order_id, OrderAmendment::default().with_notes("too late"))
            .await
            .unwrap_err();
        assert!(matches!(err, OrderFlowError::Validation(_)), "got {err}");

        tear_down(db, &url).await;
    });
}
