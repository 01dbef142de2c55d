use std::sync::Arc;

use farmgate_engine::{
    db_types::OrderStatusType,
    order_objects::{LineItemRequest, OrderAmendment, OrderRequest},
    CatalogManagement,
    MarketplaceDatabase,
    OrderFlowApi,
    OrderFlowError,
    SqliteDatabase,
};
use fgp_common::Quantity;
use log::*;
use sqlx::{migrate::MigrateDatabase, Sqlite};
use tokio::runtime::Runtime;

mod support;
use support::prepare_env::{prepare_test_env, random_db_path, seed_product, seed_users};

const NUM_BUYERS: i64 = 20;
const STOCK_UNITS: i64 = 10;

#[test]
fn concurrent_orders_never_oversell() {
    let rt = Runtime::new().unwrap();
    rt.block_on(async move {
        let url = random_db_path();
        prepare_test_env(&url).await;
        let mut db = SqliteDatabase::new_with_url(&url, 5).await.expect("Error creating database");
        let (farmer, shop, _admin) = seed_users(&db).await;
        let product = seed_product(&db, farmer.id, "Tomatoes", 12_000, STOCK_UNITS).await;
        let api = Arc::new(OrderFlowApi::new(db.clone()));

        info!("🛒️ Injecting {NUM_BUYERS} concurrent single-unit orders against {STOCK_UNITS} units of stock");
        let mut handles = Vec::with_capacity(NUM_BUYERS as usize);
        for _ in 0..NUM_BUYERS {
            let api = Arc::clone(&api);
            let request = OrderRequest::new(farmer.id, vec![LineItemRequest {
                product_id: product.id,
                quantity: Quantity::from_whole_units(1),
            }]);
            let shop_id = shop.id;
            handles.push(tokio::spawn(async move { api.place_order(shop_id, request).await }));
        }

        let mut placed = 0i64;
        for handle in handles {
            match handle.await.expect("Order task panicked") {
                Ok(_) => placed += 1,
                Err(OrderFlowError::InsufficientStock { .. }) => {},
                Err(e) => panic!("Unexpected error placing order: {e}"),
            }
        }
        assert_eq!(placed, STOCK_UNITS, "exactly the available stock must be sold");

        let product =
            db.fetch_product(product.id).await.expect("Error fetching product").expect("Product disappeared");
        assert_eq!(product.quantity, Quantity::ZERO);

        db.close().await.expect("Error closing database");
        Sqlite::drop_database(&url).await.unwrap();
    });
    info!("🛒️ burst reservation test complete");
}

#[test]
fn cancelling_an_order_releases_its_reservations() {
    let rt = Runtime::new().unwrap();
    rt.block_on(async move {
        let url = random_db_path();
        prepare_test_env(&url).await;
        let mut db = SqliteDatabase::new_with_url(&url, 5).await.expect("Error creating database");
        let (farmer, shop, _admin) = seed_users(&db).await;
        let carrots = seed_product(&db, farmer.id, "Carrots", 3_500, 10).await;
        let potatoes = seed_product(&db, farmer.id, "Potatoes", 2_800, 8).await;
        let api = OrderFlowApi::new(db.clone());

        let request = OrderRequest::new(farmer.id, vec![
            LineItemRequest { product_id: carrots.id, quantity: "2.50".parse().unwrap() },
            LineItemRequest { product_id: potatoes.id, quantity: Quantity::from_whole_units(3) },
        ]);
        let placed = api.place_order(shop.id, request).await.expect("Error placing order");
        let stock = |id| {
            let db = db.clone();
            async move { db.fetch_product(id).await.expect("Error fetching product").expect("No product").quantity }
        };
        assert_eq!(stock(carrots.id).await, "7.50".parse().unwrap());
        assert_eq!(stock(potatoes.id).await, Quantity::from_whole_units(5));

        let cancelled = api
            .amend_order(shop.id, placed.order.id, OrderAmendment::default().with_status(OrderStatusType::Cancelled))
            .await
            .expect("Error cancelling order");
        assert_eq!(cancelled.status, OrderStatusType::Cancelled);
        assert_eq!(stock(carrots.id).await, Quantity::from_whole_units(10));
        assert_eq!(stock(potatoes.id).await, Quantity::from_whole_units(8));

        // A second cancellation must not release anything again
        let err = api
            .amend_order(shop.id, placed.order.id, OrderAmendment::default().with_status(OrderStatusType::Cancelled))
            .await
            .expect_err("Cancelling a cancelled order should fail");
        assert!(matches!(err, OrderFlowError::InvalidTransition { .. }), "got {err}");
        assert_eq!(stock(carrots.id).await, Quantity::from_whole_units(10));
        assert_eq!(stock(potatoes.id).await, Quantity::from_whole_units(8));

        db.close().await.expect("Error closing database");
        Sqlite::drop_database(&url).await.unwrap();
    });
}

#[test]
fn failed_reservation_rolls_back_the_whole_order() {
    let rt = Runtime::new().unwrap();
    rt.block_on(async move {
        let url = random_db_path();
        prepare_test_env(&url).await;
        let mut db = SqliteDatabase::new_with_url(&url, 5).await.expect("Error creating database");
        let (farmer, shop, _admin) = seed_users(&db).await;
        let carrots = seed_product(&db, farmer.id, "Carrots", 3_500, 10).await;
        let api = OrderFlowApi::new(db.clone());

        // Two lines of the same product pass per-line validation (each sees 10 in stock) but the
        // second reservation must fail inside the write transaction and revert the first one.
        let request = OrderRequest::new(farmer.id, vec![
            LineItemRequest { product_id: carrots.id, quantity: Quantity::from_whole_units(6) },
            LineItemRequest { product_id: carrots.id, quantity: Quantity::from_whole_units(6) },
        ]);
        let err = api.place_order(shop.id, request).await.expect_err("Order should not fit the stock");
        match err {
            OrderFlowError::InsufficientStock { product, requested, available } => {
                assert_eq!(product, "Carrots");
                assert_eq!(requested, Quantity::from_whole_units(6));
                assert_eq!(available, Quantity::from_whole_units(4));
            },
            other => panic!("Expected an insufficient stock error, got {other}"),
        }

        let carrots =
            db.fetch_product(carrots.id).await.expect("Error fetching product").expect("Product disappeared");
        assert_eq!(carrots.quantity, Quantity::from_whole_units(10), "the partial reservation must be rolled back");
        let orders = api.orders_for_actor(shop.id, None).await.expect("Error listing orders");
        assert!(orders.is_empty(), "no order header may survive a failed reservation");

        db.close().await.expect("Error closing database");
        Sqlite::drop_database(&url).await.unwrap();
    });
}
