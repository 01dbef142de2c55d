use farmgate_engine::{
    db_types::{DeliveryStatusType, NewUser, OrderStatusType, Role},
    delivery_objects::DeliveryUpdate,
    order_objects::{LineItemRequest, OrderAmendment, OrderRequest},
    DeliveryApi,
    DeliveryApiError,
    MarketplaceDatabase,
    OrderFlowApi,
    OrderManagement,
    SqliteDatabase,
    UserManagement,
};
use fgp_common::Quantity;
use sqlx::{migrate::MigrateDatabase, Sqlite};
use tokio::runtime::Runtime;

mod support;
use support::prepare_env::{prepare_test_env, random_db_path, seed_product, seed_users};

#[test]
fn delivery_record_tracks_the_shipment() {
    let rt = Runtime::new().unwrap();
    rt.block_on(async move {
        let url = random_db_path();
        prepare_test_env(&url).await;
        let mut db = SqliteDatabase::new_with_url(&url, 5).await.expect("Error creating database");
        let (farmer, shop, admin) = seed_users(&db).await;
        let onions = seed_product(&db, farmer.id, "Onions", 2_000, 25).await;
        let orders = OrderFlowApi::new(db.clone());
        let deliveries = DeliveryApi::new(db.clone());

        let request = OrderRequest::new(farmer.id, vec![LineItemRequest {
            product_id: onions.id,
            quantity: Quantity::from_whole_units(10),
        }])
        .with_delivery_address("45 Chilonzor Avenue, Tashkent");
        let placed = orders.place_order(shop.id, request).await.expect("Error placing order");
        let order_id = placed.order.id;

        // No confirmation, no delivery record yet.
        let err = deliveries.delivery_for_order(shop.id, order_id).await.unwrap_err();
        assert!(matches!(err, DeliveryApiError::NotFound(_)), "got {err}");

        orders
            .amend_order(farmer.id, order_id, OrderAmendment::default().with_status(OrderStatusType::Confirmed))
            .await
            .expect("Error confirming order");
        let delivery = deliveries.delivery_for_order(shop.id, order_id).await.expect("Error fetching delivery");
        assert_eq!(delivery.status, DeliveryStatusType::Pending);
        assert_eq!(delivery.delivery_address.as_deref(), Some("45 Chilonzor Avenue, Tashkent"));

        // Both participants and admins can read it; bystanders cannot.
        deliveries.delivery_for_order(farmer.id, order_id).await.expect("Seller should see the delivery");
        deliveries.delivery_for_order(admin.id, order_id).await.expect("Admin should see the delivery");
        let bystander = db
            .upsert_user(NewUser::new("+998903334455", "Yunusobod Market", Role::Shop))
            .await
            .expect("Error seeding bystander");
        let err = deliveries.delivery_for_order(bystander.id, order_id).await.unwrap_err();
        assert!(matches!(err, DeliveryApiError::Forbidden(_)), "got {err}");

        // Only operations staff drive the courier states.
        let assign = DeliveryUpdate {
            status: Some(DeliveryStatusType::Assigned),
            courier_name: Some("Botir Ergashev".to_string()),
            courier_phone: Some("+998933217788".to_string()),
            tracking_number: Some("FG-2026-00917".to_string()),
            ..DeliveryUpdate::default()
        };
        let err = deliveries.update_delivery(shop.id, order_id, assign.clone()).await.unwrap_err();
        assert!(matches!(err, DeliveryApiError::Forbidden(_)), "got {err}");
        let err = deliveries.update_delivery(admin.id, order_id, DeliveryUpdate::default()).await.unwrap_err();
        assert!(matches!(err, DeliveryApiError::Validation(_)), "got {err}");

        let sync = deliveries.update_delivery(admin.id, order_id, assign).await.expect("Error assigning courier");
        assert_eq!(sync.delivery.status, DeliveryStatusType::Assigned);
        assert_eq!(sync.delivery.courier_name.as_deref(), Some("Botir Ergashev"));
        assert!(sync.synced_order.is_none());

        let sync = deliveries
            .update_delivery(admin.id, order_id, DeliveryUpdate::default().with_status(DeliveryStatusType::InTransit))
            .await
            .expect("Error moving to in_transit");
        assert_eq!(sync.delivery.status, DeliveryStatusType::InTransit);
        assert!(sync.delivery.delivered_at.is_none());

        db.close().await.expect("Error closing database");
        Sqlite::drop_database(&url).await.unwrap();
    });
}

#[test]
fn completing_a_delivery_synchronizes_the_order() {
    let rt = Runtime::new().unwrap();
    rt.block_on(async move {
        let url = random_db_path();
        prepare_test_env(&url).await;
        let mut db = SqliteDatabase::new_with_url(&url, 5).await.expect("Error creating database");
        let (farmer, shop, admin) = seed_users(&db).await;
        let plums = seed_product(&db, farmer.id, "Plums", 14_000, 18).await;
        let orders = OrderFlowApi::new(db.clone());
        let deliveries = DeliveryApi::new(db.clone());

        let request = OrderRequest::new(farmer.id, vec![LineItemRequest {
            product_id: plums.id,
            quantity: Quantity::from_whole_units(6),
        }]);
        let placed = orders.place_order(shop.id, request).await.expect("Error placing order");
        let order_id = placed.order.id;
        orders
            .amend_order(farmer.id, order_id, OrderAmendment::default().with_status(OrderStatusType::Confirmed))
            .await
            .expect("Error confirming order");

        let sync = deliveries
            .update_delivery(admin.id, order_id, DeliveryUpdate::default().with_status(DeliveryStatusType::Delivered))
            .await
            .expect("Error completing delivery");
        assert_eq!(sync.delivery.status, DeliveryStatusType::Delivered);
        let stamped_at = sync.delivery.delivered_at.expect("Completion must be stamped");
        let order = sync.synced_order.expect("Completion must synchronize the order");
        assert_eq!(order.status, OrderStatusType::Delivered);

        // Reporting completion again neither re-stamps nor re-syncs.
        let sync = deliveries
            .update_delivery(admin.id, order_id, DeliveryUpdate::default().with_status(DeliveryStatusType::Delivered))
            .await
            .expect("Error repeating completion");
        assert_eq!(sync.delivery.delivered_at, Some(stamped_at));
        assert!(sync.synced_order.is_none());
        let order = db.fetch_order(order_id).await.expect("Error fetching order").expect("Order disappeared");
        assert_eq!(order.status, OrderStatusType::Delivered);

        db.close().await.expect("Error closing database");
        Sqlite::drop_database(&url).await.unwrap();
    });
}
