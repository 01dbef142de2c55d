use farmgate_engine::{
    catalog_objects::{ProductQueryFilter, ProductUpdate},
    db_types::{NewProduct, NewUser, OrderStatusType, ProductCategory, Role},
    order_objects::{LineItemRequest, OrderAmendment, OrderRequest},
    CatalogApi,
    CatalogApiError,
    MarketplaceDatabase,
    OrderFlowApi,
    SqliteDatabase,
    UserManagement,
};
use fgp_common::{Money, Quantity};
use sqlx::{migrate::MigrateDatabase, Sqlite};
use tokio::runtime::Runtime;

mod support;
use support::prepare_env::{prepare_test_env, random_db_path, seed_product, seed_users};

#[test]
fn listings_are_owner_scoped() {
    let rt = Runtime::new().unwrap();
    rt.block_on(async move {
        let url = random_db_path();
        prepare_test_env(&url).await;
        let mut db = SqliteDatabase::new_with_url(&url, 5).await.expect("Error creating database");
        let (farmer, shop, admin) = seed_users(&db).await;
        let api = CatalogApi::new(db.clone());

        // A farmer always lists under their own account, whatever the request claims.
        let listing = NewProduct::new(admin.id, "Tomatoes", Money::from_som(12_000), Quantity::from_whole_units(20));
        let created = api.create_product(farmer.id, listing).await.expect("Error creating product");
        assert_eq!(created.farmer_id, farmer.id);

        // Shops do not sell.
        let listing = NewProduct::new(shop.id, "Onions", Money::from_som(4_000), Quantity::from_whole_units(5));
        let err = api.create_product(shop.id, listing).await.unwrap_err();
        assert!(matches!(err, CatalogApiError::Forbidden(_)), "got {err}");

        // Admins list on behalf of a farmer, and only a farmer.
        let listing = NewProduct::new(farmer.id, "Garlic", Money::from_som(15_000), Quantity::from_whole_units(3));
        let created = api.create_product(admin.id, listing).await.expect("Error creating for farmer");
        assert_eq!(created.farmer_id, farmer.id);
        let listing = NewProduct::new(shop.id, "Garlic", Money::from_som(15_000), Quantity::from_whole_units(3));
        let err = api.create_product(admin.id, listing).await.unwrap_err();
        assert!(matches!(err, CatalogApiError::NotFound(_)), "got {err}");

        // Field validation.
        let listing = NewProduct::new(farmer.id, "   ", Money::from_som(10), Quantity::from_whole_units(1));
        let err = api.create_product(farmer.id, listing).await.unwrap_err();
        assert!(matches!(err, CatalogApiError::Validation(_)), "got {err}");
        let listing = NewProduct::new(farmer.id, "Dust", Money::from_tiyin(0), Quantity::from_whole_units(1));
        let err = api.create_product(farmer.id, listing).await.unwrap_err();
        assert!(matches!(err, CatalogApiError::Validation(_)), "got {err}");

        // Updates are gated the same way.
        let other_farmer = db
            .upsert_user(NewUser::new("+998905556677", "Dilnoza Rahimova", Role::Farmer))
            .await
            .expect("Error seeding second farmer");
        let reprice = ProductUpdate { price: Some(Money::from_som(13_000)), ..ProductUpdate::default() };
        let err = api.update_product(other_farmer.id, created.id, reprice.clone()).await.unwrap_err();
        assert!(matches!(err, CatalogApiError::Forbidden(_)), "got {err}");
        let updated = api.update_product(farmer.id, created.id, reprice).await.expect("Error updating");
        assert_eq!(updated.price, Money::from_som(13_000));
        let err = api.update_product(farmer.id, created.id, ProductUpdate::default()).await.unwrap_err();
        assert!(matches!(err, CatalogApiError::Validation(_)), "got {err}");

        db.close().await.expect("Error closing database");
        Sqlite::drop_database(&url).await.unwrap();
    });
}

#[test]
fn search_filters_compose() {
    let rt = Runtime::new().unwrap();
    rt.block_on(async move {
        let url = random_db_path();
        prepare_test_env(&url).await;
        let mut db = SqliteDatabase::new_with_url(&url, 5).await.expect("Error creating database");
        let (farmer, _shop, _admin) = seed_users(&db).await;
        let other_farmer = db
            .upsert_user(NewUser::new("+998905556677", "Dilnoza Rahimova", Role::Farmer))
            .await
            .expect("Error seeding second farmer");
        let api = CatalogApi::new(db.clone());

        let tomatoes = seed_product(&db, farmer.id, "Tomatoes", 12_000, 20).await;
        seed_product(&db, farmer.id, "Cherry Tomatoes", 19_000, 6).await;
        seed_product(&db, other_farmer.id, "Apples", 9_000, 40).await;
        let dairy = NewProduct::new(farmer.id, "Kefir", Money::from_som(8_000), Quantity::from_whole_units(30))
            .with_category(ProductCategory::Dairy)
            .with_unit("l");
        api.create_product(farmer.id, dairy).await.expect("Error creating dairy product");

        let everything = api.search(ProductQueryFilter::default()).await.expect("Error searching");
        assert_eq!(everything.len(), 4);

        let mine = api.search(ProductQueryFilter::default().with_farmer_id(farmer.id)).await.unwrap();
        assert_eq!(mine.len(), 3);

        let tomato_like = api.search(ProductQueryFilter::default().with_name_like("tomat")).await.unwrap();
        assert_eq!(tomato_like.len(), 2);

        let dairy_only =
            api.search(ProductQueryFilter::default().with_category(ProductCategory::Dairy)).await.unwrap();
        assert_eq!(dairy_only.len(), 1);
        assert_eq!(dairy_only[0].name, "Kefir");

        // Retired products drop out of the public listing but stay addressable.
        let retire = ProductUpdate { is_active: Some(false), ..ProductUpdate::default() };
        api.update_product(farmer.id, tomatoes.id, retire).await.expect("Error retiring");
        let active = api.search(ProductQueryFilter::active()).await.unwrap();
        assert_eq!(active.len(), 3);
        assert!(active.iter().all(|p| p.id != tomatoes.id));
        let fetched = api.fetch_product(tomatoes.id).await.expect("Retired product must stay fetchable");
        assert!(!fetched.is_active);

        db.close().await.expect("Error closing database");
        Sqlite::drop_database(&url).await.unwrap();
    });
}

#[test]
fn removal_respects_order_history() {
    let rt = Runtime::new().unwrap();
    rt.block_on(async move {
        let url = random_db_path();
        prepare_test_env(&url).await;
        let mut db = SqliteDatabase::new_with_url(&url, 5).await.expect("Error creating database");
        let (farmer, shop, _admin) = seed_users(&db).await;
        let carrots = seed_product(&db, farmer.id, "Carrots", 3_500, 10).await;
        let onions = seed_product(&db, farmer.id, "Onions", 2_000, 10).await;
        let catalog = CatalogApi::new(db.clone());
        let orders = OrderFlowApi::new(db.clone());

        let request = OrderRequest::new(farmer.id, vec![LineItemRequest {
            product_id: carrots.id,
            quantity: Quantity::from_whole_units(2),
        }]);
        let placed = orders.place_order(shop.id, request).await.expect("Error placing order");

        // An open order pins the product.
        let err = catalog.delete_product(farmer.id, carrots.id).await.unwrap_err();
        assert!(matches!(err, CatalogApiError::ProductInUse(id) if id == carrots.id), "got {err}");

        // Once the order closes, removal retires the product instead of breaking history.
        orders
            .amend_order(farmer.id, placed.order.id, OrderAmendment::default().with_status(OrderStatusType::Delivered))
            .await
            .expect("Error delivering order");
        catalog.delete_product(farmer.id, carrots.id).await.expect("Error removing ordered product");
        let retired = catalog.fetch_product(carrots.id).await.expect("Referenced product must survive removal");
        assert!(!retired.is_active);

        // A product nothing ever referenced disappears for real.
        catalog.delete_product(farmer.id, onions.id).await.expect("Error removing unused product");
        let err = catalog.fetch_product(onions.id).await.unwrap_err();
        assert!(matches!(err, CatalogApiError::NotFound(_)), "got {err}");

        db.close().await.expect("Error closing database");
        Sqlite::drop_database(&url).await.unwrap();
    });
}
