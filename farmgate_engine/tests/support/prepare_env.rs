#![allow(dead_code)]
use std::path::Path;

use farmgate_engine::{
    db_types::{NewProduct, NewUser, Product, ProductCategory, Role, User},
    CatalogManagement,
    SqliteDatabase,
    UserManagement,
};
use fgp_common::{Money, Quantity};
use log::*;
use sqlx::{migrate::MigrateDatabase, Sqlite};

pub async fn prepare_test_env(url: &str) {
    dotenvy::from_filename(".env.test").ok();
    let _ = env_logger::try_init();
    debug!("🚀️ Logging initialised");
    create_database(url).await;
    run_migrations(url).await;
}

pub fn random_db_path() -> String {
    format!("sqlite://../data/test_farmgate_{}", rand::random::<u64>())
}

pub async fn run_migrations(url: &str) {
    let db = SqliteDatabase::new_with_url(url, 5).await.expect("Error creating connection to database");
    farmgate_engine::run_migrations(db.pool()).await.expect("Error running DB migrations");
    info!("🚀️ Migrations complete");
}

pub async fn create_database<P: AsRef<Path>>(path: P) {
    let p = path.as_ref().as_os_str().to_str().unwrap();
    if let Err(e) = Sqlite::drop_database(p).await {
        warn!("Error dropping database {p}: {e:?}");
    }
    Sqlite::create_database(p).await.expect("Error creating database");
    info!("Created Sqlite database {p}");
}

pub async fn seed_users(db: &SqliteDatabase) -> (User, User, User) {
    let farmer = db
        .upsert_user(NewUser::new("+998901112233", "Anvar Karimov", Role::Farmer))
        .await
        .expect("Error seeding farmer");
    let shop = db
        .upsert_user(NewUser::new("+998907654321", "Bodomzor Market", Role::Shop))
        .await
        .expect("Error seeding shop");
    let admin = db
        .upsert_user(NewUser::new("+998900000001", "Farmgate Ops", Role::Admin))
        .await
        .expect("Error seeding admin");
    (farmer, shop, admin)
}

pub async fn seed_product(db: &SqliteDatabase, farmer_id: i64, name: &str, price_som: i64, units: i64) -> Product {
    let product = NewProduct::new(farmer_id, name, Money::from_som(price_som), Quantity::from_whole_units(units))
        .with_category(ProductCategory::Vegetables)
        .with_unit("kg");
    db.insert_product(product).await.expect("Error seeding product")
}
