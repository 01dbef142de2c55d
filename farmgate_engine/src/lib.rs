//! Farmgate Marketplace Engine
//!
//! The Farmgate engine is the core of a farm-to-shop marketplace: farmers list produce, shops
//! order it, payments settle through Uzbek payment providers and deliveries carry the goods.
//! This library contains the whole of that logic. It is HTTP-framework agnostic.
//!
//! The library is divided into three main sections:
//! 1. Database management and control ([`mod@sqlite`] and the contracts in `traits`). SQLite is
//!    the supported backend. You should never need to access the database directly; use the
//!    public API instead. The exception is the data types stored in the database, which are
//!    defined in the [`db_types`] module and are public.
//! 2. The engine public API (`fge_api`). This provides the public-facing functionality of the
//!    marketplace: catalog management, order placement and lifecycle, payment initiation and
//!    webhook settlement, and delivery tracking. A backend acts as the engine's store by
//!    implementing the storage traits.
//! 3. The payment provider adapters ([`providers`]). Each supported provider (Payme, Click,
//!    Arca and the development mock) is wrapped in a common adapter interface that builds
//!    checkout sessions and authenticates incoming webhooks.
mod fge_api;
#[cfg(feature = "sqlite")]
mod sqlite;
mod traits;

pub mod db_types;
pub mod providers;

#[cfg(feature = "sqlite")]
pub use sqlite::{db_url, new_pool, run_migrations, SqliteDatabase};
pub use fge_api::{
    catalog_api::CatalogApi,
    catalog_objects,
    delivery_api::DeliveryApi,
    delivery_objects,
    errors::{CatalogApiError, DeliveryApiError, OrderFlowError, PaymentFlowError},
    order_flow_api::OrderFlowApi,
    order_objects,
    payment_flow_api::PaymentFlowApi,
    payment_objects,
};
pub use traits::{
    CatalogManagement,
    DeliveryManagement,
    DeliverySync,
    FullOrder,
    InventoryManagement,
    MarketplaceDatabase,
    OrderManagement,
    PaymentManagement,
    SettlementResult,
    StorageError,
    UserManagement,
};
