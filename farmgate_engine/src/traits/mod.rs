//! # Storage backend contracts.
//!
//! This module defines the interface contracts that a database backend must implement to power the
//! marketplace engine. The engine's flow APIs are generic over these traits, so a backend swap
//! (SQLite today, Postgres tomorrow) never touches flow logic.
//!
//! ## Traits
//!
//! * [`InventoryManagement`] owns the per-product stock count and the atomic reserve/release
//!   operations that keep it consistent under concurrent orders.
//! * [`OrderManagement`] persists orders and their lines, always as one unit of work with the
//!   stock reservations they imply.
//! * [`PaymentManagement`] persists payment transactions and applies the guarded status
//!   transitions that webhooks drive.
//! * [`CatalogManagement`] is the farmer-facing product store.
//! * [`UserManagement`] looks up and seeds marketplace users.
//! * [`DeliveryManagement`] tracks the delivery record attached to each confirmed order.
//! * [`MarketplaceDatabase`] is the umbrella trait the server binds against.
mod catalog_management;
mod data_objects;
mod delivery_management;
mod inventory_management;
mod marketplace_database;
mod order_management;
mod payment_management;
mod storage_error;
mod user_management;

pub use catalog_management::CatalogManagement;
pub use data_objects::{DeliverySync, FullOrder, SettlementResult};
pub use delivery_management::DeliveryManagement;
pub use inventory_management::InventoryManagement;
pub use marketplace_database::MarketplaceDatabase;
pub use order_management::OrderManagement;
pub use payment_management::PaymentManagement;
pub use storage_error::StorageError;
pub use user_management::UserManagement;
