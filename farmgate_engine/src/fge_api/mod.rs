//! # Farmgate engine public API
//!
//! The `fge_api` module exposes the programmatic API for the Farmgate marketplace engine.
//! The API is modular, so that clients can pick and choose the functionality they want, and
//! different parts (e.g. the catalog and the payment flows) could be hosted on different machines.
//!
//! * [`catalog_api`] manages the product catalog: creation, search, updates and retirement.
//! * [`order_flow_api`] is the primary API for placing orders against farmer stock and moving
//!   them through their lifecycle.
//! * [`payment_flow_api`] initiates payment sessions with the configured providers, ingests
//!   their webhooks and applies the resulting settlements.
//! * [`delivery_api`] tracks the delivery record that accompanies every confirmed order.
//!
//! The other submodules hold the request, filter and error types those APIs exchange.
//!
//! # API usage
//!
//! The pattern for using all the APIs is the same. An API instance is created by supplying a
//! database backend that implements the specific backend traits required by the API.
//!
//! For example, to look up an order:
//!
//! ```rust,ignore
//! use farmgate_engine::{OrderFlowApi, SqliteDatabase};
//! let db = SqliteDatabase::new_with_url("sqlite://data/farmgate.db", 25).await?;
//! // SqliteDatabase implements UserManagement + CatalogManagement + OrderManagement
//! let api = OrderFlowApi::new(db);
//! let order = api.fetch_visible_order(shop_id, order_id).await?;
//! ```

pub mod catalog_api;
pub mod catalog_objects;
pub mod delivery_api;
pub mod delivery_objects;
pub mod errors;
pub mod order_flow_api;
pub mod order_objects;
pub mod payment_flow_api;
pub mod payment_objects;
