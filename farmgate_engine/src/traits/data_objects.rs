use serde::Serialize;

use crate::db_types::{Delivery, Order, OrderLine, PaymentTransaction};

/// An order together with its lines, as returned by the atomic order insert.
#[derive(Debug, Clone, Serialize)]
pub struct FullOrder {
    pub order: Order,
    pub lines: Vec<OrderLine>,
}

/// The outcome of applying a webhook-driven settlement to a transaction.
///
/// `was_applied` is false when the transaction had already left `pending` — the caller treats
/// that as an idempotent replay, not an error. `confirmed_order` carries the order iff this
/// settlement is the one that moved it from pending to confirmed.
#[derive(Debug, Clone)]
pub struct SettlementResult {
    pub transaction: PaymentTransaction,
    pub was_applied: bool,
    pub confirmed_order: Option<Order>,
}

/// A delivery update, plus the parent order when the update was the one that marked it delivered.
#[derive(Debug, Clone)]
pub struct DeliverySync {
    pub delivery: Delivery,
    pub synced_order: Option<Order>,
}
