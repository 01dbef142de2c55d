use chrono::{DateTime, Utc};
use fgp_common::Quantity;
use serde::{Deserialize, Serialize};

use crate::db_types::OrderStatusType;

/// Limits carried over from the storefront forms.
pub const MAX_DELIVERY_ADDRESS_LEN: usize = 512;
pub const MAX_NOTES_LEN: usize = 1000;

/// One unpriced line of an incoming order request. Pricing is attached during assembly from the
/// product catalog, never taken from the caller.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LineItemRequest {
    pub product_id: i64,
    pub quantity: Quantity,
}

/// An order as requested by a shop: the seller, the lines wanted, and the optional free-text
/// fields.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderRequest {
    pub seller_id: i64,
    pub lines: Vec<LineItemRequest>,
    pub delivery_address: Option<String>,
    pub notes: Option<String>,
}

impl OrderRequest {
    pub fn new(seller_id: i64, lines: Vec<LineItemRequest>) -> Self {
        Self { seller_id, lines, delivery_address: None, notes: None }
    }

    pub fn with_delivery_address<S: Into<String>>(mut self, address: S) -> Self {
        self.delivery_address = Some(address.into());
        self
    }

    pub fn with_notes<S: Into<String>>(mut self, notes: S) -> Self {
        self.notes = Some(notes.into());
        self
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OrderQueryFilter {
    pub shop_id: Option<i64>,
    pub farmer_id: Option<i64>,
    pub since: Option<DateTime<Utc>>,
    pub until: Option<DateTime<Utc>>,
    pub status: Option<Vec<OrderStatusType>>,
}

impl OrderQueryFilter {
    pub fn with_shop_id(mut self, shop_id: i64) -> Self {
        self.shop_id = Some(shop_id);
        self
    }

    pub fn with_farmer_id(mut self, farmer_id: i64) -> Self {
        self.farmer_id = Some(farmer_id);
        self
    }

    pub fn since(mut self, since: DateTime<Utc>) -> Self {
        self.since = Some(since);
        self
    }

    pub fn until(mut self, until: DateTime<Utc>) -> Self {
        self.until = Some(until);
        self
    }

    pub fn with_status(mut self, status: OrderStatusType) -> Self {
        self.status.get_or_insert_with(Vec::new).push(status);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.shop_id.is_none() &&
            self.farmer_id.is_none() &&
            self.status.is_none() &&
            self.since.is_none() &&
            self.until.is_none()
    }
}

/// Partial update of an order's mutable free-text fields. Status changes travel separately
/// because they are role-gated.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OrderChangeSet {
    pub delivery_address: Option<String>,
    pub notes: Option<String>,
}

impl OrderChangeSet {
    pub fn is_empty(&self) -> bool {
        self.delivery_address.is_none() && self.notes.is_none()
    }
}

/// Everything a PATCH on an order may carry: an optional status transition plus the mutable
/// fields. [`crate::fge_api::order_flow_api::OrderFlowApi::amend_order`] checks the caller's
/// rights per part.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OrderAmendment {
    pub status: Option<OrderStatusType>,
    pub delivery_address: Option<String>,
    pub notes: Option<String>,
}

impl OrderAmendment {
    pub fn with_status(mut self, status: OrderStatusType) -> Self {
        self.status = Some(status);
        self
    }

    pub fn with_delivery_address<S: Into<String>>(mut self, address: S) -> Self {
        self.delivery_address = Some(address.into());
        self
    }

    pub fn with_notes<S: Into<String>>(mut self, notes: S) -> Self {
        self.notes = Some(notes.into());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.status.is_none() && self.delivery_address.is_none() && self.notes.is_none()
    }

    /// The field edits, without the status part.
    pub fn change_set(&self) -> OrderChangeSet {
        OrderChangeSet { delivery_address: self.delivery_address.clone(), notes: self.notes.clone() }
    }
}
