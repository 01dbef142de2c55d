use crate::{
    db_types::Delivery,
    fge_api::delivery_objects::DeliveryUpdate,
    traits::{DeliverySync, StorageError},
};

/// The delivery record attached to each confirmed order. Rows are created by the order
/// confirmation path, never directly by callers.
#[allow(async_fn_in_trait)]
pub trait DeliveryManagement {
    async fn fetch_delivery_for_order(&self, order_id: i64) -> Result<Option<Delivery>, StorageError>;

    /// Partial update of the delivery. When the update moves the status to `delivered` for the
    /// first time, `delivered_at` is stamped and the parent order is synchronized to `delivered`
    /// in the same transaction; the synced order is returned alongside the delivery.
    async fn update_delivery(&self, order_id: i64, update: DeliveryUpdate) -> Result<DeliverySync, StorageError>;
}
