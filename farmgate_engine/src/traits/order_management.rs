use crate::{
    db_types::{NewOrder, NewOrderLine, Order, OrderLine, OrderStatusType},
    fge_api::order_objects::{OrderChangeSet, OrderQueryFilter},
    traits::{FullOrder, StorageError},
};

/// Order persistence. The write paths here carry the inventory-consistency protocol: an order and
/// its stock reservations exist together or not at all.
#[allow(async_fn_in_trait)]
pub trait OrderManagement {
    /// Persist the order header, all its lines and the matching stock reservations as one unit of
    /// work.
    ///
    /// Each line's quantity is re-verified at decrement time inside the transaction. If any
    /// reservation cannot be satisfied (a concurrent order got there first), the whole insert
    /// rolls back and [`StorageError::InsufficientStock`] names the losing product. No partial
    /// order and no partial decrement is ever observable.
    async fn insert_order_with_reservations(
        &self,
        order: NewOrder,
        lines: &[NewOrderLine],
    ) -> Result<FullOrder, StorageError>;

    async fn fetch_order(&self, order_id: i64) -> Result<Option<Order>, StorageError>;

    async fn fetch_order_lines(&self, order_id: i64) -> Result<Vec<OrderLine>, StorageError>;

    /// Fetches orders according to criteria specified in the filter, newest first.
    async fn search_orders(&self, query: OrderQueryFilter) -> Result<Vec<Order>, StorageError>;

    /// Sets the order status. The update only applies while the order is in a non-terminal
    /// state; a concurrent move into `delivered` or `cancelled` surfaces as
    /// [`StorageError::OrderStateConflict`] rather than being overwritten.
    ///
    /// This is the raw setter for fulfilment states. Confirmation, delivery and cancellation
    /// have dedicated methods because they carry side effects.
    async fn update_order_status(&self, order_id: i64, status: OrderStatusType) -> Result<Order, StorageError>;

    /// Partial update of the order's mutable fields (delivery address, notes).
    async fn update_order_fields(&self, order_id: i64, update: OrderChangeSet) -> Result<Order, StorageError>;

    /// Move the order from `pending` to `confirmed` and create its delivery record.
    ///
    /// Returns `None` without touching anything when the order is no longer pending, which lets
    /// replayed payment webhooks pass through as no-ops.
    async fn confirm_order_if_pending(&self, order_id: i64) -> Result<Option<Order>, StorageError>;

    /// Mark the order delivered, stamp the delivery record's `delivered_at` and synchronize its
    /// status, all in one transaction.
    async fn mark_order_delivered(&self, order_id: i64) -> Result<Order, StorageError>;

    /// Cancel the order and return every reserved line quantity to stock, in one transaction.
    /// The release completes before the cancellation is acknowledged to the caller.
    async fn cancel_order_and_release_stock(&self, order_id: i64) -> Result<Order, StorageError>;
}
