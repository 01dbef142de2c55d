use fgp_common::Quantity;
use thiserror::Error;

use crate::db_types::{OrderStatusType, TransactionStatusType};

/// Error type shared by all the storage traits.
///
/// The variants that carry entity ids surface to API callers as 4xx responses, so their display
/// strings name the offending resource in plain language. Driver-level failures collapse into
/// [`StorageError::DatabaseError`] and are never shown to end users verbatim.
#[derive(Debug, Clone, Error)]
pub enum StorageError {
    #[error("We have an internal database error (configuration/uptime etc.): {0}")]
    DatabaseError(String),
    #[error("User {0} does not exist")]
    UserNotFound(i64),
    #[error("Product {0} does not exist")]
    ProductNotFound(i64),
    #[error("Order {0} does not exist")]
    OrderNotFound(i64),
    #[error("Transaction {0} does not exist")]
    TransactionNotFound(i64),
    #[error("No delivery exists for order {0}")]
    DeliveryNotFound(i64),
    #[error("Insufficient stock for product {product_id}: requested {requested}, available {available}")]
    InsufficientStock { product_id: i64, requested: Quantity, available: Quantity },
    #[error("Order {0} already has a pending payment transaction")]
    DuplicatePendingTransaction(i64),
    #[error("Product {0} is referenced by open orders and cannot be deleted")]
    ProductHasOpenOrders(i64),
    #[error("Order {id} is {current} and cannot become {requested}")]
    OrderStateConflict { id: i64, current: OrderStatusType, requested: OrderStatusType },
    #[error("Transaction {id} is {current} and cannot become {requested}")]
    TransactionStateConflict { id: i64, current: TransactionStatusType, requested: TransactionStatusType },
}

impl From<sqlx::Error> for StorageError {
    fn from(e: sqlx::Error) -> Self {
        StorageError::DatabaseError(e.to_string())
    }
}
