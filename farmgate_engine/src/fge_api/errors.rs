//! Error types for the flow APIs.
//!
//! Each flow has its own error enum so the server can map variants onto HTTP statuses without
//! inspecting strings. The `From<StorageError>` impls collapse the storage taxonomy into the
//! flow taxonomy; driver-level failures stay internal and are never shown to end users verbatim.

use thiserror::Error;

use crate::{
    db_types::{OrderStatusType, TransactionStatusType},
    providers::ProviderError,
    traits::StorageError,
};
use fgp_common::Quantity;

#[derive(Debug, Clone, Error)]
pub enum OrderFlowError {
    #[error("{0}")]
    Validation(String),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Forbidden(String),
    #[error("Insufficient stock for {product}: requested {requested}, available {available}")]
    InsufficientStock { product: String, requested: Quantity, available: Quantity },
    #[error("The order is {from} and cannot become {to}")]
    InvalidTransition { from: OrderStatusType, to: OrderStatusType },
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<StorageError> for OrderFlowError {
    fn from(e: StorageError) -> Self {
        match e {
            StorageError::UserNotFound(id) => OrderFlowError::NotFound(format!("User {id} does not exist")),
            StorageError::ProductNotFound(id) => OrderFlowError::NotFound(format!("Product {id} does not exist")),
            StorageError::OrderNotFound(id) => OrderFlowError::NotFound(format!("Order {id} does not exist")),
            StorageError::InsufficientStock { product_id, requested, available } => {
                OrderFlowError::InsufficientStock { product: format!("product {product_id}"), requested, available }
            },
            StorageError::OrderStateConflict { current, requested, .. } => {
                OrderFlowError::InvalidTransition { from: current, to: requested }
            },
            other => OrderFlowError::Internal(other.to_string()),
        }
    }
}

#[derive(Debug, Clone, Error)]
pub enum CatalogApiError {
    #[error("{0}")]
    Validation(String),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Forbidden(String),
    #[error("Product {0} is referenced by open orders and cannot be deleted")]
    ProductInUse(i64),
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<StorageError> for CatalogApiError {
    fn from(e: StorageError) -> Self {
        match e {
            StorageError::UserNotFound(id) => CatalogApiError::NotFound(format!("User {id} does not exist")),
            StorageError::ProductNotFound(id) => CatalogApiError::NotFound(format!("Product {id} does not exist")),
            StorageError::ProductHasOpenOrders(id) => CatalogApiError::ProductInUse(id),
            other => CatalogApiError::Internal(other.to_string()),
        }
    }
}

#[derive(Debug, Clone, Error)]
pub enum PaymentFlowError {
    #[error("{0}")]
    Validation(String),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Forbidden(String),
    #[error("Order {0} already has a pending payment transaction")]
    AlreadyInitiated(i64),
    #[error("The transaction is {from} and cannot become {to}")]
    InvalidTransition { from: TransactionStatusType, to: TransactionStatusType },
    #[error(transparent)]
    Provider(#[from] ProviderError),
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<StorageError> for PaymentFlowError {
    fn from(e: StorageError) -> Self {
        match e {
            StorageError::UserNotFound(id) => PaymentFlowError::NotFound(format!("User {id} does not exist")),
            StorageError::OrderNotFound(id) => PaymentFlowError::NotFound(format!("Order {id} does not exist")),
            StorageError::TransactionNotFound(id) => {
                PaymentFlowError::NotFound(format!("Transaction {id} does not exist"))
            },
            StorageError::DuplicatePendingTransaction(order_id) => PaymentFlowError::AlreadyInitiated(order_id),
            StorageError::TransactionStateConflict { current, requested, .. } => {
                PaymentFlowError::InvalidTransition { from: current, to: requested }
            },
            other => PaymentFlowError::Internal(other.to_string()),
        }
    }
}

#[derive(Debug, Clone, Error)]
pub enum DeliveryApiError {
    #[error("{0}")]
    Validation(String),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Forbidden(String),
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<StorageError> for DeliveryApiError {
    fn from(e: StorageError) -> Self {
        match e {
            StorageError::OrderNotFound(id) => DeliveryApiError::NotFound(format!("Order {id} does not exist")),
            StorageError::DeliveryNotFound(id) => {
                DeliveryApiError::NotFound(format!("No delivery exists for order {id}"))
            },
            other => DeliveryApiError::Internal(other.to_string()),
        }
    }
}
