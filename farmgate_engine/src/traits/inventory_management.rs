use fgp_common::Quantity;

use crate::{db_types::Product, traits::StorageError};

/// Owns the available-quantity column on products.
///
/// Reservations are the only sanctioned way order flows decrement stock. Implementations must
/// make `reserve_stock` atomic with respect to concurrent reservations on the same product: a
/// conditional decrement that only applies while sufficient stock remains, verified by the
/// affected-row count. Reading the quantity first and writing a computed value back is not an
/// acceptable implementation.
#[allow(async_fn_in_trait)]
pub trait InventoryManagement {
    /// Atomically decrement the product's available quantity by `quantity`.
    ///
    /// Fails with [`StorageError::InsufficientStock`] when the product holds less than
    /// `quantity`, and [`StorageError::ProductNotFound`] when it does not exist. Returns the
    /// product row as it stands after the decrement.
    async fn reserve_stock(&self, product_id: i64, quantity: Quantity) -> Result<Product, StorageError>;

    /// Return previously reserved quantity to the product. Used on cancellation and rollback.
    async fn release_stock(&self, product_id: i64, quantity: Quantity) -> Result<Product, StorageError>;
}
