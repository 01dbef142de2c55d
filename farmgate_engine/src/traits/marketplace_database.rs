use crate::traits::{
    CatalogManagement,
    DeliveryManagement,
    InventoryManagement,
    OrderManagement,
    PaymentManagement,
    StorageError,
    UserManagement,
};

/// The umbrella trait for a full marketplace backend. The server and the flow APIs bind against
/// this, so one type parameter carries every storage capability.
#[allow(async_fn_in_trait)]
pub trait MarketplaceDatabase:
    Clone
    + UserManagement
    + CatalogManagement
    + InventoryManagement
    + OrderManagement
    + PaymentManagement
    + DeliveryManagement
{
    /// The URL of the database.
    fn url(&self) -> &str;

    /// Closes the database connection.
    async fn close(&mut self) -> Result<(), StorageError> {
        Ok(())
    }
}
