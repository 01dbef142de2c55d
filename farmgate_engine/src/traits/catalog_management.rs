use crate::{
    db_types::{NewProduct, Product},
    fge_api::catalog_objects::{ProductQueryFilter, ProductUpdate},
    traits::StorageError,
};

/// The farmer-facing product store.
///
/// Catalog edits go through [`CatalogManagement::update_product`]; the reservation path in
/// [`crate::traits::InventoryManagement`] is the only other writer of the quantity column.
#[allow(async_fn_in_trait)]
pub trait CatalogManagement {
    async fn insert_product(&self, product: NewProduct) -> Result<Product, StorageError>;

    async fn fetch_product(&self, product_id: i64) -> Result<Option<Product>, StorageError>;

    /// Fetches products according to the criteria in the filter, newest first.
    async fn search_products(&self, query: ProductQueryFilter) -> Result<Vec<Product>, StorageError>;

    async fn update_product(&self, product_id: i64, update: ProductUpdate) -> Result<Product, StorageError>;

    /// Deletes the product, unless any order in a non-terminal state still references it, in
    /// which case [`StorageError::ProductHasOpenOrders`] is returned and nothing changes.
    async fn delete_product(&self, product_id: i64) -> Result<(), StorageError>;
}
