//! `CatalogApi` is the farmer-facing product store: create, search, edit, retire.
//!
//! Stock movements do not happen here. The quantity a farmer writes through this API is the
//! advertised availability; order placement is the only path that consumes it.

use std::fmt::Debug;

use log::info;

use crate::{
    db_types::{NewProduct, Product, Role, User},
    fge_api::{
        catalog_objects::{ProductQueryFilter, ProductUpdate},
        errors::CatalogApiError,
    },
    traits::{CatalogManagement, UserManagement},
};

pub struct CatalogApi<B> {
    db: B,
}

impl<B: Debug> Debug for CatalogApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "CatalogApi ({:?})", self.db)
    }
}

impl<B> CatalogApi<B>
where B: UserManagement + CatalogManagement
{
    pub fn new(db: B) -> Self {
        Self { db }
    }

    /// Create a product. Farmers list under their own account; admins may list on behalf of a
    /// farmer by setting `product.farmer_id`.
    pub async fn create_product(&self, actor_id: i64, mut product: NewProduct) -> Result<Product, CatalogApiError> {
        let actor = self.fetch_actor(actor_id).await?;
        match actor.role {
            Role::Farmer => product.farmer_id = actor.id,
            Role::Admin => {
                self.db
                    .fetch_user(product.farmer_id)
                    .await?
                    .filter(|u| u.role == Role::Farmer)
                    .ok_or_else(|| {
                        CatalogApiError::NotFound(format!("Farmer {} does not exist", product.farmer_id))
                    })?;
            },
            Role::Shop => {
                return Err(CatalogApiError::Forbidden("Only farmer accounts may list products".to_string()))
            },
        }
        validate_product_fields(&product)?;
        let created = self.db.insert_product(product).await?;
        info!("🥕️ Product {} ('{}') listed by farmer {}", created.id, created.name, created.farmer_id);
        Ok(created)
    }

    pub async fn fetch_product(&self, product_id: i64) -> Result<Product, CatalogApiError> {
        self.db
            .fetch_product(product_id)
            .await?
            .ok_or_else(|| CatalogApiError::NotFound(format!("Product {product_id} does not exist")))
    }

    /// Products matching the filter, newest first.
    pub async fn search(&self, filter: ProductQueryFilter) -> Result<Vec<Product>, CatalogApiError> {
        Ok(self.db.search_products(filter).await?)
    }

    /// Partial update, restricted to the owning farmer and admins.
    pub async fn update_product(
        &self,
        actor_id: i64,
        product_id: i64,
        update: ProductUpdate,
    ) -> Result<Product, CatalogApiError> {
        if update.is_empty() {
            return Err(CatalogApiError::Validation("The update contains no changes".to_string()));
        }
        if update.price.is_some_and(|p| !p.is_positive()) {
            return Err(CatalogApiError::Validation("Price must be positive".to_string()));
        }
        if update.quantity.is_some_and(|q| q.value() < 0) {
            return Err(CatalogApiError::Validation("Quantity cannot be negative".to_string()));
        }
        let actor = self.fetch_actor(actor_id).await?;
        self.fetch_owned_product(&actor, product_id).await?;
        let updated = self.db.update_product(product_id, update).await?;
        info!("🥕️ Product {} ('{}') updated by user {}", updated.id, updated.name, actor.id);
        Ok(updated)
    }

    /// Remove a product from the catalog, restricted to the owning farmer and admins. Refused
    /// while open orders reference it.
    pub async fn delete_product(&self, actor_id: i64, product_id: i64) -> Result<(), CatalogApiError> {
        let actor = self.fetch_actor(actor_id).await?;
        self.fetch_owned_product(&actor, product_id).await?;
        self.db.delete_product(product_id).await?;
        info!("🥕️ Product {product_id} removed from the catalog by user {}", actor.id);
        Ok(())
    }

    async fn fetch_actor(&self, user_id: i64) -> Result<User, CatalogApiError> {
        let user = self
            .db
            .fetch_user(user_id)
            .await?
            .ok_or_else(|| CatalogApiError::Forbidden(format!("User {user_id} is not registered")))?;
        if !user.is_active {
            return Err(CatalogApiError::Forbidden(format!("User {user_id} is deactivated")));
        }
        Ok(user)
    }

    async fn fetch_owned_product(&self, actor: &User, product_id: i64) -> Result<Product, CatalogApiError> {
        let product = self
            .db
            .fetch_product(product_id)
            .await?
            .ok_or_else(|| CatalogApiError::NotFound(format!("Product {product_id} does not exist")))?;
        if actor.role != Role::Admin && product.farmer_id != actor.id {
            return Err(CatalogApiError::Forbidden(format!(
                "User {} does not own product {}",
                actor.id, product.id
            )));
        }
        Ok(product)
    }
}

fn validate_product_fields(product: &NewProduct) -> Result<(), CatalogApiError> {
    if product.name.trim().is_empty() {
        return Err(CatalogApiError::Validation("Product name cannot be empty".to_string()));
    }
    if !product.price.is_positive() {
        return Err(CatalogApiError::Validation("Price must be positive".to_string()));
    }
    if product.quantity.value() < 0 {
        return Err(CatalogApiError::Validation("Quantity cannot be negative".to_string()));
    }
    if product.unit.trim().is_empty() {
        return Err(CatalogApiError::Validation("Unit cannot be empty".to_string()));
    }
    Ok(())
}
