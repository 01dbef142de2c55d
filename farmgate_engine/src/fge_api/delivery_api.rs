//! `DeliveryApi` exposes the delivery record that order confirmation creates.
//!
//! Participants read it to track their order; operators drive it through the courier states.
//! Marking a delivery `delivered` is the one update with a side effect: the parent order is
//! synchronized to `delivered` in the same database transaction.

use std::fmt::Debug;

use log::info;

use crate::{
    db_types::{Delivery, Role, User},
    fge_api::{
        delivery_objects::DeliveryUpdate,
        errors::DeliveryApiError,
        order_objects::MAX_NOTES_LEN,
    },
    traits::{DeliveryManagement, DeliverySync, OrderManagement, UserManagement},
};

pub struct DeliveryApi<B> {
    db: B,
}

impl<B: Debug> Debug for DeliveryApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "DeliveryApi ({:?})", self.db)
    }
}

impl<B> DeliveryApi<B>
where B: UserManagement + OrderManagement + DeliveryManagement
{
    pub fn new(db: B) -> Self {
        Self { db }
    }

    /// The delivery for an order. Available to the order's buyer, its seller and admins.
    pub async fn delivery_for_order(&self, actor_id: i64, order_id: i64) -> Result<Delivery, DeliveryApiError> {
        let actor = self.fetch_actor(actor_id).await?;
        let order = self
            .db
            .fetch_order(order_id)
            .await?
            .ok_or_else(|| DeliveryApiError::NotFound(format!("Order {order_id} does not exist")))?;
        if actor.role != Role::Admin && !order.involves(actor.id) {
            return Err(DeliveryApiError::Forbidden(format!(
                "User {} does not have access to order {}",
                actor.id, order.id
            )));
        }
        self.db
            .fetch_delivery_for_order(order_id)
            .await?
            .ok_or_else(|| DeliveryApiError::NotFound(format!("No delivery exists for order {order_id}")))
    }

    /// Update the delivery. Admin only; couriers are managed by the operations team.
    pub async fn update_delivery(
        &self,
        actor_id: i64,
        order_id: i64,
        update: DeliveryUpdate,
    ) -> Result<DeliverySync, DeliveryApiError> {
        let actor = self.fetch_actor(actor_id).await?;
        if actor.role != Role::Admin {
            return Err(DeliveryApiError::Forbidden("Only administrators may update deliveries".to_string()));
        }
        if update.is_empty() {
            return Err(DeliveryApiError::Validation("The update contains no changes".to_string()));
        }
        if update.notes.as_deref().is_some_and(|n| n.len() > MAX_NOTES_LEN) {
            return Err(DeliveryApiError::Validation(format!("Notes exceed {MAX_NOTES_LEN} characters")));
        }
        let sync = self.db.update_delivery(order_id, update).await?;
        match &sync.synced_order {
            Some(order) => {
                info!("🚚️ Delivery {} completed; order {} marked delivered", sync.delivery.id, order.id)
            },
            None => info!("🚚️ Delivery {} updated to {}", sync.delivery.id, sync.delivery.status),
        }
        Ok(sync)
    }

    async fn fetch_actor(&self, user_id: i64) -> Result<User, DeliveryApiError> {
        let user = self
            .db
            .fetch_user(user_id)
            .await?
            .ok_or_else(|| DeliveryApiError::Forbidden(format!("User {user_id} is not registered")))?;
        if !user.is_active {
            return Err(DeliveryApiError::Forbidden(format!("User {user_id} is deactivated")));
        }
        Ok(user)
    }
}
