//! `OrderFlowApi` drives the order lifecycle from placement to a terminal state.
//!
//! Placement is the consistency-critical path. The flow validates the request line by line
//! against live catalog data, then hands the whole thing to
//! [`OrderManagement::insert_order_with_reservations`], which writes the order, its lines and
//! the matching stock decrements in a single database transaction. Each decrement re-verifies
//! availability at write time, so two buyers racing for the last crate of tomatoes cannot both
//! win; the loser's insert rolls back completely and surfaces as
//! [`OrderFlowError::InsufficientStock`].
//!
//! Status changes are role-gated:
//!
//! | target       | buyer (shop)                    | seller (farmer) | admin |
//! |--------------|---------------------------------|-----------------|-------|
//! | `confirmed`  | no (payments confirm for you)   | yes             | yes   |
//! | `processing` | no                              | yes             | yes   |
//! | `shipped`    | no                              | yes             | yes   |
//! | `delivered`  | no                              | yes             | yes   |
//! | `cancelled`  | while `pending` or `confirmed`  | yes             | yes   |
//!
//! on top of the transition table in [`OrderStatusType::can_become`]. Cancellation returns every
//! reserved line quantity to stock before it is acknowledged.

use std::{collections::HashMap, fmt::Debug};

use fgp_common::Money;
use log::info;

use crate::{
    db_types::{NewOrder, NewOrderLine, Order, OrderStatusType, Role, User},
    fge_api::{
        errors::OrderFlowError,
        order_objects::{OrderAmendment, OrderQueryFilter, OrderRequest, MAX_DELIVERY_ADDRESS_LEN, MAX_NOTES_LEN},
    },
    traits::{CatalogManagement, FullOrder, OrderManagement, StorageError, UserManagement},
};

pub struct OrderFlowApi<B> {
    db: B,
}

impl<B: Debug> Debug for OrderFlowApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "OrderFlowApi ({:?})", self.db)
    }
}

impl<B> OrderFlowApi<B>
where B: UserManagement + CatalogManagement + OrderManagement
{
    pub fn new(db: B) -> Self {
        Self { db }
    }

    /// Validate and place a multi-line order on behalf of `buyer_id`.
    ///
    /// The checks run in a fixed sequence and the first failure wins: buyer role, seller
    /// existence and role, non-empty lines, then per line quantity, product existence, product
    /// availability, ownership by the seller and a stock pre-check. Only then is the atomic
    /// insert attempted; a reservation lost to a concurrent order comes back as
    /// [`OrderFlowError::InsufficientStock`] naming the product, with nothing written.
    pub async fn place_order(&self, buyer_id: i64, request: OrderRequest) -> Result<FullOrder, OrderFlowError> {
        let buyer = self.fetch_actor(buyer_id).await?;
        if buyer.role != Role::Shop {
            return Err(OrderFlowError::Forbidden("Only shop accounts may place orders".to_string()));
        }
        let seller = self
            .db
            .fetch_user(request.seller_id)
            .await?
            .filter(|u| u.role == Role::Farmer)
            .ok_or_else(|| OrderFlowError::NotFound(format!("Farmer {} does not exist", request.seller_id)))?;
        if request.lines.is_empty() {
            return Err(OrderFlowError::Validation("An order must contain at least one line".to_string()));
        }
        validate_text_fields(request.delivery_address.as_deref(), request.notes.as_deref())?;

        let mut lines = Vec::with_capacity(request.lines.len());
        let mut product_names = HashMap::new();
        // The total is accumulated in i128 so a pathological order cannot wrap i64 tiyin.
        let mut total = 0i128;
        for item in &request.lines {
            if !item.quantity.is_positive() {
                return Err(OrderFlowError::Validation(format!(
                    "Quantity for product {} must be positive",
                    item.product_id
                )));
            }
            let product = self
                .db
                .fetch_product(item.product_id)
                .await?
                .ok_or_else(|| OrderFlowError::NotFound(format!("Product {} does not exist", item.product_id)))?;
            if !product.is_active {
                return Err(OrderFlowError::Validation(format!("Product '{}' is not available", product.name)));
            }
            if product.farmer_id != seller.id {
                return Err(OrderFlowError::Validation(format!(
                    "Product '{}' does not belong to farmer {}",
                    product.name, seller.id
                )));
            }
            if product.quantity < item.quantity {
                return Err(OrderFlowError::InsufficientStock {
                    product: product.name.clone(),
                    requested: item.quantity,
                    available: product.quantity,
                });
            }
            total += i128::from(product.price.line_total(item.quantity).value());
            lines.push(NewOrderLine::new(product.id, item.quantity, product.price));
            product_names.insert(product.id, product.name);
        }
        let total = i64::try_from(total)
            .map(Money::from_tiyin)
            .map_err(|_| OrderFlowError::Validation("Order total exceeds the representable amount".to_string()))?;

        let mut order = NewOrder::new(buyer.id, seller.id, total);
        if let Some(address) = request.delivery_address {
            order = order.with_delivery_address(address);
        }
        if let Some(notes) = request.notes {
            order = order.with_notes(notes);
        }
        match self.db.insert_order_with_reservations(order, &lines).await {
            Ok(full_order) => {
                info!(
                    "🛒️ Order {} placed by shop {} against farmer {}: {} line(s), total {}",
                    full_order.order.id,
                    buyer.id,
                    seller.id,
                    full_order.lines.len(),
                    full_order.order.total_amount
                );
                Ok(full_order)
            },
            // A concurrent order may have taken the stock between the pre-check and the
            // reservation. Name the product in the error just like the pre-check does.
            Err(StorageError::InsufficientStock { product_id, requested, available }) => {
                let product =
                    product_names.remove(&product_id).unwrap_or_else(|| format!("product {product_id}"));
                Err(OrderFlowError::InsufficientStock { product, requested, available })
            },
            Err(e) => Err(e.into()),
        }
    }

    /// Fetch an order with its lines. Available to the order's buyer, its seller and admins.
    pub async fn fetch_full_order(&self, actor_id: i64, order_id: i64) -> Result<FullOrder, OrderFlowError> {
        let actor = self.fetch_actor(actor_id).await?;
        let order = self.fetch_visible_order(&actor, order_id).await?;
        let lines = self.db.fetch_order_lines(order.id).await?;
        Ok(FullOrder { order, lines })
    }

    /// The actor's orders, newest first. Shops see orders they placed, farmers see orders placed
    /// against them, admins see everything. `statuses` narrows the result when present.
    pub async fn orders_for_actor(
        &self,
        actor_id: i64,
        statuses: Option<Vec<OrderStatusType>>,
    ) -> Result<Vec<Order>, OrderFlowError> {
        let actor = self.fetch_actor(actor_id).await?;
        let mut filter = OrderQueryFilter::default();
        match actor.role {
            Role::Admin => {},
            Role::Shop => filter = filter.with_shop_id(actor.id),
            Role::Farmer => filter = filter.with_farmer_id(actor.id),
        }
        for status in statuses.unwrap_or_default() {
            filter = filter.with_status(status);
        }
        Ok(self.db.search_orders(filter).await?)
    }

    /// Apply a PATCH to the order: optional field edits followed by an optional status change.
    ///
    /// Field edits are open to both participants and admins while the order is in a non-terminal
    /// state. Status changes are checked against the transition table and the role gates in the
    /// module docs; cancellation releases the reserved stock in the same database transaction.
    pub async fn amend_order(
        &self,
        actor_id: i64,
        order_id: i64,
        amendment: OrderAmendment,
    ) -> Result<Order, OrderFlowError> {
        if amendment.is_empty() {
            return Err(OrderFlowError::Validation("The amendment contains no changes".to_string()));
        }
        validate_text_fields(amendment.delivery_address.as_deref(), amendment.notes.as_deref())?;
        let actor = self.fetch_actor(actor_id).await?;
        let mut order = self.fetch_visible_order(&actor, order_id).await?;
        let fields = amendment.change_set();
        if !fields.is_empty() {
            if order.status.is_terminal() {
                return Err(OrderFlowError::Validation(format!(
                    "Order {} is {} and can no longer be amended",
                    order.id, order.status
                )));
            }
            order = self.db.update_order_fields(order.id, fields).await?;
        }
        if let Some(target) = amendment.status {
            order = self.apply_status_change(&actor, &order, target).await?;
        }
        Ok(order)
    }

    async fn apply_status_change(
        &self,
        actor: &User,
        order: &Order,
        target: OrderStatusType,
    ) -> Result<Order, OrderFlowError> {
        use OrderStatusType::*;
        if !order.status.can_become(target) {
            return Err(OrderFlowError::InvalidTransition { from: order.status, to: target });
        }
        let is_admin = actor.role == Role::Admin;
        let is_seller = order.farmer_id == actor.id;
        let is_buyer = order.shop_id == actor.id;
        let allowed = match target {
            Cancelled => is_admin || is_seller || (is_buyer && matches!(order.status, Pending | Confirmed)),
            Confirmed | Processing | Shipped | Delivered => is_admin || is_seller,
            Pending => false,
        };
        if !allowed {
            return Err(OrderFlowError::Forbidden(format!(
                "User {} may not move order {} from {} to {target}",
                actor.id, order.id, order.status
            )));
        }
        let updated = match target {
            Cancelled => {
                let cancelled = self.db.cancel_order_and_release_stock(order.id).await?;
                info!("🛒️ Order {} cancelled by user {}; reserved stock returned", cancelled.id, actor.id);
                cancelled
            },
            Confirmed => match self.db.confirm_order_if_pending(order.id).await? {
                Some(confirmed) => {
                    info!("🛒️ Order {} confirmed manually by user {}", confirmed.id, actor.id);
                    confirmed
                },
                None => {
                    // Lost a race; report the state the order actually reached.
                    let current =
                        self.db.fetch_order(order.id).await?.map(|o| o.status).unwrap_or(order.status);
                    return Err(OrderFlowError::InvalidTransition { from: current, to: target });
                },
            },
            Delivered => {
                let delivered = self.db.mark_order_delivered(order.id).await?;
                info!("🛒️ Order {} marked delivered by user {}", delivered.id, actor.id);
                delivered
            },
            Processing | Shipped => self.db.update_order_status(order.id, target).await?,
            Pending => return Err(OrderFlowError::InvalidTransition { from: order.status, to: target }),
        };
        Ok(updated)
    }

    async fn fetch_actor(&self, user_id: i64) -> Result<User, OrderFlowError> {
        let user = self
            .db
            .fetch_user(user_id)
            .await?
            .ok_or_else(|| OrderFlowError::Forbidden(format!("User {user_id} is not registered")))?;
        if !user.is_active {
            return Err(OrderFlowError::Forbidden(format!("User {user_id} is deactivated")));
        }
        Ok(user)
    }

    async fn fetch_visible_order(&self, actor: &User, order_id: i64) -> Result<Order, OrderFlowError> {
        let order = self
            .db
            .fetch_order(order_id)
            .await?
            .ok_or_else(|| OrderFlowError::NotFound(format!("Order {order_id} does not exist")))?;
        if actor.role != Role::Admin && !order.involves(actor.id) {
            return Err(OrderFlowError::Forbidden(format!(
                "User {} does not have access to order {}",
                actor.id, order.id
            )));
        }
        Ok(order)
    }
}

fn validate_text_fields(address: Option<&str>, notes: Option<&str>) -> Result<(), OrderFlowError> {
    if address.is_some_and(|a| a.len() > MAX_DELIVERY_ADDRESS_LEN) {
        return Err(OrderFlowError::Validation(format!(
            "Delivery address exceeds {MAX_DELIVERY_ADDRESS_LEN} characters"
        )));
    }
    if notes.is_some_and(|n| n.len() > MAX_NOTES_LEN) {
        return Err(OrderFlowError::Validation(format!("Notes exceed {MAX_NOTES_LEN} characters")));
    }
    Ok(())
}
