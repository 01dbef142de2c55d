//! `SqliteDatabase` is a concrete implementation of a marketplace engine backend.
//!
//! Unsurprisingly, it uses SQLite as the backend and implements all the traits defined in the
//! [`crate::traits`] module. The multi-step write paths (order placement, payment settlement,
//! cancellation, delivery completion) each run inside a single database transaction; the
//! low-level statements live in [`super::db`] and take a plain connection, so they compose into
//! those transactions without knowing about them.
use std::fmt::Debug;

use fgp_common::Quantity;
use log::debug;
use sqlx::SqlitePool;

use super::db::{db_url, deliveries, new_pool, orders, products, transactions, users};
use crate::{
    db_types::{
        Delivery,
        DeliveryStatusType,
        NewOrder,
        NewOrderLine,
        NewProduct,
        NewTransaction,
        NewUser,
        Order,
        OrderLine,
        OrderStatusType,
        PaymentTransaction,
        Product,
        TransactionStatusType,
        User,
    },
    fge_api::{
        catalog_objects::{ProductQueryFilter, ProductUpdate},
        delivery_objects::DeliveryUpdate,
        order_objects::{OrderChangeSet, OrderQueryFilter},
        payment_objects::TransactionQueryFilter,
    },
    traits::{
        CatalogManagement,
        DeliveryManagement,
        DeliverySync,
        FullOrder,
        InventoryManagement,
        MarketplaceDatabase,
        OrderManagement,
        PaymentManagement,
        SettlementResult,
        StorageError,
        UserManagement,
    },
};

#[derive(Clone)]
pub struct SqliteDatabase {
    url: String,
    pool: SqlitePool,
}

impl Debug for SqliteDatabase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "SqliteDatabase ({:?})", self.pool)
    }
}

impl SqliteDatabase {
    /// Connects to the database named by `FGP_DATABASE_URL` (or the default path).
    pub async fn new(max_connections: u32) -> Result<Self, sqlx::Error> {
        let url = db_url();
        SqliteDatabase::new_with_url(url.as_str(), max_connections).await
    }

    pub async fn new_with_url(url: &str, max_connections: u32) -> Result<Self, sqlx::Error> {
        let pool = new_pool(url, max_connections).await?;
        let url = url.to_string();
        Ok(Self { url, pool })
    }

    /// Returns a reference to the database connection pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    async fn settle_as(
        &self,
        transaction_id: i64,
        to: TransactionStatusType,
    ) -> Result<SettlementResult, StorageError> {
        let mut conn = self.pool.acquire().await?;
        match transactions::settle_transaction(transaction_id, to, &mut conn).await? {
            Some(transaction) => {
                debug!("🗃️ Transaction {} settled as {to}", transaction.id);
                Ok(SettlementResult { transaction, was_applied: true, confirmed_order: None })
            },
            None => {
                let transaction = transactions::fetch_transaction(transaction_id, &mut conn)
                    .await?
                    .ok_or(StorageError::TransactionNotFound(transaction_id))?;
                Ok(SettlementResult { transaction, was_applied: false, confirmed_order: None })
            },
        }
    }
}

impl MarketplaceDatabase for SqliteDatabase {
    fn url(&self) -> &str {
        self.url.as_str()
    }

    async fn close(&mut self) -> Result<(), StorageError> {
        self.pool.close().await;
        Ok(())
    }
}

impl UserManagement for SqliteDatabase {
    async fn fetch_user(&self, user_id: i64) -> Result<Option<User>, StorageError> {
        let mut conn = self.pool.acquire().await?;
        users::fetch_user(user_id, &mut conn).await
    }

    async fn fetch_user_by_phone(&self, phone: &str) -> Result<Option<User>, StorageError> {
        let mut conn = self.pool.acquire().await?;
        users::fetch_user_by_phone(phone, &mut conn).await
    }

    async fn upsert_user(&self, user: NewUser) -> Result<User, StorageError> {
        let mut conn = self.pool.acquire().await?;
        let user = users::upsert_user(user, &mut conn).await?;
        debug!("🗃️ User {} ({}) upserted", user.id, user.phone);
        Ok(user)
    }
}

impl CatalogManagement for SqliteDatabase {
    async fn insert_product(&self, product: NewProduct) -> Result<Product, StorageError> {
        let mut conn = self.pool.acquire().await?;
        products::insert_product(product, &mut conn).await
    }

    async fn fetch_product(&self, product_id: i64) -> Result<Option<Product>, StorageError> {
        let mut conn = self.pool.acquire().await?;
        products::fetch_product(product_id, &mut conn).await
    }

    async fn search_products(&self, query: ProductQueryFilter) -> Result<Vec<Product>, StorageError> {
        let mut conn = self.pool.acquire().await?;
        products::search_products(query, &mut conn).await
    }

    async fn update_product(&self, product_id: i64, update: ProductUpdate) -> Result<Product, StorageError> {
        let mut conn = self.pool.acquire().await?;
        if update.is_empty() {
            return products::fetch_product(product_id, &mut conn)
                .await?
                .ok_or(StorageError::ProductNotFound(product_id));
        }
        products::update_product(product_id, update, &mut conn)
            .await?
            .ok_or(StorageError::ProductNotFound(product_id))
    }

    async fn delete_product(&self, product_id: i64) -> Result<(), StorageError> {
        let mut tx = self.pool.begin().await?;
        products::fetch_product(product_id, &mut tx).await?.ok_or(StorageError::ProductNotFound(product_id))?;
        let open_lines = products::count_open_order_lines(product_id, &mut tx).await?;
        if open_lines > 0 {
            return Err(StorageError::ProductHasOpenOrders(product_id));
        }
        let all_lines = products::count_order_lines(product_id, &mut tx).await?;
        if all_lines > 0 {
            // Lines from closed orders still reference the row; retire it instead of breaking
            // their foreign keys.
            products::deactivate_product(product_id, &mut tx).await?;
            debug!("🗃️ Product {product_id} is referenced by closed orders; deactivated instead of deleted");
        } else {
            products::delete_product(product_id, &mut tx).await?;
            debug!("🗃️ Product {product_id} deleted");
        }
        tx.commit().await?;
        Ok(())
    }
}

impl InventoryManagement for SqliteDatabase {
    async fn reserve_stock(&self, product_id: i64, quantity: Quantity) -> Result<Product, StorageError> {
        let mut conn = self.pool.acquire().await?;
        products::reserve_stock(product_id, quantity, &mut conn).await
    }

    async fn release_stock(&self, product_id: i64, quantity: Quantity) -> Result<Product, StorageError> {
        let mut conn = self.pool.acquire().await?;
        products::release_stock(product_id, quantity, &mut conn).await
    }
}

impl OrderManagement for SqliteDatabase {
    async fn insert_order_with_reservations(
        &self,
        order: NewOrder,
        lines: &[NewOrderLine],
    ) -> Result<FullOrder, StorageError> {
        let mut tx = self.pool.begin().await?;
        let order = orders::insert_order(order, &mut tx).await?;
        let mut saved_lines = Vec::with_capacity(lines.len());
        for line in lines {
            let saved = orders::insert_order_line(order.id, line, &mut tx).await?;
            // The reservation is the consistency gate. An insufficient-stock failure here drops
            // the transaction and takes the order header and every earlier line with it.
            products::reserve_stock(line.product_id, line.quantity, &mut tx).await?;
            saved_lines.push(saved);
        }
        tx.commit().await?;
        debug!("🗃️ Order {} saved with {} line(s) and stock reserved", order.id, saved_lines.len());
        Ok(FullOrder { order, lines: saved_lines })
    }

    async fn fetch_order(&self, order_id: i64) -> Result<Option<Order>, StorageError> {
        let mut conn = self.pool.acquire().await?;
        orders::fetch_order(order_id, &mut conn).await
    }

    async fn fetch_order_lines(&self, order_id: i64) -> Result<Vec<OrderLine>, StorageError> {
        let mut conn = self.pool.acquire().await?;
        orders::fetch_order_lines(order_id, &mut conn).await
    }

    async fn search_orders(&self, query: OrderQueryFilter) -> Result<Vec<Order>, StorageError> {
        let mut conn = self.pool.acquire().await?;
        orders::search_orders(query, &mut conn).await
    }

    async fn update_order_status(&self, order_id: i64, status: OrderStatusType) -> Result<Order, StorageError> {
        let mut conn = self.pool.acquire().await?;
        match orders::update_order_status_guarded(order_id, status, &mut conn).await? {
            Some(order) => Ok(order),
            None => {
                let current = orders::fetch_order(order_id, &mut conn)
                    .await?
                    .ok_or(StorageError::OrderNotFound(order_id))?;
                Err(StorageError::OrderStateConflict { id: order_id, current: current.status, requested: status })
            },
        }
    }

    async fn update_order_fields(&self, order_id: i64, update: OrderChangeSet) -> Result<Order, StorageError> {
        let mut conn = self.pool.acquire().await?;
        if update.is_empty() {
            return orders::fetch_order(order_id, &mut conn).await?.ok_or(StorageError::OrderNotFound(order_id));
        }
        orders::update_order_fields(order_id, update, &mut conn)
            .await?
            .ok_or(StorageError::OrderNotFound(order_id))
    }

    async fn confirm_order_if_pending(&self, order_id: i64) -> Result<Option<Order>, StorageError> {
        let mut tx = self.pool.begin().await?;
        let confirmed =
            orders::set_order_status_if(order_id, OrderStatusType::Pending, OrderStatusType::Confirmed, &mut tx)
                .await?;
        match &confirmed {
            Some(order) => {
                deliveries::insert_delivery_for_order(order, &mut tx).await?;
                debug!("🗃️ Order {} confirmed and its delivery record created", order.id);
            },
            None => {
                // Distinguish a missing order from one that merely left `pending`.
                orders::fetch_order(order_id, &mut tx).await?.ok_or(StorageError::OrderNotFound(order_id))?;
            },
        }
        tx.commit().await?;
        Ok(confirmed)
    }

    async fn mark_order_delivered(&self, order_id: i64) -> Result<Order, StorageError> {
        let mut tx = self.pool.begin().await?;
        let order = match orders::update_order_status_guarded(order_id, OrderStatusType::Delivered, &mut tx).await? {
            Some(order) => order,
            None => {
                let current = orders::fetch_order(order_id, &mut tx)
                    .await?
                    .ok_or(StorageError::OrderNotFound(order_id))?;
                return Err(StorageError::OrderStateConflict {
                    id: order_id,
                    current: current.status,
                    requested: OrderStatusType::Delivered,
                });
            },
        };
        // Orders pushed straight to delivered by an operator may not have a delivery row yet.
        deliveries::insert_delivery_for_order(&order, &mut tx).await?;
        deliveries::mark_delivered(order_id, &mut tx).await?.ok_or(StorageError::DeliveryNotFound(order_id))?;
        tx.commit().await?;
        debug!("🗃️ Order {} delivered; delivery record stamped", order.id);
        Ok(order)
    }

    async fn cancel_order_and_release_stock(&self, order_id: i64) -> Result<Order, StorageError> {
        let mut tx = self.pool.begin().await?;
        let order = match orders::update_order_status_guarded(order_id, OrderStatusType::Cancelled, &mut tx).await? {
            Some(order) => order,
            None => {
                let current = orders::fetch_order(order_id, &mut tx)
                    .await?
                    .ok_or(StorageError::OrderNotFound(order_id))?;
                return Err(StorageError::OrderStateConflict {
                    id: order_id,
                    current: current.status,
                    requested: OrderStatusType::Cancelled,
                });
            },
        };
        let lines = orders::fetch_order_lines(order_id, &mut tx).await?;
        for line in &lines {
            products::release_stock(line.product_id, line.quantity, &mut tx).await?;
        }
        tx.commit().await?;
        debug!("🗃️ Order {} cancelled; {} reservation(s) returned to stock", order.id, lines.len());
        Ok(order)
    }
}

impl PaymentManagement for SqliteDatabase {
    async fn insert_transaction(&self, transaction: NewTransaction) -> Result<PaymentTransaction, StorageError> {
        let mut conn = self.pool.acquire().await?;
        let order_id = transaction.order_id;
        match transactions::insert_transaction(transaction, &mut conn).await? {
            Some(transaction) => {
                debug!("🗃️ Transaction {} created for order {order_id}", transaction.id);
                Ok(transaction)
            },
            None => Err(StorageError::DuplicatePendingTransaction(order_id)),
        }
    }

    async fn record_provider_session(
        &self,
        transaction_id: i64,
        external_id: &str,
        metadata: Option<&str>,
    ) -> Result<PaymentTransaction, StorageError> {
        let mut conn = self.pool.acquire().await?;
        transactions::record_provider_session(transaction_id, external_id, metadata, &mut conn)
            .await?
            .ok_or(StorageError::TransactionNotFound(transaction_id))
    }

    async fn fetch_transaction(&self, transaction_id: i64) -> Result<Option<PaymentTransaction>, StorageError> {
        let mut conn = self.pool.acquire().await?;
        transactions::fetch_transaction(transaction_id, &mut conn).await
    }

    async fn fetch_transaction_by_external_id(
        &self,
        external_id: &str,
    ) -> Result<Option<PaymentTransaction>, StorageError> {
        let mut conn = self.pool.acquire().await?;
        transactions::fetch_transaction_by_external_id(external_id, &mut conn).await
    }

    async fn search_transactions(
        &self,
        query: TransactionQueryFilter,
    ) -> Result<Vec<PaymentTransaction>, StorageError> {
        let mut conn = self.pool.acquire().await?;
        transactions::search_transactions(query, &mut conn).await
    }

    async fn complete_transaction(&self, transaction_id: i64) -> Result<SettlementResult, StorageError> {
        let mut tx = self.pool.begin().await?;
        let settled =
            transactions::settle_transaction(transaction_id, TransactionStatusType::Completed, &mut tx).await?;
        let result = match settled {
            Some(transaction) => {
                let confirmed_order = orders::set_order_status_if(
                    transaction.order_id,
                    OrderStatusType::Pending,
                    OrderStatusType::Confirmed,
                    &mut tx,
                )
                .await?;
                if let Some(order) = &confirmed_order {
                    deliveries::insert_delivery_for_order(order, &mut tx).await?;
                    debug!("🗃️ Payment {} completed; order {} confirmed", transaction.id, order.id);
                }
                SettlementResult { transaction, was_applied: true, confirmed_order }
            },
            None => {
                let transaction = transactions::fetch_transaction(transaction_id, &mut tx)
                    .await?
                    .ok_or(StorageError::TransactionNotFound(transaction_id))?;
                SettlementResult { transaction, was_applied: false, confirmed_order: None }
            },
        };
        tx.commit().await?;
        Ok(result)
    }

    async fn fail_transaction(&self, transaction_id: i64) -> Result<SettlementResult, StorageError> {
        self.settle_as(transaction_id, TransactionStatusType::Failed).await
    }

    async fn cancel_transaction(&self, transaction_id: i64) -> Result<SettlementResult, StorageError> {
        self.settle_as(transaction_id, TransactionStatusType::Cancelled).await
    }

    async fn refund_transaction(&self, transaction_id: i64) -> Result<PaymentTransaction, StorageError> {
        let mut conn = self.pool.acquire().await?;
        match transactions::refund_transaction(transaction_id, &mut conn).await? {
            Some(transaction) => {
                debug!("🗃️ Transaction {} refunded", transaction.id);
                Ok(transaction)
            },
            None => {
                let current = transactions::fetch_transaction(transaction_id, &mut conn)
                    .await?
                    .ok_or(StorageError::TransactionNotFound(transaction_id))?;
                Err(StorageError::TransactionStateConflict {
                    id: transaction_id,
                    current: current.status,
                    requested: TransactionStatusType::Refunded,
                })
            },
        }
    }
}

impl DeliveryManagement for SqliteDatabase {
    async fn fetch_delivery_for_order(&self, order_id: i64) -> Result<Option<Delivery>, StorageError> {
        let mut conn = self.pool.acquire().await?;
        deliveries::fetch_delivery_for_order(order_id, &mut conn).await
    }

    async fn update_delivery(&self, order_id: i64, update: DeliveryUpdate) -> Result<DeliverySync, StorageError> {
        let mut tx = self.pool.begin().await?;
        let before = deliveries::fetch_delivery_for_order(order_id, &mut tx)
            .await?
            .ok_or(StorageError::DeliveryNotFound(order_id))?;
        if update.is_empty() {
            tx.commit().await?;
            return Ok(DeliverySync { delivery: before, synced_order: None });
        }
        let delivery = deliveries::update_delivery(order_id, update, &mut tx)
            .await?
            .ok_or(StorageError::DeliveryNotFound(order_id))?;
        let newly_delivered =
            delivery.status == DeliveryStatusType::Delivered && before.status != DeliveryStatusType::Delivered;
        let synced_order = if newly_delivered {
            // None here means the order already reached a terminal state on its own; the
            // delivery still records its completion.
            orders::update_order_status_guarded(order_id, OrderStatusType::Delivered, &mut tx).await?
        } else {
            None
        };
        tx.commit().await?;
        if let Some(order) = &synced_order {
            debug!("🗃️ Delivery for order {} completed; order synchronized to delivered", order.id);
        }
        Ok(DeliverySync { delivery, synced_order })
    }
}
