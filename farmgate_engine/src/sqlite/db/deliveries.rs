use log::trace;
use sqlx::{sqlite::SqliteRow, FromRow, QueryBuilder, SqliteConnection};

use crate::{
    db_types::{Delivery, DeliveryStatusType, Order},
    fge_api::delivery_objects::DeliveryUpdate,
    traits::StorageError,
};

/// Creates the delivery record for a freshly confirmed order, inheriting the order's address.
/// Idempotent: a second confirmation attempt leaves the existing record alone.
pub async fn insert_delivery_for_order(order: &Order, conn: &mut SqliteConnection) -> Result<(), StorageError> {
    sqlx::query(
        r#"
        INSERT INTO deliveries (order_id, delivery_address) VALUES ($1, $2)
        ON CONFLICT (order_id) DO NOTHING;
    "#,
    )
    .bind(order.id)
    .bind(order.delivery_address.as_deref())
    .execute(conn)
    .await?;
    Ok(())
}

pub async fn fetch_delivery_for_order(
    order_id: i64,
    conn: &mut SqliteConnection,
) -> Result<Option<Delivery>, StorageError> {
    let delivery =
        sqlx::query_as("SELECT * FROM deliveries WHERE order_id = $1").bind(order_id).fetch_optional(conn).await?;
    Ok(delivery)
}

/// Applies the partial update. The first move into `delivered` stamps `delivered_at`; the stamp
/// is never overwritten afterwards.
pub async fn update_delivery(
    order_id: i64,
    update: DeliveryUpdate,
    conn: &mut SqliteConnection,
) -> Result<Option<Delivery>, StorageError> {
    let mut builder = QueryBuilder::new("UPDATE deliveries SET updated_at = CURRENT_TIMESTAMP, ");
    let mut set_clause = builder.separated(", ");
    if let Some(status) = update.status {
        set_clause.push("status = ");
        set_clause.push_bind_unseparated(status);
        if status == DeliveryStatusType::Delivered {
            set_clause.push("delivered_at = COALESCE(delivered_at, CURRENT_TIMESTAMP)");
        }
    }
    if let Some(courier_name) = update.courier_name {
        set_clause.push("courier_name = ");
        set_clause.push_bind_unseparated(courier_name);
    }
    if let Some(courier_phone) = update.courier_phone {
        set_clause.push("courier_phone = ");
        set_clause.push_bind_unseparated(courier_phone);
    }
    if let Some(tracking_number) = update.tracking_number {
        set_clause.push("tracking_number = ");
        set_clause.push_bind_unseparated(tracking_number);
    }
    if let Some(estimated_delivery) = update.estimated_delivery {
        set_clause.push("estimated_delivery = ");
        set_clause.push_bind_unseparated(estimated_delivery);
    }
    if let Some(notes) = update.notes {
        set_clause.push("notes = ");
        set_clause.push_bind_unseparated(notes);
    }
    builder.push(" WHERE order_id = ");
    builder.push_bind(order_id);
    builder.push(" RETURNING *");
    trace!("🚚️ Executing query: {}", builder.sql());
    let delivery =
        builder.build().fetch_optional(conn).await?.map(|row: SqliteRow| Delivery::from_row(&row)).transpose()?;
    Ok(delivery)
}

/// Marks the delivery complete, stamping `delivered_at` on the first completion only.
pub async fn mark_delivered(order_id: i64, conn: &mut SqliteConnection) -> Result<Option<Delivery>, StorageError> {
    let delivery: Option<Delivery> = sqlx::query_as(
        r#"
        UPDATE deliveries
        SET status = 'delivered',
            delivered_at = COALESCE(delivered_at, CURRENT_TIMESTAMP),
            updated_at = CURRENT_TIMESTAMP
        WHERE order_id = $1
        RETURNING *;
    "#,
    )
    .bind(order_id)
    .fetch_optional(conn)
    .await?;
    Ok(delivery)
}
