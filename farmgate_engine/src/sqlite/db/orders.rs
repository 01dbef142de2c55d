use log::trace;
use sqlx::{sqlite::SqliteRow, FromRow, QueryBuilder, SqliteConnection};

use crate::{
    db_types::{NewOrder, NewOrderLine, Order, OrderLine, OrderStatusType},
    fge_api::order_objects::{OrderChangeSet, OrderQueryFilter},
    traits::StorageError,
};

/// Inserts a new order header using the given connection. This is not atomic on its own. Embed
/// the call inside a transaction and pass `&mut *tx` as the connection argument to make the
/// order, its lines and the stock reservations a single unit of work.
pub async fn insert_order(order: NewOrder, conn: &mut SqliteConnection) -> Result<Order, StorageError> {
    let order = sqlx::query_as(
        r#"
        INSERT INTO orders (shop_id, farmer_id, total_amount, delivery_address, notes)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING *;
    "#,
    )
    .bind(order.shop_id)
    .bind(order.farmer_id)
    .bind(order.total_amount)
    .bind(order.delivery_address)
    .bind(order.notes)
    .fetch_one(conn)
    .await?;
    Ok(order)
}

pub async fn insert_order_line(
    order_id: i64,
    line: &NewOrderLine,
    conn: &mut SqliteConnection,
) -> Result<OrderLine, StorageError> {
    let line = sqlx::query_as(
        r#"
        INSERT INTO order_lines (order_id, product_id, quantity, unit_price)
        VALUES ($1, $2, $3, $4)
        RETURNING *;
    "#,
    )
    .bind(order_id)
    .bind(line.product_id)
    .bind(line.quantity)
    .bind(line.unit_price)
    .fetch_one(conn)
    .await?;
    Ok(line)
}

pub async fn fetch_order(order_id: i64, conn: &mut SqliteConnection) -> Result<Option<Order>, StorageError> {
    let order = sqlx::query_as("SELECT * FROM orders WHERE id = $1").bind(order_id).fetch_optional(conn).await?;
    Ok(order)
}

pub async fn fetch_order_lines(order_id: i64, conn: &mut SqliteConnection) -> Result<Vec<OrderLine>, StorageError> {
    let lines = sqlx::query_as("SELECT * FROM order_lines WHERE order_id = $1 ORDER BY id")
        .bind(order_id)
        .fetch_all(conn)
        .await?;
    Ok(lines)
}

/// Fetches orders according to criteria specified in the `OrderQueryFilter`, newest first.
pub async fn search_orders(query: OrderQueryFilter, conn: &mut SqliteConnection) -> Result<Vec<Order>, StorageError> {
    let mut builder = QueryBuilder::new("SELECT * FROM orders ");
    if !query.is_empty() {
        builder.push("WHERE ");
    }
    let mut where_clause = builder.separated(" AND ");
    if let Some(shop_id) = query.shop_id {
        where_clause.push("shop_id = ");
        where_clause.push_bind_unseparated(shop_id);
    }
    if let Some(farmer_id) = query.farmer_id {
        where_clause.push("farmer_id = ");
        where_clause.push_bind_unseparated(farmer_id);
    }
    if query.status.as_ref().map(|s| !s.is_empty()).unwrap_or(false) {
        let statuses =
            query.status.as_ref().unwrap().iter().map(|s| format!("'{s}'")).collect::<Vec<_>>().join(",");
        where_clause.push(format!("status IN ({statuses})"));
    }
    if let Some(since) = query.since {
        where_clause.push("created_at >= ");
        where_clause.push_bind_unseparated(since);
    }
    if let Some(until) = query.until {
        where_clause.push("created_at <= ");
        where_clause.push_bind_unseparated(until);
    }
    builder.push(" ORDER BY created_at DESC");
    trace!("📝️ Executing query: {}", builder.sql());
    let orders = builder.build_query_as::<Order>().fetch_all(conn).await?;
    Ok(orders)
}

/// Sets the order status, but only while the order is still in a non-terminal state. Returns
/// `None` when the guard matched no row (missing order, or one that already reached `delivered`
/// or `cancelled`).
pub async fn update_order_status_guarded(
    order_id: i64,
    status: OrderStatusType,
    conn: &mut SqliteConnection,
) -> Result<Option<Order>, StorageError> {
    let order: Option<Order> = sqlx::query_as(
        r#"
        UPDATE orders SET status = $1, updated_at = CURRENT_TIMESTAMP
        WHERE id = $2 AND status NOT IN ('delivered', 'cancelled')
        RETURNING *;
    "#,
    )
    .bind(status)
    .bind(order_id)
    .fetch_optional(conn)
    .await?;
    Ok(order)
}

/// Moves the order from exactly `from` to `to` in one guarded update. Zero affected rows means a
/// concurrent writer got there first; the caller decides whether that is an error or a no-op.
pub async fn set_order_status_if(
    order_id: i64,
    from: OrderStatusType,
    to: OrderStatusType,
    conn: &mut SqliteConnection,
) -> Result<Option<Order>, StorageError> {
    let order: Option<Order> = sqlx::query_as(
        r#"
        UPDATE orders SET status = $1, updated_at = CURRENT_TIMESTAMP
        WHERE id = $2 AND status = $3
        RETURNING *;
    "#,
    )
    .bind(to)
    .bind(order_id)
    .bind(from)
    .fetch_optional(conn)
    .await?;
    Ok(order)
}

pub async fn update_order_fields(
    order_id: i64,
    update: OrderChangeSet,
    conn: &mut SqliteConnection,
) -> Result<Option<Order>, StorageError> {
    let mut builder = QueryBuilder::new("UPDATE orders SET updated_at = CURRENT_TIMESTAMP, ");
    let mut set_clause = builder.separated(", ");
    if let Some(address) = update.delivery_address {
        set_clause.push("delivery_address = ");
        set_clause.push_bind_unseparated(address);
    }
    if let Some(notes) = update.notes {
        set_clause.push("notes = ");
        set_clause.push_bind_unseparated(notes);
    }
    builder.push(" WHERE id = ");
    builder.push_bind(order_id);
    builder.push(" RETURNING *");
    trace!("📝️ Executing query: {}", builder.sql());
    let order =
        builder.build().fetch_optional(conn).await?.map(|row: SqliteRow| Order::from_row(&row)).transpose()?;
    Ok(order)
}
