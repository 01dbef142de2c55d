use log::trace;
use sqlx::{QueryBuilder, SqliteConnection};

use crate::{
    db_types::{NewTransaction, PaymentTransaction, TransactionStatusType},
    fge_api::payment_objects::TransactionQueryFilter,
    traits::StorageError,
};

/// Creates a `pending` transaction, but only if the order has no pending transaction already.
/// Returns `None` when the guard refused the insert. The conditional `INSERT ... SELECT` makes
/// the check-and-insert a single statement, and the partial unique index on
/// `transactions(order_id) WHERE status = 'pending'` backs it up at the schema level.
pub async fn insert_transaction(
    transaction: NewTransaction,
    conn: &mut SqliteConnection,
) -> Result<Option<PaymentTransaction>, StorageError> {
    let inserted: Option<PaymentTransaction> = sqlx::query_as(
        r#"
        INSERT INTO transactions (order_id, amount, provider)
        SELECT $1, $2, $3
        WHERE NOT EXISTS (SELECT 1 FROM transactions WHERE order_id = $4 AND status = 'pending')
        RETURNING *;
    "#,
    )
    .bind(transaction.order_id)
    .bind(transaction.amount)
    .bind(transaction.provider)
    .bind(transaction.order_id)
    .fetch_optional(conn)
    .await?;
    Ok(inserted)
}

pub async fn record_provider_session(
    transaction_id: i64,
    external_id: &str,
    metadata: Option<&str>,
    conn: &mut SqliteConnection,
) -> Result<Option<PaymentTransaction>, StorageError> {
    let transaction: Option<PaymentTransaction> = sqlx::query_as(
        r#"
        UPDATE transactions SET external_id = $1, metadata = $2, updated_at = CURRENT_TIMESTAMP
        WHERE id = $3
        RETURNING *;
    "#,
    )
    .bind(external_id)
    .bind(metadata)
    .bind(transaction_id)
    .fetch_optional(conn)
    .await?;
    Ok(transaction)
}

pub async fn fetch_transaction(
    transaction_id: i64,
    conn: &mut SqliteConnection,
) -> Result<Option<PaymentTransaction>, StorageError> {
    let transaction =
        sqlx::query_as("SELECT * FROM transactions WHERE id = $1").bind(transaction_id).fetch_optional(conn).await?;
    Ok(transaction)
}

pub async fn fetch_transaction_by_external_id(
    external_id: &str,
    conn: &mut SqliteConnection,
) -> Result<Option<PaymentTransaction>, StorageError> {
    let transaction = sqlx::query_as("SELECT * FROM transactions WHERE external_id = $1")
        .bind(external_id)
        .fetch_optional(conn)
        .await?;
    Ok(transaction)
}

/// Fetches transactions according to the criteria in the `TransactionQueryFilter`, newest
/// first. The participant filter joins through orders so buyers and sellers only ever see
/// transactions on their own orders.
pub async fn search_transactions(
    query: TransactionQueryFilter,
    conn: &mut SqliteConnection,
) -> Result<Vec<PaymentTransaction>, StorageError> {
    let mut builder =
        QueryBuilder::new("SELECT transactions.* FROM transactions JOIN orders ON orders.id = transactions.order_id ");
    if !query.is_empty() {
        builder.push("WHERE ");
    }
    let mut where_clause = builder.separated(" AND ");
    if let Some(order_id) = query.order_id {
        where_clause.push("transactions.order_id = ");
        where_clause.push_bind_unseparated(order_id);
    }
    if let Some(user_id) = query.participant_id {
        where_clause.push("(orders.shop_id = ");
        where_clause.push_bind_unseparated(user_id);
        where_clause.push_unseparated(" OR orders.farmer_id = ");
        where_clause.push_bind_unseparated(user_id);
        where_clause.push_unseparated(")");
    }
    if let Some(status) = query.status {
        where_clause.push("transactions.status = ");
        where_clause.push_bind_unseparated(status);
    }
    builder.push(" ORDER BY transactions.created_at DESC");
    trace!("💰️ Executing query: {}", builder.sql());
    let transactions = builder.build_query_as::<PaymentTransaction>().fetch_all(conn).await?;
    Ok(transactions)
}

/// Moves the transaction out of `pending` into `to`. The status guard makes the update
/// idempotent under webhook replays: a transaction that already settled matches zero rows and
/// `None` comes back.
pub async fn settle_transaction(
    transaction_id: i64,
    to: TransactionStatusType,
    conn: &mut SqliteConnection,
) -> Result<Option<PaymentTransaction>, StorageError> {
    let transaction: Option<PaymentTransaction> = sqlx::query_as(
        r#"
        UPDATE transactions SET status = $1, updated_at = CURRENT_TIMESTAMP
        WHERE id = $2 AND status = 'pending'
        RETURNING *;
    "#,
    )
    .bind(to)
    .bind(transaction_id)
    .fetch_optional(conn)
    .await?;
    Ok(transaction)
}

/// Moves a `completed` transaction to `refunded`. Any other current status matches zero rows.
pub async fn refund_transaction(
    transaction_id: i64,
    conn: &mut SqliteConnection,
) -> Result<Option<PaymentTransaction>, StorageError> {
    let transaction: Option<PaymentTransaction> = sqlx::query_as(
        r#"
        UPDATE transactions SET status = 'refunded', updated_at = CURRENT_TIMESTAMP
        WHERE id = $1 AND status = 'completed'
        RETURNING *;
    "#,
    )
    .bind(transaction_id)
    .fetch_optional(conn)
    .await?;
    Ok(transaction)
}
