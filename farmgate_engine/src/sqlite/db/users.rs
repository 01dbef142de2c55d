use sqlx::SqliteConnection;

use crate::{
    db_types::{NewUser, User},
    traits::StorageError,
};

pub async fn fetch_user(user_id: i64, conn: &mut SqliteConnection) -> Result<Option<User>, StorageError> {
    let user = sqlx::query_as("SELECT * FROM users WHERE id = $1").bind(user_id).fetch_optional(conn).await?;
    Ok(user)
}

pub async fn fetch_user_by_phone(phone: &str, conn: &mut SqliteConnection) -> Result<Option<User>, StorageError> {
    let user = sqlx::query_as("SELECT * FROM users WHERE phone = $1").bind(phone).fetch_optional(conn).await?;
    Ok(user)
}

/// Inserts the user, or updates name and role if the phone number is already registered.
pub async fn upsert_user(user: NewUser, conn: &mut SqliteConnection) -> Result<User, StorageError> {
    let user = sqlx::query_as(
        r#"
        INSERT INTO users (phone, name, role) VALUES ($1, $2, $3)
        ON CONFLICT (phone) DO UPDATE
        SET name = excluded.name, role = excluded.role, updated_at = CURRENT_TIMESTAMP
        RETURNING *;
    "#,
    )
    .bind(user.phone)
    .bind(user.name)
    .bind(user.role)
    .fetch_one(conn)
    .await?;
    Ok(user)
}
