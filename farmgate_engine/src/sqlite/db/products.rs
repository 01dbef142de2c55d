use fgp_common::Quantity;
use log::{debug, trace};
use sqlx::{sqlite::SqliteRow, FromRow, QueryBuilder, SqliteConnection};

use crate::{
    db_types::{NewProduct, Product},
    fge_api::catalog_objects::{ProductQueryFilter, ProductUpdate},
    traits::StorageError,
};

pub async fn insert_product(product: NewProduct, conn: &mut SqliteConnection) -> Result<Product, StorageError> {
    let product = sqlx::query_as(
        r#"
        INSERT INTO products (farmer_id, name, description, category, unit, price, quantity, image_url)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        RETURNING *;
    "#,
    )
    .bind(product.farmer_id)
    .bind(product.name)
    .bind(product.description)
    .bind(product.category)
    .bind(product.unit)
    .bind(product.price)
    .bind(product.quantity)
    .bind(product.image_url)
    .fetch_one(conn)
    .await?;
    Ok(product)
}

pub async fn fetch_product(product_id: i64, conn: &mut SqliteConnection) -> Result<Option<Product>, StorageError> {
    let product =
        sqlx::query_as("SELECT * FROM products WHERE id = $1").bind(product_id).fetch_optional(conn).await?;
    Ok(product)
}

/// Fetches products according to criteria specified in the `ProductQueryFilter`, newest first.
pub async fn search_products(
    query: ProductQueryFilter,
    conn: &mut SqliteConnection,
) -> Result<Vec<Product>, StorageError> {
    let mut builder = QueryBuilder::new("SELECT * FROM products ");
    let has_criteria =
        query.farmer_id.is_some() || query.category.is_some() || query.name_like.is_some() || query.active_only;
    if has_criteria {
        builder.push("WHERE ");
    }
    let mut where_clause = builder.separated(" AND ");
    if let Some(farmer_id) = query.farmer_id {
        where_clause.push("farmer_id = ");
        where_clause.push_bind_unseparated(farmer_id);
    }
    if let Some(category) = query.category {
        where_clause.push("category = ");
        where_clause.push_bind_unseparated(category);
    }
    if let Some(fragment) = query.name_like {
        where_clause.push("name LIKE ");
        where_clause.push_bind_unseparated(format!("%{fragment}%"));
    }
    if query.active_only {
        where_clause.push("is_active = 1");
    }
    builder.push(" ORDER BY created_at DESC");
    trace!("🥕️ Executing query: {}", builder.sql());
    let products = builder.build_query_as::<Product>().fetch_all(conn).await?;
    Ok(products)
}

pub async fn update_product(
    product_id: i64,
    update: ProductUpdate,
    conn: &mut SqliteConnection,
) -> Result<Option<Product>, StorageError> {
    let mut builder = QueryBuilder::new("UPDATE products SET updated_at = CURRENT_TIMESTAMP, ");
    let mut set_clause = builder.separated(", ");
    if let Some(name) = update.name {
        set_clause.push("name = ");
        set_clause.push_bind_unseparated(name);
    }
    if let Some(description) = update.description {
        set_clause.push("description = ");
        set_clause.push_bind_unseparated(description);
    }
    if let Some(category) = update.category {
        set_clause.push("category = ");
        set_clause.push_bind_unseparated(category);
    }
    if let Some(unit) = update.unit {
        set_clause.push("unit = ");
        set_clause.push_bind_unseparated(unit);
    }
    if let Some(price) = update.price {
        set_clause.push("price = ");
        set_clause.push_bind_unseparated(price);
    }
    if let Some(quantity) = update.quantity {
        set_clause.push("quantity = ");
        set_clause.push_bind_unseparated(quantity);
    }
    if let Some(image_url) = update.image_url {
        set_clause.push("image_url = ");
        set_clause.push_bind_unseparated(image_url);
    }
    if let Some(is_active) = update.is_active {
        set_clause.push("is_active = ");
        set_clause.push_bind_unseparated(is_active);
    }
    builder.push(" WHERE id = ");
    builder.push_bind(product_id);
    builder.push(" RETURNING *");
    trace!("🥕️ Executing query: {}", builder.sql());
    let product =
        builder.build().fetch_optional(conn).await?.map(|row: SqliteRow| Product::from_row(&row)).transpose()?;
    Ok(product)
}

/// Atomically decrement the available quantity, but only while enough stock remains. The
/// conditional `WHERE` clause and the affected-row check are the concurrency control: two
/// reservations racing for the same stock serialize on the row, and the loser matches zero rows
/// instead of driving the quantity negative.
pub async fn reserve_stock(
    product_id: i64,
    quantity: Quantity,
    conn: &mut SqliteConnection,
) -> Result<Product, StorageError> {
    let updated: Option<Product> = sqlx::query_as(
        r#"
        UPDATE products SET quantity = quantity - $1, updated_at = CURRENT_TIMESTAMP
        WHERE id = $2 AND quantity >= $3
        RETURNING *;
    "#,
    )
    .bind(quantity)
    .bind(product_id)
    .bind(quantity)
    .fetch_optional(&mut *conn)
    .await?;
    match updated {
        Some(product) => {
            debug!("📦️ Reserved {quantity} of product {product_id}; {} remaining", product.quantity);
            Ok(product)
        },
        // Zero rows matched: either the product is gone or the stock is short.
        None => match fetch_product(product_id, conn).await? {
            Some(product) => Err(StorageError::InsufficientStock {
                product_id,
                requested: quantity,
                available: product.quantity,
            }),
            None => Err(StorageError::ProductNotFound(product_id)),
        },
    }
}

/// Return previously reserved quantity to the product.
pub async fn release_stock(
    product_id: i64,
    quantity: Quantity,
    conn: &mut SqliteConnection,
) -> Result<Product, StorageError> {
    let updated: Option<Product> = sqlx::query_as(
        "UPDATE products SET quantity = quantity + $1, updated_at = CURRENT_TIMESTAMP WHERE id = $2 RETURNING *",
    )
    .bind(quantity)
    .bind(product_id)
    .fetch_optional(conn)
    .await?;
    match updated {
        Some(product) => {
            debug!("📦️ Released {quantity} back to product {product_id}; {} available", product.quantity);
            Ok(product)
        },
        None => Err(StorageError::ProductNotFound(product_id)),
    }
}

/// Count order lines that reference the product from orders still in a non-terminal state.
pub async fn count_open_order_lines(product_id: i64, conn: &mut SqliteConnection) -> Result<i64, StorageError> {
    let (count,): (i64,) = sqlx::query_as(
        r#"
        SELECT COUNT(*) FROM order_lines
        JOIN orders ON orders.id = order_lines.order_id
        WHERE order_lines.product_id = $1 AND orders.status NOT IN ('delivered', 'cancelled')
    "#,
    )
    .bind(product_id)
    .fetch_one(conn)
    .await?;
    Ok(count)
}

/// Count order lines that reference the product from any order, open or closed.
pub async fn count_order_lines(product_id: i64, conn: &mut SqliteConnection) -> Result<i64, StorageError> {
    let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM order_lines WHERE product_id = $1")
        .bind(product_id)
        .fetch_one(conn)
        .await?;
    Ok(count)
}

pub async fn delete_product(product_id: i64, conn: &mut SqliteConnection) -> Result<bool, StorageError> {
    let result = sqlx::query("DELETE FROM products WHERE id = $1").bind(product_id).execute(conn).await?;
    Ok(result.rows_affected() > 0)
}

pub async fn deactivate_product(product_id: i64, conn: &mut SqliteConnection) -> Result<Option<Product>, StorageError> {
    let product: Option<Product> = sqlx::query_as(
        "UPDATE products SET is_active = 0, updated_at = CURRENT_TIMESTAMP WHERE id = $1 RETURNING *",
    )
    .bind(product_id)
    .fetch_optional(conn)
    .await?;
    Ok(product)
}
