use log::trace;
use sqlx::SqliteConnection;

use crate::{
    db_types::{NewProduct, Product, StockItem, StockStatus, StockSummary},
    traits::StorageError,
};

pub async fn insert_product(product: NewProduct, conn: &mut SqliteConnection) -> Result<Product, StorageError> {
    let product = sqlx::query_as("INSERT INTO products (name, price) VALUES ($1, $2) RETURNING *")
        .bind(product.name)
        .bind(product.price)
        .fetch_one(conn)
        .await?;
    Ok(product)
}

pub async fn fetch_product(product_id: i64, conn: &mut SqliteConnection) -> Result<Option<Product>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM products WHERE id = $1").bind(product_id).fetch_optional(conn).await
}

pub async fn set_product_active(
    product_id: i64,
    active: bool,
    conn: &mut SqliteConnection,
) -> Result<bool, sqlx::Error> {
    let result =
        sqlx::query("UPDATE products SET active = $1 WHERE id = $2").bind(active).bind(product_id).execute(conn).await?;
    Ok(result.rows_affected() > 0)
}

/// Inserts new `ready` stock. This is not atomic on its own; wrap it in a transaction if that matters.
pub async fn add_stock(
    product_id: i64,
    codes: &[String],
    conn: &mut SqliteConnection,
) -> Result<Vec<StockItem>, StorageError> {
    let mut items = Vec::with_capacity(codes.len());
    for code in codes {
        let item: StockItem =
            sqlx::query_as("INSERT INTO stock_items (product_id, code, status) VALUES ($1, $2, 'ready') RETURNING *")
                .bind(product_id)
                .bind(code)
                .fetch_one(&mut *conn)
                .await?;
        items.push(item);
    }
    trace!("🗃️ Added {} stock items for product {product_id}", items.len());
    Ok(items)
}

pub async fn fetch_stock_items(product_id: i64, conn: &mut SqliteConnection) -> Result<Vec<StockItem>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM stock_items WHERE product_id = $1 ORDER BY id").bind(product_id).fetch_all(conn).await
}

pub async fn stock_summary(product_id: i64, conn: &mut SqliteConnection) -> Result<StockSummary, sqlx::Error> {
    let counts: Vec<(StockStatus, i64)> =
        sqlx::query_as("SELECT status, COUNT(*) FROM stock_items WHERE product_id = $1 GROUP BY status")
            .bind(product_id)
            .fetch_all(conn)
            .await?;
    let summary = counts.into_iter().fold(StockSummary::default(), |mut summary, (status, count)| {
        match status {
            StockStatus::Ready => summary.ready = count,
            StockStatus::Reserved => summary.reserved = count,
            StockStatus::Sold => summary.sold = count,
        }
        summary
    });
    Ok(summary)
}

/// Takes up to `quantity` ready items of the product (lowest ids first), assigns them to `owner` and sets their status
/// to `new_status`. This is a single write statement, so when it is the first statement of a transaction it also
/// acquires the write lock that makes concurrent claims mutually exclusive.
///
/// The caller must check that the number of returned items matches `quantity` and roll back otherwise.
pub async fn claim_ready_items(
    product_id: i64,
    quantity: i64,
    owner: &str,
    new_status: StockStatus,
    conn: &mut SqliteConnection,
) -> Result<Vec<StockItem>, sqlx::Error> {
    let mut items: Vec<StockItem> = sqlx::query_as(
        r#"
            UPDATE stock_items SET status = $1, owner = $2
            WHERE id IN (
                SELECT id FROM stock_items WHERE product_id = $3 AND status = 'ready' ORDER BY id LIMIT $4
            )
            RETURNING *;
        "#,
    )
    .bind(new_status)
    .bind(owner)
    .bind(product_id)
    .bind(quantity)
    .fetch_all(conn)
    .await?;
    items.sort_by_key(|i| i.id);
    Ok(items)
}

/// Flips every item reserved for the order to `sold`, returning the items.
pub async fn sell_reserved_items(order_id: i64, conn: &mut SqliteConnection) -> Result<Vec<StockItem>, sqlx::Error> {
    let mut items: Vec<StockItem> = sqlx::query_as(
        r#"
            UPDATE stock_items SET status = 'sold'
            WHERE status = 'reserved' AND id IN (SELECT stock_item_id FROM reservation_queue WHERE order_id = $1)
            RETURNING *;
        "#,
    )
    .bind(order_id)
    .fetch_all(conn)
    .await?;
    items.sort_by_key(|i| i.id);
    Ok(items)
}

/// Returns every item reserved for the order to the ready pool and clears its owner.
pub async fn release_reserved_items(order_id: i64, conn: &mut SqliteConnection) -> Result<u64, sqlx::Error> {
    let result = sqlx::query(
        r#"
            UPDATE stock_items SET status = 'ready', owner = NULL
            WHERE status = 'reserved' AND id IN (SELECT stock_item_id FROM reservation_queue WHERE order_id = $1);
        "#,
    )
    .bind(order_id)
    .execute(conn)
    .await?;
    Ok(result.rows_affected())
}
