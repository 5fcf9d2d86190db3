use sqlx::SqliteConnection;

use crate::db_types::{ReservationQueueEntry, StockItem};

/// Inserts one queue entry per reserved item. `stock_item_id` is unique in the queue, so an attempt to queue an item
/// twice fails the whole transaction.
pub async fn insert_entries(
    order_id: i64,
    user_id: &str,
    items: &[StockItem],
    conn: &mut SqliteConnection,
) -> Result<(), sqlx::Error> {
    for item in items {
        sqlx::query("INSERT INTO reservation_queue (order_id, stock_item_id, user_id) VALUES ($1, $2, $3)")
            .bind(order_id)
            .bind(item.id)
            .bind(user_id)
            .execute(&mut *conn)
            .await?;
    }
    Ok(())
}

pub async fn fetch_entries(
    order_id: i64,
    conn: &mut SqliteConnection,
) -> Result<Vec<ReservationQueueEntry>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM reservation_queue WHERE order_id = $1 ORDER BY stock_item_id")
        .bind(order_id)
        .fetch_all(conn)
        .await
}

pub async fn delete_entries(order_id: i64, conn: &mut SqliteConnection) -> Result<u64, sqlx::Error> {
    let result = sqlx::query("DELETE FROM reservation_queue WHERE order_id = $1").bind(order_id).execute(conn).await?;
    Ok(result.rows_affected())
}
