use log::debug;
use sqlx::SqliteConnection;

use super::is_unique_violation;
use crate::{
    db_types::{IntentDetails, LedgerStatus, NewOrder, Order},
    traits::StorageError,
};

/// Inserts a new order using the given connection. This is not atomic. You can embed this call inside a transaction
/// if you need to ensure atomicity, and pass `&mut *tx` as the connection argument.
pub async fn insert_order(
    order: NewOrder,
    status: LedgerStatus,
    settled_payload: Option<String>,
    conn: &mut SqliteConnection,
) -> Result<Order, StorageError> {
    let ref_id = order.external_ref_id.clone();
    let result = sqlx::query_as(
        r#"
            INSERT INTO orders (
                external_ref_id,
                user_id,
                product_id,
                quantity,
                amount,
                payment_method,
                status,
                created_at,
                expires_at,
                settled_payload
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            RETURNING *;
        "#,
    )
    .bind(order.external_ref_id)
    .bind(order.user_id)
    .bind(order.product_id)
    .bind(order.quantity)
    .bind(order.amount)
    .bind(order.payment_method.to_string())
    .bind(status)
    .bind(order.created_at)
    .bind(order.expires_at)
    .bind(settled_payload)
    .fetch_one(conn)
    .await;
    match result {
        Ok(order) => {
            debug!("🗃️ Order [{ref_id}] inserted");
            Ok(order)
        },
        Err(e) if is_unique_violation(&e) => Err(StorageError::DuplicateRefId(ref_id)),
        Err(e) => Err(e.into()),
    }
}

pub async fn fetch_order_by_id(id: i64, conn: &mut SqliteConnection) -> Result<Option<Order>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM orders WHERE id = $1").bind(id).fetch_optional(conn).await
}

pub async fn fetch_order_by_ref(ref_id: &str, conn: &mut SqliteConnection) -> Result<Option<Order>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM orders WHERE external_ref_id = $1").bind(ref_id).fetch_optional(conn).await
}

pub async fn fetch_order_by_intent(
    intent_id: &str,
    conn: &mut SqliteConnection,
) -> Result<Option<Order>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM orders WHERE intent_id = $1 ORDER BY id DESC LIMIT 1")
        .bind(intent_id)
        .fetch_optional(conn)
        .await
}

/// Pending orders, oldest first
pub async fn fetch_pending_orders(limit: i64, conn: &mut SqliteConnection) -> Result<Vec<Order>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM orders WHERE status = 'pending' ORDER BY created_at, id LIMIT $1")
        .bind(limit)
        .fetch_all(conn)
        .await
}

pub async fn attach_intent(
    id: i64,
    intent: &IntentDetails,
    conn: &mut SqliteConnection,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        "UPDATE orders SET intent_id = $1, pay_url = $2, qr_payload = $3 WHERE id = $4 AND status = 'pending'",
    )
    .bind(&intent.intent_id)
    .bind(&intent.pay_url)
    .bind(&intent.qr_payload)
    .bind(id)
    .execute(conn)
    .await?;
    Ok(result.rows_affected() > 0)
}

/// Moves the order from `pending` to `status`. Returns `false` if the order is not pending (or does not exist), in
/// which case nothing changed.
pub async fn transition_from_pending(
    id: i64,
    status: LedgerStatus,
    conn: &mut SqliteConnection,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("UPDATE orders SET status = $1 WHERE id = $2 AND status = 'pending'")
        .bind(status)
        .bind(id)
        .execute(conn)
        .await?;
    Ok(result.rows_affected() == 1)
}

pub async fn set_settled_payload(id: i64, payload: &str, conn: &mut SqliteConnection) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE orders SET settled_payload = $1 WHERE id = $2").bind(payload).bind(id).execute(conn).await?;
    Ok(())
}

pub async fn mark_notified(id: i64, conn: &mut SqliteConnection) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("UPDATE orders SET notified = 1 WHERE id = $1 AND status <> 'pending' AND notified = 0")
        .bind(id)
        .execute(conn)
        .await?;
    Ok(result.rows_affected() > 0)
}
