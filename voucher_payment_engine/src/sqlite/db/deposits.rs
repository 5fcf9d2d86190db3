use log::debug;
use sqlx::SqliteConnection;

use super::is_unique_violation;
use crate::{
    db_types::{Deposit, IntentDetails, LedgerStatus, NewDeposit},
    traits::StorageError,
};

pub async fn insert_deposit(deposit: NewDeposit, conn: &mut SqliteConnection) -> Result<Deposit, StorageError> {
    let ref_id = deposit.external_ref_id.clone();
    let result = sqlx::query_as(
        r#"
            INSERT INTO deposits (external_ref_id, user_id, amount, channel, created_at, expires_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *;
        "#,
    )
    .bind(deposit.external_ref_id)
    .bind(deposit.user_id)
    .bind(deposit.amount)
    .bind(deposit.channel)
    .bind(deposit.created_at)
    .bind(deposit.expires_at)
    .fetch_one(conn)
    .await;
    match result {
        Ok(deposit) => {
            debug!("🗃️ Deposit [{ref_id}] inserted");
            Ok(deposit)
        },
        Err(e) if is_unique_violation(&e) => Err(StorageError::DuplicateRefId(ref_id)),
        Err(e) => Err(e.into()),
    }
}

pub async fn fetch_deposit_by_id(id: i64, conn: &mut SqliteConnection) -> Result<Option<Deposit>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM deposits WHERE id = $1").bind(id).fetch_optional(conn).await
}

pub async fn fetch_deposit_by_ref(ref_id: &str, conn: &mut SqliteConnection) -> Result<Option<Deposit>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM deposits WHERE external_ref_id = $1").bind(ref_id).fetch_optional(conn).await
}

pub async fn fetch_deposit_by_intent(
    intent_id: &str,
    conn: &mut SqliteConnection,
) -> Result<Option<Deposit>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM deposits WHERE intent_id = $1 ORDER BY id DESC LIMIT 1")
        .bind(intent_id)
        .fetch_optional(conn)
        .await
}

/// Pending deposits, oldest first
pub async fn fetch_pending_deposits(limit: i64, conn: &mut SqliteConnection) -> Result<Vec<Deposit>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM deposits WHERE status = 'pending' ORDER BY created_at, id LIMIT $1")
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
        "UPDATE deposits SET intent_id = $1, pay_url = $2, qr_payload = $3 WHERE id = $4 AND status = 'pending'",
    )
    .bind(&intent.intent_id)
    .bind(&intent.pay_url)
    .bind(&intent.qr_payload)
    .bind(id)
    .execute(conn)
    .await?;
    Ok(result.rows_affected() > 0)
}

/// Moves the deposit from `pending` to `status`, attaching the settlement payload in the same statement. Returns the
/// updated deposit, or `None` if it was not pending.
pub async fn transition_from_pending(
    id: i64,
    status: LedgerStatus,
    payload: &str,
    conn: &mut SqliteConnection,
) -> Result<Option<Deposit>, sqlx::Error> {
    sqlx::query_as(
        "UPDATE deposits SET status = $1, settled_payload = $2 WHERE id = $3 AND status = 'pending' RETURNING *",
    )
    .bind(status)
    .bind(payload)
    .bind(id)
    .fetch_optional(conn)
    .await
}

pub async fn mark_notified(id: i64, conn: &mut SqliteConnection) -> Result<bool, sqlx::Error> {
    let result =
        sqlx::query("UPDATE deposits SET notified = 1 WHERE id = $1 AND status <> 'pending' AND notified = 0")
            .bind(id)
            .execute(conn)
            .await?;
    Ok(result.rows_affected() > 0)
}
