use chrono::{DateTime, Utc};
use sqlx::SqliteConnection;

use crate::db_types::{Rupiah, Wallet};

pub async fn fetch_wallet(user_id: &str, conn: &mut SqliteConnection) -> Result<Option<Wallet>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM wallets WHERE user_id = $1").bind(user_id).fetch_optional(conn).await
}

/// Adds `amount` to the user's balance, creating the wallet if this is the first credit.
pub async fn credit(
    user_id: &str,
    amount: Rupiah,
    at: DateTime<Utc>,
    conn: &mut SqliteConnection,
) -> Result<Wallet, sqlx::Error> {
    sqlx::query_as(
        r#"
            INSERT INTO wallets (user_id, balance, updated_at) VALUES ($1, $2, $3)
            ON CONFLICT (user_id) DO UPDATE SET balance = balance + excluded.balance, updated_at = excluded.updated_at
            RETURNING *;
        "#,
    )
    .bind(user_id)
    .bind(amount)
    .bind(at)
    .fetch_one(conn)
    .await
}

/// Subtracts `amount` from the user's balance if, and only if, the balance covers it. Returns `None` (and changes
/// nothing) otherwise.
pub async fn debit(
    user_id: &str,
    amount: Rupiah,
    at: DateTime<Utc>,
    conn: &mut SqliteConnection,
) -> Result<Option<Wallet>, sqlx::Error> {
    sqlx::query_as(
        r#"
            UPDATE wallets SET balance = balance - $1, updated_at = $2
            WHERE user_id = $3 AND balance >= $1
            RETURNING *;
        "#,
    )
    .bind(amount)
    .bind(at)
    .bind(user_id)
    .fetch_optional(conn)
    .await
}
