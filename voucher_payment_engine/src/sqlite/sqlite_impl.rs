//! `SqliteDatabase` is a concrete implementation of a voucher payment engine backend.
//!
//! Unsurprisingly, it uses SQLite as the backend and implements all the traits defined in the [`traits`] module.
//!
//! [`traits`]: crate::traits
use std::fmt::Debug;

use log::*;
use serde_json::json;
use sqlx::{SqliteConnection, SqlitePool};

use super::db::{db_url, deposits, new_pool, orders, queue, stock, wallets};
use crate::{
    db_types::{
        Deposit,
        IntentDetails,
        LedgerEntry,
        LedgerId,
        LedgerKind,
        LedgerStatus,
        NewDeposit,
        NewOrder,
        NewProduct,
        Order,
        Product,
        ReservationQueueEntry,
        SettlementContext,
        SettlementOutcome,
        SettlementResult,
        StockItem,
        StockStatus,
        StockSummary,
        Wallet,
    },
    traits::{InventoryManagement, LedgerDatabase, StorageError},
};

#[derive(Clone)]
pub struct SqliteDatabase {
    url: String,
    pool: SqlitePool,
}

impl Debug for SqliteDatabase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "SqliteDatabase ({:?})", self.pool)
    }
}

impl InventoryManagement for SqliteDatabase {
    async fn fetch_product(&self, product_id: i64) -> Result<Option<Product>, StorageError> {
        let mut conn = self.pool.acquire().await?;
        let product = stock::fetch_product(product_id, &mut conn).await?;
        Ok(product)
    }

    async fn insert_product(&self, product: NewProduct) -> Result<Product, StorageError> {
        let mut tx = self.pool.begin().await?;
        let product = stock::insert_product(product, &mut tx).await?;
        tx.commit().await?;
        info!("🗃️ Product #{} ({}) created at {}", product.id, product.name, product.price);
        Ok(product)
    }

    async fn set_product_active(&self, product_id: i64, active: bool) -> Result<bool, StorageError> {
        let mut conn = self.pool.acquire().await?;
        let updated = stock::set_product_active(product_id, active, &mut conn).await?;
        Ok(updated)
    }

    async fn add_stock(&self, product_id: i64, codes: &[String]) -> Result<Vec<StockItem>, StorageError> {
        let mut tx = self.pool.begin().await?;
        if stock::fetch_product(product_id, &mut tx).await?.is_none() {
            return Err(StorageError::ProductNotFound(product_id));
        }
        let items = stock::add_stock(product_id, codes, &mut tx).await?;
        tx.commit().await?;
        info!("🗃️ {} stock items added to product #{product_id}", items.len());
        Ok(items)
    }

    async fn fetch_stock_items(&self, product_id: i64) -> Result<Vec<StockItem>, StorageError> {
        let mut conn = self.pool.acquire().await?;
        let items = stock::fetch_stock_items(product_id, &mut conn).await?;
        Ok(items)
    }

    async fn stock_summary(&self, product_id: i64) -> Result<StockSummary, StorageError> {
        let mut conn = self.pool.acquire().await?;
        let summary = stock::stock_summary(product_id, &mut conn).await?;
        Ok(summary)
    }

    async fn fetch_queue_entries(&self, order_id: i64) -> Result<Vec<ReservationQueueEntry>, StorageError> {
        let mut conn = self.pool.acquire().await?;
        let entries = queue::fetch_entries(order_id, &mut conn).await?;
        Ok(entries)
    }
}

impl LedgerDatabase for SqliteDatabase {
    fn url(&self) -> &str {
        self.url.as_str()
    }

    /// Reserves stock and inserts a pending order in one atomic transaction.
    ///
    /// The stock claim is the first statement of the transaction, so the write lock is taken before anything is read.
    async fn reserve_stock_for_order(&self, order: NewOrder) -> Result<(Order, Vec<StockItem>), StorageError> {
        let mut tx = self.pool.begin().await?;
        let items =
            stock::claim_ready_items(order.product_id, order.quantity, &order.user_id, StockStatus::Reserved, &mut tx)
                .await?;
        #[allow(clippy::cast_possible_wrap)]
        let available = items.len() as i64;
        if available < order.quantity {
            tx.rollback().await?;
            debug!(
                "🗃️ Not enough stock for [{}]. {available} of {} available",
                order.external_ref_id, order.quantity
            );
            return Err(StorageError::InsufficientStock { requested: order.quantity, available });
        }
        let user_id = order.user_id.clone();
        let order = orders::insert_order(order, LedgerStatus::Pending, None, &mut tx).await?;
        queue::insert_entries(order.id, &user_id, &items, &mut tx).await?;
        tx.commit().await?;
        debug!("🗃️ {} items reserved for order [{}] until {}", items.len(), order.external_ref_id, order.expires_at);
        Ok((order, items))
    }

    async fn purchase_with_balance(&self, order: NewOrder) -> Result<(Order, Vec<StockItem>), StorageError> {
        let mut tx = self.pool.begin().await?;
        let items =
            stock::claim_ready_items(order.product_id, order.quantity, &order.user_id, StockStatus::Sold, &mut tx)
                .await?;
        #[allow(clippy::cast_possible_wrap)]
        let available = items.len() as i64;
        if available < order.quantity {
            tx.rollback().await?;
            return Err(StorageError::InsufficientStock { requested: order.quantity, available });
        }
        let debited = wallets::debit(&order.user_id, order.amount, order.created_at, &mut tx).await?;
        if debited.is_none() {
            let available = wallets::fetch_wallet(&order.user_id, &mut tx).await?.map(|w| w.balance).unwrap_or_default();
            tx.rollback().await?;
            debug!("🗃️ Wallet for {} cannot cover {}. Balance is {available}", order.user_id, order.amount);
            return Err(StorageError::InsufficientBalance { required: order.amount, available });
        }
        let codes = items.iter().map(|i| i.code.as_str()).collect::<Vec<&str>>();
        let payload = serde_json::to_string(&codes).map_err(|e| StorageError::PayloadError(e.to_string()))?;
        let order = orders::insert_order(order, LedgerStatus::Success, Some(payload), &mut tx).await?;
        tx.commit().await?;
        debug!("🗃️ Order [{}] paid from balance. {} items sold", order.external_ref_id, items.len());
        Ok((order, items))
    }

    async fn insert_deposit(&self, deposit: NewDeposit) -> Result<Deposit, StorageError> {
        let mut tx = self.pool.begin().await?;
        let deposit = deposits::insert_deposit(deposit, &mut tx).await?;
        tx.commit().await?;
        Ok(deposit)
    }

    async fn attach_intent(&self, id: LedgerId, intent: &IntentDetails) -> Result<bool, StorageError> {
        let mut conn = self.pool.acquire().await?;
        let updated = match id.kind {
            LedgerKind::Order => orders::attach_intent(id.id, intent, &mut conn).await?,
            LedgerKind::Deposit => deposits::attach_intent(id.id, intent, &mut conn).await?,
        };
        Ok(updated)
    }

    async fn settle_ledger_entry(
        &self,
        id: LedgerId,
        outcome: SettlementOutcome,
        context: &SettlementContext,
    ) -> Result<SettlementResult, StorageError> {
        let mut tx = self.pool.begin().await?;
        let result = match id.kind {
            LedgerKind::Order => settle_order(id.id, outcome, &mut tx).await?,
            LedgerKind::Deposit => settle_deposit(id.id, outcome, context, &mut tx).await?,
        };
        match &result {
            SettlementResult::Settled(_) => {
                tx.commit().await?;
                debug!("🗃️ Ledger entry {id} settled as {outcome} ({})", context.source);
            },
            SettlementResult::AlreadyProcessed(status) => {
                tx.rollback().await?;
                trace!("🗃️ Ledger entry {id} was already {status}. Nothing to do.");
            },
        }
        Ok(result)
    }

    async fn fetch_ledger_entry(&self, id: LedgerId) -> Result<Option<LedgerEntry>, StorageError> {
        let mut conn = self.pool.acquire().await?;
        let entry = match id.kind {
            LedgerKind::Order => orders::fetch_order_by_id(id.id, &mut conn).await?.map(LedgerEntry::from),
            LedgerKind::Deposit => deposits::fetch_deposit_by_id(id.id, &mut conn).await?.map(LedgerEntry::from),
        };
        Ok(entry)
    }

    async fn fetch_ledger_entry_by_ref(&self, external_ref_id: &str) -> Result<Option<LedgerEntry>, StorageError> {
        let mut conn = self.pool.acquire().await?;
        if let Some(deposit) = deposits::fetch_deposit_by_ref(external_ref_id, &mut conn).await? {
            return Ok(Some(deposit.into()));
        }
        let order = orders::fetch_order_by_ref(external_ref_id, &mut conn).await?;
        Ok(order.map(LedgerEntry::from))
    }

    async fn fetch_ledger_entry_by_intent(&self, intent_id: &str) -> Result<Option<LedgerEntry>, StorageError> {
        let mut conn = self.pool.acquire().await?;
        if let Some(deposit) = deposits::fetch_deposit_by_intent(intent_id, &mut conn).await? {
            return Ok(Some(deposit.into()));
        }
        let order = orders::fetch_order_by_intent(intent_id, &mut conn).await?;
        Ok(order.map(LedgerEntry::from))
    }

    async fn fetch_pending_entries(&self, limit: i64) -> Result<Vec<LedgerEntry>, StorageError> {
        let mut conn = self.pool.acquire().await?;
        let pending_orders = orders::fetch_pending_orders(limit, &mut conn).await?;
        let pending_deposits = deposits::fetch_pending_deposits(limit, &mut conn).await?;
        let mut entries = pending_orders
            .into_iter()
            .map(LedgerEntry::from)
            .chain(pending_deposits.into_iter().map(LedgerEntry::from))
            .collect::<Vec<LedgerEntry>>();
        entries.sort_by_key(|e| e.created_at());
        entries.truncate(usize::try_from(limit).unwrap_or_default());
        Ok(entries)
    }

    async fn mark_notified(&self, id: LedgerId) -> Result<bool, StorageError> {
        let mut conn = self.pool.acquire().await?;
        let updated = match id.kind {
            LedgerKind::Order => orders::mark_notified(id.id, &mut conn).await?,
            LedgerKind::Deposit => deposits::mark_notified(id.id, &mut conn).await?,
        };
        Ok(updated)
    }

    async fn fetch_wallet(&self, user_id: &str) -> Result<Option<Wallet>, StorageError> {
        let mut conn = self.pool.acquire().await?;
        let wallet = wallets::fetch_wallet(user_id, &mut conn).await?;
        Ok(wallet)
    }
}

/// The status flip comes first. If it does not apply, the order was not pending and nothing else is touched.
async fn settle_order(
    id: i64,
    outcome: SettlementOutcome,
    conn: &mut SqliteConnection,
) -> Result<SettlementResult, StorageError> {
    let status = LedgerStatus::from(outcome);
    if !orders::transition_from_pending(id, status, &mut *conn).await? {
        let current = orders::fetch_order_by_id(id, &mut *conn)
            .await?
            .ok_or_else(|| StorageError::LedgerEntryNotFound(LedgerId::order(id).to_string()))?;
        return Ok(SettlementResult::AlreadyProcessed(current.status));
    }
    match outcome {
        SettlementOutcome::Success => {
            let items = stock::sell_reserved_items(id, &mut *conn).await?;
            let codes = items.iter().map(|i| i.code.as_str()).collect::<Vec<&str>>();
            let payload = serde_json::to_string(&codes).map_err(|e| StorageError::PayloadError(e.to_string()))?;
            orders::set_settled_payload(id, &payload, &mut *conn).await?;
            trace!("🗃️ {} items sold for order #{id}", items.len());
        },
        SettlementOutcome::Expired | SettlementOutcome::Failed => {
            let released = stock::release_reserved_items(id, &mut *conn).await?;
            trace!("🗃️ {released} items released from order #{id}");
        },
    }
    queue::delete_entries(id, &mut *conn).await?;
    let order = orders::fetch_order_by_id(id, &mut *conn)
        .await?
        .ok_or_else(|| StorageError::LedgerEntryNotFound(LedgerId::order(id).to_string()))?;
    if outcome == SettlementOutcome::Success && order.codes().len() != usize::try_from(order.quantity).unwrap_or(0) {
        warn!(
            "🗃️ Order [{}] settled with {} codes, but {} were ordered. The reservation queue was inconsistent.",
            order.external_ref_id,
            order.codes().len(),
            order.quantity
        );
    }
    Ok(SettlementResult::Settled(order.into()))
}

async fn settle_deposit(
    id: i64,
    outcome: SettlementOutcome,
    context: &SettlementContext,
    conn: &mut SqliteConnection,
) -> Result<SettlementResult, StorageError> {
    let payload = json!({
        "source": context.source,
        "settled_at": context.settled_at,
        "remote": context.remote,
    })
    .to_string();
    let status = LedgerStatus::from(outcome);
    let deposit = match deposits::transition_from_pending(id, status, &payload, &mut *conn).await? {
        Some(deposit) => deposit,
        None => {
            let current = deposits::fetch_deposit_by_id(id, &mut *conn)
                .await?
                .ok_or_else(|| StorageError::LedgerEntryNotFound(LedgerId::deposit(id).to_string()))?;
            return Ok(SettlementResult::AlreadyProcessed(current.status));
        },
    };
    if outcome == SettlementOutcome::Success {
        let wallet = wallets::credit(&deposit.user_id, deposit.amount, context.settled_at, &mut *conn).await?;
        trace!("🗃️ Wallet for deposit [{}] credited. New balance is {}", deposit.external_ref_id, wallet.balance);
    }
    Ok(SettlementResult::Settled(deposit.into()))
}

impl SqliteDatabase {
    /// Creates a new database API object
    pub async fn new(max_connections: u32) -> Result<Self, sqlx::Error> {
        let url = db_url();
        SqliteDatabase::new_with_url(url.as_str(), max_connections).await
    }

    pub async fn new_with_url(url: &str, max_connections: u32) -> Result<Self, sqlx::Error> {
        trace!("Creating new database connection pool with url {url}");
        let pool = new_pool(url, max_connections).await?;
        let url = url.to_string();
        Ok(Self { url, pool })
    }

    /// Runs the embedded migrations. Safe to call on every start-up.
    pub async fn migrate(&self) -> Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("./src/sqlite/migrations").run(&self.pool).await?;
        debug!("🗃️ Database migrations are up to date");
        Ok(())
    }

    /// Returns a reference to the database connection pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub async fn close(&mut self) -> Result<(), sqlx::Error> {
        self.pool.close().await;
        Ok(())
    }
}
