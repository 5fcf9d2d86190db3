use std::fmt::Debug;

use crate::{
    db_types::{Deposit, LedgerEntry, Order, Rupiah, StockItem, StockSummary, Wallet},
    traits::{LedgerDatabase, StorageError},
};

/// Read-only queries over the ledgers, wallets and stock.
pub struct LedgerApi<B> {
    db: B,
}

impl<B> Debug for LedgerApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "LedgerApi")
    }
}

impl<B> LedgerApi<B> {
    pub fn new(db: B) -> Self {
        Self { db }
    }

    pub fn db(&self) -> &B {
        &self.db
    }
}

impl<B> LedgerApi<B>
where B: LedgerDatabase
{
    pub async fn fetch_entry_by_ref(&self, ref_id: &str) -> Result<Option<LedgerEntry>, StorageError> {
        self.db.fetch_ledger_entry_by_ref(ref_id).await
    }

    pub async fn fetch_order_by_ref(&self, ref_id: &str) -> Result<Option<Order>, StorageError> {
        match self.db.fetch_ledger_entry_by_ref(ref_id).await? {
            Some(LedgerEntry::Order(order)) => Ok(Some(order)),
            _ => Ok(None),
        }
    }

    pub async fn fetch_deposit_by_ref(&self, ref_id: &str) -> Result<Option<Deposit>, StorageError> {
        match self.db.fetch_ledger_entry_by_ref(ref_id).await? {
            Some(LedgerEntry::Deposit(deposit)) => Ok(Some(deposit)),
            _ => Ok(None),
        }
    }

    pub async fn fetch_wallet(&self, user_id: &str) -> Result<Option<Wallet>, StorageError> {
        self.db.fetch_wallet(user_id).await
    }

    /// Users without a wallet have a zero balance.
    pub async fn wallet_balance(&self, user_id: &str) -> Result<Rupiah, StorageError> {
        let wallet = self.db.fetch_wallet(user_id).await?;
        Ok(wallet.map(|w| w.balance).unwrap_or_default())
    }

    pub async fn stock_summary(&self, product_id: i64) -> Result<StockSummary, StorageError> {
        self.db.stock_summary(product_id).await
    }

    pub async fn fetch_stock_items(&self, product_id: i64) -> Result<Vec<StockItem>, StorageError> {
        self.db.fetch_stock_items(product_id).await
    }
}
