use thiserror::Error;

use crate::{
    db_types::{
        Deposit,
        IntentDetails,
        LedgerEntry,
        LedgerId,
        NewDeposit,
        NewOrder,
        Order,
        Rupiah,
        SettlementContext,
        SettlementOutcome,
        SettlementResult,
        StockItem,
        Wallet,
    },
    traits::InventoryManagement,
};

/// This trait defines the behaviour that storage backends must provide for the voucher payment engine.
///
/// All the methods that change state do so in exactly one database transaction. Implementations must guarantee that
/// * no stock item is ever handed to two ledger entries,
/// * a ledger entry leaves `pending` at most once, and
/// * wallet balances only change in the same transaction as the ledger transition that causes the change.
#[allow(async_fn_in_trait)]
pub trait LedgerDatabase: Clone + InventoryManagement {
    /// The URL of the database
    fn url(&self) -> &str;

    /// Reserves `order.quantity` ready stock items for the order's user and inserts the order as `pending`, along
    /// with one reservation queue entry per item.
    ///
    /// If fewer than `quantity` items are available, nothing is changed and
    /// [`StorageError::InsufficientStock`] is returned.
    async fn reserve_stock_for_order(&self, order: NewOrder) -> Result<(Order, Vec<StockItem>), StorageError>;

    /// Sells `order.quantity` ready stock items to the order's user, paying from their wallet. The order is inserted
    /// already settled, with the delivered codes as its payload.
    ///
    /// Insufficient stock or balance aborts the whole transaction.
    async fn purchase_with_balance(&self, order: NewOrder) -> Result<(Order, Vec<StockItem>), StorageError>;

    async fn insert_deposit(&self, deposit: NewDeposit) -> Result<Deposit, StorageError>;

    /// Records the remote payment intent against a ledger entry. Only pending entries are updated; the return value
    /// says whether a row changed.
    async fn attach_intent(&self, id: LedgerId, intent: &IntentDetails) -> Result<bool, StorageError>;

    /// Moves a pending ledger entry to the terminal status given by `outcome`.
    ///
    /// This is the one and only way a ledger entry leaves `pending`. The status change and its side effects happen
    /// together:
    /// * Successful orders: reserved items become sold and their codes are copied into the settled payload.
    /// * Expired or failed orders: reserved items return to `ready` with no owner.
    /// * Successful deposits: the user's wallet is credited with the deposit amount.
    /// * In every case the order's reservation queue entries are removed.
    ///
    /// If the entry has already left `pending`, nothing changes and [`SettlementResult::AlreadyProcessed`] is
    /// returned.
    async fn settle_ledger_entry(
        &self,
        id: LedgerId,
        outcome: SettlementOutcome,
        context: &SettlementContext,
    ) -> Result<SettlementResult, StorageError>;

    async fn fetch_ledger_entry(&self, id: LedgerId) -> Result<Option<LedgerEntry>, StorageError>;

    /// Resolves an external reference id. The deposit ledger is searched first, then the order ledger.
    async fn fetch_ledger_entry_by_ref(&self, external_ref_id: &str) -> Result<Option<LedgerEntry>, StorageError>;

    /// Resolves a gateway-assigned intent id.
    async fn fetch_ledger_entry_by_intent(&self, intent_id: &str) -> Result<Option<LedgerEntry>, StorageError>;

    /// At most `limit` pending entries across both ledgers, oldest first.
    async fn fetch_pending_entries(&self, limit: i64) -> Result<Vec<LedgerEntry>, StorageError>;

    /// Flags a settled ledger entry as having been announced. This is the only change allowed on a terminal entry.
    async fn mark_notified(&self, id: LedgerId) -> Result<bool, StorageError>;

    async fn fetch_wallet(&self, user_id: &str) -> Result<Option<Wallet>, StorageError>;
}

#[derive(Debug, Clone, Error)]
pub enum StorageError {
    #[error("We have an internal database engine (configuration/uptime etc.) : {0}")]
    DatabaseError(String),
    #[error("Product {0} does not exist")]
    ProductNotFound(i64),
    #[error("Product {0} is not available for sale")]
    ProductInactive(i64),
    #[error("Not enough stock. {requested} requested, but only {available} available")]
    InsufficientStock { requested: i64, available: i64 },
    #[error("Insufficient balance. {required} required, but the wallet holds {available}")]
    InsufficientBalance { required: Rupiah, available: Rupiah },
    #[error("The ledger entry {0} does not exist")]
    LedgerEntryNotFound(String),
    #[error("The external reference id {0} is already in use")]
    DuplicateRefId(String),
    #[error("Could not serialize the settlement payload. {0}")]
    PayloadError(String),
}

impl From<sqlx::Error> for StorageError {
    fn from(e: sqlx::Error) -> Self {
        StorageError::DatabaseError(e.to_string())
    }
}
