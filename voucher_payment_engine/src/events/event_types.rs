use serde::{Deserialize, Serialize};

use crate::db_types::LedgerEntry;

/// Emitted after a ledger entry has left `pending` and the change has been committed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerSettledEvent {
    pub entry: LedgerEntry,
    /// What triggered the settlement, e.g. `callback`, `reconcile` or `watcher`
    pub source: String,
}

impl LedgerSettledEvent {
    pub fn new<S: Into<String>>(entry: LedgerEntry, source: S) -> Self {
        Self { entry, source: source.into() }
    }
}
