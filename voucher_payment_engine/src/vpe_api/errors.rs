use thiserror::Error;

use crate::{db_types::Rupiah, traits::StorageError};

#[derive(Debug, Clone, Error)]
pub enum CheckoutError {
    #[error("Invalid quantity: {0}")]
    InvalidQuantity(i64),
    #[error("Invalid amount: {0}")]
    InvalidAmount(Rupiah),
    #[error("The minimum deposit is {minimum}")]
    DepositTooSmall { minimum: Rupiah },
    #[error("Product {0} does not exist")]
    ProductNotFound(i64),
    #[error("Product {0} is not available for sale")]
    ProductInactive(i64),
    #[error("Unsupported payment channel: {0}")]
    UnknownChannel(String),
    #[error("Not enough stock. {requested} requested, but only {available} available")]
    InsufficientStock { requested: i64, available: i64 },
    #[error("Insufficient balance. {required} required, but the wallet holds {available}")]
    InsufficientBalance { required: Rupiah, available: Rupiah },
    #[error("Database error: {0}")]
    DatabaseError(String),
}

impl From<StorageError> for CheckoutError {
    fn from(e: StorageError) -> Self {
        match e {
            StorageError::ProductNotFound(id) => Self::ProductNotFound(id),
            StorageError::ProductInactive(id) => Self::ProductInactive(id),
            StorageError::InsufficientStock { requested, available } => Self::InsufficientStock { requested, available },
            StorageError::InsufficientBalance { required, available } => {
                Self::InsufficientBalance { required, available }
            },
            e => Self::DatabaseError(e.to_string()),
        }
    }
}

#[derive(Debug, Clone, Error)]
pub enum SettlementError {
    #[error("The callback signature is invalid")]
    InvalidSignature,
    #[error("No ledger entry matches {0}")]
    LedgerEntryNotFound(String),
    #[error("Database error: {0}")]
    DatabaseError(String),
}

impl From<StorageError> for SettlementError {
    fn from(e: StorageError) -> Self {
        match e {
            StorageError::LedgerEntryNotFound(id) => Self::LedgerEntryNotFound(id),
            e => Self::DatabaseError(e.to_string()),
        }
    }
}

#[derive(Debug, Clone, Error)]
pub enum ReconciliationError {
    #[error("No ledger entry matches {0}")]
    LedgerEntryNotFound(String),
    #[error("Database error: {0}")]
    DatabaseError(String),
}

impl From<StorageError> for ReconciliationError {
    fn from(e: StorageError) -> Self {
        match e {
            StorageError::LedgerEntryNotFound(id) => Self::LedgerEntryNotFound(id),
            e => Self::DatabaseError(e.to_string()),
        }
    }
}

impl From<SettlementError> for ReconciliationError {
    fn from(e: SettlementError) -> Self {
        match e {
            SettlementError::LedgerEntryNotFound(id) => Self::LedgerEntryNotFound(id),
            e => Self::DatabaseError(e.to_string()),
        }
    }
}
