//! # Backend and collaborator contracts
//!
//! The engine APIs are generic over two seams:
//!
//! * Storage backends implement [`InventoryManagement`] (products, stock and the reservation queue) and
//!   [`LedgerDatabase`] (orders, deposits, wallets and the one settlement mutator). Every mutating method is a single
//!   atomic transaction.
//! * The external payment provider is reached through a [`PaymentGateway`]. Implementations are responsible for
//!   turning vendor status strings into a [`RemoteStatus`](crate::db_types::RemoteStatus), bounding every call with a
//!   timeout, and retrying transient failures.
mod inventory_management;
mod ledger_database;
mod payment_gateway;

pub use inventory_management::InventoryManagement;
pub use ledger_database::{LedgerDatabase, StorageError};
pub use payment_gateway::{
    CallbackVerifier,
    GatewayError,
    IntentRequest,
    PaymentGateway,
    RemoteStatusReport,
    StatusQuery,
};
