//! Voucher Payment Engine
//!
//! The engine sells redeemable voucher codes from a finite stock pool, paid either from a user's wallet balance or
//! through an external payment gateway, and keeps wallet top-ups (deposits) on the same footing.
//!
//! The library is divided into three main sections:
//! 1. Storage ([`traits`] and the SQLite backend). Stock reservation and settlement are atomic database transactions;
//!    the database is the only arbiter between concurrent webhooks, pollers and user requests. The data types used in
//!    the database live in [`db_types`] and are public.
//! 2. The public API ([`mod@vpe_api`]): checkout, settlement, reconciliation, the per-order watcher and read-only
//!    queries.
//! 3. Events ([`events`]). Subscribers are told about settled ledger entries after the settlement has committed, so
//!    that notification failures can never undo a payment.
#[cfg(feature = "sqlite")]
mod sqlite;

pub mod db_types;
pub mod events;
pub mod helpers;
pub mod traits;
mod vpe_api;

#[cfg(any(feature = "test_utils", test))]
pub mod test_utils;

#[cfg(feature = "sqlite")]
pub use sqlite::SqliteDatabase;
pub use vpe_api::{
    checkout_api::CheckoutApi,
    engine_config::EngineConfig,
    errors::{CheckoutError, ReconciliationError, SettlementError},
    ledger_api::LedgerApi,
    ledger_objects,
    reconciliation_api::ReconciliationApi,
    settlement_api::SettlementApi,
    watcher::PaymentWatcher,
};
