//! # Voucher payment engine public API
//!
//! * [`checkout_api`] creates orders (reserving or selling stock) and wallet deposits, and requests payment intents.
//! * [`settlement_api`] owns the one operation that moves a ledger entry out of `pending`, and handles gateway
//!   callbacks.
//! * [`reconciliation_api`] polls the gateway for pending entries, in batches or on demand, and expires entries that
//!   are overdue.
//! * [`watcher`] follows one entry until it settles, for clients waiting on a payment page.
//! * [`ledger_api`] provides read-only queries.
//!
//! # API usage
//!
//! Every API is created by supplying a storage backend (and, where the gateway is involved, a [`PaymentGateway`]
//! implementation):
//!
//! ```rust,ignore
//! use voucher_payment_engine::{CheckoutApi, EngineConfig, SqliteDatabase};
//! let db = SqliteDatabase::new_with_url(...).await?;
//! let api = CheckoutApi::new(db, my_gateway, EngineConfig::default());
//! let result = api.create_order("user-1", product_id, 2, PaymentMethod::Balance).await?;
//! ```
//!
//! [`PaymentGateway`]: crate::traits::PaymentGateway

pub mod checkout_api;
pub mod engine_config;
pub mod errors;
pub mod ledger_api;
pub mod ledger_objects;
pub mod reconciliation_api;
pub mod settlement_api;
pub mod watcher;
