//! # Payment gateway tools
//!
//! A thin client for the one external payment gateway the voucher payment server talks to.
//!
//! * [`GatewayApi`] creates remote payment intents and polls their status. Every call is bounded by a request timeout
//!   and retried a small, fixed number of times with exponential backoff.
//! * [`TransactionStatus`] is the closed set of outcomes that the gateway's loosely-typed status strings are normalized
//!   into. Nothing outside this crate should ever look at a raw vendor status string.
//! * [`callback_signature`] and [`verify_callback_signature`] implement the gateway's webhook signature scheme.
mod api;
mod config;
mod data_objects;
mod error;
mod retry;
mod signature;
mod status;

pub use api::GatewayApi;
pub use config::{ChannelMap, GatewayConfig};
pub use data_objects::{NewIntent, PaymentIntent, StatusCheck};
pub use error::GatewayApiError;
pub use retry::{with_retries, RetryPolicy};
pub use signature::{callback_signature, verify_callback_signature};
pub use status::TransactionStatus;
