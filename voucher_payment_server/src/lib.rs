//! # Voucher payment server
//! This module hosts the server code for the voucher payment gateway. It is responsible for:
//! * Taking orders and wallet deposits from users, and handing them to the payment engine.
//! * Receiving payment notifications from the external payment gateway.
//! * Running the reconciliation worker, which catches payments whose notification never arrived and expires the
//!   ones that were never paid.
//!
//! ## Configuration
//! The server is configured via environment variables. See [config](config/index.html) for more information.
//!
//! ## Routes
//! The server exposes the following routes:
//! * `/health`: A health check route that returns a 200 OK response.
//! * `/callback`: The webhook route for payment notifications from the gateway.
//! * `/api/orders` and `/api/deposits`: Checkout.
//! * `/api/ledger/{ref_id}` and `/api/watch/{ref_id}`: Payment status, once or as a stream.
//! * `/api/balance`: The user's wallet balance.
//! * `/api/reconcile`: Manual reconciliation (requires the admin key).
//!
//! The user's identity is taken from the `X-User-Id` header, which an upstream authentication layer is expected to set.

pub mod auth;
pub mod cli;
pub mod config;
pub mod data_objects;
pub mod errors;
pub mod helpers;
pub mod integrations;
pub mod middleware;
pub mod reconciliation_worker;
pub mod routes;
pub mod server;

#[cfg(test)]
mod endpoint_tests;
