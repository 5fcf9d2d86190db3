//! SQLite backend for the voucher payment engine.
//!
//! SQLite has no row-level locks. Every mutating transaction here therefore opens with a write statement, which takes
//! the database write lock for the remainder of the transaction. The conditional `UPDATE`s in [`db`] double as the
//! "lock, then check" step.
mod sqlite_impl;

pub mod db;
pub use sqlite_impl::SqliteDatabase;
