use chrono::{DateTime, Utc};

use crate::db_types::LedgerKind;

/// Generates the gateway-facing reference for a new ledger entry, e.g. `ORD-1718000000000-3fa2c1`.
///
/// The prefix keeps order and deposit references apart; the random suffix separates entries created in the same
/// millisecond. Uniqueness is ultimately enforced by the database.
pub fn new_external_ref_id(kind: LedgerKind, now: DateTime<Utc>) -> String {
    let suffix = rand::random::<u32>() & 0x00ff_ffff;
    format!("{}-{}-{suffix:06x}", kind.ref_prefix(), now.timestamp_millis())
}
