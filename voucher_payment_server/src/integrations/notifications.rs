//! Tells users about settled orders and deposits.
//!
//! Delivery itself belongs to an outside notification service with its own retry policy. Here we only log a summary,
//! with the user id and voucher codes masked, and record that the entry has been announced. Nothing in here can
//! affect the settlement that triggered it.
use futures::future::BoxFuture;
use log::*;
use voucher_payment_engine::{
    db_types::{LedgerEntry, LedgerStatus},
    events::{EventHandlers, EventHooks, LedgerSettledEvent},
    traits::LedgerDatabase,
    SqliteDatabase,
};
use vpg_common::mask_identifier;

pub const NOTIFICATION_EVENT_BUFFER_SIZE: usize = 25;

pub fn create_notification_handlers(db: SqliteDatabase) -> EventHandlers {
    let mut hooks = EventHooks::default();
    hooks.on_ledger_settled(move |ev| notify(db.clone(), ev));
    EventHandlers::new(NOTIFICATION_EVENT_BUFFER_SIZE, hooks)
}

fn notify(db: SqliteDatabase, ev: LedgerSettledEvent) -> BoxFuture<'static, ()> {
    let LedgerSettledEvent { entry, source } = ev;
    Box::pin(async move {
        info!("📬️ {} (via {source})", notification_summary(&entry));
        let id = entry.ledger_id();
        match db.mark_notified(id).await {
            Ok(true) => debug!("📬️ {id} marked as notified"),
            Ok(false) => debug!("📬️ {id} was already marked as notified"),
            Err(e) => warn!("📬️ Could not mark {id} as notified. {e}"),
        }
    })
}

/// A one-line description of a settled entry that is safe to show outside the user's own account.
pub fn notification_summary(entry: &LedgerEntry) -> String {
    let user = mask_identifier(entry.user_id());
    let status = entry.status();
    match entry {
        LedgerEntry::Order(order) => {
            let codes = order.codes().iter().map(|c| mask_identifier(c)).collect::<Vec<String>>();
            match status {
                LedgerStatus::Success => format!(
                    "Order {} for {user}: {} × product #{} paid ({}, {}). Codes: {}",
                    order.external_ref_id,
                    order.quantity,
                    order.product_id,
                    order.amount,
                    order.payment_method,
                    codes.join(", ")
                ),
                _ => format!("Order {} for {user} is {status}. The reserved stock was released.", order.external_ref_id),
            }
        },
        LedgerEntry::Deposit(deposit) => match status {
            LedgerStatus::Success => format!(
                "Deposit {} for {user}: {} via {} credited",
                deposit.external_ref_id, deposit.amount, deposit.channel
            ),
            _ => format!("Deposit {} for {user} is {status}", deposit.external_ref_id),
        },
    }
}

#[cfg(test)]
mod test {
    use chrono::{Duration, TimeZone, Utc};
    use voucher_payment_engine::db_types::{Deposit, Order, PaymentMethod, Rupiah};

    use super::*;

    fn order(status: LedgerStatus, codes: Option<&str>) -> LedgerEntry {
        let created_at = Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap();
        LedgerEntry::Order(Order {
            id: 7,
            external_ref_id: "ORD-1717243200000-3fa2c1".into(),
            user_id: "628123456789".into(),
            product_id: 3,
            quantity: 2,
            amount: Rupiah::from(20_000),
            payment_method: PaymentMethod::Gateway("qris".into()),
            status,
            created_at,
            expires_at: created_at + Duration::minutes(15),
            settled_payload: codes.map(String::from),
            intent_id: None,
            pay_url: None,
            qr_payload: None,
            notified: false,
        })
    }

    #[test]
    fn paid_order_summary_masks_user_and_codes() {
        let entry = order(LedgerStatus::Success, Some(r#"["PLN-12345678","PLN-87654321"]"#));
        let summary = notification_summary(&entry);
        assert!(summary.starts_with("Order ORD-1717243200000-3fa2c1 for 628*****6789: 2 × product #3 paid"));
        assert!(summary.ends_with("Codes: PLN*****5678, PLN*****4321"), "{summary}");
        assert!(!summary.contains("12345678"));
    }

    #[test]
    fn expired_order_summary_mentions_released_stock() {
        let summary = notification_summary(&order(LedgerStatus::Expired, None));
        assert_eq!(
            summary,
            "Order ORD-1717243200000-3fa2c1 for 628*****6789 is expired. The reserved stock was released."
        );
    }

    #[test]
    fn deposit_summary() {
        let created_at = Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap();
        let entry = LedgerEntry::Deposit(Deposit {
            id: 1,
            external_ref_id: "DEP-1717243200000-0b9e44".into(),
            user_id: "alice@example.com".into(),
            amount: Rupiah::from(50_000),
            channel: "bca".into(),
            status: LedgerStatus::Success,
            created_at,
            expires_at: created_at + Duration::minutes(15),
            settled_payload: None,
            intent_id: Some("tx-1".into()),
            pay_url: None,
            qr_payload: None,
            notified: false,
        });
        let summary = notification_summary(&entry);
        assert!(summary.starts_with("Deposit DEP-1717243200000-0b9e44 for ali"), "{summary}");
        assert!(summary.ends_with("via bca credited"), "{summary}");
        assert!(!summary.contains("alice@"));
    }
}
