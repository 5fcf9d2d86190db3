use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};

use chrono::{Duration, Utc};
use mockall::predicate::function;
use serde_json::json;
use voucher_payment_engine::{
    db_types::{IntentDetails, LedgerEntry, LedgerStatus, PaymentMethod, RemoteStatus, Rupiah, StockStatus},
    ledger_objects::{ReconcileOutcome, ReconcileTarget},
    traits::{GatewayError, InventoryManagement, LedgerDatabase, RemoteStatusReport, StatusQuery},
    CheckoutApi,
    LedgerApi,
    ReconciliationApi,
    ReconciliationError,
};

mod support;
use support::*;

fn qris() -> PaymentMethod {
    PaymentMethod::Gateway("qris".into())
}

#[tokio::test]
async fn overdue_order_is_expired_and_stock_released() {
    let (db, product) = setup_with_stock(15_000, 3).await;
    let config = test_config();
    let checkout = CheckoutApi::new(db.clone(), FixedGateway::offline(), config.clone());
    let order = checkout.create_order("alice", product.id, 3, qris()).await.unwrap();
    assert_eq!(db.stock_summary(product.id).await.unwrap().reserved, 3);
    let LedgerEntry::Order(pending) = &order.ledger else { panic!("Expected an order") };

    let mut gateway = MockGateway::new();
    gateway
        .expect_check_status()
        .times(1)
        .returning(|q| Ok(RemoteStatusReport::new(RemoteStatus::Pending, json!({ "ref_id": q.ref_id }))));
    let api = ReconciliationApi::new(db.clone(), gateway, Default::default(), config.clone());

    let later = pending.expires_at + config.grace_period + Duration::seconds(1);
    let report = api.sync_pending_payments(later).await.unwrap();
    assert_eq!(report.checked, 1);
    assert_eq!(report.settled, 1);
    assert_eq!(report.forced, 1);

    assert_eq!(ledger_status(&db, order.ledger.ledger_id()).await, LedgerStatus::Expired);
    for item in db.fetch_stock_items(product.id).await.unwrap() {
        assert_eq!(item.status, StockStatus::Ready);
        assert!(item.owner.is_none());
    }
    assert!(db.fetch_queue_entries(pending.id).await.unwrap().is_empty());
    assert!(db.fetch_pending_entries(10).await.unwrap().is_empty());
}

#[tokio::test]
async fn unreachable_gateway_defers_until_overdue() {
    let db = setup().await;
    let config = test_config();
    let checkout = CheckoutApi::new(db.clone(), FixedGateway::offline(), config.clone());
    let now = Utc::now();
    let deposit = checkout.create_deposit_at("bob", Rupiah::from(25_000), "qris", now).await.unwrap();

    let mut gateway = MockGateway::new();
    gateway.expect_check_status().times(2).returning(|_| Err(GatewayError::Unavailable("timeout".into())));
    let api = ReconciliationApi::new(db.clone(), gateway, Default::default(), config.clone());

    // Past the poll grace window, but well before expiry
    let outcome = api.process_single(&deposit.ledger, now + Duration::minutes(1)).await.unwrap();
    assert!(matches!(outcome, ReconcileOutcome::StillPending { gateway_error: Some(_) }));
    assert_eq!(ledger_status(&db, deposit.ledger.ledger_id()).await, LedgerStatus::Pending);

    let overdue = deposit.ledger.expires_at() + config.grace_period + Duration::seconds(1);
    let outcome = api.process_single(&deposit.ledger, overdue).await.unwrap();
    assert_eq!(outcome, ReconcileOutcome::Settled { status: LedgerStatus::Expired, forced: true });
    assert_eq!(LedgerApi::new(db).wallet_balance("bob").await.unwrap(), Rupiah::default());
}

#[tokio::test]
async fn young_entries_are_left_for_the_webhook() {
    let db = setup().await;
    let config = test_config();
    let checkout = CheckoutApi::new(db.clone(), FixedGateway::offline(), config.clone());
    let now = Utc::now();
    checkout.create_deposit_at("carol", Rupiah::from(25_000), "qris", now).await.unwrap();

    let mut gateway = MockGateway::new();
    gateway.expect_check_status().never();
    let api = ReconciliationApi::new(db.clone(), gateway, Default::default(), config);
    let report = api.sync_pending_payments(now + Duration::seconds(5)).await.unwrap();
    assert_eq!(report.checked, 0);
    assert_eq!(db.fetch_pending_entries(10).await.unwrap().len(), 1);
}

#[tokio::test]
async fn batch_settles_paid_entries_oldest_first() {
    let (db, product) = setup_with_stock(15_000, 2).await;
    let config = test_config();
    let checkout = CheckoutApi::new(db.clone(), FixedGateway::offline(), config.clone());
    let t0 = Utc::now() - Duration::minutes(3);
    let deposit = checkout.create_deposit_at("dave", Rupiah::from(40_000), "bca", t0).await.unwrap();
    let order = checkout.create_order_at("dave", product.id, 1, qris(), t0 + Duration::seconds(10)).await.unwrap();
    let deposit_ref = deposit.ledger.external_ref_id().to_string();
    let order_ref = order.ledger.external_ref_id().to_string();

    let mut gateway = MockGateway::new();
    let expected_ref = deposit_ref.clone();
    gateway
        .expect_check_status()
        .with(function(move |q: &StatusQuery| q.ref_id == expected_ref))
        .times(1)
        .returning(|q| {
            assert_eq!(q.amount, Some(Rupiah::from(40_000)));
            assert_eq!(q.channel.as_deref(), Some("bca"));
            Ok(RemoteStatusReport::new(RemoteStatus::Success, json!({ "status": "PAID" })))
        });
    let expected_ref = order_ref.clone();
    gateway
        .expect_check_status()
        .with(function(move |q: &StatusQuery| q.ref_id == expected_ref))
        .times(1)
        .returning(|_| Ok(RemoteStatusReport::new(RemoteStatus::Failed, json!({ "status": "FAILED" }))));
    let api = ReconciliationApi::new(db.clone(), gateway, Default::default(), config);
    let report = api.sync_pending_payments(Utc::now()).await.unwrap();
    assert_eq!(report.checked, 2);
    assert_eq!(report.settled, 2);
    assert_eq!(report.forced, 0);

    let ledger = LedgerApi::new(db.clone());
    assert_eq!(ledger.wallet_balance("dave").await.unwrap(), Rupiah::from(40_000));
    let order = ledger.fetch_order_by_ref(&order_ref).await.unwrap().unwrap();
    assert_eq!(order.status, LedgerStatus::Failed);
    assert_eq!(ledger.stock_summary(product.id).await.unwrap().ready, 2);
    let deposit = ledger.fetch_deposit_by_ref(&deposit_ref).await.unwrap().unwrap();
    let payload: serde_json::Value = serde_json::from_str(deposit.settled_payload.as_deref().unwrap()).unwrap();
    assert_eq!(payload["source"], "reconcile");
    assert_eq!(payload["remote"]["status"], "PAID");
}

#[tokio::test]
async fn on_demand_reconciliation_by_any_identifier() {
    let (db, product) = setup_with_stock(15_000, 2).await;
    let config = test_config();
    let mut intents = MockGateway::new();
    intents.expect_create_intent().returning(|r| {
        Ok(IntentDetails {
            intent_id: format!("INV-{}", r.ref_id),
            pay_url: None,
            qr_payload: Some("qr".into()),
            total_amount: r.amount,
        })
    });
    let checkout = CheckoutApi::new(db.clone(), intents, config.clone());
    let order = checkout.create_order("erin", product.id, 1, qris()).await.unwrap();
    let intent_id = order.intent.unwrap().intent_id;

    let mut gateway = MockGateway::new();
    let polls = Arc::new(AtomicUsize::new(0));
    let counter = polls.clone();
    gateway.expect_check_status().times(2).returning(move |_| {
        let status = match counter.fetch_add(1, Ordering::SeqCst) {
            0 => RemoteStatus::Pending,
            _ => RemoteStatus::Success,
        };
        Ok(RemoteStatusReport::new(status, json!({})))
    });
    let api = ReconciliationApi::new(db.clone(), gateway, Default::default(), config);

    let target = ReconcileTarget::RefId(order.ledger.external_ref_id().to_string());
    let (entry, outcome) = api.reconcile(target, Utc::now()).await.unwrap();
    assert_eq!(outcome, ReconcileOutcome::StillPending { gateway_error: None });
    assert_eq!(entry.status(), LedgerStatus::Pending);

    let (entry, outcome) = api.reconcile(ReconcileTarget::IntentId(intent_id), Utc::now()).await.unwrap();
    assert_eq!(outcome, ReconcileOutcome::Settled { status: LedgerStatus::Success, forced: false });
    let LedgerEntry::Order(order) = &entry else { panic!("Expected an order") };
    assert_eq!(order.codes(), vec!["PLN-0".to_string()]);

    // Settled entries are not sent to the gateway again
    let (_, outcome) = api.reconcile(ReconcileTarget::LedgerId(entry.ledger_id()), Utc::now()).await.unwrap();
    assert_eq!(outcome, ReconcileOutcome::AlreadyProcessed { status: LedgerStatus::Success });
    assert_eq!(polls.load(Ordering::SeqCst), 2);

    let err = api.reconcile(ReconcileTarget::RefId("ORD-404".into()), Utc::now()).await.unwrap_err();
    assert!(matches!(err, ReconciliationError::LedgerEntryNotFound(_)));
}
