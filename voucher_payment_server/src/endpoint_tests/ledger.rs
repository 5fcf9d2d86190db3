use actix_web::{http::StatusCode, test::TestRequest};
use serde_json::Value;
use voucher_payment_engine::{
    db_types::{RemoteStatus, Rupiah},
    LedgerApi,
};

use super::{
    helpers::{as_user, configure, create_deposit, issuing_gateway, reporting_gateway, send_request, setup_db},
    mocks::MockGateway,
};

#[actix_web::test]
async fn entries_are_private() {
    let db = setup_db().await;
    let deposit = create_deposit(&db, "alice", 20_000).await;
    let ref_id = deposit.ledger.external_ref_id();

    let req = as_user(TestRequest::get().uri(&format!("/api/ledger/{ref_id}")), "mallory");
    let (status, body) = send_request(req, configure(db.clone(), issuing_gateway())).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(!body.contains("alice"), "{body}");

    let req = as_user(TestRequest::get().uri(&format!("/api/watch/{ref_id}")), "mallory");
    let (status, _) = send_request(req, configure(db.clone(), issuing_gateway())).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let req = as_user(TestRequest::get().uri("/api/ledger/DEP-1-nothere"), "alice");
    let (status, _) = send_request(req, configure(db, issuing_gateway())).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[actix_web::test]
async fn pending_entry_is_reconciled_when_fetched() {
    let db = setup_db().await;
    let deposit = create_deposit(&db, "alice", 20_000).await;
    let ref_id = deposit.ledger.external_ref_id();

    let req = as_user(TestRequest::get().uri(&format!("/api/ledger/{ref_id}")), "alice");
    let (status, body) = send_request(req, configure(db.clone(), reporting_gateway(RemoteStatus::Success))).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    let entry: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(entry["kind"], "deposit");
    assert_eq!(entry["status"], "success");
    assert_eq!(LedgerApi::new(db.clone()).wallet_balance("alice").await.unwrap(), Rupiah::from(20_000));

    // Settled entries are served from the database
    let mut gateway = MockGateway::new();
    gateway.expect_check_status().never();
    let req = as_user(TestRequest::get().uri(&format!("/api/ledger/{ref_id}")), "alice");
    let (status, body) = send_request(req, configure(db, gateway)).await;
    assert_eq!(status, StatusCode::OK);
    let entry: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(entry["status"], "success");
}

#[actix_web::test]
async fn watch_streams_until_the_payment_settles() {
    let db = setup_db().await;
    let deposit = create_deposit(&db, "alice", 20_000).await;
    let ref_id = deposit.ledger.external_ref_id();

    let req = as_user(TestRequest::get().uri(&format!("/api/watch/{ref_id}")), "alice");
    let (status, body) = send_request(req, configure(db, reporting_gateway(RemoteStatus::Success))).await;
    assert_eq!(status, StatusCode::OK);
    let events = body
        .split("\n\n")
        .filter(|e| !e.is_empty())
        .map(|e| {
            let data = e.strip_prefix("event: status\ndata: ").expect("Not a status event");
            serde_json::from_str::<Value>(data).unwrap()
        })
        .collect::<Vec<Value>>();
    assert_eq!(events.len(), 2, "{body}");
    assert_eq!(events[0]["status"], "pending");
    assert_eq!(events[0]["terminal"], false);
    assert_eq!(events[1]["status"], "success");
    assert_eq!(events[1]["terminal"], true);
    assert_eq!(events[1]["ref_id"], ref_id);
}
