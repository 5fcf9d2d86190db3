use actix_web::{http::StatusCode, test::TestRequest};
use serde_json::{json, Value};
use voucher_payment_engine::{
    db_types::{LedgerStatus, RemoteStatus},
    traits::LedgerDatabase,
};

use super::{
    helpers::{configure, create_deposit, reporting_gateway, send_request, setup_db, ADMIN_KEY},
    mocks::MockGateway,
};
use crate::middleware::ADMIN_KEY_HEADER;

#[actix_web::test]
async fn reconcile_needs_the_admin_key() {
    let db = setup_db().await;
    let req = TestRequest::post().uri("/api/reconcile");
    let (status, _) = send_request(req, configure(db.clone(), MockGateway::new())).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let req = TestRequest::post().uri("/api/reconcile").insert_header((ADMIN_KEY_HEADER, "guess"));
    let (status, _) = send_request(req, configure(db, MockGateway::new())).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[actix_web::test]
async fn batch_leaves_young_entries_alone() {
    let db = setup_db().await;
    create_deposit(&db, "alice", 20_000).await;
    let mut gateway = MockGateway::new();
    gateway.expect_check_status().never();
    let req = TestRequest::post().uri("/api/reconcile").insert_header((ADMIN_KEY_HEADER, ADMIN_KEY));
    let (status, body) = send_request(req, configure(db, gateway)).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    let report: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(
        report,
        json!({ "checked": 0, "settled": 0, "forced": 0, "still_pending": 0, "gateway_errors": 0, "failed": 0 })
    );
}

#[actix_web::test]
async fn reconcile_a_single_entry() {
    let db = setup_db().await;
    let deposit = create_deposit(&db, "alice", 20_000).await;
    let ref_id = deposit.ledger.external_ref_id();
    let req = TestRequest::post()
        .uri("/api/reconcile")
        .insert_header((ADMIN_KEY_HEADER, ADMIN_KEY))
        .set_json(json!({ "ref_id": ref_id }));
    let (status, body) = send_request(req, configure(db.clone(), reporting_gateway(RemoteStatus::Expired))).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    let response: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(response["target"], json!({ "ref_id": ref_id }));
    assert_eq!(response["outcome"], json!({ "outcome": "settled", "status": "expired", "forced": false }));
    assert_eq!(response["entry"]["status"], "expired");
    let entry = db.fetch_ledger_entry(deposit.ledger.ledger_id()).await.unwrap().unwrap();
    assert_eq!(entry.status(), LedgerStatus::Expired);

    let req = TestRequest::post()
        .uri("/api/reconcile")
        .insert_header((ADMIN_KEY_HEADER, ADMIN_KEY))
        .set_json(json!({ "intent_id": "tx-unknown" }));
    let (status, _) = send_request(req, configure(db.clone(), MockGateway::new())).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let req = TestRequest::post()
        .uri("/api/reconcile")
        .insert_header((ADMIN_KEY_HEADER, ADMIN_KEY))
        .set_payload("{\"order\": 1}");
    let (status, _) = send_request(req, configure(db, MockGateway::new())).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}
