use actix_web::{http::StatusCode, test::TestRequest};
use serde_json::json;
use voucher_payment_engine::{
    db_types::{LedgerStatus, RemoteStatus, Rupiah},
    traits::LedgerDatabase,
    LedgerApi,
};

use super::helpers::{configure, create_deposit, offline_gateway, reporting_gateway, send_request, setup_db, sign};

fn callback_request(ref_id: &str, status: &str, signature: &str) -> TestRequest {
    TestRequest::post().uri("/callback").set_json(json!({
        "ref_id": ref_id,
        "status": status,
        "signature": signature,
        "total_bayar": 50_700,
        "total_diterima": 50_000,
    }))
}

#[actix_web::test]
async fn paid_callback_credits_the_wallet_once() {
    let db = setup_db().await;
    let deposit = create_deposit(&db, "alice", 50_000).await;
    let ref_id = deposit.ledger.external_ref_id().to_string();

    let req = callback_request(&ref_id, "PAID", &sign(&ref_id));
    let (status, body) = send_request(req, configure(db.clone(), offline_gateway())).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, format!(r#"{{"status":"ok","message":"{ref_id} is now success"}}"#));
    let ledger = LedgerApi::new(db.clone());
    assert_eq!(ledger.wallet_balance("alice").await.unwrap(), Rupiah::from(50_000));

    // The gateway retries. Nothing changes the second time around.
    let req = callback_request(&ref_id, "PAID", &sign(&ref_id));
    let (status, body) = send_request(req, configure(db.clone(), offline_gateway())).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("already processed (success)"), "{body}");
    assert_eq!(ledger.wallet_balance("alice").await.unwrap(), Rupiah::from(50_000));
}

#[actix_web::test]
async fn tampered_signature_is_rejected() {
    let db = setup_db().await;
    let deposit = create_deposit(&db, "alice", 50_000).await;
    let ref_id = deposit.ledger.external_ref_id().to_string();
    let signature = sign("DEP-0-forged");

    let req = callback_request(&ref_id, "PAID", &signature);
    let (status, body) = send_request(req, configure(db.clone(), offline_gateway())).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body, r#"{"status":"error","message":"Invalid signature"}"#);
    let entry = db.fetch_ledger_entry(deposit.ledger.ledger_id()).await.unwrap().unwrap();
    assert_eq!(entry.status(), LedgerStatus::Pending);
    assert_eq!(LedgerApi::new(db).wallet_balance("alice").await.unwrap(), Rupiah::default());
}

#[actix_web::test]
async fn unpaid_callback_changes_nothing() {
    let db = setup_db().await;
    let deposit = create_deposit(&db, "alice", 20_000).await;
    let ref_id = deposit.ledger.external_ref_id().to_string();

    let req = callback_request(&ref_id, "UNPAID", &sign(&ref_id));
    let (status, body) = send_request(req, configure(db.clone(), reporting_gateway(RemoteStatus::Success))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, r#"{"status":"ok","message":"pending"}"#);
    let entry = db.fetch_ledger_entry(deposit.ledger.ledger_id()).await.unwrap().unwrap();
    assert_eq!(entry.status(), LedgerStatus::Pending);
}

#[actix_web::test]
async fn expired_callback_settles_without_credit() {
    let db = setup_db().await;
    let deposit = create_deposit(&db, "alice", 20_000).await;
    let ref_id = deposit.ledger.external_ref_id().to_string();

    let req = callback_request(&ref_id, "expired", &sign(&ref_id));
    let (status, body) = send_request(req, configure(db.clone(), offline_gateway())).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("is now expired"), "{body}");
    assert_eq!(LedgerApi::new(db).wallet_balance("alice").await.unwrap(), Rupiah::default());
}

#[actix_web::test]
async fn callback_for_unknown_reference() {
    let db = setup_db().await;
    let req = callback_request("DEP-1-nothere", "PAID", &sign("DEP-1-nothere"));
    let (status, body) = send_request(req, configure(db, offline_gateway())).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body, r#"{"status":"error","message":"Unknown reference"}"#);
}

#[actix_web::test]
async fn malformed_callback() {
    let db = setup_db().await;
    let req = TestRequest::post().uri("/callback").set_payload("ref_id=DEP-1&status=PAID");
    let (status, body) = send_request(req, configure(db, offline_gateway())).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, r#"{"status":"error","message":"Invalid callback payload"}"#);
}
