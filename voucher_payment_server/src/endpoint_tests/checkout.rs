use actix_web::{http::StatusCode, test::TestRequest};
use serde_json::{json, Value};
use voucher_payment_engine::{db_types::Rupiah, traits::InventoryManagement, LedgerApi};

use super::helpers::{
    as_user,
    configure,
    fund_wallet,
    issuing_gateway,
    offline_gateway,
    send_request,
    setup_db,
    setup_with_stock,
};

fn order_request(product_id: i64, quantity: i64, payment_method: &str) -> TestRequest {
    TestRequest::post()
        .uri("/api/orders")
        .set_json(json!({ "product_id": product_id, "quantity": quantity, "payment_method": payment_method }))
}

#[actix_web::test]
async fn orders_need_a_user() {
    let (db, product) = setup_with_stock(10_000, 3).await;
    let req = order_request(product.id, 1, "qris");
    let (status, body) = send_request(req, configure(db, issuing_gateway())).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body, r#"{"error":"No user identity was provided with the request."}"#);
}

#[actix_web::test]
async fn gateway_order_reserves_stock_and_returns_payment_details() {
    let (db, product) = setup_with_stock(10_000, 3).await;
    let req = as_user(order_request(product.id, 2, "qris"), "alice");
    let (status, body) = send_request(req, configure(db.clone(), issuing_gateway())).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    let result: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(result["fulfilled"], json!(false));
    assert_eq!(result["codes"], json!([]));
    assert_eq!(result["ledger"]["kind"], "order");
    assert_eq!(result["ledger"]["status"], "pending");
    assert_eq!(result["ledger"]["amount"], 20_000);
    let ref_id = result["ledger"]["external_ref_id"].as_str().unwrap();
    assert!(ref_id.starts_with("ORD-"));
    assert_eq!(result["intent"]["intent_id"], format!("tx-{ref_id}"));
    assert_eq!(result["intent"]["total_amount"], 20_700);

    let summary = db.stock_summary(product.id).await.unwrap();
    assert_eq!(summary.ready, 1);
    assert_eq!(summary.reserved, 2);
}

#[actix_web::test]
async fn order_survives_an_unreachable_gateway() {
    let (db, product) = setup_with_stock(10_000, 1).await;
    let req = as_user(order_request(product.id, 1, "qris"), "alice");
    let (status, body) = send_request(req, configure(db, offline_gateway())).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    let result: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(result["ledger"]["status"], "pending");
    assert_eq!(result["intent"], Value::Null);
}

#[actix_web::test]
async fn balance_purchase_delivers_codes() {
    let (db, product) = setup_with_stock(10_000, 3).await;
    fund_wallet(&db, "alice", 30_000).await;
    let req = as_user(order_request(product.id, 2, "balance"), "alice");
    let (status, body) = send_request(req, configure(db.clone(), issuing_gateway())).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    let result: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(result["fulfilled"], json!(true));
    assert_eq!(result["ledger"]["status"], "success");
    assert_eq!(result["codes"].as_array().unwrap().len(), 2);
    assert_eq!(result["intent"], Value::Null);

    let req = as_user(TestRequest::get().uri("/api/balance"), "alice");
    let (status, body) = send_request(req, configure(db, issuing_gateway())).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, r#"{"user_id":"alice","balance":10000}"#);
}

#[actix_web::test]
async fn short_balance_is_a_conflict() {
    let (db, product) = setup_with_stock(10_000, 3).await;
    fund_wallet(&db, "alice", 15_000).await;
    let req = as_user(order_request(product.id, 2, "balance"), "alice");
    let (status, _) = send_request(req, configure(db.clone(), issuing_gateway())).await;
    assert_eq!(status, StatusCode::CONFLICT);
    // Nothing was debited, and nothing was sold
    assert_eq!(LedgerApi::new(db.clone()).wallet_balance("alice").await.unwrap(), Rupiah::from(15_000));
    let summary = db.stock_summary(product.id).await.unwrap();
    assert_eq!(summary.ready, 3);
}

#[actix_web::test]
async fn short_stock_is_a_conflict() {
    let (db, product) = setup_with_stock(10_000, 1).await;
    let req = as_user(order_request(product.id, 2, "qris"), "alice");
    let (status, body) = send_request(req, configure(db.clone(), issuing_gateway())).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(body.starts_with(r#"{"error":"#), "{body}");
    let summary = db.stock_summary(product.id).await.unwrap();
    assert_eq!(summary.ready, 1);
    assert_eq!(summary.reserved, 0);
}

#[actix_web::test]
async fn invalid_orders_are_rejected() {
    let (db, product) = setup_with_stock(10_000, 3).await;
    let req = as_user(order_request(product.id, 0, "qris"), "alice");
    let (status, _) = send_request(req, configure(db.clone(), issuing_gateway())).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let req = as_user(order_request(product.id, 1, "paypal"), "alice");
    let (status, _) = send_request(req, configure(db.clone(), issuing_gateway())).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let req = as_user(order_request(product.id + 100, 1, "qris"), "alice");
    let (status, _) = send_request(req, configure(db, issuing_gateway())).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[actix_web::test]
async fn deposits() {
    let db = setup_db().await;
    let req = TestRequest::post().uri("/api/deposits").set_json(json!({ "amount": 25_000, "channel": "bca" }));
    let (status, body) = send_request(as_user(req, "bob"), configure(db.clone(), issuing_gateway())).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    let result: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(result["ledger"]["kind"], "deposit");
    assert_eq!(result["ledger"]["user_id"], "bob");
    assert_eq!(result["ledger"]["amount"], 25_000);
    assert!(result["ledger"]["external_ref_id"].as_str().unwrap().starts_with("DEP-"));
    assert_eq!(result["intent"]["total_amount"], 25_700);

    let req = TestRequest::post().uri("/api/deposits").set_json(json!({ "amount": 5_000, "channel": "bca" }));
    let (status, _) = send_request(as_user(req, "bob"), configure(db.clone(), issuing_gateway())).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let req = TestRequest::post().uri("/api/deposits").set_json(json!({ "amount": 25_000, "channel": "paypal" }));
    let (status, _) = send_request(as_user(req, "bob"), configure(db, issuing_gateway())).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}
