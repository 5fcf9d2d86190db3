use std::sync::Arc;

use actix_web::{http::StatusCode, test, test::TestRequest, web, web::ServiceConfig, App};
use chrono::{Duration, Utc};
use log::debug;
use paygate_tools::{callback_signature, GatewayConfig};
use serde_json::json;
use voucher_payment_engine::{
    db_types::{IntentDetails, Product, RemoteStatus, Rupiah, SettlementContext, SettlementOutcome},
    events::EventProducers,
    ledger_objects::CheckoutResult,
    test_utils::prepare_env::{prepare_test_env, random_db_path, seed_product},
    traits::{GatewayError, RemoteStatusReport},
    CheckoutApi,
    EngineConfig,
    LedgerApi,
    PaymentWatcher,
    ReconciliationApi,
    SettlementApi,
    SqliteDatabase,
};
use vpg_common::Secret;

use super::mocks::MockGateway;
use crate::{
    auth::USER_ID_HEADER,
    config::{AdminKey, ServerOptions},
    integrations::paygate::PaygateGateway,
    routes::{
        health,
        CallbackRoute,
        CreateDepositRoute,
        CreateOrderRoute,
        LedgerEntryRoute,
        MyBalanceRoute,
        ReconcileRoute,
        WatchRoute,
    },
};

// Test-only credentials. DO NOT re-use these anywhere.
pub const MERCHANT_ID: &str = "M1";
pub const CALLBACK_SECRET: &str = "s3cr3t";
pub const ADMIN_KEY: &str = "8Hq2vTnR0wLc5YxZ";

pub type TestGateway = Arc<MockGateway>;

pub fn engine_config() -> EngineConfig {
    EngineConfig {
        order_timeout: Duration::minutes(15),
        grace_period: Duration::minutes(5),
        poll_grace: Duration::seconds(30),
        batch_size: 50,
        watch_interval: std::time::Duration::from_millis(20),
        min_deposit: Rupiah::from(10_000),
        max_quantity: 10,
        channels: vec!["qris".to_string(), "bca".to_string()],
    }
}

/// The real adapter, used only to verify callback signatures. It never talks to the network in these tests.
pub fn verifier() -> PaygateGateway {
    let config = GatewayConfig {
        merchant_id: MERCHANT_ID.into(),
        callback_secret: Secret::new(CALLBACK_SECRET.to_string()),
        ..GatewayConfig::default()
    };
    PaygateGateway::new(config).expect("Could not create gateway adapter")
}

pub fn sign(ref_id: &str) -> String {
    callback_signature(MERCHANT_ID, CALLBACK_SECRET, ref_id)
}

pub async fn setup_db() -> SqliteDatabase {
    let url = random_db_path();
    prepare_test_env(&url).await;
    SqliteDatabase::new_with_url(&url, 10).await.expect("Error creating database")
}

pub async fn setup_with_stock(price: i64, count: usize) -> (SqliteDatabase, Product) {
    let db = setup_db().await;
    let product = seed_product(&db, "PLN", price, count).await;
    (db, product)
}

/// A gateway that issues intents and is never asked for a status.
pub fn issuing_gateway() -> MockGateway {
    let mut gateway = MockGateway::new();
    gateway.expect_create_intent().returning(|request| {
        Ok(IntentDetails {
            intent_id: format!("tx-{}", request.ref_id),
            pay_url: Some(format!("https://pay.example/{}", request.ref_id)),
            qr_payload: Some("00020101021226".into()),
            total_amount: request.amount + Rupiah::from(700),
        })
    });
    gateway.expect_check_status().never();
    gateway
}

/// A gateway that issues intents and always reports `status`.
pub fn reporting_gateway(status: RemoteStatus) -> MockGateway {
    let mut gateway = MockGateway::new();
    gateway.expect_create_intent().returning(|request| {
        Ok(IntentDetails {
            intent_id: format!("tx-{}", request.ref_id),
            pay_url: None,
            qr_payload: None,
            total_amount: request.amount,
        })
    });
    gateway
        .expect_check_status()
        .returning(move |q| Ok(RemoteStatusReport::new(status, json!({ "ref_id": q.ref_id, "status": status }))));
    gateway
}

pub fn offline_gateway() -> MockGateway {
    let mut gateway = MockGateway::new();
    gateway.expect_create_intent().returning(|_| Err(GatewayError::Unavailable("connection refused".into())));
    gateway.expect_check_status().returning(|_| Err(GatewayError::Unavailable("connection refused".into())));
    gateway
}

pub async fn create_deposit(db: &SqliteDatabase, user_id: &str, amount: i64) -> CheckoutResult {
    let api = CheckoutApi::new(db.clone(), issuing_gateway(), engine_config());
    api.create_deposit(user_id, Rupiah::from(amount), "qris").await.expect("Could not create deposit")
}

/// Tops up a wallet by settling a deposit.
pub async fn fund_wallet(db: &SqliteDatabase, user_id: &str, amount: i64) {
    let deposit = create_deposit(db, user_id, amount).await;
    let settlement = SettlementApi::new(db.clone(), EventProducers::default());
    let context = SettlementContext::new("test", Utc::now());
    let result = settlement.settle_ledger_entry(deposit.ledger.ledger_id(), SettlementOutcome::Success, context).await;
    assert!(result.unwrap().is_settled());
}

/// Registers every route against `db`, with `gateway` standing in for the payment gateway.
pub fn configure(db: SqliteDatabase, gateway: MockGateway) -> impl FnOnce(&mut ServiceConfig) {
    let gateway: TestGateway = Arc::new(gateway);
    move |cfg: &mut ServiceConfig| {
        let config = engine_config();
        let producers = EventProducers::default();
        let checkout = CheckoutApi::new(db.clone(), gateway.clone(), config.clone());
        let settlement = SettlementApi::new(db.clone(), producers.clone());
        let reconciler = ReconciliationApi::new(db.clone(), gateway.clone(), producers.clone(), config.clone());
        let watcher = PaymentWatcher::new(db.clone(), gateway, producers, config);
        let ledger = LedgerApi::new(db);
        cfg.app_data(web::Data::new(checkout))
            .app_data(web::Data::new(settlement))
            .app_data(web::Data::new(reconciler))
            .app_data(web::Data::new(watcher))
            .app_data(web::Data::new(ledger))
            .app_data(web::Data::new(verifier()))
            .app_data(web::Data::new(ServerOptions::default()))
            .app_data(web::Data::new(AdminKey::new(ADMIN_KEY)))
            .service(health)
            .service(CallbackRoute::<SqliteDatabase, PaygateGateway>::new())
            .service(
                web::scope("/api")
                    .service(CreateOrderRoute::<SqliteDatabase, TestGateway>::new())
                    .service(CreateDepositRoute::<SqliteDatabase, TestGateway>::new())
                    .service(LedgerEntryRoute::<SqliteDatabase, TestGateway>::new())
                    .service(WatchRoute::<SqliteDatabase, TestGateway>::new())
                    .service(MyBalanceRoute::<SqliteDatabase>::new())
                    .service(ReconcileRoute::<SqliteDatabase, TestGateway>::new()),
            );
    }
}

/// Sends `req` to a fresh app and returns the status and body. Errors raised by middleware are turned into their
/// responses, the way the server would send them.
pub async fn send_request<F>(req: TestRequest, configure: F) -> (StatusCode, String)
where F: FnOnce(&mut ServiceConfig) {
    let app = test::init_service(App::new().configure(configure)).await;
    debug!("Making request");
    match test::try_call_service(&app, req.to_request()).await {
        Ok(res) => {
            let status = res.status();
            let body = test::read_body(res).await;
            (status, String::from_utf8_lossy(&body).into_owned())
        },
        Err(e) => {
            let res = e.error_response();
            (res.status(), e.to_string())
        },
    }
}

pub fn as_user(req: TestRequest, user_id: &str) -> TestRequest {
    req.insert_header((USER_ID_HEADER, user_id))
}
