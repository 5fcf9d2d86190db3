#![allow(dead_code)]
use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};

use chrono::Duration;
use mockall::mock;
use serde_json::json;
use voucher_payment_engine::{
    db_types::{
        IntentDetails,
        LedgerId,
        LedgerStatus,
        Product,
        RemoteStatus,
        Rupiah,
        SettlementContext,
        SettlementOutcome,
    },
    events::EventProducers,
    test_utils::prepare_env::{prepare_test_env, random_db_path, seed_product},
    traits::{
        CallbackVerifier,
        GatewayError,
        IntentRequest,
        LedgerDatabase,
        PaymentGateway,
        RemoteStatusReport,
        StatusQuery,
    },
    EngineConfig,
    SettlementApi,
    SqliteDatabase,
};

mock! {
    pub Gateway {}
    impl PaymentGateway for Gateway {
        async fn create_intent(&self, request: IntentRequest) -> Result<IntentDetails, GatewayError>;
        async fn check_status(&self, query: StatusQuery) -> Result<RemoteStatusReport, GatewayError>;
    }
}

/// A gateway that hands out intents and always reports the same status.
#[derive(Clone, Default)]
pub struct FixedGateway {
    pub status: Option<RemoteStatus>,
    pub status_calls: Arc<AtomicUsize>,
}

impl FixedGateway {
    pub fn reporting(status: RemoteStatus) -> Self {
        Self { status: Some(status), status_calls: Arc::default() }
    }

    /// Intents and status checks both fail
    pub fn offline() -> Self {
        Self::default()
    }

    pub fn status_calls(&self) -> usize {
        self.status_calls.load(Ordering::SeqCst)
    }
}

impl PaymentGateway for FixedGateway {
    async fn create_intent(&self, request: IntentRequest) -> Result<IntentDetails, GatewayError> {
        match self.status {
            None => Err(GatewayError::Unavailable("connection refused".into())),
            Some(_) => Ok(IntentDetails {
                intent_id: format!("tx-{}", request.ref_id),
                pay_url: Some(format!("https://pay.example/{}", request.ref_id)),
                qr_payload: Some("00020101021226".into()),
                total_amount: request.amount + Rupiah::from(700),
            }),
        }
    }

    async fn check_status(&self, query: StatusQuery) -> Result<RemoteStatusReport, GatewayError> {
        self.status_calls.fetch_add(1, Ordering::SeqCst);
        match self.status {
            None => Err(GatewayError::Unavailable("connection refused".into())),
            Some(status) => Ok(RemoteStatusReport::new(status, json!({ "ref_id": query.ref_id, "status": status }))),
        }
    }
}

/// Accepts signatures of the form `signed:<ref_id>`
pub struct TestVerifier;

impl CallbackVerifier for TestVerifier {
    fn verify_signature(&self, ref_id: &str, signature: &str) -> bool {
        signature == format!("signed:{ref_id}")
    }
}

pub fn sign(ref_id: &str) -> String {
    format!("signed:{ref_id}")
}

pub fn test_config() -> EngineConfig {
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

pub async fn setup() -> SqliteDatabase {
    let url = random_db_path();
    prepare_test_env(&url).await;
    SqliteDatabase::new_with_url(&url, 10).await.expect("Error creating database")
}

pub async fn setup_with_stock(price: i64, count: usize) -> (SqliteDatabase, Product) {
    let db = setup().await;
    let product = seed_product(&db, "PLN", price, count).await;
    (db, product)
}

/// Tops up a wallet the only way a wallet can be topped up: by settling a deposit.
pub async fn fund_wallet(db: &SqliteDatabase, user_id: &str, amount: i64) {
    use voucher_payment_engine::CheckoutApi;
    let api = CheckoutApi::new(db.clone(), FixedGateway::reporting(RemoteStatus::Pending), test_config());
    let deposit = api.create_deposit(user_id, Rupiah::from(amount), "qris").await.unwrap();
    let settlement = SettlementApi::new(db.clone(), EventProducers::default());
    let context = SettlementContext::new("test", chrono::Utc::now());
    let result = settlement.settle_ledger_entry(deposit.ledger.ledger_id(), SettlementOutcome::Success, context).await;
    assert!(result.unwrap().is_settled());
}

pub async fn ledger_status(db: &SqliteDatabase, id: LedgerId) -> LedgerStatus {
    db.fetch_ledger_entry(id).await.unwrap().unwrap().status()
}

pub async fn ledger_id_by_ref(db: &SqliteDatabase, ref_id: &str) -> LedgerId {
    db.fetch_ledger_entry_by_ref(ref_id).await.unwrap().unwrap().ledger_id()
}
