use std::time::Duration;

use actix_web::{dev::Server, http::KeepAlive, middleware::Logger, web, App, HttpServer};
use log::*;
use voucher_payment_engine::{
    events::EventProducers,
    CheckoutApi,
    LedgerApi,
    PaymentWatcher,
    ReconciliationApi,
    SettlementApi,
    SqliteDatabase,
};

use crate::{
    config::{ServerConfig, ServerOptions},
    errors::ServerError,
    integrations::{notifications::create_notification_handlers, paygate::PaygateGateway},
    reconciliation_worker::start_reconciliation_worker,
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

pub async fn run_server(config: ServerConfig) -> Result<(), ServerError> {
    let db = SqliteDatabase::new_with_url(&config.database_url, 25)
        .await
        .map_err(|e| ServerError::InitializeError(e.to_string()))?;
    db.migrate().await.map_err(|e| ServerError::InitializeError(e.to_string()))?;
    let gateway =
        PaygateGateway::new(config.gateway.clone()).map_err(|e| ServerError::InitializeError(e.to_string()))?;
    let handlers = create_notification_handlers(db.clone());
    let producers = handlers.producers();
    handlers.start_handlers().await;
    let reconciler = ReconciliationApi::new(db.clone(), gateway.clone(), producers.clone(), config.engine_config());
    // The worker is never awaited. It stops when the runtime does.
    let _worker = start_reconciliation_worker(reconciler, config.reconcile_interval);
    let srv = create_server_instance(config, db, gateway, producers)?;
    srv.await.map_err(|e| ServerError::Unspecified(e.to_string()))
}

pub fn create_server_instance(
    config: ServerConfig,
    db: SqliteDatabase,
    gateway: PaygateGateway,
    producers: EventProducers,
) -> Result<Server, ServerError> {
    let engine_config = config.engine_config();
    let options = ServerOptions::from_config(&config);
    let admin_key = web::Data::new(config.admin_key.clone());
    info!("🪛️ Accepting payments via: {}", engine_config.channels.join(", "));
    let srv = HttpServer::new(move || {
        let checkout_api = CheckoutApi::new(db.clone(), gateway.clone(), engine_config.clone());
        let settlement_api = SettlementApi::new(db.clone(), producers.clone());
        let reconciliation_api =
            ReconciliationApi::new(db.clone(), gateway.clone(), producers.clone(), engine_config.clone());
        let watcher = PaymentWatcher::from_reconciler(reconciliation_api.clone());
        let ledger_api = LedgerApi::new(db.clone());
        let api_scope = web::scope("/api")
            .service(CreateOrderRoute::<SqliteDatabase, PaygateGateway>::new())
            .service(CreateDepositRoute::<SqliteDatabase, PaygateGateway>::new())
            .service(LedgerEntryRoute::<SqliteDatabase, PaygateGateway>::new())
            .service(WatchRoute::<SqliteDatabase, PaygateGateway>::new())
            .service(MyBalanceRoute::<SqliteDatabase>::new())
            .service(ReconcileRoute::<SqliteDatabase, PaygateGateway>::new());
        App::new()
            .wrap(Logger::new("%t (%D ms) %s %a %{Host}i %U").log_target("vpg::access_log"))
            .app_data(web::Data::new(checkout_api))
            .app_data(web::Data::new(settlement_api))
            .app_data(web::Data::new(reconciliation_api))
            .app_data(web::Data::new(watcher))
            .app_data(web::Data::new(ledger_api))
            .app_data(web::Data::new(gateway.clone()))
            .app_data(web::Data::new(options))
            .app_data(admin_key.clone())
            .service(health)
            .service(CallbackRoute::<SqliteDatabase, PaygateGateway>::new())
            .service(api_scope)
    })
    .keep_alive(KeepAlive::Timeout(Duration::from_secs(600)))
    .bind((config.host.as_str(), config.port))?
    .run();
    Ok(srv)
}
