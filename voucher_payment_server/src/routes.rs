//! Request handler definitions
//!
//! Define each route and it handler here.
//! Handlers that are more than a line or two MUST go into a separate module. Keep this module neat and tidy 🙏
//!
//! A note about performance:
//! Since each worker thread processes its requests sequentially, handlers which block the current thread will cause the
//! current worker to stop processing new requests. Database and gateway calls are all asynchronous, so they are fine.
//! Long-lived work (e.g. a payment watcher) is spawned onto the worker's local task set, and handed back to the client
//! as a stream.
use std::convert::Infallible;

use actix_web::{get, http::header, rt, web, HttpRequest, HttpResponse, Responder};
use bytes::Bytes;
use chrono::Utc;
use log::*;
use paygate_tools::TransactionStatus;
use tokio::sync::mpsc;
use voucher_payment_engine::{
    db_types::LedgerEntry,
    ledger_objects::{CallbackOutcome, CallbackPayload, ReconcileTarget, WatchUpdate},
    traits::{CallbackVerifier, LedgerDatabase, PaymentGateway},
    CheckoutApi,
    LedgerApi,
    PaymentWatcher,
    ReconciliationApi,
    SettlementApi,
    SettlementError,
};
use vpg_common::Rupiah;

use crate::{
    auth::CurrentUser,
    config::ServerOptions,
    data_objects::{
        BalanceResponse,
        CallbackRequest,
        CallbackResponse,
        CreateDepositRequest,
        CreateOrderRequest,
        ReconcileResponse,
    },
    errors::ServerError,
    helpers::remote_ip_for_log,
    integrations::paygate::remote_status,
};

const WATCH_BUFFER_SIZE: usize = 8;

// Web-actix cannot handle generics in handlers, so it's implemented manually using the `route!` macro
#[macro_export]
macro_rules! route {
    ($name:ident => $method:ident $path:literal impl $($bounds:ty),+ where requires admin) => {
        paste::paste! { pub struct [<$name:camel Route>]< $( [< T $bounds:camel> ],)+ >( $( core::marker::PhantomData<fn() -> [< T $bounds:camel> ] >,)+ );}
        paste::paste! { impl< $( [< T $bounds:camel> ],)+ > [<$name:camel Route>]< $( [< T $bounds:camel> ],)+ > {
            #[allow(clippy::new_without_default)]
            pub fn new() -> Self {
                Self($( core::marker::PhantomData::<fn() -> [< T $bounds:camel> ] >,)+)
            }
        }}
        paste::paste! { impl<$( [< T $bounds:camel >] , )+> actix_web::dev::HttpServiceFactory for [<$name:camel Route>]<$([<T $bounds:camel>],)+>
        where
            $([<T $bounds:camel>]: $bounds + 'static,)+
        {
            fn register(self, config: &mut actix_web::dev::AppService) {
                let res = actix_web::Resource::new($path)
                    .name(stringify!($name))
                    .guard(actix_web::guard::$method())
                    .to($name::< $( [< T $bounds:camel >], )+>)
                    .wrap($crate::middleware::AdminKeyMiddlewareFactory::new());
                actix_web::dev::HttpServiceFactory::register(res, config);
            }
        }}
    };

    ($name:ident => $method:ident $path:literal impl $($bounds:ty),+) => {
        paste::paste! { pub struct [<$name:camel Route>]< $( [< T $bounds:camel> ],)+ >( $( core::marker::PhantomData<fn() -> [< T $bounds:camel> ] >,)+ );}
        paste::paste! { impl< $( [< T $bounds:camel> ],)+ > [<$name:camel Route>]< $( [< T $bounds:camel> ],)+ > {
            #[allow(clippy::new_without_default)]
            pub fn new() -> Self {
                Self($( core::marker::PhantomData::<fn() -> [< T $bounds:camel> ] >,)+)
            }
        }}
        paste::paste! { impl<$( [< T $bounds:camel >] , )+> actix_web::dev::HttpServiceFactory for [<$name:camel Route>]<$([<T $bounds:camel>],)+>
        where
            $([<T $bounds:camel>]: $bounds + 'static,)+
        {
            fn register(self, config: &mut actix_web::dev::AppService) {
                let res = actix_web::Resource::new($path)
                    .name(stringify!($name))
                    .guard(actix_web::guard::$method())
                    .to($name::< $( [< T $bounds:camel >], )+>);
                actix_web::dev::HttpServiceFactory::register(res, config);
            }
        }}
    };
}

// ----------------------------------------------   Health  ----------------------------------------------------
#[get("/health")]
pub async fn health() -> impl Responder {
    trace!("💻️ Received health check request");
    HttpResponse::Ok().body("👍️\n")
}

//----------------------------------------------   Gateway callback  ----------------------------------------------
route!(callback => Post "/callback" impl LedgerDatabase, CallbackVerifier);
/// Route handler for payment notifications from the gateway.
///
/// The body is `{ref_id, status, signature, total_bayar, total_diterima}`. The status is normalized before the engine
/// sees it, and the signature is checked before anything is looked up.
///
/// Every response has the form `{status: "ok"|"error", message}`:
/// * 200 `ok`: the entry was settled, had already been settled, or is still pending. Replays are harmless.
/// * 400: the body could not be parsed.
/// * 401: the signature is wrong. Nothing was changed.
/// * 404: no order or deposit has this reference.
/// * 500: the settlement was rolled back. The gateway may safely retry.
pub async fn callback<B, V>(
    req: HttpRequest,
    body: web::Bytes,
    api: web::Data<SettlementApi<B>>,
    verifier: web::Data<V>,
    options: web::Data<ServerOptions>,
) -> HttpResponse
where
    B: LedgerDatabase,
    V: CallbackVerifier,
{
    let request = match serde_json::from_slice::<CallbackRequest>(&body) {
        Ok(r) => r,
        Err(e) => {
            warn!("💻️ Could not parse callback from {}. {e}", remote_ip_for_log(&req, **options));
            return HttpResponse::BadRequest().json(CallbackResponse::error("Invalid callback payload"));
        },
    };
    debug!("💻️ Callback for [{}] with status '{}'", request.ref_id, request.status);
    let ref_id = request.ref_id.clone();
    let payload = CallbackPayload {
        status: remote_status(TransactionStatus::from_vendor(&request.status)),
        ref_id: request.ref_id,
        signature: request.signature,
        total_paid: request.total_bayar.map(Rupiah::from),
        total_received: request.total_diterima.map(Rupiah::from),
    };
    match api.handle_callback(verifier.get_ref(), payload).await {
        Ok(CallbackOutcome::Settled(entry)) => {
            HttpResponse::Ok().json(CallbackResponse::ok(format!("{} is now {}", ref_id, entry.status())))
        },
        Ok(CallbackOutcome::AlreadyProcessed(status)) => {
            HttpResponse::Ok().json(CallbackResponse::ok(format!("already processed ({status})")))
        },
        Ok(CallbackOutcome::StillPending) => HttpResponse::Ok().json(CallbackResponse::ok("pending")),
        Err(SettlementError::InvalidSignature) => {
            warn!("💻️ Rejected callback for [{ref_id}] from {}. Invalid signature.", remote_ip_for_log(&req, **options));
            HttpResponse::Unauthorized().json(CallbackResponse::error("Invalid signature"))
        },
        Err(SettlementError::LedgerEntryNotFound(_)) => {
            info!("💻️ Callback for unknown reference [{ref_id}]");
            HttpResponse::NotFound().json(CallbackResponse::error("Unknown reference"))
        },
        Err(e) => {
            error!("💻️ Could not process callback for [{ref_id}]. {e}");
            HttpResponse::InternalServerError().json(CallbackResponse::error("Internal error. Please retry."))
        },
    }
}

//----------------------------------------------   Checkout  ----------------------------------------------------
route!(create_order => Post "/orders" impl LedgerDatabase, PaymentGateway);
/// Route handler for creating an order.
///
/// Balance purchases are completed immediately and the codes are returned. Gateway purchases reserve the stock and
/// return the payment details. Insufficient stock or balance gives a 409, and nothing is reserved or debited.
pub async fn create_order<B, G>(
    user: CurrentUser,
    body: web::Json<CreateOrderRequest>,
    api: web::Data<CheckoutApi<B, G>>,
) -> Result<HttpResponse, ServerError>
where
    B: LedgerDatabase,
    G: PaymentGateway,
{
    let CreateOrderRequest { product_id, quantity, payment_method } = body.into_inner();
    debug!("💻️ POST order for {quantity} × product #{product_id} by {} ({payment_method})", user.id());
    let result = api.create_order(user.id(), product_id, quantity, payment_method).await.map_err(|e| {
        debug!("💻️ Order for {} was rejected. {e}", user.id());
        ServerError::from(e)
    })?;
    Ok(HttpResponse::Ok().json(result))
}

route!(create_deposit => Post "/deposits" impl LedgerDatabase, PaymentGateway);
pub async fn create_deposit<B, G>(
    user: CurrentUser,
    body: web::Json<CreateDepositRequest>,
    api: web::Data<CheckoutApi<B, G>>,
) -> Result<HttpResponse, ServerError>
where
    B: LedgerDatabase,
    G: PaymentGateway,
{
    let CreateDepositRequest { amount, channel } = body.into_inner();
    debug!("💻️ POST deposit of {amount} via {channel} by {}", user.id());
    let result = api.create_deposit(user.id(), amount, &channel).await?;
    Ok(HttpResponse::Ok().json(result))
}

//----------------------------------------------   Ledger  ----------------------------------------------------
route!(ledger_entry => Get "/ledger/{ref_id}" impl LedgerDatabase, PaymentGateway);
/// Route handler for a single order or deposit.
///
/// Users can only see their own entries; anyone else's reference gives a 404. A pending entry is reconciled with the
/// gateway before it is returned, so a user refreshing their payment page sees the payment as soon as the gateway
/// knows about it.
pub async fn ledger_entry<B, G>(
    user: CurrentUser,
    path: web::Path<String>,
    api: web::Data<ReconciliationApi<B, G>>,
) -> Result<HttpResponse, ServerError>
where
    B: LedgerDatabase,
    G: PaymentGateway,
{
    let ref_id = path.into_inner();
    debug!("💻️ GET ledger entry [{ref_id}] for {}", user.id());
    let entry = own_entry(&user, &ref_id, api.as_ref()).await?;
    if !entry.is_pending() {
        return Ok(HttpResponse::Ok().json(entry));
    }
    let (entry, outcome) = api.reconcile(ReconcileTarget::LedgerId(entry.ledger_id()), Utc::now()).await?;
    trace!("💻️ On-demand reconciliation of [{ref_id}]: {outcome:?}");
    Ok(HttpResponse::Ok().json(entry))
}

route!(watch => Get "/watch/{ref_id}" impl LedgerDatabase, PaymentGateway);
/// Route handler for following a payment as a stream of Server-Sent Events.
///
/// The first event is the entry as it stands. A new event follows every poll until the entry is settled, at which
/// point the stream ends. Closing the connection stops the watcher.
pub async fn watch<B, G>(
    user: CurrentUser,
    path: web::Path<String>,
    api: web::Data<ReconciliationApi<B, G>>,
    watcher: web::Data<PaymentWatcher<B, G>>,
) -> Result<HttpResponse, ServerError>
where
    B: LedgerDatabase + 'static,
    G: PaymentGateway + 'static,
{
    let ref_id = path.into_inner();
    debug!("💻️ GET watch [{ref_id}] for {}", user.id());
    let entry = own_entry(&user, &ref_id, api.as_ref()).await?;
    let target = ReconcileTarget::LedgerId(entry.ledger_id());
    let (tx, rx) = mpsc::channel(WATCH_BUFFER_SIZE);
    let watcher = watcher.into_inner();
    rt::spawn(async move {
        if let Err(e) = watcher.watch(target, tx).await {
            warn!("💻️ Watcher for [{ref_id}] stopped early. {e}");
        }
    });
    let stream = futures::stream::unfold(rx, |mut rx| async move {
        let update = rx.recv().await?;
        Some((Ok::<_, Infallible>(sse_event(&update)), rx))
    });
    Ok(HttpResponse::Ok()
        .insert_header((header::CONTENT_TYPE, "text/event-stream"))
        .insert_header((header::CACHE_CONTROL, "no-cache"))
        .streaming(stream))
}

route!(my_balance => Get "/balance" impl LedgerDatabase);
pub async fn my_balance<B: LedgerDatabase>(
    user: CurrentUser,
    api: web::Data<LedgerApi<B>>,
) -> Result<HttpResponse, ServerError> {
    debug!("💻️ GET balance for {}", user.id());
    let balance = api.wallet_balance(user.id()).await.map_err(|e| {
        debug!("💻️ Could not fetch balance. {e}");
        ServerError::BackendError(e.to_string())
    })?;
    Ok(HttpResponse::Ok().json(BalanceResponse { user_id: user.0, balance }))
}

//----------------------------------------------   Admin  ----------------------------------------------------
route!(reconcile => Post "/reconcile" impl LedgerDatabase, PaymentGateway where requires admin);
/// Route handler for triggering reconciliation by hand. Requires the admin key.
///
/// With an empty body, one batch is run over the oldest pending entries, exactly as the background worker would, and
/// the report is returned. Otherwise the body names a single entry: `{"ref_id": ".."}`, `{"intent_id": ".."}` or
/// `{"ledger_id": {"kind": "order", "id": 1}}`.
pub async fn reconcile<B, G>(
    body: web::Bytes,
    api: web::Data<ReconciliationApi<B, G>>,
) -> Result<HttpResponse, ServerError>
where
    B: LedgerDatabase,
    G: PaymentGateway,
{
    if body.iter().all(u8::is_ascii_whitespace) {
        info!("💻️ Manual reconciliation batch requested");
        let report = api.sync_pending_payments(Utc::now()).await?;
        return Ok(HttpResponse::Ok().json(report));
    }
    let target = serde_json::from_slice::<ReconcileTarget>(&body).map_err(|e| {
        debug!("💻️ Invalid reconciliation target. {e}");
        ServerError::InvalidRequestBody(e.to_string())
    })?;
    info!("💻️ Manual reconciliation of {target} requested");
    let (entry, outcome) = api.reconcile(target.clone(), Utc::now()).await?;
    Ok(HttpResponse::Ok().json(ReconcileResponse { target, entry, outcome }))
}

/// Fetches an entry by reference, but only if it belongs to `user`. Other users' entries are reported as missing, so
/// that references cannot be probed.
async fn own_entry<B, G>(
    user: &CurrentUser,
    ref_id: &str,
    api: &ReconciliationApi<B, G>,
) -> Result<LedgerEntry, ServerError>
where
    B: LedgerDatabase,
    G: PaymentGateway,
{
    let entry = api.resolve(&ReconcileTarget::RefId(ref_id.to_string())).await?;
    if entry.user_id() == user.id() {
        Ok(entry)
    } else {
        debug!("💻️ {} asked for [{ref_id}], which belongs to someone else", user.id());
        Err(ServerError::NoRecordFound(format!("No order or deposit matches {ref_id}")))
    }
}

fn sse_event(update: &WatchUpdate) -> Bytes {
    let data = serde_json::to_string(update).unwrap_or_else(|e| {
        error!("💻️ Could not serialize watch update for [{}]. {e}", update.ref_id);
        serde_json::json!({ "ref_id": update.ref_id, "status": update.status, "terminal": update.terminal }).to_string()
    });
    Bytes::from(format!("event: status\ndata: {data}\n\n"))
}
