use std::{fmt::Display, str::FromStr};

use chrono::{DateTime, Utc};
use log::error;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::{FromRow, Type};
use thiserror::Error;
pub use vpg_common::Rupiah;

#[derive(Debug, Clone, Error)]
#[error("Conversion error: {0}")]
pub struct ConversionError(String);

//--------------------------------------      Product       ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct Product {
    pub id: i64,
    pub name: String,
    /// The unit price of one stock item of this product
    pub price: Rupiah,
    pub active: bool,
}

#[derive(Debug, Clone)]
pub struct NewProduct {
    pub name: String,
    pub price: Rupiah,
}

impl NewProduct {
    pub fn new<S: Into<String>>(name: S, price: Rupiah) -> Self {
        Self { name: name.into(), price }
    }
}

//--------------------------------------    StockStatus     ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum StockStatus {
    /// Available for purchase. A ready item never has an owner.
    Ready,
    /// Held for a pending order.
    Reserved,
    /// Delivered. The code belongs to exactly one successful order.
    Sold,
}

impl Display for StockStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StockStatus::Ready => write!(f, "ready"),
            StockStatus::Reserved => write!(f, "reserved"),
            StockStatus::Sold => write!(f, "sold"),
        }
    }
}

//--------------------------------------     StockItem      ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct StockItem {
    pub id: i64,
    pub product_id: i64,
    /// The redeemable voucher code. Treat it as a secret until it has been delivered.
    pub code: String,
    pub status: StockStatus,
    pub owner: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockSummary {
    pub ready: i64,
    pub reserved: i64,
    pub sold: i64,
}

//--------------------------------------    LedgerStatus    ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum LedgerStatus {
    /// Waiting for the payment to complete. The only status that may change.
    Pending,
    Success,
    Expired,
    Failed,
}

impl LedgerStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, LedgerStatus::Pending)
    }
}

impl Display for LedgerStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LedgerStatus::Pending => write!(f, "pending"),
            LedgerStatus::Success => write!(f, "success"),
            LedgerStatus::Expired => write!(f, "expired"),
            LedgerStatus::Failed => write!(f, "failed"),
        }
    }
}

impl FromStr for LedgerStatus {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "success" => Ok(Self::Success),
            "expired" => Ok(Self::Expired),
            "failed" => Ok(Self::Failed),
            s => Err(ConversionError(format!("Invalid ledger status: {s}"))),
        }
    }
}

impl From<SettlementOutcome> for LedgerStatus {
    fn from(outcome: SettlementOutcome) -> Self {
        match outcome {
            SettlementOutcome::Success => LedgerStatus::Success,
            SettlementOutcome::Expired => LedgerStatus::Expired,
            SettlementOutcome::Failed => LedgerStatus::Failed,
        }
    }
}

//--------------------------------------  SettlementOutcome  ---------------------------------------------------------
/// The definitive result of a payment. Settling a ledger entry moves it out of pending with exactly one of these.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SettlementOutcome {
    Success,
    Expired,
    Failed,
}

impl Display for SettlementOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        LedgerStatus::from(*self).fmt(f)
    }
}

/// The payment gateway's view of a payment, already normalized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RemoteStatus {
    Success,
    Expired,
    Failed,
    Pending,
}

impl RemoteStatus {
    /// `None` means the gateway has not reached a decision yet.
    pub fn outcome(&self) -> Option<SettlementOutcome> {
        match self {
            RemoteStatus::Success => Some(SettlementOutcome::Success),
            RemoteStatus::Expired => Some(SettlementOutcome::Expired),
            RemoteStatus::Failed => Some(SettlementOutcome::Failed),
            RemoteStatus::Pending => None,
        }
    }
}

impl Display for RemoteStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RemoteStatus::Success => write!(f, "success"),
            RemoteStatus::Expired => write!(f, "expired"),
            RemoteStatus::Failed => write!(f, "failed"),
            RemoteStatus::Pending => write!(f, "pending"),
        }
    }
}

//--------------------------------------   PaymentMethod    ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub enum PaymentMethod {
    /// Pay immediately from the user's wallet balance.
    Balance,
    /// Pay through the external gateway using the named channel (e.g. `qris`).
    Gateway(String),
}

impl PaymentMethod {
    pub fn channel(&self) -> Option<&str> {
        match self {
            PaymentMethod::Balance => None,
            PaymentMethod::Gateway(channel) => Some(channel.as_str()),
        }
    }
}

impl Display for PaymentMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PaymentMethod::Balance => write!(f, "balance"),
            PaymentMethod::Gateway(channel) => write!(f, "gateway:{channel}"),
        }
    }
}

impl FromStr for PaymentMethod {
    type Err = ConversionError;

    /// Accepts `balance`, `gateway:<channel>`, or a bare channel name.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        match s.to_ascii_lowercase().as_str() {
            "" => Err(ConversionError("Empty payment method".to_string())),
            "balance" => Ok(Self::Balance),
            other => {
                let channel = other.strip_prefix("gateway:").unwrap_or(other).trim();
                if channel.is_empty() {
                    Err(ConversionError(format!("Invalid payment method: {s}")))
                } else {
                    Ok(Self::Gateway(channel.to_string()))
                }
            },
        }
    }
}

impl TryFrom<String> for PaymentMethod {
    type Error = ConversionError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<PaymentMethod> for String {
    fn from(value: PaymentMethod) -> Self {
        value.to_string()
    }
}

//--------------------------------------    LedgerKind      ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LedgerKind {
    Order,
    Deposit,
}

impl Display for LedgerKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LedgerKind::Order => write!(f, "order"),
            LedgerKind::Deposit => write!(f, "deposit"),
        }
    }
}

impl LedgerKind {
    pub fn ref_prefix(&self) -> &'static str {
        match self {
            LedgerKind::Order => "ORD",
            LedgerKind::Deposit => "DEP",
        }
    }
}

/// Identifies a row in one of the two ledgers. Row ids are only unique within their own ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LedgerId {
    pub kind: LedgerKind,
    pub id: i64,
}

impl LedgerId {
    pub fn order(id: i64) -> Self {
        Self { kind: LedgerKind::Order, id }
    }

    pub fn deposit(id: i64) -> Self {
        Self { kind: LedgerKind::Deposit, id }
    }
}

impl Display for LedgerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}#{}", self.kind, self.id)
    }
}

//--------------------------------------        Order       ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct Order {
    pub id: i64,
    /// The gateway-facing reference, e.g. `ORD-1718000000000-3fa2c1`
    pub external_ref_id: String,
    pub user_id: String,
    pub product_id: i64,
    pub quantity: i64,
    pub amount: Rupiah,
    #[sqlx(try_from = "String")]
    pub payment_method: PaymentMethod,
    pub status: LedgerStatus,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    /// JSON array of the voucher codes delivered with this order. Only set once the order succeeds.
    pub settled_payload: Option<String>,
    pub intent_id: Option<String>,
    pub pay_url: Option<String>,
    pub qr_payload: Option<String>,
    pub notified: bool,
}

impl Order {
    /// The voucher codes delivered with this order. Empty unless the order succeeded.
    pub fn codes(&self) -> Vec<String> {
        match self.settled_payload.as_deref() {
            None => vec![],
            Some(payload) => serde_json::from_str(payload).unwrap_or_else(|e| {
                error!("Order {} has an unreadable settled payload. {e}", self.external_ref_id);
                vec![]
            }),
        }
    }
}

#[derive(Debug, Clone)]
pub struct NewOrder {
    pub external_ref_id: String,
    pub user_id: String,
    pub product_id: i64,
    pub quantity: i64,
    /// The total price, i.e. unit price × quantity
    pub amount: Rupiah,
    pub payment_method: PaymentMethod,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

//--------------------------------------      Deposit       ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct Deposit {
    pub id: i64,
    pub external_ref_id: String,
    pub user_id: String,
    pub amount: Rupiah,
    pub channel: String,
    pub status: LedgerStatus,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    /// JSON object describing what the gateway reported when the deposit settled
    pub settled_payload: Option<String>,
    pub intent_id: Option<String>,
    pub pay_url: Option<String>,
    pub qr_payload: Option<String>,
    pub notified: bool,
}

#[derive(Debug, Clone)]
pub struct NewDeposit {
    pub external_ref_id: String,
    pub user_id: String,
    pub amount: Rupiah,
    pub channel: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

//--------------------------------------    LedgerEntry     ---------------------------------------------------------
/// A row from either ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum LedgerEntry {
    Order(Order),
    Deposit(Deposit),
}

impl LedgerEntry {
    pub fn ledger_id(&self) -> LedgerId {
        match self {
            LedgerEntry::Order(o) => LedgerId::order(o.id),
            LedgerEntry::Deposit(d) => LedgerId::deposit(d.id),
        }
    }

    pub fn kind(&self) -> LedgerKind {
        self.ledger_id().kind
    }

    pub fn external_ref_id(&self) -> &str {
        match self {
            LedgerEntry::Order(o) => &o.external_ref_id,
            LedgerEntry::Deposit(d) => &d.external_ref_id,
        }
    }

    pub fn user_id(&self) -> &str {
        match self {
            LedgerEntry::Order(o) => &o.user_id,
            LedgerEntry::Deposit(d) => &d.user_id,
        }
    }

    pub fn amount(&self) -> Rupiah {
        match self {
            LedgerEntry::Order(o) => o.amount,
            LedgerEntry::Deposit(d) => d.amount,
        }
    }

    pub fn status(&self) -> LedgerStatus {
        match self {
            LedgerEntry::Order(o) => o.status,
            LedgerEntry::Deposit(d) => d.status,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.status() == LedgerStatus::Pending
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        match self {
            LedgerEntry::Order(o) => o.created_at,
            LedgerEntry::Deposit(d) => d.created_at,
        }
    }

    pub fn expires_at(&self) -> DateTime<Utc> {
        match self {
            LedgerEntry::Order(o) => o.expires_at,
            LedgerEntry::Deposit(d) => d.expires_at,
        }
    }

    /// The gateway channel, if this entry is paid through the gateway.
    pub fn channel(&self) -> Option<&str> {
        match self {
            LedgerEntry::Order(o) => o.payment_method.channel(),
            LedgerEntry::Deposit(d) => Some(d.channel.as_str()),
        }
    }

    pub fn intent_id(&self) -> Option<&str> {
        match self {
            LedgerEntry::Order(o) => o.intent_id.as_deref(),
            LedgerEntry::Deposit(d) => d.intent_id.as_deref(),
        }
    }

    pub fn settled_payload(&self) -> Option<&str> {
        match self {
            LedgerEntry::Order(o) => o.settled_payload.as_deref(),
            LedgerEntry::Deposit(d) => d.settled_payload.as_deref(),
        }
    }

    pub fn notified(&self) -> bool {
        match self {
            LedgerEntry::Order(o) => o.notified,
            LedgerEntry::Deposit(d) => d.notified,
        }
    }
}

impl From<Order> for LedgerEntry {
    fn from(order: Order) -> Self {
        LedgerEntry::Order(order)
    }
}

impl From<Deposit> for LedgerEntry {
    fn from(deposit: Deposit) -> Self {
        LedgerEntry::Deposit(deposit)
    }
}

//--------------------------------------  Reservation queue  ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct ReservationQueueEntry {
    pub order_id: i64,
    pub stock_item_id: i64,
    pub user_id: String,
}

//--------------------------------------       Wallet       ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct Wallet {
    pub user_id: String,
    pub balance: Rupiah,
    pub updated_at: DateTime<Utc>,
}

//--------------------------------------  Payment intents   ---------------------------------------------------------
/// The remote payment intent details that are stored against a pending ledger entry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntentDetails {
    pub intent_id: String,
    pub pay_url: Option<String>,
    pub qr_payload: Option<String>,
    /// The amount the customer will actually be charged, fees included
    pub total_amount: Rupiah,
}

/// Where a settlement came from and what the gateway told us, recorded alongside the state transition.
#[derive(Debug, Clone, PartialEq)]
pub struct SettlementContext {
    /// A short label for the trigger, e.g. `callback`, `reconcile` or `watcher`
    pub source: String,
    pub settled_at: DateTime<Utc>,
    pub remote: Option<Value>,
}

impl SettlementContext {
    pub fn new<S: Into<String>>(source: S, settled_at: DateTime<Utc>) -> Self {
        Self { source: source.into(), settled_at, remote: None }
    }

    pub fn with_remote(mut self, remote: Value) -> Self {
        self.remote = Some(remote);
        self
    }
}

//--------------------------------------  SettlementResult  ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SettlementResult {
    /// This call moved the entry out of pending. Holds the entry as it was committed.
    Settled(LedgerEntry),
    /// Someone else got there first. Nothing was changed.
    AlreadyProcessed(LedgerStatus),
}

impl SettlementResult {
    pub fn is_settled(&self) -> bool {
        matches!(self, SettlementResult::Settled(_))
    }
}
