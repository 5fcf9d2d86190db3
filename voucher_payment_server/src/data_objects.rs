use std::fmt::Display;

use serde::{Deserialize, Serialize};
use voucher_payment_engine::{
    db_types::{LedgerEntry, PaymentMethod, Rupiah},
    ledger_objects::{ReconcileOutcome, ReconcileTarget},
};

/// The body of a payment notification, exactly as the gateway sends it. The status is still in the gateway's own
/// vocabulary at this point.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallbackRequest {
    pub ref_id: String,
    pub status: String,
    #[serde(default)]
    pub signature: String,
    #[serde(default)]
    pub total_bayar: Option<i64>,
    #[serde(default)]
    pub total_diterima: Option<i64>,
}

/// The gateway only looks at the HTTP status, but logs the body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallbackResponse {
    pub status: String,
    pub message: String,
}

impl CallbackResponse {
    pub fn ok<S: Display>(message: S) -> Self {
        Self { status: "ok".into(), message: message.to_string() }
    }

    pub fn error<S: Display>(message: S) -> Self {
        Self { status: "error".into(), message: message.to_string() }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateOrderRequest {
    pub product_id: i64,
    pub quantity: i64,
    /// `balance`, or the gateway channel to pay with, e.g. `qris`
    pub payment_method: PaymentMethod,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateDepositRequest {
    pub amount: Rupiah,
    pub channel: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BalanceResponse {
    pub user_id: String,
    pub balance: Rupiah,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReconcileResponse {
    pub target: ReconcileTarget,
    pub entry: LedgerEntry,
    pub outcome: ReconcileOutcome,
}
