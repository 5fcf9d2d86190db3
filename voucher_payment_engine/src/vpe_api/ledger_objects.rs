use std::fmt::Display;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::db_types::{IntentDetails, LedgerEntry, LedgerId, LedgerStatus, RemoteStatus, Rupiah};

/// The result of creating an order or a deposit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckoutResult {
    pub ledger: LedgerEntry,
    /// True if the purchase completed immediately (i.e. it was paid from the wallet)
    pub fulfilled: bool,
    /// The delivered voucher codes. Only populated when `fulfilled` is true.
    pub codes: Vec<String>,
    /// The remote payment intent. `None` for balance purchases, and when the gateway could not be reached. In the
    /// latter case the entry stays pending and is cleaned up by the timeout path.
    pub intent: Option<IntentDetails>,
}

/// A payment notification from the gateway, with its status already normalized.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallbackPayload {
    pub ref_id: String,
    pub status: RemoteStatus,
    pub signature: String,
    /// What the customer paid, fees included
    pub total_paid: Option<Rupiah>,
    /// What the merchant receives after fees
    pub total_received: Option<Rupiah>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallbackOutcome {
    Settled(LedgerEntry),
    AlreadyProcessed(LedgerStatus),
    /// The gateway reported a non-final status. Nothing was changed.
    StillPending,
}

/// The identifiers that a reconciliation run can be targeted at.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReconcileTarget {
    /// Our external reference id
    RefId(String),
    LedgerId(LedgerId),
    /// The gateway's intent (transaction) id
    IntentId(String),
}

impl Display for ReconcileTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReconcileTarget::RefId(r) => write!(f, "ref {r}"),
            ReconcileTarget::LedgerId(id) => write!(f, "{id}"),
            ReconcileTarget::IntentId(i) => write!(f, "intent {i}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ReconcileOutcome {
    /// This run moved the entry out of pending. `forced` is set when the entry was expired locally because it was
    /// overdue, rather than because the gateway said so.
    Settled { status: LedgerStatus, forced: bool },
    AlreadyProcessed { status: LedgerStatus },
    /// The entry is still pending. `gateway_error` is set if the gateway could not be asked.
    StillPending { gateway_error: Option<String> },
}

impl ReconcileOutcome {
    pub fn is_settled(&self) -> bool {
        matches!(self, ReconcileOutcome::Settled { .. })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconcileReport {
    pub checked: usize,
    pub settled: usize,
    pub forced: usize,
    pub still_pending: usize,
    pub gateway_errors: usize,
    pub failed: usize,
}

impl ReconcileReport {
    pub fn record(&mut self, outcome: &ReconcileOutcome) {
        self.checked += 1;
        match outcome {
            ReconcileOutcome::Settled { forced, .. } => {
                self.settled += 1;
                if *forced {
                    self.forced += 1;
                }
            },
            ReconcileOutcome::AlreadyProcessed { .. } => {},
            ReconcileOutcome::StillPending { gateway_error } => {
                self.still_pending += 1;
                if gateway_error.is_some() {
                    self.gateway_errors += 1;
                }
            },
        }
    }
}

/// One message from the per-order watcher.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WatchUpdate {
    pub ref_id: String,
    pub status: LedgerStatus,
    /// Set on the last update of a watch
    pub terminal: bool,
    pub entry: LedgerEntry,
    pub at: DateTime<Utc>,
}

impl WatchUpdate {
    pub fn new(entry: LedgerEntry, at: DateTime<Utc>) -> Self {
        Self {
            ref_id: entry.external_ref_id().to_string(),
            status: entry.status(),
            terminal: entry.status().is_terminal(),
            entry,
            at,
        }
    }
}
