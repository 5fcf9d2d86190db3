use std::fmt::Display;

use log::*;
use serde::{Deserialize, Serialize};

/// The closed set of remote transaction states. Every vendor status string is normalized into one of these.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionStatus {
    Success,
    Expired,
    Failed,
    Pending,
}

impl TransactionStatus {
    /// Normalizes a raw vendor status. Matching ignores case and surrounding whitespace. Anything we do not recognise
    /// is treated as still pending, so that an unexpected string can never settle a payment.
    pub fn from_vendor(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "paid" | "success" | "completed" | "settled" => Self::Success,
            "expired" => Self::Expired,
            "failed" | "cancelled" | "canceled" => Self::Failed,
            "pending" | "unpaid" | "waiting" | "processing" => Self::Pending,
            other => {
                warn!("🌐️ Unrecognised gateway status '{other}'. Treating it as pending.");
                Self::Pending
            },
        }
    }

    pub fn is_final(&self) -> bool {
        !matches!(self, Self::Pending)
    }
}

impl Display for TransactionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Success => write!(f, "success"),
            Self::Expired => write!(f, "expired"),
            Self::Failed => write!(f, "failed"),
            Self::Pending => write!(f, "pending"),
        }
    }
}
