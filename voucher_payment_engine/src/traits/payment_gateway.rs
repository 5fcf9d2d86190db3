use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::db_types::{IntentDetails, RemoteStatus, Rupiah};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntentRequest {
    pub ref_id: String,
    pub amount: Rupiah,
    pub channel: String,
    pub metadata: Value,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusQuery {
    pub ref_id: String,
    pub amount: Option<Rupiah>,
    pub channel: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RemoteStatusReport {
    pub status: RemoteStatus,
    /// The gateway's response, verbatim. Kept for the settlement payload and for diagnostics.
    pub raw: Value,
}

impl RemoteStatusReport {
    pub fn new(status: RemoteStatus, raw: Value) -> Self {
        Self { status, raw }
    }
}

#[derive(Debug, Clone, Error)]
pub enum GatewayError {
    /// The gateway could not be reached, or kept failing after all retries. Callers should try again later.
    #[error("The payment gateway is unavailable. {0}")]
    Unavailable(String),
    #[error("The payment gateway rejected the request. {0}")]
    Rejected(String),
    #[error("Unexpected response from the payment gateway. {0}")]
    InvalidResponse(String),
}

/// The adapter seam between the engine and the external payment provider.
///
/// Implementations must normalize vendor status vocabulary into [`RemoteStatus`]; nothing else in the engine looks at
/// raw vendor strings. Calls are made without any database transaction open.
#[allow(async_fn_in_trait)]
pub trait PaymentGateway {
    async fn create_intent(&self, request: IntentRequest) -> Result<IntentDetails, GatewayError>;

    async fn check_status(&self, query: StatusQuery) -> Result<RemoteStatusReport, GatewayError>;
}

impl<G: PaymentGateway> PaymentGateway for Arc<G> {
    async fn create_intent(&self, request: IntentRequest) -> Result<IntentDetails, GatewayError> {
        self.as_ref().create_intent(request).await
    }

    async fn check_status(&self, query: StatusQuery) -> Result<RemoteStatusReport, GatewayError> {
        self.as_ref().check_status(query).await
    }
}

/// Checks that a payment callback really came from the gateway.
pub trait CallbackVerifier {
    fn verify_signature(&self, ref_id: &str, signature: &str) -> bool;
}
