//! Connects the engine's [`PaymentGateway`] and [`CallbackVerifier`] seams to the gateway client in `paygate_tools`.
//!
//! This is the only place where the gateway's [`TransactionStatus`] is translated into the engine's [`RemoteStatus`].
use log::*;
use paygate_tools::{
    verify_callback_signature,
    GatewayApi,
    GatewayApiError,
    GatewayConfig,
    NewIntent,
    TransactionStatus,
};
use voucher_payment_engine::{
    db_types::{IntentDetails, RemoteStatus},
    traits::{CallbackVerifier, GatewayError, IntentRequest, PaymentGateway, RemoteStatusReport, StatusQuery},
};

#[derive(Clone)]
pub struct PaygateGateway {
    api: GatewayApi,
}

impl PaygateGateway {
    pub fn new(config: GatewayConfig) -> Result<Self, GatewayApiError> {
        let api = GatewayApi::new(config)?;
        Ok(Self { api })
    }

    pub fn api(&self) -> &GatewayApi {
        &self.api
    }
}

impl PaymentGateway for PaygateGateway {
    async fn create_intent(&self, request: IntentRequest) -> Result<IntentDetails, GatewayError> {
        let intent = NewIntent {
            ref_id: request.ref_id,
            amount: request.amount,
            channel: request.channel,
            metadata: request.metadata,
        };
        let intent = self.api.create_order(&intent).await.map_err(gateway_error)?;
        Ok(IntentDetails {
            intent_id: intent.intent_id,
            pay_url: intent.pay_url,
            qr_payload: intent.qr_payload,
            total_amount: intent.total_amount,
        })
    }

    async fn check_status(&self, query: StatusQuery) -> Result<RemoteStatusReport, GatewayError> {
        let check =
            self.api.check_status(&query.ref_id, query.amount, query.channel.as_deref()).await.map_err(gateway_error)?;
        Ok(RemoteStatusReport::new(remote_status(check.status), check.raw))
    }
}

/// Callbacks are signed with the merchant id and the shared callback secret.
impl CallbackVerifier for PaygateGateway {
    fn verify_signature(&self, ref_id: &str, signature: &str) -> bool {
        let config = self.api.config();
        verify_callback_signature(&config.merchant_id, config.callback_secret.reveal(), ref_id, signature)
    }
}

pub fn remote_status(status: TransactionStatus) -> RemoteStatus {
    match status {
        TransactionStatus::Success => RemoteStatus::Success,
        TransactionStatus::Expired => RemoteStatus::Expired,
        TransactionStatus::Failed => RemoteStatus::Failed,
        TransactionStatus::Pending => RemoteStatus::Pending,
    }
}

fn gateway_error(e: GatewayApiError) -> GatewayError {
    trace!("🌐️ Gateway call failed. {e}");
    if e.is_transient() {
        return GatewayError::Unavailable(e.to_string());
    }
    match e {
        GatewayApiError::Initialization(_) => GatewayError::Unavailable(e.to_string()),
        GatewayApiError::QueryError { .. } | GatewayApiError::UnknownChannel(_) => GatewayError::Rejected(e.to_string()),
        _ => GatewayError::InvalidResponse(e.to_string()),
    }
}
