use std::sync::Arc;

use log::*;
use reqwest::{
    header::{HeaderMap, HeaderValue},
    Client,
    Method,
};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use vpg_common::Rupiah;

use crate::{
    config::GatewayConfig,
    data_objects::{CreateTransactionRequest, Envelope, RawTransaction},
    retry::with_retries,
    GatewayApiError,
    NewIntent,
    PaymentIntent,
    StatusCheck,
    TransactionStatus,
};

#[derive(Clone)]
pub struct GatewayApi {
    config: GatewayConfig,
    client: Arc<Client>,
}

impl GatewayApi {
    pub fn new(config: GatewayConfig) -> Result<Self, GatewayApiError> {
        let mut headers = HeaderMap::with_capacity(2);
        let val = HeaderValue::from_str(config.api_key.reveal().as_str())
            .map_err(|e| GatewayApiError::Initialization(e.to_string()))?;
        headers.insert("X-Api-Key", val);
        headers.insert("Content-Type", HeaderValue::from_static("application/json"));
        let client = Client::builder()
            .default_headers(headers)
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| GatewayApiError::Initialization(e.to_string()))?;
        Ok(Self { config, client: Arc::new(client) })
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{path}", self.config.base_url)
    }

    /// A single request with no retries. Non-2xx responses become [`GatewayApiError::QueryError`].
    pub async fn rest_query<T: DeserializeOwned, B: Serialize>(
        &self,
        method: Method,
        path: &str,
        params: &[(&str, String)],
        body: Option<&B>,
    ) -> Result<T, GatewayApiError> {
        let url = self.url(path);
        trace!("🌐️ Sending {method} {url}");
        let mut req = self.client.request(method, url);
        if !params.is_empty() {
            req = req.query(params);
        }
        if let Some(body) = body {
            req = req.json(body);
        }
        let response = req.send().await?;
        if response.status().is_success() {
            trace!("🌐️ Gateway query successful. {}", response.status());
            response.json::<T>().await.map_err(|e| GatewayApiError::JsonError(e.to_string()))
        } else {
            let status = response.status().as_u16();
            let message = response.text().await?;
            Err(GatewayApiError::QueryError { status, message })
        }
    }

    /// Creates a remote payment intent for `intent.ref_id`.
    pub async fn create_order(&self, intent: &NewIntent) -> Result<PaymentIntent, GatewayApiError> {
        let channel = self
            .config
            .channels
            .vendor_code(&intent.channel)
            .ok_or_else(|| GatewayApiError::UnknownChannel(intent.channel.clone()))?;
        let body = CreateTransactionRequest {
            merchant_id: &self.config.merchant_id,
            ref_id: &intent.ref_id,
            amount: intent.amount.value(),
            channel,
            metadata: &intent.metadata,
        };
        debug!("🌐️ Creating payment intent for {} ({} via {channel})", intent.ref_id, intent.amount);
        let label = format!("create intent {}", intent.ref_id);
        let response = with_retries(self.config.retry_policy, &label, || {
            self.rest_query::<Envelope<RawTransaction>, _>(Method::POST, "/transactions", &[], Some(&body))
        })
        .await?;
        let intent = response.data.ok_or(GatewayApiError::EmptyResponse)?.into_intent(intent.amount)?;
        info!("🌐️ Payment intent {} created for {}", intent.intent_id, body.ref_id);
        Ok(intent)
    }

    /// Asks the gateway for the current status of `ref_id`. Some channels require the original amount and channel to
    /// locate the transaction, so they are forwarded when known.
    pub async fn check_status(
        &self,
        ref_id: &str,
        amount: Option<Rupiah>,
        channel: Option<&str>,
    ) -> Result<StatusCheck, GatewayApiError> {
        let mut params = Vec::with_capacity(2);
        if let Some(amount) = amount {
            params.push(("amount", amount.value().to_string()));
        }
        if let Some(code) = channel.and_then(|c| self.config.channels.vendor_code(c)) {
            params.push(("channel", code.to_string()));
        }
        let path = format!("/transactions/{ref_id}");
        let label = format!("status check {ref_id}");
        let response = with_retries(self.config.retry_policy, &label, || {
            self.rest_query::<Envelope<Value>, ()>(Method::GET, &path, &params, None)
        })
        .await?;
        let raw = response.data.ok_or(GatewayApiError::EmptyResponse)?;
        let status = raw["status"]
            .as_str()
            .map(TransactionStatus::from_vendor)
            .ok_or_else(|| GatewayApiError::JsonError(format!("No status in response for {ref_id}")))?;
        debug!("🌐️ Gateway reports {ref_id} as {status}");
        Ok(StatusCheck { status, raw })
    }
}
