use serde::{Deserialize, Serialize};
use serde_json::Value;
use vpg_common::Rupiah;

use crate::{GatewayApiError, TransactionStatus};

/// A request for a new remote payment intent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewIntent {
    /// Our external reference id. The gateway echoes it back in callbacks and uses it as the key for status checks.
    pub ref_id: String,
    pub amount: Rupiah,
    /// The user-facing channel name (e.g. `qris`). Translated to a vendor code by the client.
    pub channel: String,
    #[serde(default)]
    pub metadata: Value,
}

/// The gateway's answer to a [`NewIntent`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentIntent {
    pub intent_id: String,
    pub pay_url: Option<String>,
    pub qr_payload: Option<String>,
    /// The total the customer will be charged, including any fees the gateway adds.
    pub total_amount: Rupiah,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusCheck {
    pub status: TransactionStatus,
    pub raw: Value,
}

// ---------------------------------------  Wire formats  ---------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub(crate) struct CreateTransactionRequest<'a> {
    pub merchant_id: &'a str,
    pub ref_id: &'a str,
    pub amount: i64,
    pub channel: &'a str,
    pub metadata: &'a Value,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct Envelope<T> {
    pub data: Option<T>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct RawTransaction {
    pub id: Value,
    pub pay_url: Option<String>,
    pub qr_string: Option<String>,
    pub total_bayar: Option<i64>,
}

impl RawTransaction {
    pub fn into_intent(self, requested: Rupiah) -> Result<PaymentIntent, GatewayApiError> {
        let intent_id = match self.id {
            Value::String(s) if !s.is_empty() => s,
            Value::Number(n) => n.to_string(),
            other => return Err(GatewayApiError::JsonError(format!("Invalid transaction id in response: {other}"))),
        };
        let total_amount = self.total_bayar.map(Rupiah::from).unwrap_or(requested);
        Ok(PaymentIntent { intent_id, pay_url: self.pay_url, qr_payload: self.qr_string, total_amount })
    }
}

#[cfg(test)]
mod test {
    use serde_json::json;

    use super::*;

    #[test]
    fn raw_transaction_conversion() {
        let raw: Envelope<RawTransaction> = serde_json::from_value(json!({
            "data": {"id": 9912, "pay_url": "https://pay.example/x", "qr_string": "000201...", "total_bayar": 50700}
        }))
        .unwrap();
        let intent = raw.data.unwrap().into_intent(Rupiah::from(50_000)).unwrap();
        assert_eq!(intent.intent_id, "9912");
        assert_eq!(intent.total_amount, Rupiah::from(50_700));
        assert_eq!(intent.qr_payload.as_deref(), Some("000201..."));

        let raw: RawTransaction = serde_json::from_value(json!({"id": "abc"})).unwrap();
        let intent = raw.into_intent(Rupiah::from(1_000)).unwrap();
        assert_eq!(intent.total_amount, Rupiah::from(1_000));
        assert!(intent.pay_url.is_none());

        let raw: RawTransaction = serde_json::from_value(json!({"id": null})).unwrap();
        assert!(raw.into_intent(Rupiah::from(1_000)).is_err());
    }
}
