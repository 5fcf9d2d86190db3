use std::fmt::Debug;

use chrono::{DateTime, Utc};
use log::*;
use serde_json::json;

use crate::{
    db_types::{IntentDetails, LedgerEntry, LedgerKind, NewDeposit, NewOrder, PaymentMethod, Rupiah},
    helpers::new_external_ref_id,
    traits::{IntentRequest, LedgerDatabase, PaymentGateway},
    vpe_api::{engine_config::EngineConfig, errors::CheckoutError, ledger_objects::CheckoutResult},
};

/// `CheckoutApi` creates orders and deposits.
///
/// Stock is reserved (or sold, for balance purchases) inside a single database transaction. The gateway is only
/// contacted after that transaction has committed, so a slow gateway never holds the reservation lock.
pub struct CheckoutApi<B, G> {
    db: B,
    gateway: G,
    config: EngineConfig,
}

impl<B, G> Debug for CheckoutApi<B, G> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "CheckoutApi")
    }
}

impl<B, G> CheckoutApi<B, G> {
    pub fn new(db: B, gateway: G, config: EngineConfig) -> Self {
        Self { db, gateway, config }
    }

    pub fn db(&self) -> &B {
        &self.db
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }
}

impl<B, G> CheckoutApi<B, G>
where
    B: LedgerDatabase,
    G: PaymentGateway,
{
    pub async fn create_order(
        &self,
        user_id: &str,
        product_id: i64,
        quantity: i64,
        payment_method: PaymentMethod,
    ) -> Result<CheckoutResult, CheckoutError> {
        self.create_order_at(user_id, product_id, quantity, payment_method, Utc::now()).await
    }

    /// Creates an order for `quantity` items of the product.
    ///
    /// * Balance purchases are settled immediately: the wallet is debited and the items are sold in one transaction,
    ///   and the codes are returned.
    /// * Gateway purchases reserve the items and create a pending order that expires after the configured timeout.
    ///   The payment intent is requested once the reservation is committed. If that request fails, the order is
    ///   left pending and will be expired by the reconciler.
    ///
    /// Insufficient stock (or balance) leaves the database untouched.
    pub async fn create_order_at(
        &self,
        user_id: &str,
        product_id: i64,
        quantity: i64,
        payment_method: PaymentMethod,
        now: DateTime<Utc>,
    ) -> Result<CheckoutResult, CheckoutError> {
        if quantity < 1 || quantity > self.config.max_quantity {
            return Err(CheckoutError::InvalidQuantity(quantity));
        }
        if let Some(channel) = payment_method.channel() {
            if !self.config.accepts_channel(channel) {
                return Err(CheckoutError::UnknownChannel(channel.to_string()));
            }
        }
        let product = self.db.fetch_product(product_id).await?.ok_or(CheckoutError::ProductNotFound(product_id))?;
        if !product.active {
            return Err(CheckoutError::ProductInactive(product_id));
        }
        let amount = product.price.checked_mul(quantity).ok_or(CheckoutError::InvalidQuantity(quantity))?;
        let expires_at = match payment_method {
            PaymentMethod::Balance => now,
            PaymentMethod::Gateway(_) => now + self.config.order_timeout,
        };
        let order = NewOrder {
            external_ref_id: new_external_ref_id(LedgerKind::Order, now),
            user_id: user_id.to_string(),
            product_id,
            quantity,
            amount,
            payment_method: payment_method.clone(),
            created_at: now,
            expires_at,
        };
        match payment_method {
            PaymentMethod::Balance => {
                let (order, items) = self.db.purchase_with_balance(order).await?;
                let codes = items.into_iter().map(|i| i.code).collect::<Vec<String>>();
                info!("🔄️📦️ Order [{}] for {quantity} × {} paid from balance", order.external_ref_id, product.name);
                Ok(CheckoutResult { ledger: order.into(), fulfilled: true, codes, intent: None })
            },
            PaymentMethod::Gateway(channel) => {
                let (order, items) = self.db.reserve_stock_for_order(order).await?;
                info!(
                    "🔄️📦️ Order [{}] reserved {} × {} until {}",
                    order.external_ref_id,
                    items.len(),
                    product.name,
                    order.expires_at
                );
                let metadata = json!({ "kind": "order", "product": product.name, "quantity": quantity });
                let entry = LedgerEntry::from(order);
                let intent = self.request_intent(&entry, channel, metadata).await;
                Ok(CheckoutResult { ledger: entry, fulfilled: false, codes: vec![], intent })
            },
        }
    }

    pub async fn create_deposit(
        &self,
        user_id: &str,
        amount: Rupiah,
        channel: &str,
    ) -> Result<CheckoutResult, CheckoutError> {
        self.create_deposit_at(user_id, amount, channel, Utc::now()).await
    }

    /// Creates a pending wallet top-up and requests a payment intent for it. The wallet is only credited when the
    /// deposit settles.
    pub async fn create_deposit_at(
        &self,
        user_id: &str,
        amount: Rupiah,
        channel: &str,
        now: DateTime<Utc>,
    ) -> Result<CheckoutResult, CheckoutError> {
        if !amount.is_positive() {
            return Err(CheckoutError::InvalidAmount(amount));
        }
        if amount < self.config.min_deposit {
            return Err(CheckoutError::DepositTooSmall { minimum: self.config.min_deposit });
        }
        if !self.config.accepts_channel(channel) {
            return Err(CheckoutError::UnknownChannel(channel.to_string()));
        }
        let deposit = NewDeposit {
            external_ref_id: new_external_ref_id(LedgerKind::Deposit, now),
            user_id: user_id.to_string(),
            amount,
            channel: channel.to_ascii_lowercase(),
            created_at: now,
            expires_at: now + self.config.order_timeout,
        };
        let deposit = self.db.insert_deposit(deposit).await?;
        info!("🔄️💰️ Deposit [{}] of {amount} created", deposit.external_ref_id);
        let channel = deposit.channel.clone();
        let entry = LedgerEntry::from(deposit);
        let intent = self.request_intent(&entry, channel, json!({ "kind": "deposit" })).await;
        Ok(CheckoutResult { ledger: entry, fulfilled: false, codes: vec![], intent })
    }

    /// Asks the gateway for a payment intent and stores it against the entry. Failures are logged, never returned.
    async fn request_intent(
        &self,
        entry: &LedgerEntry,
        channel: String,
        metadata: serde_json::Value,
    ) -> Option<IntentDetails> {
        let request = IntentRequest {
            ref_id: entry.external_ref_id().to_string(),
            amount: entry.amount(),
            channel,
            metadata,
        };
        let intent = match self.gateway.create_intent(request).await {
            Ok(intent) => intent,
            Err(e) => {
                warn!(
                    "🔄️ Could not create a payment intent for [{}]. It stays pending until it expires. {e}",
                    entry.external_ref_id()
                );
                return None;
            },
        };
        match self.db.attach_intent(entry.ledger_id(), &intent).await {
            Ok(true) => debug!("🔄️ Intent {} attached to [{}]", intent.intent_id, entry.external_ref_id()),
            Ok(false) => warn!(
                "🔄️ [{}] was settled before its intent {} could be recorded",
                entry.external_ref_id(),
                intent.intent_id
            ),
            Err(e) => error!("🔄️ Could not record intent {} for [{}]. {e}", intent.intent_id, entry.external_ref_id()),
        }
        Some(intent)
    }
}
