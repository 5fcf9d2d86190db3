use std::fmt::Debug;

use chrono::{DateTime, Utc};
use log::*;
use serde_json::json;

use crate::{
    db_types::{LedgerEntry, LedgerId, RemoteStatus, SettlementContext, SettlementOutcome, SettlementResult},
    events::{EventProducers, LedgerSettledEvent},
    traits::{CallbackVerifier, LedgerDatabase},
    vpe_api::{
        errors::SettlementError,
        ledger_objects::{CallbackOutcome, CallbackPayload},
    },
};

/// `SettlementApi` owns the single state transition that takes a ledger entry out of `pending`.
///
/// The webhook handler, the reconciliation poller and the per-order watcher all settle through
/// [`Self::settle_ledger_entry`]. Each of them is only responsible for working out *which* outcome applies.
#[derive(Clone)]
pub struct SettlementApi<B> {
    db: B,
    producers: EventProducers,
}

impl<B> Debug for SettlementApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "SettlementApi")
    }
}

impl<B> SettlementApi<B> {
    pub fn new(db: B, producers: EventProducers) -> Self {
        Self { db, producers }
    }

    pub fn db(&self) -> &B {
        &self.db
    }
}

impl<B> SettlementApi<B>
where B: LedgerDatabase
{
    /// Settles the ledger entry with the given outcome.
    ///
    /// If the entry is still pending, it is moved to the terminal status matching `outcome`, along with its stock or
    /// wallet side effects, in one transaction. Subscribers are notified after the commit. If the entry has already
    /// been settled (by a duplicate webhook, or by the poller winning a race), nothing happens and
    /// [`SettlementResult::AlreadyProcessed`] is returned. Calling this repeatedly is always safe.
    pub async fn settle_ledger_entry(
        &self,
        id: LedgerId,
        outcome: SettlementOutcome,
        context: SettlementContext,
    ) -> Result<SettlementResult, SettlementError> {
        trace!("🔄️ Settling {id} as {outcome} ({})", context.source);
        let result = self.db.settle_ledger_entry(id, outcome, &context).await.map_err(|e| {
            error!("🔄️ Could not settle {id} as {outcome}. The transaction was rolled back. {e}");
            SettlementError::from(e)
        })?;
        match &result {
            SettlementResult::Settled(entry) => {
                info!("🔄️ {} [{}] is now {} ({})", entry.kind(), entry.external_ref_id(), entry.status(), context.source);
                self.call_ledger_settled_hook(entry, &context.source).await;
            },
            SettlementResult::AlreadyProcessed(status) => {
                info!("🔄️ {id} was already {status}. Ignoring the {outcome} from {}", context.source);
            },
        }
        Ok(result)
    }

    /// Handles a payment notification from the gateway.
    ///
    /// 1. The signature is checked first. Forged callbacks are rejected without touching the database.
    /// 2. The reference id is resolved against the deposit ledger, then the order ledger.
    /// 3. A final status is applied through [`Self::settle_ledger_entry`]. A non-final status is acknowledged and
    ///    otherwise ignored.
    pub async fn handle_callback<V: CallbackVerifier>(
        &self,
        verifier: &V,
        callback: CallbackPayload,
    ) -> Result<CallbackOutcome, SettlementError> {
        self.handle_callback_at(verifier, callback, Utc::now()).await
    }

    pub async fn handle_callback_at<V: CallbackVerifier>(
        &self,
        verifier: &V,
        callback: CallbackPayload,
        now: DateTime<Utc>,
    ) -> Result<CallbackOutcome, SettlementError> {
        if !verifier.verify_signature(&callback.ref_id, &callback.signature) {
            warn!("🔄️ Callback for [{}] has an invalid signature. Rejecting it.", callback.ref_id);
            return Err(SettlementError::InvalidSignature);
        }
        let entry = self
            .db
            .fetch_ledger_entry_by_ref(&callback.ref_id)
            .await?
            .ok_or_else(|| SettlementError::LedgerEntryNotFound(callback.ref_id.clone()))?;
        let Some(outcome) = callback.status.outcome() else {
            debug!("🔄️ Callback for [{}] reports a non-final status. Nothing to do.", callback.ref_id);
            return Ok(CallbackOutcome::StillPending);
        };
        if callback.status == RemoteStatus::Success {
            check_paid_amount(&entry, &callback);
        }
        let remote = json!({
            "status": callback.status,
            "total_bayar": callback.total_paid,
            "total_diterima": callback.total_received,
        });
        let context = SettlementContext::new("callback", now).with_remote(remote);
        let result = match self.settle_ledger_entry(entry.ledger_id(), outcome, context).await? {
            SettlementResult::Settled(entry) => CallbackOutcome::Settled(entry),
            SettlementResult::AlreadyProcessed(status) => CallbackOutcome::AlreadyProcessed(status),
        };
        Ok(result)
    }

    async fn call_ledger_settled_hook(&self, entry: &LedgerEntry, source: &str) {
        for emitter in &self.producers.ledger_settled_producer {
            debug!("🔄️ Notifying ledger settled hook subscribers");
            let event = LedgerSettledEvent::new(entry.clone(), source);
            emitter.publish_event(event).await;
        }
    }
}

/// The gateway's status is authoritative, so a short payment is only logged.
fn check_paid_amount(entry: &LedgerEntry, callback: &CallbackPayload) {
    match callback.total_paid {
        Some(paid) if paid < entry.amount() => warn!(
            "🔄️ [{}] was reported as paid with {paid}, but {} was due. Settling anyway, as the gateway says so.",
            entry.external_ref_id(),
            entry.amount()
        ),
        _ => {},
    }
}
