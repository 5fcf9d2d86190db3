use std::fmt::Debug;

use chrono::{DateTime, Utc};
use log::*;
use serde_json::json;

use crate::{
    db_types::{LedgerEntry, SettlementContext, SettlementOutcome, SettlementResult},
    events::EventProducers,
    traits::{LedgerDatabase, PaymentGateway, StatusQuery},
    vpe_api::{
        engine_config::EngineConfig,
        errors::ReconciliationError,
        ledger_objects::{ReconcileOutcome, ReconcileReport, ReconcileTarget},
        settlement_api::SettlementApi,
    },
};

/// `ReconciliationApi` asks the gateway about payments we have not heard back about, and settles them.
///
/// It never decides outcomes on its own, with one exception: an entry that is still pending once
/// `expires_at + grace_period` has passed is expired locally, whether or not the gateway can be reached. That bounds
/// how long stock can be held by a payment that will never complete.
#[derive(Clone)]
pub struct ReconciliationApi<B, G> {
    settlement: SettlementApi<B>,
    gateway: G,
    config: EngineConfig,
}

impl<B, G> Debug for ReconciliationApi<B, G> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ReconciliationApi")
    }
}

impl<B, G> ReconciliationApi<B, G> {
    pub fn new(db: B, gateway: G, producers: EventProducers, config: EngineConfig) -> Self {
        let settlement = SettlementApi::new(db, producers);
        Self { settlement, gateway, config }
    }

    pub fn db(&self) -> &B {
        self.settlement.db()
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }
}

impl<B, G> ReconciliationApi<B, G>
where
    B: LedgerDatabase,
    G: PaymentGateway,
{
    /// Runs one reconciliation batch over the oldest pending entries.
    ///
    /// Entries created less than `poll_grace` ago are skipped; their webhook is probably on its way. Failures on
    /// individual entries are logged and counted, and do not stop the batch.
    pub async fn sync_pending_payments(&self, now: DateTime<Utc>) -> Result<ReconcileReport, ReconciliationError> {
        let cutoff = now - self.config.poll_grace;
        let pending = self.db().fetch_pending_entries(self.config.batch_size).await?;
        let mut report = ReconcileReport::default();
        for entry in pending.iter().filter(|e| e.created_at() <= cutoff) {
            match self.process_single(entry, now).await {
                Ok(outcome) => report.record(&outcome),
                Err(e) => {
                    error!("🕰️ Could not reconcile [{}]. {e}", entry.external_ref_id());
                    report.checked += 1;
                    report.failed += 1;
                },
            }
        }
        if report.checked > 0 {
            info!(
                "🕰️ Reconciled {} entries. {} settled ({} forced), {} still pending, {} gateway errors, {} failed",
                report.checked, report.settled, report.forced, report.still_pending, report.gateway_errors, report.failed
            );
        }
        Ok(report)
    }

    /// Brings one pending entry up to date with the gateway.
    ///
    /// A final remote status is applied through the shared settlement path. If the gateway says the payment is still
    /// pending, or cannot be reached, the entry is left alone unless it is overdue, in which case it is expired.
    pub async fn process_single(
        &self,
        entry: &LedgerEntry,
        now: DateTime<Utc>,
    ) -> Result<ReconcileOutcome, ReconciliationError> {
        if !entry.is_pending() {
            return Ok(ReconcileOutcome::AlreadyProcessed { status: entry.status() });
        }
        let query = StatusQuery {
            ref_id: entry.external_ref_id().to_string(),
            amount: Some(entry.amount()),
            channel: entry.channel().map(String::from),
        };
        let overdue = now > entry.expires_at() + self.config.grace_period;
        let gateway_error = match self.gateway.check_status(query).await {
            Ok(report) => match report.status.outcome() {
                Some(outcome) => {
                    let context = SettlementContext::new("reconcile", now).with_remote(report.raw);
                    return self.apply(entry, outcome, context, false).await;
                },
                None => {
                    trace!("🕰️ Gateway still reports [{}] as pending", entry.external_ref_id());
                    None
                },
            },
            Err(e) => {
                warn!("🕰️ Could not check the status of [{}]. Will try again later. {e}", entry.external_ref_id());
                Some(e.to_string())
            },
        };
        if overdue {
            info!(
                "🕰️ [{}] expired at {} and is past its grace period. Expiring it locally.",
                entry.external_ref_id(),
                entry.expires_at()
            );
            let context = SettlementContext::new("timeout", now)
                .with_remote(json!({ "forced": true, "gateway_error": gateway_error }));
            return self.apply(entry, SettlementOutcome::Expired, context, true).await;
        }
        Ok(ReconcileOutcome::StillPending { gateway_error })
    }

    /// Reconciles a single entry on demand, e.g. when a user opens their payment page. Returns the entry as it
    /// stands afterwards.
    pub async fn reconcile(
        &self,
        target: ReconcileTarget,
        now: DateTime<Utc>,
    ) -> Result<(LedgerEntry, ReconcileOutcome), ReconciliationError> {
        let entry = self.resolve(&target).await?;
        let outcome = self.process_single(&entry, now).await?;
        debug!("🕰️ On-demand reconciliation of {target}: {outcome:?}");
        let entry = self
            .db()
            .fetch_ledger_entry(entry.ledger_id())
            .await?
            .ok_or_else(|| ReconciliationError::LedgerEntryNotFound(target.to_string()))?;
        Ok((entry, outcome))
    }

    pub async fn resolve(&self, target: &ReconcileTarget) -> Result<LedgerEntry, ReconciliationError> {
        let entry = match target {
            ReconcileTarget::RefId(ref_id) => self.db().fetch_ledger_entry_by_ref(ref_id).await?,
            ReconcileTarget::LedgerId(id) => self.db().fetch_ledger_entry(*id).await?,
            ReconcileTarget::IntentId(intent_id) => self.db().fetch_ledger_entry_by_intent(intent_id).await?,
        };
        entry.ok_or_else(|| ReconciliationError::LedgerEntryNotFound(target.to_string()))
    }

    async fn apply(
        &self,
        entry: &LedgerEntry,
        outcome: SettlementOutcome,
        context: SettlementContext,
        forced: bool,
    ) -> Result<ReconcileOutcome, ReconciliationError> {
        let result = self.settlement.settle_ledger_entry(entry.ledger_id(), outcome, context).await?;
        let outcome = match result {
            SettlementResult::Settled(entry) => ReconcileOutcome::Settled { status: entry.status(), forced },
            SettlementResult::AlreadyProcessed(status) => ReconcileOutcome::AlreadyProcessed { status },
        };
        Ok(outcome)
    }
}
