use std::fmt::Debug;

use chrono::Utc;
use log::*;
use tokio::sync::mpsc;

use crate::{
    events::EventProducers,
    traits::{LedgerDatabase, PaymentGateway},
    vpe_api::{
        engine_config::EngineConfig,
        errors::ReconciliationError,
        ledger_objects::{ReconcileTarget, WatchUpdate},
        reconciliation_api::ReconciliationApi,
    },
};

/// Follows a single ledger entry until it leaves `pending`, pushing a [`WatchUpdate`] after every poll.
///
/// The watcher is a narrowly-scoped reconciler: each poll goes through [`ReconciliationApi::process_single`], so it
/// settles through exactly the same path as the webhook and the batch poller. It stops when
/// * the entry reaches a terminal status (which, past `expires_at + grace_period`, is guaranteed), or
/// * the receiving side hangs up.
pub struct PaymentWatcher<B, G> {
    reconciler: ReconciliationApi<B, G>,
}

impl<B, G> Debug for PaymentWatcher<B, G> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "PaymentWatcher")
    }
}

impl<B, G> PaymentWatcher<B, G> {
    pub fn new(db: B, gateway: G, producers: EventProducers, config: EngineConfig) -> Self {
        Self { reconciler: ReconciliationApi::new(db, gateway, producers, config) }
    }

    pub fn from_reconciler(reconciler: ReconciliationApi<B, G>) -> Self {
        Self { reconciler }
    }
}

impl<B, G> PaymentWatcher<B, G>
where
    B: LedgerDatabase,
    G: PaymentGateway,
{
    /// Watches the entry identified by `target`. The first update is sent immediately and reflects the entry as it
    /// is stored; the last one has `terminal` set.
    pub async fn watch(
        &self,
        target: ReconcileTarget,
        updates: mpsc::Sender<WatchUpdate>,
    ) -> Result<(), ReconciliationError> {
        let mut entry = self.reconciler.resolve(&target).await?;
        let ref_id = entry.external_ref_id().to_string();
        debug!("👀️ Watching [{ref_id}]");
        let interval = self.reconciler.config().watch_interval;
        loop {
            let update = WatchUpdate::new(entry.clone(), Utc::now());
            let terminal = update.terminal;
            if updates.send(update).await.is_err() {
                debug!("👀️ Nobody is listening for [{ref_id}] any more. Stopping.");
                return Ok(());
            }
            if terminal {
                debug!("👀️ [{ref_id}] is {}. Watch complete.", entry.status());
                return Ok(());
            }
            tokio::select! {
                _ = tokio::time::sleep(interval) => {},
                _ = updates.closed() => {
                    debug!("👀️ Nobody is listening for [{ref_id}] any more. Stopping.");
                    return Ok(());
                },
            }
            let outcome = self.reconciler.process_single(&entry, Utc::now()).await?;
            trace!("👀️ [{ref_id}]: {outcome:?}");
            entry = self
                .reconciler
                .db()
                .fetch_ledger_entry(entry.ledger_id())
                .await?
                .ok_or_else(|| ReconciliationError::LedgerEntryNotFound(ref_id.clone()))?;
        }
    }
}
