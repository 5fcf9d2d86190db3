use chrono::Utc;
use log::*;
use tokio::task::JoinHandle;
use voucher_payment_engine::{ReconciliationApi, SqliteDatabase};

use crate::integrations::paygate::PaygateGateway;

/// Starts the reconciliation worker. Do not await the returned JoinHandle, as it will run indefinitely.
///
/// Every `interval`, the oldest pending orders and deposits are checked against the gateway. This catches payments
/// whose webhook never arrived, and expires entries that are past their grace period.
pub fn start_reconciliation_worker(
    api: ReconciliationApi<SqliteDatabase, PaygateGateway>,
    interval: std::time::Duration,
) -> JoinHandle<()> {
    // tokio's interval panics on a zero period
    let interval = interval.max(std::time::Duration::from_secs(1));
    tokio::spawn(async move {
        let mut timer = tokio::time::interval(interval);
        timer.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        info!("🕰️ Reconciliation worker started. Running every {}s", interval.as_secs());
        loop {
            timer.tick().await;
            trace!("🕰️ Running reconciliation job");
            match api.sync_pending_payments(Utc::now()).await {
                Ok(report) if report.checked > 0 => debug!("🕰️ Reconciliation job complete. {report:?}"),
                Ok(_) => trace!("🕰️ Nothing to reconcile"),
                Err(e) => error!("🕰️ Error running reconciliation job: {e}"),
            }
        }
    })
}
