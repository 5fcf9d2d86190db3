use chrono::Duration;
use vpg_common::Rupiah;

/// Tunables for the checkout, settlement and reconciliation APIs. Built once at start-up and handed to each API; the
/// engine never reads the environment itself.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// How long a pending order or deposit waits for payment
    pub order_timeout: Duration,
    /// Extra time after `expires_at` before an entry is expired locally, even if the gateway cannot be reached
    pub grace_period: Duration,
    /// Pending entries younger than this are left alone by the batch reconciler, so that it does not race the
    /// webhook that is probably about to arrive
    pub poll_grace: Duration,
    /// Maximum number of entries examined in one reconciliation batch
    pub batch_size: i64,
    /// Polling interval of the per-order watcher
    pub watch_interval: std::time::Duration,
    pub min_deposit: Rupiah,
    pub max_quantity: i64,
    /// The gateway channels users may pay with
    pub channels: Vec<String>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            order_timeout: Duration::minutes(15),
            grace_period: Duration::minutes(5),
            poll_grace: Duration::seconds(30),
            batch_size: 50,
            watch_interval: std::time::Duration::from_secs(3),
            min_deposit: Rupiah::from(10_000),
            max_quantity: 100,
            channels: vec!["qris".to_string()],
        }
    }
}

impl EngineConfig {
    pub fn accepts_channel(&self, channel: &str) -> bool {
        self.channels.iter().any(|c| c.eq_ignore_ascii_case(channel))
    }
}
