use std::{future::Future, time::Duration};

use log::*;

use crate::GatewayApiError;

/// A bounded retry schedule: at most `max_retries` additional attempts, sleeping `initial_backoff`, then twice that,
/// and so on, between attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub initial_backoff: Duration,
}

impl RetryPolicy {
    pub fn new(max_retries: u32, initial_backoff: Duration) -> Self {
        Self { max_retries, initial_backoff }
    }

    pub fn no_retries() -> Self {
        Self { max_retries: 0, initial_backoff: Duration::ZERO }
    }

    /// The delay before retry number `attempt` (1-based).
    pub fn backoff(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
        self.initial_backoff.saturating_mul(factor)
    }
}

/// Runs `f` until it succeeds, fails with a non-transient error, or the retry budget is exhausted. The last error is
/// returned in the latter two cases.
pub async fn with_retries<T, F, Fut>(policy: RetryPolicy, label: &str, mut f: F) -> Result<T, GatewayApiError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, GatewayApiError>>,
{
    let mut attempt = 0;
    loop {
        match f().await {
            Ok(v) => return Ok(v),
            Err(e) if e.is_transient() && attempt < policy.max_retries => {
                attempt += 1;
                let delay = policy.backoff(attempt);
                warn!("🌐️ {label} failed ({e}). Retry {attempt}/{} in {delay:?}", policy.max_retries);
                tokio::time::sleep(delay).await;
            },
            Err(e) => {
                debug!("🌐️ {label} failed after {} attempt(s). {e}", attempt + 1);
                return Err(e);
            },
        }
    }
}
