use std::{collections::HashMap, env, time::Duration};

use log::*;
use vpg_common::Secret;

use crate::retry::RetryPolicy;

const DEFAULT_BASE_URL: &str = "https://gateway.example.com/api";
const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);
const DEFAULT_MAX_RETRIES: u32 = 3;
const DEFAULT_INITIAL_BACKOFF: Duration = Duration::from_millis(500);
const DEFAULT_CHANNELS: &str = "qris:QRIS,bca:BCA_VA,bni:BNI_VA,bri:BRI_VA,mandiri:MANDIRI_VA";

#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// Base URL of the gateway's REST API, without a trailing slash.
    pub base_url: String,
    /// The merchant (project) identifier assigned by the gateway. Also part of the callback signature.
    pub merchant_id: String,
    pub api_key: Secret<String>,
    /// The shared secret used in callback signatures.
    pub callback_secret: Secret<String>,
    pub request_timeout: Duration,
    pub retry_policy: RetryPolicy,
    pub channels: ChannelMap,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            merchant_id: String::default(),
            api_key: Secret::default(),
            callback_secret: Secret::default(),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            retry_policy: RetryPolicy::new(DEFAULT_MAX_RETRIES, DEFAULT_INITIAL_BACKOFF),
            channels: ChannelMap::parse(DEFAULT_CHANNELS),
        }
    }
}

impl GatewayConfig {
    pub fn new_from_env_or_default() -> Self {
        let base_url = env::var("VPG_GATEWAY_BASE_URL")
            .map(|s| s.trim_end_matches('/').to_string())
            .unwrap_or_else(|_| {
                warn!("🪛️ VPG_GATEWAY_BASE_URL not set, using (probably useless) default {DEFAULT_BASE_URL}");
                DEFAULT_BASE_URL.to_string()
            });
        let merchant_id = env::var("VPG_GATEWAY_MERCHANT_ID").unwrap_or_else(|_| {
            error!("🪛️ VPG_GATEWAY_MERCHANT_ID is not set. Callbacks cannot be verified without it.");
            String::default()
        });
        let api_key = Secret::new(env::var("VPG_GATEWAY_API_KEY").unwrap_or_else(|_| {
            error!("🪛️ VPG_GATEWAY_API_KEY is not set. Payment intents cannot be created without it.");
            String::default()
        }));
        let callback_secret = Secret::new(env::var("VPG_GATEWAY_CALLBACK_SECRET").unwrap_or_else(|_| {
            error!("🪛️ VPG_GATEWAY_CALLBACK_SECRET is not set. Every callback will be rejected.");
            String::default()
        }));
        let request_timeout = env_duration_ms("VPG_GATEWAY_TIMEOUT_MS", DEFAULT_REQUEST_TIMEOUT);
        let max_retries = env::var("VPG_GATEWAY_MAX_RETRIES")
            .ok()
            .and_then(|s| {
                s.parse::<u32>()
                    .map_err(|e| warn!("🪛️ Invalid configuration value for VPG_GATEWAY_MAX_RETRIES. {e}"))
                    .ok()
            })
            .unwrap_or(DEFAULT_MAX_RETRIES);
        let initial_backoff = env_duration_ms("VPG_GATEWAY_BACKOFF_MS", DEFAULT_INITIAL_BACKOFF);
        let channels = env::var("VPG_GATEWAY_CHANNELS").unwrap_or_else(|_| {
            info!("🪛️ VPG_GATEWAY_CHANNELS is not set. Using the default channel map: {DEFAULT_CHANNELS}");
            DEFAULT_CHANNELS.to_string()
        });
        let channels = ChannelMap::parse(&channels);
        Self {
            base_url,
            merchant_id,
            api_key,
            callback_secret,
            request_timeout,
            retry_policy: RetryPolicy::new(max_retries, initial_backoff),
            channels,
        }
    }
}

fn env_duration_ms(name: &str, default: Duration) -> Duration {
    env::var(name)
        .ok()
        .and_then(|s| {
            s.parse::<u64>()
                .map(Duration::from_millis)
                .map_err(|e| warn!("🪛️ Invalid configuration value for {name}. {e}"))
                .ok()
        })
        .unwrap_or(default)
}

/// Maps the channel names our users see (`qris`, `bca`, ...) onto the gateway's own channel codes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChannelMap {
    channels: HashMap<String, String>,
}

impl ChannelMap {
    /// Parses a comma-separated list of `name:CODE` pairs. Invalid entries are logged and skipped.
    pub fn parse(s: &str) -> Self {
        let channels = s
            .split(',')
            .map(str::trim)
            .filter(|pair| !pair.is_empty())
            .filter_map(|pair| match pair.split_once(':') {
                Some((name, code)) if !name.trim().is_empty() && !code.trim().is_empty() => {
                    Some((name.trim().to_ascii_lowercase(), code.trim().to_string()))
                },
                _ => {
                    warn!("🪛️ Ignoring invalid payment channel mapping: {pair}");
                    None
                },
            })
            .collect();
        Self { channels }
    }

    pub fn vendor_code(&self, channel: &str) -> Option<&str> {
        self.channels.get(&channel.to_ascii_lowercase()).map(String::as_str)
    }

    pub fn contains(&self, channel: &str) -> bool {
        self.vendor_code(channel).is_some()
    }

    pub fn names(&self) -> Vec<String> {
        let mut names = self.channels.keys().cloned().collect::<Vec<String>>();
        names.sort();
        names
    }
}
