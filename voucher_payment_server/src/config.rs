use std::{env, io::Write, str::FromStr};

use chrono::Duration;
use log::*;
use paygate_tools::GatewayConfig;
use rand::{distributions::Alphanumeric, thread_rng, Rng};
use tempfile::NamedTempFile;
use voucher_payment_engine::EngineConfig;
use vpg_common::{parse_boolean_flag, Rupiah, Secret};

const DEFAULT_VPG_HOST: &str = "127.0.0.1";
const DEFAULT_VPG_PORT: u16 = 8370;
const DEFAULT_DATABASE_URL: &str = "sqlite://data/voucher_store.db";
const DEFAULT_ORDER_TIMEOUT: Duration = Duration::minutes(15);
const DEFAULT_GRACE_PERIOD: Duration = Duration::minutes(5);
const DEFAULT_POLL_GRACE: Duration = Duration::seconds(30);
const DEFAULT_RECONCILE_INTERVAL: std::time::Duration = std::time::Duration::from_secs(60);
const DEFAULT_BATCH_SIZE: i64 = 50;
const DEFAULT_WATCH_INTERVAL: std::time::Duration = std::time::Duration::from_secs(3);
const DEFAULT_MIN_DEPOSIT: i64 = 10_000;
const DEFAULT_MAX_QUANTITY: i64 = 100;

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    /// If true, the X-Forwarded-For header will be used to determine the client's IP address, rather than the
    /// connection's remote address.
    pub use_x_forwarded_for: bool,
    /// If true, the Forwarded header will be used to determine the client's IP address.
    pub use_forwarded: bool,
    /// How long a pending order or deposit waits for payment before it expires.
    pub order_timeout: Duration,
    /// The time past expiry after which a pending entry is expired locally, even if the gateway is unreachable.
    pub grace_period: Duration,
    /// The reconciliation worker leaves entries younger than this to the webhook.
    pub poll_grace: Duration,
    /// How often the reconciliation worker runs.
    pub reconcile_interval: std::time::Duration,
    pub batch_size: i64,
    /// How often a payment watcher polls the gateway.
    pub watch_interval: std::time::Duration,
    pub min_deposit: Rupiah,
    pub max_quantity: i64,
    /// Key that must be supplied in the `X-Admin-Key` header to trigger reconciliation manually.
    pub admin_key: AdminKey,
    pub gateway: GatewayConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_VPG_HOST.to_string(),
            port: DEFAULT_VPG_PORT,
            database_url: DEFAULT_DATABASE_URL.to_string(),
            use_x_forwarded_for: false,
            use_forwarded: false,
            order_timeout: DEFAULT_ORDER_TIMEOUT,
            grace_period: DEFAULT_GRACE_PERIOD,
            poll_grace: DEFAULT_POLL_GRACE,
            reconcile_interval: DEFAULT_RECONCILE_INTERVAL,
            batch_size: DEFAULT_BATCH_SIZE,
            watch_interval: DEFAULT_WATCH_INTERVAL,
            min_deposit: Rupiah::from(DEFAULT_MIN_DEPOSIT),
            max_quantity: DEFAULT_MAX_QUANTITY,
            admin_key: AdminKey::default(),
            gateway: GatewayConfig::default(),
        }
    }
}

impl ServerConfig {
    pub fn new(host: &str, port: u16) -> Self {
        Self { host: host.to_string(), port, ..Default::default() }
    }

    pub fn from_env_or_default() -> Self {
        let host = env::var("VPG_HOST").ok().unwrap_or_else(|| DEFAULT_VPG_HOST.into());
        let port = env::var("VPG_PORT")
            .map(|s| {
                s.parse::<u16>().unwrap_or_else(|e| {
                    error!(
                        "🪛️ {s} is not a valid port for VPG_PORT. {e} Using the default, {DEFAULT_VPG_PORT}, instead."
                    );
                    DEFAULT_VPG_PORT
                })
            })
            .ok()
            .unwrap_or(DEFAULT_VPG_PORT);
        let database_url = env::var("VPG_DATABASE_URL").ok().unwrap_or_else(|| {
            warn!("🪛️ VPG_DATABASE_URL is not set. Using the default, {DEFAULT_DATABASE_URL}.");
            DEFAULT_DATABASE_URL.to_string()
        });
        let use_x_forwarded_for = parse_boolean_flag(env::var("VPG_USE_X_FORWARDED_FOR").ok(), false);
        let use_forwarded = parse_boolean_flag(env::var("VPG_USE_FORWARDED").ok(), false);
        let order_timeout =
            Duration::minutes(positive_env_or_default("VPG_ORDER_TIMEOUT_MINS", DEFAULT_ORDER_TIMEOUT.num_minutes()));
        let grace_period = Duration::minutes(env_or_default("VPG_GRACE_PERIOD_MINS", DEFAULT_GRACE_PERIOD.num_minutes()));
        let poll_grace = Duration::seconds(env_or_default("VPG_POLL_GRACE_SECS", DEFAULT_POLL_GRACE.num_seconds()));
        let reconcile_interval = std::time::Duration::from_secs(positive_env_or_default(
            "VPG_RECONCILE_INTERVAL_SECS",
            DEFAULT_RECONCILE_INTERVAL.as_secs(),
        ));
        let batch_size = positive_env_or_default("VPG_RECONCILE_BATCH_SIZE", DEFAULT_BATCH_SIZE);
        let watch_interval = std::time::Duration::from_millis(positive_env_or_default(
            "VPG_WATCH_INTERVAL_MS",
            DEFAULT_WATCH_INTERVAL.as_millis() as u64,
        ));
        let min_deposit = Rupiah::from(positive_env_or_default("VPG_MIN_DEPOSIT", DEFAULT_MIN_DEPOSIT));
        let max_quantity = positive_env_or_default("VPG_MAX_QUANTITY", DEFAULT_MAX_QUANTITY);
        let admin_key = AdminKey::from_env_or_default();
        let gateway = GatewayConfig::new_from_env_or_default();
        Self {
            host,
            port,
            database_url,
            use_x_forwarded_for,
            use_forwarded,
            order_timeout,
            grace_period,
            poll_grace,
            reconcile_interval,
            batch_size,
            watch_interval,
            min_deposit,
            max_quantity,
            admin_key,
            gateway,
        }
    }

    /// The engine-side view of the configuration. The accepted payment channels are the ones the gateway is
    /// configured for.
    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig {
            order_timeout: self.order_timeout,
            grace_period: self.grace_period,
            poll_grace: self.poll_grace,
            batch_size: self.batch_size,
            watch_interval: self.watch_interval,
            min_deposit: self.min_deposit,
            max_quantity: self.max_quantity,
            channels: self.gateway.channels.names(),
        }
    }
}

/// Reads a numeric setting, logging which value ends up being used.
fn env_or_default<T>(name: &str, default: T) -> T
where
    T: FromStr + std::fmt::Display,
    T::Err: std::fmt::Display,
{
    match env::var(name) {
        Ok(s) => s.trim().parse::<T>().unwrap_or_else(|e| {
            warn!("🪛️ Invalid configuration value for {name} ({s}). {e}. Using the default, {default}.");
            default
        }),
        Err(_) => {
            info!("🪛️ {name} is not set. Using the default value of {default}.");
            default
        },
    }
}

/// As [`env_or_default`], for settings where zero or a negative value would stall or disable the server.
fn positive_env_or_default<T>(name: &str, default: T) -> T
where
    T: FromStr + std::fmt::Display + PartialOrd + Default + Copy,
    T::Err: std::fmt::Display,
{
    positive_or_default(name, env_or_default(name, default), default)
}

fn positive_or_default<T>(name: &str, value: T, default: T) -> T
where T: std::fmt::Display + PartialOrd + Default {
    if value > T::default() {
        value
    } else {
        error!("🪛️ {name} must be greater than zero, but is {value}. Using the default, {default}, instead.");
        default
    }
}

//-------------------------------------------------  AdminKey  ---------------------------------------------------------
#[derive(Clone, Debug)]
pub struct AdminKey(Secret<String>);

impl AdminKey {
    pub fn new<S: Into<String>>(key: S) -> Self {
        Self(Secret::new(key.into()))
    }

    pub fn matches(&self, candidate: &str) -> bool {
        let key = self.0.reveal();
        !key.is_empty() && key.as_str() == candidate
    }

    pub fn from_env_or_default() -> Self {
        match env::var("VPG_ADMIN_KEY") {
            Ok(s) if !s.trim().is_empty() => Self::new(s.trim()),
            _ => Self::default(),
        }
    }
}

impl Default for AdminKey {
    fn default() -> Self {
        warn!(
            "🚨️🚨️🚨️ VPG_ADMIN_KEY has not been set. I'm using a random value for this session. Set VPG_ADMIN_KEY \
             if you want to trigger reconciliation by hand. 🚨️🚨️🚨️"
        );
        let key = thread_rng().sample_iter(&Alphanumeric).take(32).map(char::from).collect::<String>();
        match NamedTempFile::new().ok().and_then(|f| f.keep().ok()) {
            Some((mut f, p)) => match writeln!(f, "{key}") {
                Ok(()) => warn!(
                    "🚨️ The admin key for this session was written to {}. If this is a production instance, set \
                     VPG_ADMIN_KEY instead.",
                    p.to_str().unwrap_or("???")
                ),
                Err(e) => warn!("🪛️ Could not write the admin key to the temporary file. {e}"),
            },
            None => warn!("🪛️ Could not create a temporary file to store the admin key."),
        }
        Self::new(key)
    }
}

//-------------------------------------------------  ServerOptions  ----------------------------------------------------
/// A subset of the server configuration that route handlers need. Secrets stay out of it.
#[derive(Clone, Copy, Debug, Default)]
pub struct ServerOptions {
    pub use_x_forwarded_for: bool,
    pub use_forwarded: bool,
}

impl ServerOptions {
    pub fn from_config(config: &ServerConfig) -> Self {
        Self { use_x_forwarded_for: config.use_x_forwarded_for, use_forwarded: config.use_forwarded }
    }
}
