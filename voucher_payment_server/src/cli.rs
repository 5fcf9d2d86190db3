use std::{env, env::VarError};

// Printed with their values
const PLAIN_ENVS: [&str; 20] = [
    "RUST_LOG",
    "VPG_HOST",
    "VPG_PORT",
    "VPG_DATABASE_URL",
    "VPG_USE_X_FORWARDED_FOR",
    "VPG_USE_FORWARDED",
    "VPG_ORDER_TIMEOUT_MINS",
    "VPG_GRACE_PERIOD_MINS",
    "VPG_POLL_GRACE_SECS",
    "VPG_RECONCILE_INTERVAL_SECS",
    "VPG_RECONCILE_BATCH_SIZE",
    "VPG_WATCH_INTERVAL_MS",
    "VPG_MIN_DEPOSIT",
    "VPG_MAX_QUANTITY",
    "VPG_GATEWAY_BASE_URL",
    "VPG_GATEWAY_MERCHANT_ID",
    "VPG_GATEWAY_TIMEOUT_MS",
    "VPG_GATEWAY_MAX_RETRIES",
    "VPG_GATEWAY_BACKOFF_MS",
    "VPG_GATEWAY_CHANNELS",
];

// Only reported as set or not set
const SECRET_ENVS: [&str; 3] = ["VPG_ADMIN_KEY", "VPG_GATEWAY_API_KEY", "VPG_GATEWAY_CALLBACK_SECRET"];

/// There's no real CLI for the server. `--version` prints the version, and any other argument prints the help text
/// and the current configuration. Returns true if the server should exit instead of starting.
pub fn handle_command_line_args() -> bool {
    let Some(arg) = env::args().nth(1) else {
        return false;
    };
    match arg.as_str() {
        "-V" | "--version" => println!("voucher_payment_server {}", env!("CARGO_PKG_VERSION")),
        _ => {
            display_readme();
            display_envs();
        },
    }
    true
}

fn display_readme() {
    const README: &str = include_str!("./cli-help.txt");
    println!("\n{README}\n");
}

fn display_envs() {
    println!("Current environment values:");
    for name in PLAIN_ENVS {
        let val = match env::var(name) {
            Ok(s) => s,
            Err(VarError::NotPresent) => "Not set".into(),
            Err(VarError::NotUnicode(s)) => format!("Invalid value: {}", s.to_string_lossy()),
        };
        println!("  {name:<35} {val:<15}");
    }
    for name in SECRET_ENVS {
        let val = if env::var_os(name).is_some_and(|v| !v.is_empty()) { "****" } else { "Not set" };
        println!("  {name:<35} {val:<15}");
    }
}
