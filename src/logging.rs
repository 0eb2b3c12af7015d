/// Diagnostic logging setup.
///
/// Logs go to stderr so table, JSON and CSV output on stdout stays clean.
/// The filter comes from `CHATSTAT_LOG`, then `RUST_LOG`, then the
/// `[logging] level` config value.
use std::io;

use tracing_subscriber::EnvFilter;

use crate::config::schema::LoggingConfig;

/// Pick the filter directive: env vars first, then config.
fn filter_directive(config: &LoggingConfig, var: impl Fn(&str) -> Option<String>) -> String {
    ["CHATSTAT_LOG", "RUST_LOG"]
        .into_iter()
        .filter_map(|name| var(name))
        .find(|value| !value.trim().is_empty())
        .unwrap_or_else(|| config.level.clone())
}

/// Install the global subscriber. Calling it twice is harmless.
pub fn init(config: &LoggingConfig) {
    let directive = filter_directive(config, |name| std::env::var(name).ok());
    let filter = EnvFilter::try_new(&directive).unwrap_or_else(|_| EnvFilter::new("warn"));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .try_init();
}
