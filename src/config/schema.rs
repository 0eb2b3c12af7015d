/// Configuration schema and defaults for chatstat.
///
/// Defines the TOML-serializable configuration structure with the sections
/// `[api]`, `[stats]`, `[database]` and `[logging]`.
///
/// Every field has a built-in default. Users only need to set the values
/// they want to override.
use serde::{Deserialize, Serialize};

use crate::api::models::StatsFilter;

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

/// Top-level chatstat configuration.
///
/// Maps directly to the `~/.chatstat/config.toml` and `.chatstat.toml`
/// file schemas. All sections and fields are optional.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChatstatConfig {
    pub api: ApiConfig,
    pub stats: StatsConfig,
    pub database: DatabaseConfig,
    pub logging: LoggingConfig,
}

// ---------------------------------------------------------------------------
// [api]
// ---------------------------------------------------------------------------

/// Backend connection settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Base URL of the statistics backend, without the `/api` prefix.
    pub base_url: String,
    /// Per-request timeout (milliseconds).
    pub timeout_ms: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000".to_string(),
            timeout_ms: 10_000,
        }
    }
}

// ---------------------------------------------------------------------------
// [stats]
// ---------------------------------------------------------------------------

/// Default exclusions for the user and channel tables.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StatsConfig {
    /// Leave bot accounts out of the user table.
    pub exclude_bots: bool,
    /// Usernames left out of both tables.
    pub exclude_users: Vec<String>,
    /// Channels left out of the user table.
    pub exclude_channels: Vec<String>,
}

impl Default for StatsConfig {
    fn default() -> Self {
        Self {
            exclude_bots: true,
            exclude_users: Vec::new(),
            exclude_channels: Vec::new(),
        }
    }
}

impl StatsConfig {
    /// The request filter these defaults describe. `include_bots` drops
    /// every exclusion, matching the dashboard's "include bots" switch.
    pub fn filter(&self, include_bots: bool) -> StatsFilter {
        if include_bots {
            return StatsFilter::default();
        }
        StatsFilter {
            exclude_bots: self.exclude_bots,
            exclude_users: self.exclude_users.clone(),
            exclude_channels: self.exclude_channels.clone(),
        }
    }
}

// ---------------------------------------------------------------------------
// [database]
// ---------------------------------------------------------------------------

/// Defaults for the message database listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// Rows per page when no saved or explicit page size applies.
    pub page_size: u32,
    /// IANA timezone used to interpret the date filter.
    pub timezone: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            page_size: 50,
            timezone: "UTC".to_string(),
        }
    }
}

/// Largest page size the backend accepts.
pub const MAX_PAGE_SIZE: u32 = 1000;

// ---------------------------------------------------------------------------
// [logging]
// ---------------------------------------------------------------------------

/// Diagnostic logging settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// `tracing` filter directive, e.g. `warn` or `chatstat=debug`.
    /// Overridden by `CHATSTAT_LOG` / `RUST_LOG`.
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "warn".to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// Default TOML content
// ---------------------------------------------------------------------------

impl ChatstatConfig {
    /// Annotated default config file, written by `chatstat config init`.
    pub fn default_toml() -> String {
        r#"# chatstat configuration
#
# Configuration hierarchy (highest precedence wins):
#   1. Environment variables (CHATSTAT_*)
#   2. Project config (.chatstat.toml in current directory)
#   3. User global config (~/.chatstat/config.toml)
#   4. Built-in defaults

[api]
base_url = "http://localhost:8000"
timeout_ms = 10000

[stats]
exclude_bots = true           # Leave bot accounts out of the user table
exclude_users = []            # e.g. ["Dank Memer"]
exclude_channels = []         # e.g. ["bot-spam"]

[database]
page_size = 50                # 1..=1000
timezone = "UTC"              # IANA name, used for the --date filter

[logging]
level = "warn"                # tracing filter; CHATSTAT_LOG overrides
"#
        .to_string()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
