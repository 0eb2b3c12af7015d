//! CLI command implementations for chatstat.
//!
//! Provides subcommand handlers for:
//! - `chatstat login|logout|whoami`: session management
//! - `chatstat register <username>`: create a dashboard account
//! - `chatstat summary|timeline|recent`: archive-wide statistics
//! - `chatstat users|channels`: sortable per-user / per-channel tables
//! - `chatstat user|channel <name>`: single profiles
//! - `chatstat messages|message|delete|filter-options`: the message database
//! - `chatstat watch <view>`: live-refreshing views
//! - `chatstat config show|init|set|reset`: configuration management

pub mod database;
pub mod stats;

use std::io::{self, BufRead, Write};
use std::rc::Rc;

use anyhow::{Context as _, Result};
use colored::Colorize;
use tracing::warn;

use crate::api::ApiClient;
use crate::api::models::RegisterRequest;
use crate::config::{self, ChatstatConfig};
use crate::session::Session;
use crate::session::credentials::{CredentialStore, FileCredentialStore, MemoryCredentialStore};
use crate::session::preferences::{PreferenceStore, default_preferences_path};

/// Output format for list commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Table,
    Json,
    Csv,
}

impl OutputFormat {
    pub fn from_str_opt(s: Option<&str>) -> Self {
        match s {
            Some("json") => Self::Json,
            Some("csv") => Self::Csv,
            _ => Self::Table,
        }
    }
}

// ---------------------------------------------------------------------------
// Shared command context
// ---------------------------------------------------------------------------

/// Everything a command needs, built once in `main`.
pub struct Context {
    pub config: ChatstatConfig,
    pub session: Session,
    pub client: ApiClient,
    pub preferences: PreferenceStore,
}

impl Context {
    /// Wire up the credential store, session, client and preferences.
    ///
    /// Without a home directory, credentials and preferences live only for
    /// this process.
    pub fn new(config: ChatstatConfig) -> Self {
        let credentials: Rc<dyn CredentialStore> = match FileCredentialStore::default_location() {
            Some(store) => Rc::new(store),
            None => {
                warn!("no home directory; credentials will not be saved");
                Rc::new(MemoryCredentialStore::default())
            }
        };
        Self::with_parts(config, credentials, default_preferences_path())
    }

    pub fn with_parts(
        config: ChatstatConfig,
        credentials: Rc<dyn CredentialStore>,
        preferences_path: Option<std::path::PathBuf>,
    ) -> Self {
        let session = Session::restore(Rc::clone(&credentials));
        let client = ApiClient::new(&config.api, credentials);
        let preferences = PreferenceStore::open(preferences_path, &config.database);
        Self {
            config,
            session,
            client,
            preferences,
        }
    }
}

// ---------------------------------------------------------------------------
// chatstat login | logout | whoami
// ---------------------------------------------------------------------------

/// Log in and store the token pair.
///
/// The password comes from `--password`, then `CHATSTAT_PASSWORD`, then a
/// line read from stdin.
pub fn run_login(ctx: &Context, username: &str, password: Option<String>) -> Result<()> {
    let password = resolve_password(password)?;

    let state = ctx.session.login(&ctx.client, username, &password)?;
    let name = state.display_name.as_deref().unwrap_or(username);
    println!(
        "{} Logged in as {} at {}",
        "✓".green().bold(),
        name.bold(),
        ctx.client.base_url()
    );
    Ok(())
}

/// Create an account on the backend. Needs an existing login.
///
/// The password is sourced the same way as for `login`.
pub fn run_register(
    ctx: &Context,
    username: &str,
    first_name: &str,
    last_name: &str,
    password: Option<String>,
) -> Result<()> {
    let password = resolve_password(password)?;
    let request = RegisterRequest {
        username,
        password: &password,
        first_name,
        last_name,
    };
    let created = ctx
        .client
        .register(&request)
        .with_context(|| format!("could not register '{username}' (username already taken?)"))?;
    println!(
        "{} Registered {}; log in with `chatstat login {}`",
        "✓".green().bold(),
        created.username.bold(),
        created.username
    );
    Ok(())
}

fn resolve_password(password: Option<String>) -> Result<String> {
    match password.or_else(|| std::env::var("CHATSTAT_PASSWORD").ok()) {
        Some(p) if !p.is_empty() => Ok(p),
        _ => prompt_password(),
    }
}

fn prompt_password() -> Result<String> {
    eprint!("Password: ");
    io::stderr().flush().ok();
    let mut line = String::new();
    io::stdin()
        .lock()
        .read_line(&mut line)
        .context("failed to read password from stdin")?;
    let password = line.trim_end_matches(['\r', '\n']).to_string();
    if password.is_empty() {
        anyhow::bail!("no password given");
    }
    Ok(password)
}

pub fn run_logout(ctx: &Context) -> Result<()> {
    if !ctx.session.is_authorized() {
        println!("{}", "Not logged in.".yellow());
        return Ok(());
    }
    ctx.session.logout()?;
    println!("{} Logged out", "✓".green().bold());
    Ok(())
}

/// Show the stored session and, when possible, confirm it with the backend.
pub fn run_whoami(ctx: &Context) -> Result<()> {
    let state = ctx.session.state();
    if !state.authorized {
        println!(
            "{}",
            "Not logged in. Run `chatstat login <username>`.".yellow()
        );
        return Ok(());
    }

    print_item("Backend", true, ctx.client.base_url());
    print_item(
        "Username",
        true,
        state.username.as_deref().unwrap_or("(unknown)"),
    );

    match ctx.client.current_user() {
        Ok(account) => {
            print_item("Name", true, &account.display_name());
            if !account.email.is_empty() {
                print_item("Email", true, &account.email);
            }
            print_item("Staff", account.is_staff, if account.is_staff { "yes" } else { "no" });
        }
        Err(e) => {
            let stored = state.display_name.as_deref().unwrap_or("(unknown)");
            print_item("Name", true, stored);
            print_item("Token", false, &e.to_string());
        }
    }
    Ok(())
}

fn print_item(name: &str, ok: bool, detail: &str) {
    let status = if ok {
        "✓".green().bold()
    } else {
        "✗".red().bold()
    };
    println!("  {} {:<12} {}", status, name, detail.dimmed());
}

// ---------------------------------------------------------------------------
// chatstat config show | init | set | reset
// ---------------------------------------------------------------------------

/// Show the effective (merged) configuration as TOML.
pub fn run_config_show() -> Result<()> {
    let toml_str = config::show_effective_config()?;
    println!("{}", "Effective chatstat configuration".bold().cyan());
    println!("{}", "=".repeat(50));
    println!();
    println!("{toml_str}");

    let global_exists = config::global_config_path().is_some_and(|p| p.exists());
    let project_exists = config::project_config_path().is_some_and(|p| p.exists());
    println!("{}", "Sources (highest priority last):".dimmed());
    println!("  {} built-in defaults", "·".dimmed());
    print_source(global_exists, "~/.chatstat/config.toml");
    print_source(project_exists, ".chatstat.toml");
    println!(
        "  {} {}",
        "·".dimmed(),
        "CHATSTAT_* environment variables".dimmed()
    );

    Ok(())
}

fn print_source(exists: bool, label: &str) {
    if exists {
        println!("  {} {}", "✓".green(), label.dimmed());
    } else {
        println!("  {} {}", "·".dimmed(), format!("{label} (not found)").dimmed());
    }
}

/// Initialize a default config file at `~/.chatstat/config.toml`.
pub fn run_config_init(force: bool) -> Result<()> {
    let path = config::init_config(force)?;
    println!(
        "{} Config written to {}",
        "✓".green().bold(),
        path.display()
    );
    Ok(())
}

/// Set a single configuration value in the global config file.
pub fn run_config_set(key: &str, value: &str) -> Result<()> {
    config::set_config_value(key, value)?;
    println!("{} Set {} = {}", "✓".green().bold(), key.bold(), value);
    Ok(())
}

/// Reset configuration to defaults.
pub fn run_config_reset() -> Result<()> {
    let path = config::reset_config()?;
    println!(
        "{} Config reset to defaults at {}",
        "✓".green().bold(),
        path.display()
    );
    Ok(())
}

// ---------------------------------------------------------------------------
// Output helpers
// ---------------------------------------------------------------------------

pub(crate) fn print_json<T: serde::Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Quote a CSV field when it contains a separator, quote or newline.
pub(crate) fn csv_field(s: &str) -> String {
    if s.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", s.replace('"', "\"\""))
    } else {
        s.to_string()
    }
}

/// Print a section title in the house style.
pub(crate) fn print_title(title: &str, width: usize) {
    println!("{}", title.bold().cyan());
    println!("{}", "=".repeat(width));
}

/// Collapse whitespace so message bodies fit on one table row.
pub(crate) fn one_line(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
