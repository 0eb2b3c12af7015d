/// Configuration system for chatstat.
///
/// Provides a layered configuration hierarchy:
///
/// 1. **Built-in defaults**: hardcoded in [`schema::ChatstatConfig::default()`]
/// 2. **User global config**: `~/.chatstat/config.toml`
/// 3. **Project local config**: `.chatstat.toml` in the current working directory
/// 4. **Environment variables**: `CHATSTAT_*` overrides (highest precedence)
///
/// Later layers override earlier ones. Missing sections in a TOML file fall
/// back to the built-in defaults.
///
/// Live-refresh settings have no section here; they start from the
/// defaults in [`crate::session::RefreshPrefs`] on every run.
pub mod schema;

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::warn;

pub use schema::ChatstatConfig;

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Load the fully resolved chatstat configuration.
///
/// Merges all layers in order: defaults → global TOML → project TOML → env
/// vars.
pub fn load() -> ChatstatConfig {
    let files: Vec<PathBuf> = [global_config_path(), project_config_path()]
        .into_iter()
        .flatten()
        .collect();
    let mut config = load_layers(&files);

    // Environment variable overrides
    apply_env_overrides(&mut config, |key| std::env::var(key).ok());

    config
}

/// Deep-merge the TOML files in `paths`, later files winning key by key,
/// and resolve the result against the built-in defaults.
///
/// A file that cannot be read as part of the config is skipped with a
/// warning so a typo never blocks a read-only command.
fn load_layers(paths: &[PathBuf]) -> ChatstatConfig {
    let mut merged = toml::Value::Table(toml::Table::new());

    for path in paths {
        let Some(layer) = load_toml_file(path) else {
            continue;
        };
        let mut candidate = merged.clone();
        merge_toml(&mut candidate, layer);
        match candidate.clone().try_into::<ChatstatConfig>() {
            Ok(_) => merged = candidate,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "ignoring invalid config file");
            }
        }
    }

    merged.try_into().unwrap_or_default()
}

/// Parse the TOML file at `path`, if it exists.
fn load_toml_file(path: &Path) -> Option<toml::Value> {
    let content = fs::read_to_string(path).ok()?;
    match toml::from_str(&content) {
        Ok(value) => Some(value),
        Err(e) => {
            warn!(path = %path.display(), error = %e, "ignoring malformed config file");
            None
        }
    }
}

/// Merge `overlay` into `base`.
///
/// Tables merge key by key; any other value (arrays included) replaces
/// the one underneath.
fn merge_toml(base: &mut toml::Value, overlay: toml::Value) {
    match (base, overlay) {
        (toml::Value::Table(base), toml::Value::Table(overlay)) => {
            for (key, value) in overlay {
                match base.get_mut(&key) {
                    Some(existing) => merge_toml(existing, value),
                    None => {
                        base.insert(key, value);
                    }
                }
            }
        }
        (base, overlay) => *base = overlay,
    }
}

// ---------------------------------------------------------------------------
// File paths
// ---------------------------------------------------------------------------

/// Directory holding all chatstat state: `~/.chatstat/`.
pub fn state_dir() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".chatstat"))
}

/// Path to the user global config: `~/.chatstat/config.toml`.
pub fn global_config_path() -> Option<PathBuf> {
    state_dir().map(|dir| dir.join("config.toml"))
}

/// Path to the project local config: `.chatstat.toml` in the current directory.
pub fn project_config_path() -> Option<PathBuf> {
    std::env::current_dir()
        .ok()
        .map(|cwd| cwd.join(".chatstat.toml"))
}

// ---------------------------------------------------------------------------
// Environment variable overrides
// ---------------------------------------------------------------------------

/// Apply environment variable overrides (highest precedence layer).
///
/// Supported variables:
/// - `CHATSTAT_API_URL`: backend base URL
/// - `CHATSTAT_TIMEOUT_MS`: request timeout
/// - `CHATSTAT_EXCLUDE_BOTS`: `1`/`true`/`yes`/`on` to exclude bots
/// - `CHATSTAT_PAGE_SIZE`: database page size
/// - `CHATSTAT_TIMEZONE`: database date-filter timezone
fn apply_env_overrides(config: &mut ChatstatConfig, var: impl Fn(&str) -> Option<String>) {
    if let Some(val) = var("CHATSTAT_API_URL")
        && !val.is_empty()
    {
        config.api.base_url = val;
    }
    if let Some(val) = var("CHATSTAT_TIMEOUT_MS")
        && let Ok(ms) = val.parse::<u64>()
    {
        config.api.timeout_ms = ms;
    }
    if let Some(val) = var("CHATSTAT_EXCLUDE_BOTS") {
        config.stats.exclude_bots = is_truthy(&val);
    }
    if let Some(val) = var("CHATSTAT_PAGE_SIZE")
        && let Ok(size) = val.parse::<u32>()
    {
        config.database.page_size = size.clamp(1, schema::MAX_PAGE_SIZE);
    }
    if let Some(val) = var("CHATSTAT_TIMEZONE")
        && !val.is_empty()
    {
        config.database.timezone = val;
    }
}

/// Check if a string value represents a truthy boolean.
pub fn is_truthy(val: &str) -> bool {
    matches!(
        val.to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

// ---------------------------------------------------------------------------
// Config init / set / reset
// ---------------------------------------------------------------------------

/// Write the default annotated config to `~/.chatstat/config.toml`.
///
/// Returns an error if the file already exists, unless `force` is set.
pub fn init_config(force: bool) -> Result<PathBuf> {
    let path = global_config_path().context("could not determine home directory")?;
    init_config_at(&path, force)?;
    Ok(path)
}

fn init_config_at(path: &Path, force: bool) -> Result<()> {
    if path.exists() && !force {
        anyhow::bail!(
            "config file already exists at {}. Use --force to overwrite.",
            path.display()
        );
    }

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).context("failed to create config directory")?;
    }

    fs::write(path, ChatstatConfig::default_toml()).context("failed to write config file")
}

/// Set a single config key in the global config file.
///
/// Supports dotted keys like `api.base_url`. The file is created from the
/// defaults when missing.
pub fn set_config_value(key: &str, value: &str) -> Result<()> {
    let path = global_config_path().context("could not determine home directory")?;
    set_config_value_at(&path, key, value)
}

fn set_config_value_at(path: &Path, key: &str, value: &str) -> Result<()> {
    let content = if path.exists() {
        fs::read_to_string(path).context("failed to read config file")?
    } else {
        toml::to_string_pretty(&ChatstatConfig::default())
            .context("failed to serialize default config")?
    };

    let mut root: toml::Value =
        toml::from_str(&content).context("failed to parse config as TOML value")?;
    set_toml_value(&mut root, key, value)?;

    // Reject values the schema cannot load before touching the file.
    let serialized = toml::to_string_pretty(&root).context("failed to serialize config")?;
    toml::from_str::<ChatstatConfig>(&serialized)
        .with_context(|| format!("invalid value for '{key}': {value}"))?;

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).context("failed to create config directory")?;
    }
    fs::write(path, serialized).context("failed to write config file")
}

/// Set a value in a TOML value tree using a dotted key path.
///
/// The key must already exist; the new value is parsed according to the
/// type of the existing one.
fn set_toml_value(root: &mut toml::Value, key: &str, raw_value: &str) -> Result<()> {
    let parts: Vec<&str> = key.split('.').collect();
    let Some((&leaf, sections)) = parts.split_last() else {
        anyhow::bail!("empty config key");
    };

    let mut current = root;
    for &part in sections {
        current = current
            .get_mut(part)
            .with_context(|| format!("config key not found: section '{part}' in '{key}'"))?;
    }

    let table = current
        .as_table_mut()
        .with_context(|| format!("expected a table above '{key}'"))?;

    let new_value = match table.get(leaf) {
        Some(toml::Value::Boolean(_)) => toml::Value::Boolean(is_truthy(raw_value)),
        Some(toml::Value::Integer(_)) => {
            let n: i64 = raw_value
                .parse()
                .with_context(|| format!("expected integer for '{key}', got '{raw_value}'"))?;
            toml::Value::Integer(n)
        }
        Some(toml::Value::Array(_)) => {
            // Comma-separated list; an empty string clears it
            let items = raw_value
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(|s| toml::Value::String(s.to_string()))
                .collect();
            toml::Value::Array(items)
        }
        Some(_) => toml::Value::String(raw_value.to_string()),
        None => anyhow::bail!("unknown config key: '{key}'"),
    };

    table.insert(leaf.to_string(), new_value);
    Ok(())
}

/// Reset the global config to defaults (overwrite the file).
pub fn reset_config() -> Result<PathBuf> {
    init_config(true)
}

/// Show the effective (fully resolved) config as TOML.
pub fn show_effective_config() -> Result<String> {
    let config = load();
    toml::to_string_pretty(&config).context("failed to serialize effective config")
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn is_truthy_accepts_variants() {
        assert!(is_truthy("1"));
        assert!(is_truthy("true"));
        assert!(is_truthy("TRUE"));
        assert!(is_truthy("yes"));
        assert!(is_truthy("on"));
        assert!(!is_truthy("0"));
        assert!(!is_truthy("false"));
        assert!(!is_truthy("off"));
        assert!(!is_truthy(""));
    }

    #[test]
    fn env_overrides_apply() {
        let env: HashMap<&str, &str> = HashMap::from([
            ("CHATSTAT_API_URL", "https://stats.example.com"),
            ("CHATSTAT_TIMEOUT_MS", "2500"),
            ("CHATSTAT_EXCLUDE_BOTS", "0"),
            ("CHATSTAT_PAGE_SIZE", "5000"),
            ("CHATSTAT_TIMEZONE", "America/Chicago"),
        ]);
        let mut config = ChatstatConfig::default();
        apply_env_overrides(&mut config, |k| env.get(k).map(|v| v.to_string()));

        assert_eq!(config.api.base_url, "https://stats.example.com");
        assert_eq!(config.api.timeout_ms, 2500);
        assert!(!config.stats.exclude_bots);
        assert_eq!(config.database.page_size, schema::MAX_PAGE_SIZE);
        assert_eq!(config.database.timezone, "America/Chicago");
    }

    #[test]
    fn invalid_env_values_are_ignored() {
        let mut config = ChatstatConfig::default();
        apply_env_overrides(&mut config, |k| match k {
            "CHATSTAT_TIMEOUT_MS" => Some("soon".to_string()),
            "CHATSTAT_API_URL" => Some(String::new()),
            _ => None,
        });
        assert_eq!(config, ChatstatConfig::default());
    }

    #[test]
    fn set_toml_value_updates_string() {
        let mut root: toml::Value = toml::from_str("[api]\nbase_url = \"http://a\"\n").unwrap();
        set_toml_value(&mut root, "api.base_url", "http://b").unwrap();
        assert_eq!(root["api"]["base_url"].as_str(), Some("http://b"));
    }

    #[test]
    fn set_toml_value_updates_bool_and_integer() {
        let mut root: toml::Value =
            toml::from_str("[stats]\nexclude_bots = true\n[database]\npage_size = 50\n").unwrap();
        set_toml_value(&mut root, "stats.exclude_bots", "off").unwrap();
        set_toml_value(&mut root, "database.page_size", "25").unwrap();
        assert_eq!(root["stats"]["exclude_bots"].as_bool(), Some(false));
        assert_eq!(root["database"]["page_size"].as_integer(), Some(25));
    }

    #[test]
    fn set_toml_value_splits_lists() {
        let mut root: toml::Value = toml::from_str("[stats]\nexclude_users = []\n").unwrap();
        set_toml_value(&mut root, "stats.exclude_users", "Dank Memer, MEE6").unwrap();
        let users: Vec<&str> = root["stats"]["exclude_users"]
            .as_array()
            .unwrap()
            .iter()
            .filter_map(|v| v.as_str())
            .collect();
        assert_eq!(users, ["Dank Memer", "MEE6"]);
    }

    #[test]
    fn set_toml_value_rejects_unknown_keys() {
        let mut root: toml::Value = toml::from_str("[api]\nbase_url = \"x\"\n").unwrap();
        assert!(set_toml_value(&mut root, "nonexistent.key", "v").is_err());
        assert!(set_toml_value(&mut root, "api.nope", "v").is_err());
        assert!(set_toml_value(&mut root, "api.base_url", "ok").is_ok());
    }

    #[test]
    fn set_config_value_creates_file_from_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");

        set_config_value_at(&path, "api.timeout_ms", "1234").unwrap();

        let config: ChatstatConfig = toml::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(config.api.timeout_ms, 1234);
        assert_eq!(config.api.base_url, "http://localhost:8000");
    }

    #[test]
    fn set_config_value_rejects_bad_integer() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        assert!(set_config_value_at(&path, "database.page_size", "lots").is_err());
        assert!(!path.exists());
    }

    #[test]
    fn init_refuses_to_overwrite_without_force() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");

        init_config_at(&path, false).unwrap();
        assert!(init_config_at(&path, false).is_err());
        init_config_at(&path, true).unwrap();

        assert_eq!(load_layers(&[path]), ChatstatConfig::default());
    }

    #[test]
    fn malformed_file_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "[api\nbase_url = ").unwrap();
        assert!(load_toml_file(&path).is_none());
        assert_eq!(load_layers(&[path]), ChatstatConfig::default());
    }

    #[test]
    fn project_layer_keeps_unrelated_global_keys() {
        let dir = tempfile::tempdir().unwrap();
        let global = dir.path().join("config.toml");
        let project = dir.path().join(".chatstat.toml");
        fs::write(
            &global,
            "[api]\nbase_url = \"https://stats.example.com\"\n[stats]\nexclude_bots = false\n",
        )
        .unwrap();
        fs::write(&project, "[stats]\nexclude_bots = true\n[api]\ntimeout_ms = 500\n").unwrap();

        let config = load_layers(&[global, project]);
        assert_eq!(config.api.base_url, "https://stats.example.com");
        assert_eq!(config.api.timeout_ms, 500);
        assert!(config.stats.exclude_bots);
        assert_eq!(config.database, ChatstatConfig::default().database);
    }

    #[test]
    fn later_layers_replace_lists_whole() {
        let mut base: toml::Value =
            toml::from_str("[stats]\nexclude_users = [\"a\", \"b\"]\n").unwrap();
        let overlay: toml::Value = toml::from_str("[stats]\nexclude_users = [\"c\"]\n").unwrap();
        merge_toml(&mut base, overlay);
        assert_eq!(base["stats"]["exclude_users"].as_array().map(Vec::len), Some(1));
    }

    #[test]
    fn ill_typed_layer_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let global = dir.path().join("config.toml");
        let project = dir.path().join(".chatstat.toml");
        fs::write(&global, "[api]\ntimeout_ms = 2000\n").unwrap();
        fs::write(&project, "[api]\ntimeout_ms = \"slow\"\n").unwrap();

        assert_eq!(load_layers(&[global, project]).api.timeout_ms, 2000);
    }
}
