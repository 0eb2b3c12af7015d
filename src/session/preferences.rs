/// Remembered message-database settings.
///
/// The last filter set, page size and timezone are kept in
/// `~/.chatstat/preferences.json` so `chatstat messages` picks up where the
/// previous invocation left off. Reads and writes are best-effort: a missing
/// or corrupt file falls back to the configured defaults and a failed write
/// is only logged.
use std::fs;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::Observable;
use crate::api::models::{MessageFilters, MessageQuery};
use crate::config::schema::{DatabaseConfig, MAX_PAGE_SIZE};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Preferences {
    pub filters: MessageFilters,
    pub page_size: u32,
    pub timezone: String,
}

impl Default for Preferences {
    fn default() -> Self {
        Self::from_config(&DatabaseConfig::default())
    }
}

impl Preferences {
    pub fn from_config(config: &DatabaseConfig) -> Self {
        Self {
            filters: MessageFilters::default(),
            page_size: config.page_size.clamp(1, MAX_PAGE_SIZE),
            timezone: config.timezone.clone(),
        }
    }

    /// The database query for `page` under these settings.
    pub fn query(&self, page: u32) -> MessageQuery {
        MessageQuery {
            page: page.max(1),
            page_size: self.page_size,
            timezone: self.timezone.clone(),
            filters: self.filters.clone(),
        }
    }
}

/// Observable [`Preferences`] backed by an optional file.
pub struct PreferenceStore {
    path: Option<PathBuf>,
    defaults: Preferences,
    prefs: Observable<Preferences>,
}

impl PreferenceStore {
    /// Load from `path`, falling back to `config` when the file is absent
    /// or unreadable. `None` keeps everything in memory.
    pub fn open(path: Option<PathBuf>, config: &DatabaseConfig) -> Self {
        let defaults = Preferences::from_config(config);
        let loaded = path
            .as_ref()
            .and_then(|p| fs::read_to_string(p).ok())
            .and_then(|content| match serde_json::from_str::<Preferences>(&content) {
                Ok(prefs) => Some(prefs),
                Err(e) => {
                    warn!(error = %e, "ignoring unreadable preferences file");
                    None
                }
            });
        let mut prefs = loaded.unwrap_or_else(|| defaults.clone());
        prefs.page_size = prefs.page_size.clamp(1, MAX_PAGE_SIZE);
        Self {
            path,
            defaults,
            prefs: Observable::new(prefs),
        }
    }

    pub fn get(&self) -> Preferences {
        self.prefs.get()
    }

    pub fn observe(&self) -> &Observable<Preferences> {
        &self.prefs
    }

    pub fn set_filters(&self, filters: MessageFilters) {
        self.prefs.update(|p| p.filters = filters);
    }

    /// Clamped to `1..=1000`.
    pub fn set_page_size(&self, page_size: u32) {
        self.prefs
            .update(|p| p.page_size = page_size.clamp(1, MAX_PAGE_SIZE));
    }

    pub fn set_timezone(&self, timezone: impl Into<String>) {
        let timezone = timezone.into();
        self.prefs.update(|p| p.timezone = timezone);
    }

    /// Write the current preferences. Returns `false` if nothing was written.
    pub fn save(&self) -> bool {
        let Some(path) = &self.path else {
            return false;
        };
        let written = (|| -> Option<()> {
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent).ok()?;
            }
            let json = serde_json::to_string_pretty(&self.prefs.get()).ok()?;
            fs::write(path, json).ok()
        })();
        match written {
            Some(()) => {
                debug!(path = %path.display(), "saved preferences");
                true
            }
            None => {
                warn!(path = %path.display(), "could not save preferences");
                false
            }
        }
    }

    /// Forget everything remembered and go back to the configured defaults.
    pub fn reset(&self) {
        if let Some(path) = &self.path
            && let Err(e) = fs::remove_file(path)
            && e.kind() != std::io::ErrorKind::NotFound
        {
            warn!(path = %path.display(), error = %e, "could not remove preferences");
        }
        self.prefs.set(self.defaults.clone());
    }
}

/// Path to the preferences file: `~/.chatstat/preferences.json`.
pub fn default_preferences_path() -> Option<PathBuf> {
    crate::config::state_dir().map(|dir| dir.join("preferences.json"))
}
