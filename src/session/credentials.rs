/// Persisted login credentials.
///
/// The backend issues an access/refresh token pair at login. Both are kept
/// in `~/.chatstat/credentials.json` together with the username and display
/// name so later invocations start out logged in. The API client reads the
/// access token from the store on every request; nothing here validates or
/// refreshes tokens.
use std::cell::RefCell;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Everything persisted for a logged-in session.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Credentials {
    pub access: Option<String>,
    pub refresh: Option<String>,
    pub username: Option<String>,
    pub display_name: Option<String>,
}

impl Credentials {
    pub fn is_empty(&self) -> bool {
        self.access.is_none()
    }
}

/// Storage for [`Credentials`].
pub trait CredentialStore {
    /// Current credentials; empty when nothing is stored or the stored data
    /// is unreadable.
    fn load(&self) -> Credentials;

    fn save(&self, credentials: &Credentials) -> Result<()>;

    fn clear(&self) -> Result<()>;

    /// The bearer token to attach to outgoing requests, if any.
    fn access_token(&self) -> Option<String> {
        self.load().access.filter(|t| !t.is_empty())
    }
}

// ---------------------------------------------------------------------------
// File-backed store
// ---------------------------------------------------------------------------

/// JSON file store, `~/.chatstat/credentials.json` by default.
#[derive(Debug, Clone)]
pub struct FileCredentialStore {
    path: PathBuf,
}

impl FileCredentialStore {
    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Store at the default location, or `None` without a home directory.
    pub fn default_location() -> Option<Self> {
        default_credentials_path().map(Self::at)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl CredentialStore for FileCredentialStore {
    fn load(&self) -> Credentials {
        fs::read_to_string(&self.path)
            .ok()
            .and_then(|content| serde_json::from_str(&content).ok())
            .unwrap_or_default()
    }

    fn save(&self, credentials: &Credentials) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
        let json = serde_json::to_string_pretty(credentials)
            .context("failed to serialize credentials")?;
        fs::write(&self.path, json)
            .with_context(|| format!("failed to write {}", self.path.display()))?;
        restrict_permissions(&self.path)?;
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e).with_context(|| format!("failed to remove {}", self.path.display())),
        }
    }
}

#[cfg(unix)]
fn restrict_permissions(path: &Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(0o600))
        .with_context(|| format!("failed to restrict permissions on {}", path.display()))
}

#[cfg(not(unix))]
fn restrict_permissions(_path: &Path) -> Result<()> {
    Ok(())
}

/// Path to the credentials file: `~/.chatstat/credentials.json`.
pub fn default_credentials_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".chatstat").join("credentials.json"))
}

// ---------------------------------------------------------------------------
// In-memory store
// ---------------------------------------------------------------------------

/// Process-local store, for tests and `--token` style one-off use.
#[derive(Debug, Default)]
pub struct MemoryCredentialStore {
    inner: RefCell<Credentials>,
}

impl MemoryCredentialStore {
    pub fn new(credentials: Credentials) -> Self {
        Self {
            inner: RefCell::new(credentials),
        }
    }

    /// Store holding only an access token.
    pub fn with_token(token: impl Into<String>) -> Self {
        Self::new(Credentials {
            access: Some(token.into()),
            ..Credentials::default()
        })
    }
}

impl CredentialStore for MemoryCredentialStore {
    fn load(&self) -> Credentials {
        self.inner.borrow().clone()
    }

    fn save(&self, credentials: &Credentials) -> Result<()> {
        *self.inner.borrow_mut() = credentials.clone();
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        *self.inner.borrow_mut() = Credentials::default();
        Ok(())
    }
}
