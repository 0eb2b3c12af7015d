/// Client-side state shared between commands: who is logged in, how live
/// views refresh, and which database filters were last used.
///
/// Each piece of state lives in an [`Observable`] cell. It is created once
/// in `main` and handed to whoever needs it. Readers take snapshots;
/// writers go through the setters here, which notify subscribers.
pub mod credentials;
pub mod preferences;

use std::cell::RefCell;
use std::rc::Rc;

use anyhow::{Context, Result};
use tracing::{info, warn};

use crate::api::ApiClient;
use credentials::{CredentialStore, Credentials};

// ---------------------------------------------------------------------------
// Observable cell
// ---------------------------------------------------------------------------

/// Handle returned by [`Observable::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubscriptionId(u64);

type Listener<T> = Rc<dyn Fn(&T)>;

struct Slot<T> {
    value: T,
    next_id: u64,
    listeners: Vec<(SubscriptionId, Listener<T>)>,
}

/// Single-threaded shared value with change notification.
///
/// Clones share the same underlying value.
pub struct Observable<T> {
    slot: Rc<RefCell<Slot<T>>>,
}

impl<T> Clone for Observable<T> {
    fn clone(&self) -> Self {
        Self {
            slot: Rc::clone(&self.slot),
        }
    }
}

impl<T: Clone> Observable<T> {
    pub fn new(value: T) -> Self {
        Self {
            slot: Rc::new(RefCell::new(Slot {
                value,
                next_id: 0,
                listeners: Vec::new(),
            })),
        }
    }

    /// Snapshot of the current value.
    pub fn get(&self) -> T {
        self.slot.borrow().value.clone()
    }

    pub fn set(&self, value: T) {
        self.slot.borrow_mut().value = value;
        self.notify();
    }

    /// Mutate in place, then notify.
    pub fn update(&self, f: impl FnOnce(&mut T)) {
        f(&mut self.slot.borrow_mut().value);
        self.notify();
    }

    pub fn subscribe(&self, listener: impl Fn(&T) + 'static) -> SubscriptionId {
        let mut slot = self.slot.borrow_mut();
        let id = SubscriptionId(slot.next_id);
        slot.next_id += 1;
        slot.listeners.push((id, Rc::new(listener)));
        id
    }

    pub fn unsubscribe(&self, id: SubscriptionId) {
        self.slot.borrow_mut().listeners.retain(|(lid, _)| *lid != id);
    }

    fn notify(&self) {
        // Listeners run with no borrow held so they may read or write the cell.
        let (value, listeners) = {
            let slot = self.slot.borrow();
            let listeners: Vec<Listener<T>> =
                slot.listeners.iter().map(|(_, l)| Rc::clone(l)).collect();
            (slot.value.clone(), listeners)
        };
        for listener in listeners {
            listener(&value);
        }
    }
}

impl<T: Clone + Default> Default for Observable<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

// ---------------------------------------------------------------------------
// Authorization
// ---------------------------------------------------------------------------

/// Snapshot of the login state.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuthState {
    pub authorized: bool,
    pub username: Option<String>,
    pub display_name: Option<String>,
}

impl AuthState {
    fn from_credentials(credentials: &Credentials) -> Self {
        Self {
            authorized: credentials.access.as_deref().is_some_and(|t| !t.is_empty()),
            username: credentials.username.clone(),
            display_name: credentials.display_name.clone(),
        }
    }
}

/// The authenticated session.
///
/// Restored from the credential store at startup and changed only by
/// [`Session::login`] and [`Session::logout`].
pub struct Session {
    store: Rc<dyn CredentialStore>,
    state: Observable<AuthState>,
}

impl Session {
    pub fn restore(store: Rc<dyn CredentialStore>) -> Self {
        let state = AuthState::from_credentials(&store.load());
        Self {
            store,
            state: Observable::new(state),
        }
    }

    pub fn state(&self) -> AuthState {
        self.state.get()
    }

    pub fn is_authorized(&self) -> bool {
        self.state.get().authorized
    }

    /// Subscribe to login/logout transitions.
    pub fn observe(&self) -> &Observable<AuthState> {
        &self.state
    }

    /// Exchange credentials for tokens, persist them and look up the
    /// account's display name.
    ///
    /// The token pair is stored before the profile lookup so the lookup is
    /// authorized. A failed lookup leaves the session logged in under the
    /// plain username.
    pub fn login(&self, client: &ApiClient, username: &str, password: &str) -> Result<AuthState> {
        let pair = client
            .obtain_token(username, password)
            .context("login failed")?;

        let mut credentials = Credentials {
            access: pair.access,
            refresh: pair.refresh,
            username: Some(username.to_string()),
            display_name: None,
        };
        self.store
            .save(&credentials)
            .context("failed to store credentials")?;

        match client.current_user() {
            Ok(account) => {
                credentials.display_name = Some(account.display_name());
                self.store
                    .save(&credentials)
                    .context("failed to store credentials")?;
            }
            Err(e) => warn!(error = %e, "could not fetch account profile"),
        }

        let state = AuthState::from_credentials(&credentials);
        info!(username, "logged in");
        self.state.set(state.clone());
        Ok(state)
    }

    /// Forget the stored tokens.
    pub fn logout(&self) -> Result<()> {
        self.store.clear().context("failed to clear credentials")?;
        self.state.set(AuthState::default());
        info!("logged out");
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Live refresh preferences
// ---------------------------------------------------------------------------

/// Refresh intervals offered by the dashboard (milliseconds).
pub const INTERVAL_OPTIONS: [u64; 5] = [1_000, 3_000, 10_000, 30_000, 60_000];

/// How live views poll the backend. Never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RefreshPrefs {
    pub enabled: bool,
    pub interval_ms: u64,
}

impl Default for RefreshPrefs {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_ms: 1_000,
        }
    }
}

/// Shared, observable [`RefreshPrefs`].
#[derive(Clone, Default)]
pub struct RefreshSettings {
    prefs: Observable<RefreshPrefs>,
}

impl RefreshSettings {
    pub fn new(prefs: RefreshPrefs) -> Self {
        Self {
            prefs: Observable::new(prefs),
        }
    }

    pub fn get(&self) -> RefreshPrefs {
        self.prefs.get()
    }

    pub fn set_enabled(&self, enabled: bool) {
        self.prefs.update(|p| p.enabled = enabled);
    }

    /// A zero interval is raised to 1ms.
    pub fn set_interval_ms(&self, interval_ms: u64) {
        self.prefs.update(|p| p.interval_ms = interval_ms.max(1));
    }

    pub fn observe(&self) -> &Observable<RefreshPrefs> {
        &self.prefs
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use credentials::MemoryCredentialStore;
    use std::cell::Cell;

    #[test]
    fn observable_notifies_subscribers() {
        let cell = Observable::new(1);
        let seen = Rc::new(Cell::new(0));

        let sink = Rc::clone(&seen);
        let id = cell.subscribe(move |v| sink.set(*v));

        cell.set(5);
        assert_eq!(seen.get(), 5);

        cell.update(|v| *v += 1);
        assert_eq!(seen.get(), 6);
        assert_eq!(cell.get(), 6);

        cell.unsubscribe(id);
        cell.set(9);
        assert_eq!(seen.get(), 6);
    }

    #[test]
    fn observable_clones_share_state() {
        let a = Observable::new(String::from("x"));
        let b = a.clone();
        b.set("y".to_string());
        assert_eq!(a.get(), "y");
    }

    #[test]
    fn listener_may_read_the_cell() {
        let cell = Observable::new(0);
        let reader = cell.clone();
        let seen = Rc::new(Cell::new(0));
        let sink = Rc::clone(&seen);
        cell.subscribe(move |_| sink.set(reader.get()));
        cell.set(3);
        assert_eq!(seen.get(), 3);
    }

    #[test]
    fn session_restores_from_store() {
        let store = Rc::new(MemoryCredentialStore::new(Credentials {
            access: Some("tok".to_string()),
            refresh: Some("ref".to_string()),
            username: Some("admin".to_string()),
            display_name: Some("Ada Lovelace".to_string()),
        }));
        let session = Session::restore(store);
        let state = session.state();
        assert!(state.authorized);
        assert_eq!(state.display_name.as_deref(), Some("Ada Lovelace"));
    }

    #[test]
    fn empty_store_is_logged_out() {
        let session = Session::restore(Rc::new(MemoryCredentialStore::default()));
        assert!(!session.is_authorized());
        assert_eq!(session.state(), AuthState::default());
    }

    #[test]
    fn logout_clears_credentials_and_notifies() {
        let store = Rc::new(MemoryCredentialStore::with_token("tok"));
        let session = Session::restore(store.clone());
        assert!(session.is_authorized());

        let flips = Rc::new(Cell::new(0));
        let sink = Rc::clone(&flips);
        session.observe().subscribe(move |s| {
            if !s.authorized {
                sink.set(sink.get() + 1);
            }
        });

        session.logout().unwrap();
        assert!(!session.is_authorized());
        assert!(store.load().is_empty());
        assert_eq!(flips.get(), 1);
    }

    #[test]
    fn refresh_defaults_and_setters() {
        let settings = RefreshSettings::default();
        assert_eq!(
            settings.get(),
            RefreshPrefs {
                enabled: true,
                interval_ms: 1_000
            }
        );

        let changes = Rc::new(Cell::new(0));
        let sink = Rc::clone(&changes);
        settings.observe().subscribe(move |_| sink.set(sink.get() + 1));

        settings.set_interval_ms(INTERVAL_OPTIONS[2]);
        settings.set_enabled(false);
        assert_eq!(settings.get().interval_ms, 10_000);
        assert!(!settings.get().enabled);
        assert_eq!(changes.get(), 2);

        settings.set_interval_ms(0);
        assert_eq!(settings.get().interval_ms, 1);
    }
}
