//! Durable preference storage.
//!
//! Preferences live in a string key-value store under two keys:
//! `watchlist` (a JSON array of symbols) and `beginner-mode` (`"true"` or
//! `"false"`). [`PreferenceAdapter`] maps between those keys and
//! [`PersistedPreferences`], falling back to defaults for anything absent or
//! unreadable.

mod file;
mod memory;

pub use file::FileStore;
pub use memory::MemoryStore;

use crate::constants::DEFAULT_WATCHLIST;
use crate::error::Result;
use crate::state::Watchlist;

/// Key holding the JSON-encoded watchlist.
pub const WATCHLIST_KEY: &str = "watchlist";
/// Key holding the beginner-mode flag.
pub const BEGINNER_MODE_KEY: &str = "beginner-mode";

/// A durable string key-value store.
#[cfg_attr(test, mockall::automock)]
pub trait KeyValueStore: Send + Sync {
    /// Read a value. `Ok(None)` when the key was never written.
    fn get(&self, key: &str) -> Result<Option<String>>;

    /// Write a value, durably, before returning.
    fn set(&self, key: &str, value: &str) -> Result<()>;
}

/// The subset of preferences that survives a restart.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersistedPreferences {
    pub watchlist: Watchlist,
    pub beta_mode: bool,
}

impl Default for PersistedPreferences {
    fn default() -> Self {
        Self {
            watchlist: Watchlist::from_symbols(DEFAULT_WATCHLIST),
            beta_mode: true,
        }
    }
}

/// Loads and saves [`PersistedPreferences`] through a [`KeyValueStore`].
pub struct PreferenceAdapter {
    store: Box<dyn KeyValueStore>,
}

impl std::fmt::Debug for PreferenceAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PreferenceAdapter").finish_non_exhaustive()
    }
}

impl PreferenceAdapter {
    /// Create an adapter over the given store.
    pub fn new(store: impl KeyValueStore + 'static) -> Self {
        Self {
            store: Box::new(store),
        }
    }

    /// Read persisted preferences. Never fails.
    ///
    /// Each key falls back to its default independently when it is absent,
    /// unreadable or malformed.
    pub fn load(&self) -> PersistedPreferences {
        let defaults = PersistedPreferences::default();

        let watchlist = match self.read(WATCHLIST_KEY) {
            Some(raw) => match serde_json::from_str::<Vec<String>>(&raw) {
                Ok(symbols) => Watchlist::from_symbols(symbols),
                Err(e) => {
                    tracing::warn!("Stored watchlist is malformed, using default: {}", e);
                    defaults.watchlist
                }
            },
            None => defaults.watchlist,
        };

        let beta_mode = match self.read(BEGINNER_MODE_KEY) {
            Some(raw) => match raw.trim() {
                "true" => true,
                "false" => false,
                other => {
                    tracing::warn!("Stored beginner mode {:?} is malformed, using default", other);
                    defaults.beta_mode
                }
            },
            None => defaults.beta_mode,
        };

        PersistedPreferences {
            watchlist,
            beta_mode,
        }
    }

    /// Persist the watchlist.
    pub fn save_watchlist(&self, watchlist: &Watchlist) -> Result<()> {
        let encoded = serde_json::to_string(watchlist)?;
        self.store.set(WATCHLIST_KEY, &encoded)
    }

    /// Persist the beginner-mode flag.
    pub fn save_beta_mode(&self, beta_mode: bool) -> Result<()> {
        self.store
            .set(BEGINNER_MODE_KEY, if beta_mode { "true" } else { "false" })
    }

    /// Persist everything.
    pub fn save(&self, prefs: &PersistedPreferences) -> Result<()> {
        self.save_watchlist(&prefs.watchlist)?;
        self.save_beta_mode(prefs.beta_mode)
    }

    fn read(&self, key: &str) -> Option<String> {
        match self.store.get(key) {
            Ok(value) => value,
            Err(e) => {
                tracing::warn!("Failed to read {}: {}", key, e);
                None
            }
        }
    }
}
