//! State management for tickerdeck.
//!
//! The [`Store`] is the single writer of the watchlist and preferences. Every
//! mutation that touches durable state is written through to the
//! [`PreferenceAdapter`] before the call returns, and the new watchlist is
//! published to subscribers (the polling synchronizers).

mod app_state;
mod market_state;
mod portfolio_state;
mod watchlist;

pub use app_state::{Preferences, Tab};
pub use market_state::{
    Analysis, Divergence, Fibonacci, Indicators, Macd, MovingAverages, QuoteSnapshot,
    Recommendation, ScoreContribution, SeriesPoint, SupportResistance, SymbolMatch, Timeframe,
    Trend, VixReading, VolumeRatio, WatchlistRow, WatchlistSummary,
};
pub use portfolio_state::{PortfolioSummary, Position};
pub use watchlist::{Watchlist, normalize_symbol};

use crate::persistence::PreferenceAdapter;
use tokio::sync::watch;

/// Actions that can be applied to the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    // Watchlist
    AddSymbol(String),
    RemoveSymbol(String),
    SetWatchlist(Vec<String>),

    // Preferences
    SetBetaMode(bool),
    ToggleBetaMode,

    // Navigation
    SetActiveTab(Tab),
    SelectSymbol(String),
    ClearSelection,
}

/// The preference and watchlist store.
#[derive(Debug)]
pub struct Store {
    /// Current preferences.
    prefs: Preferences,
    /// Current watchlist.
    watchlist: Watchlist,
    /// Durable storage for the persisted subset.
    adapter: PreferenceAdapter,
    /// Publishes the watchlist after every change.
    watchlist_tx: watch::Sender<Vec<String>>,
}

impl Store {
    /// Load persisted state and build the store.
    ///
    /// Absent or malformed persisted values fall back to the default
    /// watchlist and beginner mode; loading never fails.
    pub fn load(adapter: PreferenceAdapter) -> Self {
        let persisted = adapter.load();
        tracing::info!(
            "Loaded {} watchlist symbols (beginner mode: {})",
            persisted.watchlist.len(),
            persisted.beta_mode
        );

        let (watchlist_tx, _) = watch::channel(persisted.watchlist.as_slice().to_vec());
        Self {
            prefs: Preferences {
                beta_mode: persisted.beta_mode,
                ..Preferences::default()
            },
            watchlist: persisted.watchlist,
            adapter,
            watchlist_tx,
        }
    }

    /// Current preferences.
    pub fn preferences(&self) -> &Preferences {
        &self.prefs
    }

    /// Current watchlist.
    pub fn watchlist(&self) -> &Watchlist {
        &self.watchlist
    }

    /// Check whether a symbol is tracked.
    pub fn contains(&self, symbol: &str) -> bool {
        self.watchlist.contains(symbol)
    }

    /// Subscribe to watchlist changes. The receiver starts at the current list.
    pub fn subscribe_watchlist(&self) -> watch::Receiver<Vec<String>> {
        self.watchlist_tx.subscribe()
    }

    /// Track a symbol. Idempotent.
    pub fn add_symbol(&mut self, symbol: &str) -> &[String] {
        if self.watchlist.insert(symbol) {
            tracing::debug!("Added {} to watchlist", normalize_symbol(symbol));
            self.watchlist_changed();
        }
        self.watchlist.as_slice()
    }

    /// Stop tracking a symbol. Idempotent.
    pub fn remove_symbol(&mut self, symbol: &str) -> &[String] {
        if self.watchlist.remove(symbol) {
            tracing::debug!("Removed {} from watchlist", normalize_symbol(symbol));
            self.watchlist_changed();
        }
        self.watchlist.as_slice()
    }

    /// Replace the watchlist, keeping the first occurrence of each symbol.
    pub fn set_watchlist<I, S>(&mut self, symbols: I) -> &[String]
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let next = Watchlist::from_symbols(symbols);
        if next != self.watchlist {
            self.watchlist = next;
            self.watchlist_changed();
        } else {
            // Same contents still count as an acknowledged write.
            self.persist_watchlist();
        }
        self.watchlist.as_slice()
    }

    /// Switch between beginner and expert presentation. Persisted.
    pub fn set_beta_mode(&mut self, beta_mode: bool) {
        self.prefs.beta_mode = beta_mode;
        if let Err(e) = self.adapter.save_beta_mode(beta_mode) {
            tracing::warn!("Failed to persist beginner mode: {}", e);
        }
    }

    /// Change the active tab. Session only.
    pub fn set_active_tab(&mut self, tab: Tab) {
        self.prefs.active_tab = tab;
    }

    /// Open or close the detail view. Session only.
    pub fn set_selected_symbol(&mut self, symbol: Option<&str>) {
        self.prefs.selected_symbol = symbol
            .map(normalize_symbol)
            .filter(|s| !s.is_empty());
    }

    /// Apply an action to update state.
    pub fn reduce(&mut self, action: Action) {
        match action {
            Action::AddSymbol(symbol) => {
                self.add_symbol(&symbol);
            }
            Action::RemoveSymbol(symbol) => {
                self.remove_symbol(&symbol);
            }
            Action::SetWatchlist(symbols) => {
                self.set_watchlist(symbols);
            }
            Action::SetBetaMode(flag) => self.set_beta_mode(flag),
            Action::ToggleBetaMode => self.set_beta_mode(!self.prefs.beta_mode),
            Action::SetActiveTab(tab) => self.set_active_tab(tab),
            Action::SelectSymbol(symbol) => self.set_selected_symbol(Some(&symbol)),
            Action::ClearSelection => self.set_selected_symbol(None),
        }
    }

    fn watchlist_changed(&mut self) {
        self.persist_watchlist();
        self.watchlist_tx
            .send_replace(self.watchlist.as_slice().to_vec());
    }

    // Best effort: the in-memory list stays authoritative for this session.
    fn persist_watchlist(&self) {
        if let Err(e) = self.adapter.save_watchlist(&self.watchlist) {
            tracing::warn!("Failed to persist watchlist: {}", e);
        }
    }
}
