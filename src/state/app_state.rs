//! Session-level preferences.

use serde::{Deserialize, Serialize};

/// Navigation tab.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tab {
    #[default]
    Market,
    Find,
    Portfolio,
    Settings,
}

impl std::fmt::Display for Tab {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Market => write!(f, "market"),
            Self::Find => write!(f, "find"),
            Self::Portfolio => write!(f, "portfolio"),
            Self::Settings => write!(f, "settings"),
        }
    }
}

/// User-controlled, cross-view preferences.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Preferences {
    /// Beginner (true) or expert (false) presentation. Persisted.
    pub beta_mode: bool,
    /// Active navigation tab. Session only.
    pub active_tab: Tab,
    /// Symbol open in the detail view. Session only.
    pub selected_symbol: Option<String>,
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            beta_mode: true,
            active_tab: Tab::Market,
            selected_symbol: None,
        }
    }
}

impl Preferences {
    /// Check if the single-symbol detail view is open.
    pub fn is_detail_open(&self) -> bool {
        self.selected_symbol.is_some()
    }
}
