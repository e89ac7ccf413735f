//! Ordered, duplicate-free symbol list.

use serde::{Deserialize, Serialize};

/// Normalize a user-entered ticker: trimmed and uppercased.
///
/// Symbols are otherwise opaque; validation is the backend's job.
pub fn normalize_symbol(symbol: &str) -> String {
    symbol.trim().to_uppercase()
}

/// The user's watchlist.
///
/// Set semantics with insertion order preserved. Every symbol is stored
/// normalized.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<String>", into = "Vec<String>")]
pub struct Watchlist {
    symbols: Vec<String>,
}

impl Watchlist {
    /// Create an empty watchlist.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from any symbol sequence, keeping the first occurrence of each.
    pub fn from_symbols<I, S>(symbols: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut list = Self::new();
        for symbol in symbols {
            list.insert(symbol.as_ref());
        }
        list
    }

    /// Append a symbol. Returns false if it was already present.
    pub fn insert(&mut self, symbol: &str) -> bool {
        let symbol = normalize_symbol(symbol);
        if symbol.is_empty() || self.symbols.contains(&symbol) {
            return false;
        }
        self.symbols.push(symbol);
        true
    }

    /// Remove a symbol. Returns false if it was absent.
    pub fn remove(&mut self, symbol: &str) -> bool {
        let symbol = normalize_symbol(symbol);
        let before = self.symbols.len();
        self.symbols.retain(|s| *s != symbol);
        self.symbols.len() != before
    }

    /// Check membership.
    pub fn contains(&self, symbol: &str) -> bool {
        let symbol = normalize_symbol(symbol);
        self.symbols.contains(&symbol)
    }

    /// Symbols in display order.
    pub fn as_slice(&self) -> &[String] {
        &self.symbols
    }

    /// Number of tracked symbols.
    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    /// Whether no symbols are tracked.
    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    /// Iterate in display order.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.symbols.iter().map(String::as_str)
    }
}

impl From<Vec<String>> for Watchlist {
    fn from(symbols: Vec<String>) -> Self {
        Self::from_symbols(symbols)
    }
}

impl From<Watchlist> for Vec<String> {
    fn from(list: Watchlist) -> Self {
        list.symbols
    }
}
