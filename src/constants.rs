//! Fixed symbol data shared by the store and the views.

/// Watchlist used when nothing usable has been persisted yet.
pub const DEFAULT_WATCHLIST: [&str; 8] = [
    "AAPL", "TSLA", "NVDA", "GOOGL", "META", "MSFT", "AMZN", "NFLX",
];

/// Symbol shown as the market benchmark on the overview.
pub const BENCHMARK_SYMBOL: &str = "SPY";

const COMPANY_NAMES: [(&str, &str); 10] = [
    ("AAPL", "APPLE INC."),
    ("TSLA", "TESLA MOTORS"),
    ("NVDA", "NVIDIA CORP"),
    ("GOOGL", "ALPHABET INC."),
    ("META", "META PLATFORMS"),
    ("MSFT", "MICROSOFT CORP"),
    ("AMZN", "AMAZON.COM INC."),
    ("NFLX", "NETFLIX INC."),
    ("SPY", "S&P 500 ETF"),
    ("SPX", "S&P 500 INDEX"),
];

/// Display name for a symbol, with a generic fallback for unknown tickers.
pub fn company_name(symbol: &str) -> String {
    let upper = symbol.to_uppercase();
    COMPANY_NAMES
        .iter()
        .find(|(s, _)| *s == upper)
        .map(|(_, name)| (*name).to_string())
        .unwrap_or_else(|| format!("{upper} INC."))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_and_unknown_names() {
        assert_eq!(company_name("nvda"), "NVIDIA CORP");
        assert_eq!(company_name("SOXL"), "SOXL INC.");
    }
}
