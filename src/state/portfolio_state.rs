//! Portfolio summary as served by the backend.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A held position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Position {
    /// Ticker symbol.
    pub symbol: String,
    /// Shares held.
    pub amount: Decimal,
    /// Average entry price.
    pub entry: Decimal,
    /// Current market price.
    pub current: Decimal,
    /// Unrealized PnL as reported.
    pub pnl: Decimal,
}

/// Portfolio state.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PortfolioSummary {
    /// Cash balance.
    pub balance: Decimal,
    /// PnL for the current session.
    pub pnl_daily: Decimal,
    /// Session PnL in percent.
    pub pnl_percent: Decimal,
    /// Open positions.
    pub positions: Vec<Position>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn summary() -> PortfolioSummary {
        serde_json::from_str(
            r#"{
                "balance": 12500.50,
                "pnl_daily": 345.20,
                "pnl_percent": 2.8,
                "positions": [
                    {"symbol": "SOXL", "amount": 100, "entry": 42.50, "current": 43.12, "pnl": 62.00},
                    {"symbol": "TSLA", "amount": 10, "entry": 240.10, "current": 253.20, "pnl": 131.00}
                ]
            }"#,
        )
        .unwrap()
    }

    #[test]
    fn test_parse_backend_payload() {
        let portfolio = summary();
        assert_eq!(portfolio.balance, dec!(12500.50));
        assert_eq!(portfolio.positions.len(), 2);
        assert_eq!(portfolio.positions[1].symbol, "TSLA");
        assert_eq!(portfolio.positions[1].pnl, dec!(131.00));
    }
}
