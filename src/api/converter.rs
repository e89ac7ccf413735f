//! Wire formats and their conversion to internal state types.

use crate::state::{
    Analysis, Indicators, QuoteSnapshot, Recommendation, SeriesPoint, SymbolMatch, VixReading,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;

/// Quote as served by `/api/v1/stocks/quote/{symbol}`.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct QuoteResponse {
    pub symbol: String,
    pub current_price: Decimal,
    #[serde(default)]
    pub percent_change: Decimal,
    #[serde(default)]
    pub change: Decimal,
    #[serde(default)]
    pub high: Decimal,
    #[serde(default)]
    pub low: Decimal,
    #[serde(default)]
    pub open: Decimal,
    #[serde(default)]
    pub previous_close: Decimal,
    #[serde(default)]
    pub is_simulated: Option<bool>,
}

/// Payload of `/api/v1/stocks/analysis/{symbol}`.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct AnalysisResponse {
    pub symbol: String,
    pub quote: QuoteResponse,
    #[serde(default)]
    pub indicators: Indicators,
    #[serde(default)]
    pub vix: VixReading,
    #[serde(default)]
    pub recommendation: Recommendation,
}

/// Payload of `/api/v1/market/ohlcv/{symbol}`.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct OhlcvResponse {
    #[serde(default)]
    pub data: Vec<BarResponse>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct BarResponse {
    pub time: i64,
    #[serde(default)]
    pub open: Decimal,
    #[serde(default)]
    pub high: Decimal,
    #[serde(default)]
    pub low: Decimal,
    pub close: Decimal,
    #[serde(default)]
    pub volume: Decimal,
}

/// Payload of `/api/v1/stocks/search`.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct SearchResponse {
    #[serde(default)]
    pub symbols: Vec<SymbolMatch>,
}

/// Converts API responses to internal state types.
pub struct DataConverter;

impl DataConverter {
    /// Convert a quote payload, stamping it with the receive time.
    pub(crate) fn convert_quote(quote: QuoteResponse, fetched_at: DateTime<Utc>) -> QuoteSnapshot {
        QuoteSnapshot {
            symbol: quote.symbol.to_uppercase(),
            price: quote.current_price,
            percent_change: quote.percent_change,
            change: quote.change,
            high: quote.high,
            low: quote.low,
            open: quote.open,
            previous_close: quote.previous_close,
            is_simulated: quote.is_simulated.unwrap_or(false),
            fetched_at,
        }
    }

    /// Convert an analysis payload.
    pub(crate) fn convert_analysis(analysis: AnalysisResponse, fetched_at: DateTime<Utc>) -> Analysis {
        Analysis {
            symbol: analysis.symbol.to_uppercase(),
            quote: Self::convert_quote(analysis.quote, fetched_at),
            indicators: analysis.indicators,
            vix: analysis.vix,
            recommendation: analysis.recommendation,
        }
    }

    /// Convert bars into a time-ascending series.
    ///
    /// The feed is not guaranteed ordered. Missing (zero) open, high or low
    /// values are filled from the close so every bar draws as a candle.
    pub(crate) fn convert_series(bars: Vec<BarResponse>) -> Vec<SeriesPoint> {
        let mut series: Vec<SeriesPoint> = bars
            .into_iter()
            .map(|bar| {
                let or_close = |v: Decimal| if v.is_zero() { bar.close } else { v };
                SeriesPoint {
                    time: bar.time,
                    open: or_close(bar.open),
                    high: or_close(bar.high),
                    low: or_close(bar.low),
                    close: bar.close,
                    volume: bar.volume,
                }
            })
            .collect();
        series.sort_by_key(|p| p.time);
        series
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rust_decimal_macros::dec;

    #[test]
    fn test_convert_quote() {
        let wire: QuoteResponse = serde_json::from_str(
            r#"{"symbol": "aapl", "current_price": 189.84, "percent_change": -0.52,
                "change": -0.99, "high": 191.2, "low": 188.1, "open": 190.5,
                "previous_close": 190.83, "is_simulated": true}"#,
        )
        .unwrap();
        let now = Utc::now();
        let quote = DataConverter::convert_quote(wire, now);

        assert_eq!(quote.symbol, "AAPL");
        assert_eq!(quote.price, dec!(189.84));
        assert_eq!(quote.percent_change, dec!(-0.52));
        assert_eq!(quote.previous_close, dec!(190.83));
        assert!(quote.is_simulated);
        assert_eq!(quote.fetched_at, now);
    }

    #[test]
    fn test_quote_optional_fields_default() {
        let wire: QuoteResponse =
            serde_json::from_str(r#"{"symbol": "SPY", "current_price": 512}"#).unwrap();
        let quote = DataConverter::convert_quote(wire, Utc::now());
        assert_eq!(quote.percent_change, Decimal::ZERO);
        assert!(!quote.is_simulated);
    }

    #[test]
    fn test_quote_without_price_is_rejected() {
        let parsed = serde_json::from_str::<QuoteResponse>(r#"{"symbol": "SPY"}"#);
        assert!(parsed.is_err());
    }

    #[test]
    fn test_series_sorted_and_filled() {
        let wire: OhlcvResponse = serde_json::from_str(
            r#"{"data": [
                {"time": 300, "open": 3, "high": 4, "low": 2, "close": 3.5, "volume": 10},
                {"time": 100, "close": 1.5},
                {"time": 200, "open": 2, "high": 0, "low": 1, "close": 2.5, "volume": 7}
            ]}"#,
        )
        .unwrap();
        let series = DataConverter::convert_series(wire.data);

        let times: Vec<i64> = series.iter().map(|p| p.time).collect();
        assert_eq!(times, [100, 200, 300]);

        assert_eq!(series[0].open, dec!(1.5));
        assert_eq!(series[0].high, dec!(1.5));
        assert_eq!(series[0].low, dec!(1.5));
        assert_eq!(series[0].volume, Decimal::ZERO);
        assert_eq!(series[1].high, dec!(2.5));
        assert_eq!(series[1].open, dec!(2));
    }

    #[test]
    fn test_convert_analysis() {
        let wire: AnalysisResponse = serde_json::from_str(
            r#"{
                "symbol": "nvda",
                "quote": {"symbol": "NVDA", "current_price": 492.25, "percent_change": 1.1},
                "indicators": {
                    "rsi": 58.2,
                    "macd": {"is_positive": true, "histogram": 1.4},
                    "volume": {"ratio": 1.3},
                    "moving_averages": {"sma_20": 480.1, "sma_50": 462.7, "trend": "bullish"}
                },
                "vix": {"value": 14.2, "risk_level": "low"},
                "recommendation": {
                    "action": "BUY", "score": 3, "normalized_score": 0.72,
                    "color": "green", "confidence": "high",
                    "signals": ["RSI neutral", "MACD positive"]
                }
            }"#,
        )
        .unwrap();
        let analysis = DataConverter::convert_analysis(wire, Utc::now());

        assert_eq!(analysis.symbol, "NVDA");
        assert_eq!(analysis.quote.price, dec!(492.25));
        assert_eq!(analysis.indicators.moving_averages.trend, "bullish");
        assert_eq!(analysis.recommendation.action, "BUY");
        assert_eq!(analysis.recommendation.normalized_score, Some(0.72));
        assert_eq!(analysis.recommendation.signals.len(), 2);
        assert!(analysis.recommendation.breakdown.is_none());
        assert_eq!(analysis.vix.risk_level, "low");
    }

    #[test]
    fn test_analysis_with_short_history() {
        let wire: AnalysisResponse = serde_json::from_str(
            r#"{
                "symbol": "RDDT",
                "quote": {"symbol": "RDDT", "current_price": 61.4},
                "indicators": {
                    "rsi": 50,
                    "divergence": {"detected": false, "type": null, "strength": 0},
                    "fibonacci": {"levels": [], "current_level": null}
                }
            }"#,
        )
        .unwrap();
        let analysis = DataConverter::convert_analysis(wire, Utc::now());

        let fibonacci = analysis.indicators.fibonacci.unwrap();
        assert!(fibonacci.levels.is_empty());
        assert!(fibonacci.current_level.is_none());
        assert_eq!(analysis.quote.price, dec!(61.4));
    }

    #[test]
    fn test_analysis_fibonacci_levels() {
        let wire: AnalysisResponse = serde_json::from_str(
            r#"{
                "symbol": "AAPL",
                "quote": {"symbol": "AAPL", "current_price": 190},
                "indicators": {"fibonacci": {
                    "levels": {"0.0": 199.62, "61.8": 181.3, "100.0": 169.21},
                    "swing_high": 199.62, "swing_low": 169.21,
                    "current_level": "38.2", "trend": "up"
                }}
            }"#,
        )
        .unwrap();
        let fibonacci = wire.indicators.fibonacci.unwrap();
        assert_eq!(fibonacci.levels.len(), 3);
        assert_eq!(fibonacci.levels["61.8"], 181.3);
        assert_eq!(fibonacci.current_level.as_deref(), Some("38.2"));

        let bad = serde_json::from_str::<AnalysisResponse>(
            r#"{"symbol": "AAPL", "quote": {"symbol": "AAPL", "current_price": 190},
                "indicators": {"fibonacci": {"levels": [1.0, 2.0]}}}"#,
        );
        assert!(bad.is_err());
    }

    #[test]
    fn test_search_response() {
        let wire: SearchResponse = serde_json::from_str(
            r#"{"symbols": [{"symbol": "AAPL", "name": "Apple Inc."}, {"symbol": "AAL"}]}"#,
        )
        .unwrap();
        assert_eq!(wire.symbols.len(), 2);
        assert_eq!(wire.symbols[1].name, "");
    }
}
