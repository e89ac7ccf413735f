//! Market data types and watchlist read models.

use crate::constants::company_name;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Latest quote for one symbol.
///
/// Replaced wholesale on each successful fetch; never merged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuoteSnapshot {
    /// Ticker symbol.
    pub symbol: String,
    /// Last traded price.
    pub price: Decimal,
    /// Change versus previous close, in percent.
    pub percent_change: Decimal,
    /// Absolute change versus previous close.
    pub change: Decimal,
    /// Session high.
    pub high: Decimal,
    /// Session low.
    pub low: Decimal,
    /// Session open.
    pub open: Decimal,
    /// Previous session close.
    pub previous_close: Decimal,
    /// Set when the backend served synthetic data (no market data key).
    pub is_simulated: bool,
    /// When this snapshot was received.
    pub fetched_at: DateTime<Utc>,
}

impl QuoteSnapshot {
    /// Direction of the session move.
    pub fn trend(&self) -> Trend {
        if self.percent_change > Decimal::ZERO {
            Trend::Up
        } else if self.percent_change < Decimal::ZERO {
            Trend::Down
        } else {
            Trend::Flat
        }
    }

    /// Session range (high - low).
    pub fn range(&self) -> Decimal {
        self.high - self.low
    }
}

impl AsRef<QuoteSnapshot> for QuoteSnapshot {
    fn as_ref(&self) -> &QuoteSnapshot {
        self
    }
}

/// Direction of a price move.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trend {
    Up,
    Down,
    Flat,
}

/// One OHLCV bar.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SeriesPoint {
    /// Bar open time, unix seconds.
    pub time: i64,
    pub open: Decimal,
    pub high: Decimal,
    pub low: Decimal,
    pub close: Decimal,
    pub volume: Decimal,
}

/// Chart window requested from the OHLCV endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Timeframe {
    /// Hourly bars over one day.
    #[default]
    OneDay,
    /// Daily bars over a week.
    OneWeek,
    /// Daily bars over a month.
    OneMonth,
    /// Daily bars over a year.
    OneYear,
    /// Daily bars over two weeks, used for list sparklines.
    Sparkline,
}

impl Timeframe {
    /// Timeframes offered by the detail view.
    pub const CHART: [Timeframe; 4] = [Self::OneDay, Self::OneWeek, Self::OneMonth, Self::OneYear];

    /// Bar resolution understood by the backend.
    pub fn resolution(&self) -> &'static str {
        match self {
            Self::OneDay => "60",
            Self::OneWeek | Self::OneMonth | Self::OneYear | Self::Sparkline => "D",
        }
    }

    /// Lookback in days.
    pub fn days(&self) -> u32 {
        match self {
            Self::OneDay => 1,
            Self::OneWeek => 7,
            Self::OneMonth => 30,
            Self::OneYear => 365,
            Self::Sparkline => 14,
        }
    }
}

impl std::fmt::Display for Timeframe {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::OneDay => write!(f, "1D"),
            Self::OneWeek => write!(f, "1W"),
            Self::OneMonth => write!(f, "1M"),
            Self::OneYear => write!(f, "1Y"),
            Self::Sparkline => write!(f, "14D"),
        }
    }
}

/// Search hit from the symbol search endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SymbolMatch {
    pub symbol: String,
    #[serde(default)]
    pub name: String,
}

/// Composite analysis for one symbol. Every indicator is precomputed by the
/// backend.
#[derive(Debug, Clone, PartialEq)]
pub struct Analysis {
    pub symbol: String,
    pub quote: QuoteSnapshot,
    pub indicators: Indicators,
    pub vix: VixReading,
    pub recommendation: Recommendation,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Indicators {
    pub rsi: f64,
    pub macd: Macd,
    pub volume: VolumeRatio,
    pub moving_averages: MovingAverages,
    pub support_resistance: Option<SupportResistance>,
    pub divergence: Option<Divergence>,
    pub fibonacci: Option<Fibonacci>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Macd {
    pub is_positive: bool,
    pub histogram: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VolumeRatio {
    pub ratio: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MovingAverages {
    pub sma_20: f64,
    pub sma_50: f64,
    pub trend: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SupportResistance {
    pub support_level: f64,
    pub resistance_level: f64,
    pub current_price: f64,
    pub support_distance_pct: f64,
    pub resistance_distance_pct: f64,
    pub near_support: bool,
    pub near_resistance: bool,
    pub signal: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Divergence {
    pub detected: bool,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub strength: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Fibonacci {
    /// Retracement level name (e.g. "61.8") to price. Empty when the backend
    /// had too little history.
    #[serde(deserialize_with = "levels_or_empty")]
    pub levels: BTreeMap<String, f64>,
    pub swing_high: f64,
    pub swing_low: f64,
    pub current_price: f64,
    pub current_level: Option<String>,
    pub trend: String,
}

/// Short histories come back as `"levels": []` instead of an object.
fn levels_or_empty<'de, D>(deserializer: D) -> Result<BTreeMap<String, f64>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Levels {
        Map(BTreeMap<String, f64>),
        List(Vec<serde_json::Value>),
        Null(()),
    }

    match Levels::deserialize(deserializer)? {
        Levels::Map(levels) => Ok(levels),
        Levels::List(items) if items.is_empty() => Ok(BTreeMap::new()),
        Levels::List(_) => Err(de::Error::custom("expected fibonacci levels as an object")),
        Levels::Null(()) => Ok(BTreeMap::new()),
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VixReading {
    pub value: f64,
    pub risk_level: String,
}

/// Backend recommendation block.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Recommendation {
    /// Action label, e.g. "BUY".
    pub action: String,
    pub score: f64,
    pub normalized_score: Option<f64>,
    pub color: String,
    pub confidence: String,
    pub signals: Vec<String>,
    pub breakdown: Option<Vec<ScoreContribution>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoreContribution {
    pub label: String,
    pub value: f64,
    pub contribution: f64,
}

/// One watchlist row: the symbol and its cached quote, if any.
#[derive(Debug, Clone, PartialEq)]
pub struct WatchlistRow {
    pub symbol: String,
    /// Display name for the row.
    pub name: String,
    pub quote: Option<QuoteSnapshot>,
}

impl WatchlistRow {
    /// Percent change, zero while no quote has arrived.
    pub fn percent_change(&self) -> Decimal {
        self.quote
            .as_ref()
            .map(|q| q.percent_change)
            .unwrap_or_default()
    }
}

/// Read model for watchlist views, in store order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WatchlistSummary {
    pub rows: Vec<WatchlistRow>,
    pub gainers: usize,
    pub losers: usize,
    pub neutral: usize,
    /// Whether any cached quote is synthetic.
    pub any_simulated: bool,
}

impl WatchlistSummary {
    /// Build rows for `symbols`, looking each one up with `lookup`.
    pub fn build<'a, I, F, T>(symbols: I, mut lookup: F) -> Self
    where
        I: IntoIterator<Item = &'a str>,
        F: FnMut(&str) -> Option<T>,
        T: AsRef<QuoteSnapshot>,
    {
        let rows: Vec<WatchlistRow> = symbols
            .into_iter()
            .map(|symbol| WatchlistRow {
                symbol: symbol.to_string(),
                name: company_name(symbol),
                quote: lookup(symbol).map(|q| q.as_ref().clone()),
            })
            .collect();

        let mut summary = Self {
            any_simulated: rows
                .iter()
                .any(|r| r.quote.as_ref().is_some_and(|q| q.is_simulated)),
            ..Default::default()
        };
        for row in &rows {
            let pct = row.percent_change();
            if pct > Decimal::ZERO {
                summary.gainers += 1;
            } else if pct < Decimal::ZERO {
                summary.losers += 1;
            } else {
                summary.neutral += 1;
            }
        }
        summary.rows = rows;
        summary
    }
}
