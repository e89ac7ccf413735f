//! What a synchronizer fetches for each symbol.

use crate::api::MarketData;
use crate::error::Result;
use crate::state::{Analysis, QuoteSnapshot, Timeframe};
use async_trait::async_trait;
use rust_decimal::Decimal;
use std::sync::Arc;

/// Per-symbol fetch performed once per pass.
///
/// The output is applied as a unit, so everything a view shows for one
/// symbol comes from the same pass.
#[async_trait]
pub trait PollJob: Send + Sync + 'static {
    /// Snapshot type cached per symbol.
    type Output: Send + Sync + 'static;

    /// Short name used in logs.
    fn name(&self) -> &'static str;

    /// Fetch fresh data for one symbol.
    async fn fetch(&self, symbol: &str) -> Result<Self::Output>;
}

/// Quote only. Used by the watchlist view.
#[derive(Debug)]
pub struct QuoteJob<M> {
    source: Arc<M>,
}

impl<M: MarketData> QuoteJob<M> {
    pub fn new(source: Arc<M>) -> Self {
        Self { source }
    }
}

#[async_trait]
impl<M: MarketData + 'static> PollJob for QuoteJob<M> {
    type Output = QuoteSnapshot;

    fn name(&self) -> &'static str {
        "quotes"
    }

    async fn fetch(&self, symbol: &str) -> Result<QuoteSnapshot> {
        self.source.quote(symbol).await
    }
}

/// Quote plus sparkline closes for the market overview.
#[derive(Debug, Clone, PartialEq)]
pub struct OverviewSnapshot {
    pub quote: QuoteSnapshot,
    /// Closing prices over the sparkline window, oldest first. Empty when the
    /// series could not be fetched.
    pub sparkline: Vec<Decimal>,
}

impl AsRef<QuoteSnapshot> for OverviewSnapshot {
    fn as_ref(&self) -> &QuoteSnapshot {
        &self.quote
    }
}

/// Quote and sparkline, fetched concurrently. The quote is required; a failed
/// sparkline leaves it empty.
#[derive(Debug)]
pub struct OverviewJob<M> {
    source: Arc<M>,
}

impl<M: MarketData> OverviewJob<M> {
    pub fn new(source: Arc<M>) -> Self {
        Self { source }
    }
}

#[async_trait]
impl<M: MarketData + 'static> PollJob for OverviewJob<M> {
    type Output = OverviewSnapshot;

    fn name(&self) -> &'static str {
        "overview"
    }

    async fn fetch(&self, symbol: &str) -> Result<OverviewSnapshot> {
        let (quote, series) = tokio::join!(
            self.source.quote(symbol),
            self.source.ohlcv(symbol, Timeframe::Sparkline)
        );
        let sparkline = match series {
            Ok(series) => series.into_iter().map(|p| p.close).collect(),
            Err(e) => {
                tracing::debug!("No sparkline for {}: {}", symbol, e);
                Vec::new()
            }
        };
        Ok(OverviewSnapshot {
            quote: quote?,
            sparkline,
        })
    }
}

/// Quote and analysis for the single-symbol detail view.
#[derive(Debug, Clone, PartialEq)]
pub struct DetailSnapshot {
    pub quote: QuoteSnapshot,
    pub analysis: Analysis,
}

impl AsRef<QuoteSnapshot> for DetailSnapshot {
    fn as_ref(&self) -> &QuoteSnapshot {
        &self.quote
    }
}

/// Quote and analysis, fetched concurrently. Both are required so the
/// detail view never pairs a quote with an older analysis.
#[derive(Debug)]
pub struct DetailJob<M> {
    source: Arc<M>,
}

impl<M: MarketData> DetailJob<M> {
    pub fn new(source: Arc<M>) -> Self {
        Self { source }
    }
}

#[async_trait]
impl<M: MarketData + 'static> PollJob for DetailJob<M> {
    type Output = DetailSnapshot;

    fn name(&self) -> &'static str {
        "detail"
    }

    async fn fetch(&self, symbol: &str) -> Result<DetailSnapshot> {
        let (quote, analysis) = tokio::join!(
            self.source.quote(symbol),
            self.source.analysis(symbol)
        );
        Ok(DetailSnapshot {
            quote: quote?,
            analysis: analysis?,
        })
    }
}
