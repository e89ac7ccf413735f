//! Backend API integration.
//!
//! This module provides a typed client for the dashboard backend and the
//! [`MarketData`] seam the polling jobs fetch through.

mod client;
mod converter;

pub use client::{ApiClient, ApiClientBuilder};
pub use converter::DataConverter;

use crate::error::Result;
use crate::state::{Analysis, PortfolioSummary, QuoteSnapshot, SeriesPoint, SymbolMatch, Timeframe};
use async_trait::async_trait;

/// Source of market data.
///
/// Implemented by [`ApiClient`]; tests substitute their own sources.
#[async_trait]
pub trait MarketData: Send + Sync {
    /// Latest quote for a symbol.
    async fn quote(&self, symbol: &str) -> Result<QuoteSnapshot>;

    /// Composite analysis (quote, indicators, recommendation) for a symbol.
    async fn analysis(&self, symbol: &str) -> Result<Analysis>;

    /// OHLCV bars for a symbol, sorted by time ascending.
    async fn ohlcv(&self, symbol: &str, timeframe: Timeframe) -> Result<Vec<SeriesPoint>>;

    /// Symbols matching a free-text query.
    async fn search(&self, query: &str) -> Result<Vec<SymbolMatch>>;

    /// Portfolio summary.
    async fn portfolio(&self) -> Result<PortfolioSummary>;
}
