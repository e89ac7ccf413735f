//! HTTP client for the dashboard backend.

use super::MarketData;
use super::converter::{
    AnalysisResponse, DataConverter, OhlcvResponse, QuoteResponse, SearchResponse,
};
use crate::config::ApiConfig;
use crate::error::{Error, Result};
use crate::state::{Analysis, PortfolioSummary, QuoteSnapshot, SeriesPoint, SymbolMatch, Timeframe};
use async_trait::async_trait;
use chrono::Utc;
use reqwest::Url;
use serde::de::DeserializeOwned;
use tracing::debug;

/// Builder for creating an API client.
pub struct ApiClientBuilder {
    config: ApiConfig,
}

impl ApiClientBuilder {
    /// Create a new builder with default config.
    pub fn new() -> Self {
        Self {
            config: ApiConfig::default(),
        }
    }

    /// Set the API configuration.
    pub fn config(mut self, config: ApiConfig) -> Self {
        self.config = config;
        self
    }

    /// Override the base URL.
    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.config.base_url = base_url.into();
        self
    }

    /// Build the API client.
    pub fn build(self) -> Result<ApiClient> {
        ApiClient::new(self.config)
    }
}

impl Default for ApiClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Typed client for the backend REST API.
#[derive(Debug, Clone)]
pub struct ApiClient {
    /// Parsed base URL.
    base_url: Url,
    /// Shared connection pool.
    http: reqwest::Client,
}

impl ApiClient {
    /// Create a new API client.
    pub fn new(config: ApiConfig) -> Result<Self> {
        let trimmed = config.base_url.trim().trim_end_matches('/');
        let base_url = Url::parse(trimmed)
            .map_err(|e| Error::config(format!("Invalid base_url {:?}: {}", config.base_url, e)))?;
        if !matches!(base_url.scheme(), "http" | "https") {
            return Err(Error::config(format!(
                "Invalid base_url: must start with http:// or https://, got {:?}",
                config.base_url
            )));
        }

        let http = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()?;

        debug!("Created API client for {}", base_url);
        Ok(Self { base_url, http })
    }

    /// Base URL requests are issued against.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Build an endpoint URL from path segments. Segments are percent-encoded,
    /// so user-typed symbols cannot escape their path position.
    pub fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| Error::config(format!("{} cannot be a base URL", self.base_url)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    /// GET a JSON document.
    ///
    /// Non-success statuses become [`Error::Status`]; a body that does not
    /// match `T` becomes [`Error::Serialization`].
    async fn get_json<T: DeserializeOwned>(&self, url: Url) -> Result<T> {
        debug!("GET {}", url);
        let response = self.http.get(url.clone()).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::Status {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        let body = response.text().await?;
        Ok(serde_json::from_str(&body)?)
    }
}

#[async_trait]
impl MarketData for ApiClient {
    async fn quote(&self, symbol: &str) -> Result<QuoteSnapshot> {
        let url = self.endpoint(&["api", "v1", "stocks", "quote", symbol])?;
        let quote: QuoteResponse = self.get_json(url).await?;
        Ok(DataConverter::convert_quote(quote, Utc::now()))
    }

    async fn analysis(&self, symbol: &str) -> Result<Analysis> {
        let url = self.endpoint(&["api", "v1", "stocks", "analysis", symbol])?;
        let analysis: AnalysisResponse = self.get_json(url).await?;
        Ok(DataConverter::convert_analysis(analysis, Utc::now()))
    }

    async fn ohlcv(&self, symbol: &str, timeframe: Timeframe) -> Result<Vec<SeriesPoint>> {
        let mut url = self.endpoint(&["api", "v1", "market", "ohlcv", symbol])?;
        url.query_pairs_mut()
            .append_pair("timeframe", timeframe.resolution())
            .append_pair("days", &timeframe.days().to_string());
        let response: OhlcvResponse = self.get_json(url).await?;
        Ok(DataConverter::convert_series(response.data))
    }

    async fn search(&self, query: &str) -> Result<Vec<SymbolMatch>> {
        let mut url = self.endpoint(&["api", "v1", "stocks", "search"])?;
        url.query_pairs_mut().append_pair("q", query);
        let response: SearchResponse = self.get_json(url).await?;
        Ok(response.symbols)
    }

    async fn portfolio(&self) -> Result<PortfolioSummary> {
        let url = self.endpoint(&["api", "v1", "portfolio"])?;
        self.get_json(url).await
    }
}
