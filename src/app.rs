//! Main application module.
//!
//! [`App`] ties the [`Store`] to the polling views. The market tab keeps an
//! overview synchronizer running over the watchlist plus a benchmark quote,
//! the portfolio tab polls watchlist quotes, and selecting a symbol replaces
//! the tab view with a detail synchronizer for it. Views are activated and
//! deactivated as actions change the store.

use crate::api::{ApiClient, MarketData};
use crate::config::{Config, PollingConfig};
use crate::error::{Error, Result};
use crate::persistence::{FileStore, PreferenceAdapter};
use crate::state::{
    Action, PortfolioSummary, QuoteSnapshot, SeriesPoint, Store, SymbolMatch, Tab, Timeframe,
    WatchlistSummary, normalize_symbol,
};
use crate::constants::BENCHMARK_SYMBOL;
use crate::sync::{
    CacheReader, DetailJob, DetailSnapshot, IntervalTicker, OverviewJob, OverviewSnapshot,
    PollJob, PollTarget, QuoteJob, SyncHandle, Synchronizer,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

/// A running synchronizer and the means to read and stop it.
struct ActiveView<T> {
    /// Symbol for single-symbol views.
    symbol: Option<String>,
    handle: SyncHandle,
    reader: CacheReader<T>,
    task: JoinHandle<()>,
}

impl<T> ActiveView<T> {
    async fn shutdown(self) {
        self.handle.deactivate();
        if let Err(e) = self.task.await {
            tracing::warn!("Synchronizer task ended abnormally: {}", e);
        }
    }
}

/// The main application.
pub struct App<M: MarketData + 'static = ApiClient> {
    /// Preference and watchlist store.
    store: Store,
    /// Market data source.
    source: Arc<M>,
    /// Refresh cadences.
    polling: PollingConfig,
    /// Market tab overview of the watchlist.
    market_view: Option<ActiveView<OverviewSnapshot>>,
    /// Market tab benchmark quote.
    benchmark_view: Option<ActiveView<QuoteSnapshot>>,
    /// Portfolio tab quote list over the watchlist.
    watchlist_view: Option<ActiveView<QuoteSnapshot>>,
    /// Detail view, while a symbol is selected.
    detail_view: Option<ActiveView<DetailSnapshot>>,
}

impl App<ApiClient> {
    /// Create the application from configuration: HTTP client, file-backed
    /// preferences, and the store loaded from them.
    pub fn new(config: &Config) -> Result<Self> {
        let client = ApiClient::new(config.api.clone())?;
        let file_store = FileStore::from_config(&config.storage)?;
        tracing::info!("Preferences at {}", file_store.path().display());
        let store = Store::load(PreferenceAdapter::new(file_store));
        Ok(Self::with_parts(store, Arc::new(client), config.polling.clone()))
    }
}

impl<M: MarketData + 'static> App<M> {
    /// Assemble an application from parts.
    pub fn with_parts(store: Store, source: Arc<M>, polling: PollingConfig) -> Self {
        Self {
            store,
            source,
            polling,
            market_view: None,
            benchmark_view: None,
            watchlist_view: None,
            detail_view: None,
        }
    }

    /// Read-only access to the store.
    pub fn store(&self) -> &Store {
        &self.store
    }

    /// Apply an action and bring the polling views in line with the new
    /// state. Must be called from within a tokio runtime.
    pub fn dispatch(&mut self, action: Action) {
        self.store.reduce(action);
        self.sync_views();
    }

    /// Start or stop synchronizers to match the visible view.
    ///
    /// An open detail view replaces the tab view, so tab synchronizers only
    /// run while nothing is selected.
    pub fn sync_views(&mut self) {
        let prefs = self.store.preferences().clone();
        let tab = (!prefs.is_detail_open()).then_some(prefs.active_tab);

        let market = tab == Some(Tab::Market);
        if market != self.market_view.is_some() {
            if market {
                self.market_view = Some(self.spawn_view(
                    OverviewJob::new(Arc::clone(&self.source)),
                    PollTarget::Watchlist(self.store.subscribe_watchlist()),
                    self.polling.list_interval(),
                    None,
                ));
                self.benchmark_view = Some(self.spawn_view(
                    QuoteJob::new(Arc::clone(&self.source)),
                    PollTarget::single(BENCHMARK_SYMBOL),
                    self.polling.list_interval(),
                    Some(BENCHMARK_SYMBOL.to_string()),
                ));
            } else {
                deactivate(self.market_view.take());
                deactivate(self.benchmark_view.take());
            }
        }

        let watchlist = tab == Some(Tab::Portfolio);
        if watchlist != self.watchlist_view.is_some() {
            if watchlist {
                self.watchlist_view = Some(self.spawn_view(
                    QuoteJob::new(Arc::clone(&self.source)),
                    PollTarget::Watchlist(self.store.subscribe_watchlist()),
                    self.polling.list_interval(),
                    None,
                ));
            } else {
                deactivate(self.watchlist_view.take());
            }
        }

        let current = self
            .detail_view
            .as_ref()
            .and_then(|view| view.symbol.clone());
        if current != prefs.selected_symbol {
            deactivate(self.detail_view.take());
            if let Some(symbol) = prefs.selected_symbol {
                self.detail_view = Some(self.spawn_view(
                    DetailJob::new(Arc::clone(&self.source)),
                    PollTarget::single(&symbol),
                    self.polling.detail_interval(),
                    Some(symbol),
                ));
            }
        }
    }

    fn spawn_view<J: PollJob>(
        &self,
        job: J,
        target: PollTarget,
        period: Duration,
        symbol: Option<String>,
    ) -> ActiveView<J::Output> {
        let (sync, handle, reader) = Synchronizer::new(job, target, IntervalTicker::new(period));
        ActiveView {
            symbol,
            handle,
            reader,
            task: sync.spawn(),
        }
    }

    /// Reader for the market overview, while the market tab is shown.
    pub fn market_reader(&self) -> Option<&CacheReader<OverviewSnapshot>> {
        self.market_view.as_ref().map(|view| &view.reader)
    }

    /// Reader for the benchmark quote, while the market tab is shown.
    pub fn benchmark_reader(&self) -> Option<&CacheReader<QuoteSnapshot>> {
        self.benchmark_view.as_ref().map(|view| &view.reader)
    }

    /// Reader for the portfolio tab's watchlist quotes, while it is shown.
    pub fn watchlist_reader(&self) -> Option<&CacheReader<QuoteSnapshot>> {
        self.watchlist_view.as_ref().map(|view| &view.reader)
    }

    /// Reader for the detail view, while a symbol is selected.
    pub fn detail_reader(&self) -> Option<&CacheReader<DetailSnapshot>> {
        self.detail_view.as_ref().map(|view| &view.reader)
    }

    /// Latest benchmark quote, if the market tab has one.
    pub fn benchmark_quote(&self) -> Option<Arc<QuoteSnapshot>> {
        self.benchmark_reader()?.get(BENCHMARK_SYMBOL)
    }

    /// Watchlist rows in store order with whatever quotes the visible list
    /// view holds.
    pub fn watchlist_summary(&self) -> WatchlistSummary {
        if let Some(reader) = self.market_reader() {
            self.summarize(reader)
        } else if let Some(reader) = self.watchlist_reader() {
            self.summarize(reader)
        } else {
            WatchlistSummary::build(self.store.watchlist().iter(), |_| None::<QuoteSnapshot>)
        }
    }

    fn summarize<T: AsRef<QuoteSnapshot>>(&self, reader: &CacheReader<T>) -> WatchlistSummary {
        let cache = reader.snapshot();
        WatchlistSummary::build(self.store.watchlist().iter(), |symbol| {
            cache.get(symbol).map(|value| {
                let quote: &QuoteSnapshot = (*value).as_ref();
                quote.clone()
            })
        })
    }

    /// One-shot chart fetch for the detail view's timeframe selector.
    pub async fn fetch_chart(&self, symbol: &str, timeframe: Timeframe) -> Result<Vec<SeriesPoint>> {
        self.source.ohlcv(&normalize_symbol(symbol), timeframe).await
    }

    /// Look up a single ticker the way the find tab does: the query is taken
    /// as a symbol and quoted directly.
    pub async fn lookup(&self, query: &str) -> Result<QuoteSnapshot> {
        let symbol = normalize_symbol(query);
        if symbol.is_empty() {
            return Err(Error::invalid_input("empty symbol"));
        }
        self.source.quote(&symbol).await
    }

    /// Free-text symbol search.
    pub async fn search(&self, query: &str) -> Result<Vec<SymbolMatch>> {
        let query = query.trim();
        if query.is_empty() {
            return Ok(Vec::new());
        }
        self.source.search(query).await
    }

    /// Portfolio summary.
    pub async fn portfolio(&self) -> Result<PortfolioSummary> {
        self.source.portfolio().await
    }

    /// Stop every synchronizer and wait for them to finish.
    pub async fn shutdown(&mut self) {
        if let Some(view) = self.market_view.take() {
            view.shutdown().await;
        }
        if let Some(view) = self.benchmark_view.take() {
            view.shutdown().await;
        }
        if let Some(view) = self.watchlist_view.take() {
            view.shutdown().await;
        }
        if let Some(view) = self.detail_view.take() {
            view.shutdown().await;
        }
    }
}

fn deactivate<T>(view: Option<ActiveView<T>>) {
    if let Some(view) = view {
        view.handle.deactivate();
    }
}
