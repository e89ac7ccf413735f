//! The polling loop.

use super::cache::{CacheReader, SnapshotCache};
use super::jobs::PollJob;
use super::ticker::Ticker;
use crate::error::Result;
use crate::state::normalize_symbol;
use futures::future::BoxFuture;
use futures::stream::{FuturesUnordered, StreamExt};
use futures::FutureExt;
use std::sync::Arc;
use tokio::sync::{oneshot, watch};
use tracing::{debug, info, warn};

/// Which symbols a synchronizer polls.
#[derive(Debug)]
pub enum PollTarget {
    /// Follow the store's watchlist; a change triggers an immediate pass.
    Watchlist(watch::Receiver<Vec<String>>),
    /// A fixed set of symbols, e.g. the one open in the detail view.
    Fixed(Vec<String>),
}

impl PollTarget {
    /// Poll a single symbol.
    pub fn single(symbol: &str) -> Self {
        Self::Fixed(vec![normalize_symbol(symbol)])
    }

    fn current(&mut self) -> Vec<String> {
        match self {
            Self::Watchlist(rx) => rx.borrow_and_update().clone(),
            Self::Fixed(symbols) => symbols.clone(),
        }
    }

    /// Resolves when the tracked set changes. Never resolves for fixed targets.
    async fn changed(&mut self) -> bool {
        match self {
            Self::Watchlist(rx) => rx.changed().await.is_ok(),
            Self::Fixed(_) => std::future::pending().await,
        }
    }
}

/// Handle used to deactivate a running synchronizer.
///
/// Dropping the handle deactivates it as well.
#[derive(Debug)]
pub struct SyncHandle {
    stop_tx: Option<oneshot::Sender<()>>,
}

impl SyncHandle {
    /// Stop scheduling passes and drop in-flight fetches.
    pub fn deactivate(mut self) {
        if let Some(tx) = self.stop_tx.take() {
            let _ = tx.send(());
        }
    }
}

struct FetchOutcome<T> {
    symbol: String,
    seq: u64,
    result: Result<T>,
}

enum LoopEvent<T> {
    Deactivated,
    Tick,
    TickerClosed,
    TargetChanged,
    TargetClosed,
    Fetched(FetchOutcome<T>),
}

/// Keeps a [`SnapshotCache`] fresh by polling a [`PollJob`].
///
/// One pass runs on activation, then one per tick, plus one whenever a
/// followed watchlist changes. Each pass snapshots the tracked symbols and
/// fetches them concurrently on this task. Results are applied per symbol as
/// they resolve; a failed fetch leaves that symbol's entry untouched, and a
/// result from an older pass never replaces one from a newer pass.
pub struct Synchronizer<J: PollJob> {
    job: Arc<J>,
    target: PollTarget,
    ticker: Box<dyn Ticker>,
    stop_rx: oneshot::Receiver<()>,
    cache: SnapshotCache<J::Output>,
    cache_tx: watch::Sender<Arc<SnapshotCache<J::Output>>>,
    in_flight: FuturesUnordered<BoxFuture<'static, FetchOutcome<J::Output>>>,
    tracked: Vec<String>,
    next_seq: u64,
}

impl<J: PollJob> Synchronizer<J> {
    /// Create a synchronizer, its deactivation handle and a cache reader.
    pub fn new(
        job: J,
        target: PollTarget,
        ticker: impl Ticker + 'static,
    ) -> (Self, SyncHandle, CacheReader<J::Output>) {
        let cache = SnapshotCache::new();
        let (cache_tx, cache_rx) = watch::channel(Arc::new(cache.clone()));
        let (stop_tx, stop_rx) = oneshot::channel();

        let sync = Self {
            job: Arc::new(job),
            target,
            ticker: Box::new(ticker),
            stop_rx,
            cache,
            cache_tx,
            in_flight: FuturesUnordered::new(),
            tracked: Vec::new(),
            next_seq: 1,
        };
        let handle = SyncHandle {
            stop_tx: Some(stop_tx),
        };
        (sync, handle, CacheReader::new(cache_rx))
    }

    /// Spawn the loop onto the current runtime.
    pub fn spawn(self) -> tokio::task::JoinHandle<()> {
        tokio::spawn(self.run())
    }

    /// Run until deactivated.
    pub async fn run(mut self) {
        let name = self.job.name();
        info!("Activated {} synchronizer", name);
        self.start_pass();

        let mut ticker_open = true;
        loop {
            let event = tokio::select! {
                _ = &mut self.stop_rx => LoopEvent::Deactivated,
                open = self.ticker.tick(), if ticker_open => {
                    if open { LoopEvent::Tick } else { LoopEvent::TickerClosed }
                }
                open = self.target.changed() => {
                    if open { LoopEvent::TargetChanged } else { LoopEvent::TargetClosed }
                }
                Some(outcome) = self.in_flight.next(), if !self.in_flight.is_empty() => {
                    LoopEvent::Fetched(outcome)
                }
            };

            match event {
                LoopEvent::Deactivated => break,
                LoopEvent::Tick | LoopEvent::TargetChanged => self.start_pass(),
                LoopEvent::TickerClosed => {
                    debug!("{} ticker closed; no further scheduled passes", name);
                    ticker_open = false;
                }
                LoopEvent::TargetClosed => {
                    // The store is gone; keep polling the last known set.
                    let last = self.target.current();
                    self.target = PollTarget::Fixed(last);
                }
                LoopEvent::Fetched(outcome) => self.apply(outcome),
            }
        }

        if !self.in_flight.is_empty() {
            debug!(
                "Dropping {} in-flight {} fetches",
                self.in_flight.len(),
                name
            );
        }
        info!("Deactivated {} synchronizer", name);
    }

    fn start_pass(&mut self) {
        let seq = self.next_seq;
        self.next_seq += 1;

        self.tracked = self.target.current();
        let pruned = self.cache.retain_symbols(&self.tracked);
        self.cache.record_pass();
        if pruned > 0 {
            debug!("Pruned {} untracked symbols", pruned);
        }
        self.publish();

        debug!(
            "{} pass {} for {} symbols",
            self.job.name(),
            seq,
            self.tracked.len()
        );
        for symbol in &self.tracked {
            let job = Arc::clone(&self.job);
            let symbol = symbol.clone();
            self.in_flight.push(
                async move {
                    let result = job.fetch(&symbol).await;
                    FetchOutcome {
                        symbol,
                        seq,
                        result,
                    }
                }
                .boxed(),
            );
        }
    }

    fn apply(&mut self, outcome: FetchOutcome<J::Output>) {
        let FetchOutcome {
            symbol,
            seq,
            result,
        } = outcome;

        match result {
            Ok(value) if self.tracked.contains(&symbol) => {
                if !self.cache.apply(&symbol, seq, value) {
                    debug!("Discarded stale result for {} from pass {}", symbol, seq);
                }
            }
            Ok(_) => {
                debug!("Discarded result for untracked {}", symbol);
                self.cache.record_discard();
            }
            Err(e) => {
                warn!("{} fetch for {} failed: {}", self.job.name(), symbol, e);
                self.cache.record_failure();
            }
        }
        self.publish();
    }

    fn publish(&self) {
        self.cache_tx.send_replace(Arc::new(self.cache.clone()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::sync::SyncStats;
    use crate::sync::ticker::{IntervalTicker, ManualTicker, TickTrigger};
    use async_trait::async_trait;
    use pretty_assertions::assert_eq;
    use std::collections::HashMap;
    use std::time::Duration;
    use tokio::sync::mpsc;

    type Responder = oneshot::Sender<Result<u32>>;

    /// Each fetch parks until the test answers it.
    struct ControlledJob {
        requests: mpsc::UnboundedSender<(String, Responder)>,
    }

    #[async_trait]
    impl PollJob for ControlledJob {
        type Output = u32;

        fn name(&self) -> &'static str {
            "controlled"
        }

        async fn fetch(&self, symbol: &str) -> Result<u32> {
            let (tx, rx) = oneshot::channel();
            self.requests
                .send((symbol.to_string(), tx))
                .map_err(|e| Error::channel(e.to_string()))?;
            rx.await.map_err(|e| Error::channel(e.to_string()))?
        }
    }

    struct Harness {
        requests: mpsc::UnboundedReceiver<(String, Responder)>,
        trigger: TickTrigger,
        handle: SyncHandle,
        reader: CacheReader<u32>,
        task: tokio::task::JoinHandle<()>,
    }

    impl Harness {
        fn start(target: PollTarget) -> Self {
            let (tx, requests) = mpsc::unbounded_channel();
            let (ticker, trigger) = ManualTicker::new();
            let (sync, handle, reader) =
                Synchronizer::new(ControlledJob { requests: tx }, target, ticker);
            let task = sync.spawn();
            Self {
                requests,
                trigger,
                handle,
                reader,
                task,
            }
        }

        /// Collect the `n` requests of one pass, keyed by symbol.
        async fn pass(&mut self, n: usize) -> HashMap<String, Responder> {
            let mut pending = HashMap::new();
            for _ in 0..n {
                let (symbol, responder) = self.requests.recv().await.unwrap();
                pending.insert(symbol, responder);
            }
            pending
        }

        async fn wait_stats(&mut self, predicate: impl Fn(&SyncStats) -> bool) {
            self.reader
                .wait_for(|cache| predicate(&cache.stats()))
                .await
                .unwrap();
        }
    }

    fn unavailable() -> Error {
        Error::Status {
            status: 503,
            url: "test".to_string(),
        }
    }

    fn watchlist(symbols: &[&str]) -> (watch::Sender<Vec<String>>, PollTarget) {
        let (tx, rx) = watch::channel(symbols.iter().map(|s| s.to_string()).collect());
        (tx, PollTarget::Watchlist(rx))
    }

    #[tokio::test]
    async fn test_activation_runs_immediate_pass() {
        let (_tx, target) = watchlist(&["AAPL", "TSLA"]);
        let mut h = Harness::start(target);

        let mut pass = h.pass(2).await;
        assert!(pass.contains_key("AAPL"));
        assert!(pass.contains_key("TSLA"));

        pass.remove("AAPL").unwrap().send(Ok(1)).unwrap();
        pass.remove("TSLA").unwrap().send(Ok(2)).unwrap();
        h.wait_stats(|s| s.applied == 2).await;

        let cache = h.reader.snapshot();
        assert_eq!(cache.get("AAPL").as_deref(), Some(&1));
        assert_eq!(cache.get("TSLA").as_deref(), Some(&2));
        assert_eq!(cache.stats().passes, 1);
    }

    #[tokio::test]
    async fn test_failure_is_isolated_per_symbol() {
        let (_tx, target) = watchlist(&["AAPL", "TSLA"]);
        let mut h = Harness::start(target);

        // First pass: AAPL fails before ever being fetched, TSLA succeeds.
        let mut pass = h.pass(2).await;
        pass.remove("AAPL").unwrap().send(Err(unavailable())).unwrap();
        pass.remove("TSLA").unwrap().send(Ok(10)).unwrap();
        h.wait_stats(|s| s.applied == 1 && s.failed == 1).await;
        assert_eq!(h.reader.get("AAPL"), None);
        assert_eq!(h.reader.get("TSLA").as_deref(), Some(&10));

        // Second pass: both succeed.
        h.trigger.tick();
        let mut pass = h.pass(2).await;
        pass.remove("AAPL").unwrap().send(Ok(20)).unwrap();
        pass.remove("TSLA").unwrap().send(Ok(21)).unwrap();
        h.wait_stats(|s| s.applied == 3).await;

        // Third pass: AAPL fails and keeps its previous value.
        h.trigger.tick();
        let mut pass = h.pass(2).await;
        pass.remove("AAPL").unwrap().send(Err(unavailable())).unwrap();
        pass.remove("TSLA").unwrap().send(Ok(31)).unwrap();
        h.wait_stats(|s| s.applied == 4 && s.failed == 2).await;

        assert_eq!(h.reader.get("AAPL").as_deref(), Some(&20));
        assert_eq!(h.reader.get("TSLA").as_deref(), Some(&31));
    }

    #[tokio::test]
    async fn test_slow_fetch_does_not_block_others() {
        let (_tx, target) = watchlist(&["AAPL", "TSLA"]);
        let mut h = Harness::start(target);

        let mut pass = h.pass(2).await;
        // AAPL stays parked while TSLA lands.
        let _aapl = pass.remove("AAPL").unwrap();
        pass.remove("TSLA").unwrap().send(Ok(5)).unwrap();
        h.wait_stats(|s| s.applied == 1).await;
        assert_eq!(h.reader.get("TSLA").as_deref(), Some(&5));
    }

    #[tokio::test]
    async fn test_late_result_from_older_pass_is_discarded() {
        let mut h = Harness::start(PollTarget::single("aapl"));

        // Pass 1 request parks.
        let mut first = h.pass(1).await;
        let slow = first.remove("AAPL").unwrap();

        // Pass 2 resolves first.
        h.trigger.tick();
        let mut second = h.pass(1).await;
        second.remove("AAPL").unwrap().send(Ok(6)).unwrap();
        h.wait_stats(|s| s.applied == 1).await;
        assert_eq!(h.reader.snapshot().entry("AAPL").unwrap().seq, 2);

        // Pass 1 straggles in and must not win.
        slow.send(Ok(5)).unwrap();
        h.wait_stats(|s| s.discarded == 1).await;
        assert_eq!(h.reader.get("AAPL").as_deref(), Some(&6));
    }

    #[tokio::test]
    async fn test_watchlist_change_triggers_pass_and_prunes() {
        let (tx, target) = watchlist(&["AAPL", "TSLA"]);
        let mut h = Harness::start(target);

        let mut pass = h.pass(2).await;
        pass.remove("AAPL").unwrap().send(Ok(1)).unwrap();
        pass.remove("TSLA").unwrap().send(Ok(2)).unwrap();
        h.wait_stats(|s| s.applied == 2).await;

        // Removing TSLA starts a new pass over the remaining symbol only.
        tx.send_replace(vec!["AAPL".to_string()]);
        let mut pass = h.pass(1).await;
        assert!(pass.contains_key("AAPL"));
        h.wait_stats(|s| s.passes == 2).await;
        assert_eq!(h.reader.get("TSLA"), None);
        assert_eq!(h.reader.get("AAPL").as_deref(), Some(&1));

        pass.remove("AAPL").unwrap().send(Ok(3)).unwrap();
        h.wait_stats(|s| s.applied == 3).await;
        assert_eq!(h.reader.get("AAPL").as_deref(), Some(&3));
    }

    #[tokio::test]
    async fn test_result_for_removed_symbol_is_dropped() {
        let (tx, target) = watchlist(&["AAPL", "TSLA"]);
        let mut h = Harness::start(target);

        let mut pass = h.pass(2).await;
        let tsla = pass.remove("TSLA").unwrap();

        tx.send_replace(vec!["AAPL".to_string()]);
        let _second = h.pass(1).await;

        tsla.send(Ok(9)).unwrap();
        h.wait_stats(|s| s.discarded == 1).await;
        assert_eq!(h.reader.get("TSLA"), None);
    }

    #[tokio::test]
    async fn test_deactivation_stops_applying_results() {
        let (_tx, target) = watchlist(&["AAPL"]);
        let mut h = Harness::start(target);

        let mut pass = h.pass(1).await;
        let parked = pass.remove("AAPL").unwrap();

        h.handle.deactivate();
        h.task.await.unwrap();

        // The in-flight fetch was dropped with the loop.
        assert!(parked.send(Ok(1)).is_err());
        while h.reader.changed().await {}
        assert_eq!(h.reader.get("AAPL"), None);
        assert!(!h.trigger.tick());
    }

    #[tokio::test]
    async fn test_dropping_handle_deactivates() {
        let (_tx, target) = watchlist(&["AAPL"]);
        let Harness { handle, task, .. } = Harness::start(target);
        drop(handle);
        task.await.unwrap();
    }

    #[tokio::test]
    async fn test_empty_watchlist_pass_is_harmless() {
        let (tx, target) = watchlist(&[]);
        let mut h = Harness::start(target);
        h.wait_stats(|s| s.passes == 1).await;

        tx.send_replace(vec!["NVDA".to_string()]);
        let mut pass = h.pass(1).await;
        pass.remove("NVDA").unwrap().send(Ok(7)).unwrap();
        h.wait_stats(|s| s.applied == 1).await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_interval_cadence() {
        let (tx, mut requests) = mpsc::unbounded_channel();
        let (sync, handle, _reader) = Synchronizer::new(
            ControlledJob { requests: tx },
            PollTarget::single("SPY"),
            IntervalTicker::new(Duration::from_secs(60)),
        );
        let start = tokio::time::Instant::now();
        let task = sync.spawn();

        let (_, r1) = requests.recv().await.unwrap();
        assert_eq!(start.elapsed(), Duration::ZERO);
        r1.send(Ok(1)).unwrap();

        let (_, r2) = requests.recv().await.unwrap();
        assert_eq!(start.elapsed(), Duration::from_secs(60));
        r2.send(Ok(2)).unwrap();

        let (_, _r3) = requests.recv().await.unwrap();
        assert_eq!(start.elapsed(), Duration::from_secs(120));

        handle.deactivate();
        task.await.unwrap();
    }
}
