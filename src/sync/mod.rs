//! Polling synchronization of per-symbol market data.
//!
//! A [`Synchronizer`] owns one [`SnapshotCache`] and is its only writer.
//! Views read it through a [`CacheReader`]. Fetches for a pass run
//! concurrently on the synchronizer's own task; there is no retry other than
//! the next scheduled pass.

mod cache;
mod jobs;
mod synchronizer;
mod ticker;

pub use cache::{CacheReader, Cached, SnapshotCache, SyncStats};
pub use jobs::{DetailJob, DetailSnapshot, OverviewJob, OverviewSnapshot, PollJob, QuoteJob};
pub use synchronizer::{PollTarget, SyncHandle, Synchronizer};
pub use ticker::{IntervalTicker, ManualTicker, TickTrigger, Ticker};

#[cfg(test)]
pub(crate) use jobs::fixtures;
