//! # tickerdeck - Stock Dashboard Core
//!
//! The stateful core of a stock trading dashboard: the user's watchlist and
//! preferences with durable persistence, and polling synchronizers that keep
//! per-symbol market data fresh from the dashboard backend.
//!
//! ## Architecture
//!
//! - **State**: The preference/watchlist store, the single writer of user state
//! - **Persistence**: Durable key-value storage behind the store
//! - **Sync**: Per-view polling synchronizers and their snapshot caches
//! - **API**: Backend REST client
//! - **App**: Wires store changes to view activation
//! - **Config**: Configuration management

pub mod api;
pub mod app;
pub mod config;
pub mod constants;
pub mod error;
pub mod persistence;
pub mod state;
pub mod sync;

pub use app::App;
pub use config::Config;
pub use error::{Error, Result};
pub use state::{Action, Store};
pub use sync::{CacheReader, PollJob, PollTarget, Synchronizer};
