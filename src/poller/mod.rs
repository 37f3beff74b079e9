//! Background pollers that keep the snapshot store fresh
//!
//! Two independent fixed-rate cycles: a fast one for current prices and 24h
//! statistics, a slow one for the hourly close-price trend series. Cycle
//! failures are logged and absorbed; the store keeps its last good snapshots.

mod price;
mod trend;

pub use price::PricePoller;
pub use trend::TrendPoller;

use chrono::{DateTime, Utc};
use std::sync::Arc;
use tokio::sync::RwLock;

/// Cycle counters shared between the pollers, the status command, and the
/// TUI header. `price_failures` counts aborted price cycles;
/// `trend_failures` counts per-symbol fetch failures.
#[derive(Debug, Default, Clone)]
pub struct PollerHealth {
    pub price_cycles: u64,
    pub price_failures: u64,
    pub last_price_sync: Option<DateTime<Utc>>,
    pub trend_cycles: u64,
    pub trend_failures: u64,
    pub last_trend_sync: Option<DateTime<Utc>>,
}

pub type SharedPollerHealth = Arc<RwLock<PollerHealth>>;

pub fn new_shared_health() -> SharedPollerHealth {
    Arc::new(RwLock::new(PollerHealth::default()))
}
