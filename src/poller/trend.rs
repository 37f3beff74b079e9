//! Close-price trend series poller

use futures_util::future::join_all;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, warn};

use crate::binance::types::{close_price, pair_symbol};
use crate::binance::{BinanceRestClient, RestApiError};
use crate::store::{SnapshotStore, StoreWrite, TrendMap};
use crate::watchlist;

use super::SharedPollerHealth;

/// A drawable series needs at least two points
const MIN_TREND_POINTS: usize = 2;

/// Fetches the recent close-price series per watch-list symbol and replaces
/// the whole trend snapshot in one commit. Symbols fail independently: a bad
/// response yields an empty series for that symbol only.
pub struct TrendPoller {
    store: Arc<SnapshotStore>,
    client: Arc<BinanceRestClient>,
    quote_asset: String,
    candle_interval: String,
    candle_limit: u32,
    health: SharedPollerHealth,
}

impl TrendPoller {
    pub fn new(
        store: Arc<SnapshotStore>,
        client: Arc<BinanceRestClient>,
        quote_asset: String,
        candle_interval: String,
        candle_limit: u32,
        health: SharedPollerHealth,
    ) -> Self {
        Self {
            store,
            client,
            quote_asset,
            candle_interval,
            candle_limit,
            health,
        }
    }

    /// Run cycles forever at a fixed cadence. The first cycle starts
    /// immediately; an overrunning cycle delays the next tick instead of
    /// overlapping it.
    pub fn spawn(self: Arc<Self>, period: Duration) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                self.poll_once().await;
            }
        })
    }

    /// One poll cycle. Never escalates to the caller.
    pub async fn poll_once(&self) {
        let failures = self.run_cycle().await;

        let mut health = self.health.write().await;
        health.trend_cycles += 1;
        health.trend_failures += failures;
        health.last_trend_sync = Some(chrono::Utc::now());
    }

    async fn run_cycle(&self) -> u64 {
        let stored = self.store.watchlist().await;
        let symbols = watchlist::sanitize_list(&stored);

        let mut write = StoreWrite::new();
        if symbols != stored {
            write = write.watchlist(symbols.clone());
        }

        if symbols.is_empty() {
            self.store.commit(write.trends(TrendMap::new())).await;
            return 0;
        }

        if !write.is_empty() {
            self.store.commit(write).await;
        }

        let series = join_all(symbols.iter().map(|s| self.fetch_series(s))).await;

        let mut trends = TrendMap::new();
        let mut failures = 0u64;
        for (symbol, result) in symbols.iter().zip(series) {
            let closes = match result {
                Ok(closes) if closes.len() >= MIN_TREND_POINTS => closes,
                Ok(short) => {
                    debug!(
                        "Trend series for {} has {} points, storing empty",
                        symbol,
                        short.len()
                    );
                    Vec::new()
                }
                Err(err) => {
                    warn!("Trend fetch failed for {}: {}", symbol, err);
                    failures += 1;
                    Vec::new()
                }
            };
            trends.insert(symbol.clone(), closes);
        }

        // The whole mapping becomes visible at once, after every symbol
        // has settled
        self.store.commit(StoreWrite::new().trends(trends)).await;

        failures
    }

    async fn fetch_series(&self, symbol: &str) -> Result<Vec<f64>, RestApiError> {
        let pair = pair_symbol(symbol, &self.quote_asset);
        let klines = self
            .client
            .get_klines(&pair, &self.candle_interval, self.candle_limit)
            .await?;

        Ok(klines.iter().filter_map(|candle| close_price(candle)).collect())
    }
}
