//! Price and 24h statistics poller

use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::binance::types::{base_symbol, pair_symbol};
use crate::binance::{BinanceRestClient, RestApiError};
use crate::store::{PriceMap, SnapshotStore, StatsMap, StoreWrite, SymbolStats};
use crate::watchlist;

use super::SharedPollerHealth;

/// Fetches batched current prices and 24h statistics for the whole
/// watch-list and replaces both snapshots in one commit. A failure on
/// either request aborts the cycle and leaves the previous snapshots
/// untouched.
pub struct PricePoller {
    store: Arc<SnapshotStore>,
    client: Arc<BinanceRestClient>,
    quote_asset: String,
    health: SharedPollerHealth,
}

impl PricePoller {
    pub fn new(
        store: Arc<SnapshotStore>,
        client: Arc<BinanceRestClient>,
        quote_asset: String,
        health: SharedPollerHealth,
    ) -> Self {
        Self {
            store,
            client,
            quote_asset,
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
        let result = self.run_cycle().await;

        let mut health = self.health.write().await;
        health.price_cycles += 1;
        match result {
            Ok(tracked) => {
                health.last_price_sync = Some(chrono::Utc::now());
                drop(health);
                debug!("Price cycle stored data for {} symbols", tracked);
            }
            Err(err) => {
                health.price_failures += 1;
                drop(health);
                warn!("Price cycle aborted, keeping previous snapshots: {}", err);
            }
        }
    }

    async fn run_cycle(&self) -> Result<usize, RestApiError> {
        let stored = self.store.watchlist().await;
        let symbols = watchlist::sanitize_list(&stored);

        // Self-heal the stored list whenever sanitation changed it
        let mut write = StoreWrite::new();
        if symbols != stored {
            info!(
                "Sanitized stored watch-list ({} -> {} symbols)",
                stored.len(),
                symbols.len()
            );
            write = write.watchlist(symbols.clone());
        }

        if symbols.is_empty() {
            // Nothing tracked: clear both snapshots without calling out
            self.store
                .commit(write.prices(PriceMap::new()).stats(StatsMap::new()))
                .await;
            return Ok(0);
        }

        if !write.is_empty() {
            self.store.commit(write).await;
        }

        let pairs: Vec<String> = symbols
            .iter()
            .map(|s| pair_symbol(s, &self.quote_asset))
            .collect();

        let (prices, tickers) = tokio::join!(
            self.client.get_prices(&pairs),
            self.client.get_ticker_24h(&pairs),
        );
        let (prices, tickers) = (prices?, tickers?);

        let mut price_map = PriceMap::new();
        for ticker in prices {
            let Some(base) = base_symbol(&ticker.symbol, &self.quote_asset) else {
                debug!("Ignoring price for unexpected pair {}", ticker.symbol);
                continue;
            };
            if !symbols.iter().any(|s| s == base) {
                debug!("Ignoring price for untracked symbol {}", base);
                continue;
            }
            price_map.insert(base.to_string(), ticker.price);
        }

        let mut stats_map = StatsMap::new();
        for ticker in tickers {
            let Some(base) = base_symbol(&ticker.symbol, &self.quote_asset) else {
                continue;
            };
            if !symbols.iter().any(|s| s == base) {
                continue;
            }
            stats_map.insert(
                base.to_string(),
                SymbolStats {
                    price_change_percent: ticker.price_change_percent,
                    high_price: ticker.high_price,
                    low_price: ticker.low_price,
                    volume: ticker.volume,
                    quote_volume: ticker.quote_volume,
                },
            );
        }

        let tracked = price_map.len();

        // Both snapshots become visible together
        self.store
            .commit(StoreWrite::new().prices(price_map).stats(stats_map))
            .await;

        Ok(tracked)
    }
}
