//! Snapshot store module
//!
//! Owns the four shared snapshot keys (watch-list, prices, 24h statistics,
//! trend series), persists them as one JSON document, and fans out change
//! notifications to subscribers.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tokio::sync::{RwLock, broadcast};
use tracing::{debug, warn};

use crate::watchlist;

/// Capacity of the change notification channel. Subscribers that fall this
/// far behind see a lag error and must re-read the full snapshot.
const CHANGE_CHANNEL_CAPACITY: usize = 64;

/// Keys addressable in the snapshot store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreKey {
    Watchlist,
    Prices,
    Stats,
    Trends,
}

impl StoreKey {
    pub const ALL: [StoreKey; 4] = [
        StoreKey::Watchlist,
        StoreKey::Prices,
        StoreKey::Stats,
        StoreKey::Trends,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            StoreKey::Watchlist => "watchlist",
            StoreKey::Prices => "prices",
            StoreKey::Stats => "stats",
            StoreKey::Trends => "trends",
        }
    }
}

/// 24h statistics for one symbol. Values stay numeric strings as delivered
/// by the exchange; null means the exchange omitted the field.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SymbolStats {
    pub price_change_percent: Option<String>,
    pub high_price: Option<String>,
    pub low_price: Option<String>,
    pub volume: Option<String>,
    pub quote_volume: Option<String>,
}

pub type PriceMap = HashMap<String, String>;
pub type StatsMap = HashMap<String, SymbolStats>;
pub type TrendMap = HashMap<String, Vec<f64>>;

/// Full store contents. Also the on-disk JSON layout: one object with
/// exactly the four snapshot keys.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreSnapshot {
    pub watchlist: Vec<String>,
    pub prices: PriceMap,
    pub stats: StatsMap,
    pub trends: TrendMap,
}

/// Notification delivered to subscribers after a commit, naming exactly the
/// keys that commit wrote. Carries no values; readers re-read the snapshot.
#[derive(Debug, Clone)]
pub struct StoreChange {
    pub keys: Vec<StoreKey>,
}

impl StoreChange {
    pub fn contains(&self, key: StoreKey) -> bool {
        self.keys.contains(&key)
    }
}

/// A multi-key write applied atomically by [`SnapshotStore::commit`].
/// Keys not named are left untouched.
#[derive(Debug, Default)]
pub struct StoreWrite {
    watchlist: Option<Vec<String>>,
    prices: Option<PriceMap>,
    stats: Option<StatsMap>,
    trends: Option<TrendMap>,
}

impl StoreWrite {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn watchlist(mut self, symbols: Vec<String>) -> Self {
        self.watchlist = Some(symbols);
        self
    }

    pub fn prices(mut self, prices: PriceMap) -> Self {
        self.prices = Some(prices);
        self
    }

    pub fn stats(mut self, stats: StatsMap) -> Self {
        self.stats = Some(stats);
        self
    }

    pub fn trends(mut self, trends: TrendMap) -> Self {
        self.trends = Some(trends);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.watchlist.is_none()
            && self.prices.is_none()
            && self.stats.is_none()
            && self.trends.is_none()
    }

    fn keys(&self) -> Vec<StoreKey> {
        let mut keys = Vec::new();
        if self.watchlist.is_some() {
            keys.push(StoreKey::Watchlist);
        }
        if self.prices.is_some() {
            keys.push(StoreKey::Prices);
        }
        if self.stats.is_some() {
            keys.push(StoreKey::Stats);
        }
        if self.trends.is_some() {
            keys.push(StoreKey::Trends);
        }
        keys
    }
}

/// Shared snapshot store. Writers commit whole-key replacements; readers
/// take consistent clones; subscribers receive changed-key notifications.
pub struct SnapshotStore {
    state: RwLock<StoreSnapshot>,
    change_tx: broadcast::Sender<StoreChange>,
    file_path: Option<PathBuf>,
}

impl SnapshotStore {
    /// Create a store with no persistence backing.
    pub fn in_memory() -> Self {
        let (change_tx, _) = broadcast::channel(CHANGE_CHANNEL_CAPACITY);
        Self {
            state: RwLock::new(StoreSnapshot::default()),
            change_tx,
            file_path: None,
        }
    }

    /// Open a store backed by a JSON file, loading the previous contents.
    /// A missing or unreadable file starts the store empty.
    pub async fn open<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref().to_path_buf();
        let state = Self::load_lenient(&path).await;
        let (change_tx, _) = broadcast::channel(CHANGE_CHANNEL_CAPACITY);
        Self {
            state: RwLock::new(state),
            change_tx,
            file_path: Some(path),
        }
    }

    /// Subscribe to change notifications.
    pub fn subscribe(&self) -> broadcast::Receiver<StoreChange> {
        self.change_tx.subscribe()
    }

    /// Consistent clone of all four keys.
    pub async fn snapshot(&self) -> StoreSnapshot {
        self.state.read().await.clone()
    }

    /// Current watch-list.
    pub async fn watchlist(&self) -> Vec<String> {
        self.state.read().await.watchlist.clone()
    }

    /// Apply a multi-key write. All named keys become visible together and
    /// the new state reaches the backing file before the write lock is
    /// released, so the file always holds the latest commit. A single
    /// notification naming the written keys goes out afterwards.
    pub async fn commit(&self, write: StoreWrite) {
        if write.is_empty() {
            return;
        }

        let keys = write.keys();
        {
            let mut state = self.state.write().await;
            if let Some(watchlist) = write.watchlist {
                state.watchlist = watchlist;
            }
            if let Some(prices) = write.prices {
                state.prices = prices;
            }
            if let Some(stats) = write.stats {
                state.stats = stats;
            }
            if let Some(trends) = write.trends {
                state.trends = trends;
            }
            self.persist(&state).await;
        }

        debug!("Store commit: {:?}", keys);

        // A send error only means nobody is subscribed right now
        let _ = self.change_tx.send(StoreChange { keys });
    }

    /// Write the snapshot to the backing file. Callers hold the store's
    /// write lock, which serializes persists into commit order. The content
    /// lands in a sibling temp file first and is renamed into place, so the
    /// store path never holds a partially written document.
    async fn persist(&self, snapshot: &StoreSnapshot) {
        let Some(path) = &self.file_path else {
            return;
        };

        let content = match serde_json::to_string_pretty(snapshot) {
            Ok(content) => content,
            Err(err) => {
                warn!("Failed to serialize store state: {}", err);
                return;
            }
        };

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                if let Err(err) = tokio::fs::create_dir_all(parent).await {
                    warn!("Failed to create store directory {}: {}", parent.display(), err);
                    return;
                }
            }
        }

        let temp_path = path.with_extension("tmp");
        if let Err(err) = tokio::fs::write(&temp_path, content).await {
            warn!("Failed to write store temp file {}: {}", temp_path.display(), err);
            return;
        }
        if let Err(err) = tokio::fs::rename(&temp_path, path).await {
            warn!("Failed to replace store file {}: {}", path.display(), err);
            let _ = tokio::fs::remove_file(&temp_path).await;
        }
    }

    /// Load persisted state, tolerating a missing file, corrupt JSON, and
    /// individually wrong-typed keys. The watch-list passes through the
    /// sanitizer so hand-edited files cannot smuggle invalid symbols in.
    async fn load_lenient(path: &Path) -> StoreSnapshot {
        let content = match tokio::fs::read_to_string(path).await {
            Ok(content) => content,
            Err(err) => {
                debug!("No store file at {}: {}", path.display(), err);
                return StoreSnapshot::default();
            }
        };

        let value: serde_json::Value = match serde_json::from_str(&content) {
            Ok(value) => value,
            Err(err) => {
                warn!("Corrupt store file {}: {}", path.display(), err);
                return StoreSnapshot::default();
            }
        };

        let watchlist = value
            .get(StoreKey::Watchlist.as_str())
            .and_then(|v| v.as_array())
            .map(|items| watchlist::sanitize(items))
            .unwrap_or_default();

        let prices = Self::load_key(&value, StoreKey::Prices);
        let stats = Self::load_key(&value, StoreKey::Stats);
        let trends = Self::load_key(&value, StoreKey::Trends);

        StoreSnapshot {
            watchlist,
            prices,
            stats,
            trends,
        }
    }

    fn load_key<T: Default + for<'de> Deserialize<'de>>(
        value: &serde_json::Value,
        key: StoreKey,
    ) -> T {
        match value.get(key.as_str()) {
            Some(v) => serde_json::from_value(v.clone()).unwrap_or_else(|err| {
                warn!("Ignoring malformed store key {:?}: {}", key.as_str(), err);
                T::default()
            }),
            None => T::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_commit_notifies_written_keys_only() {
        let store = SnapshotStore::in_memory();
        let mut rx = store.subscribe();

        let mut prices = PriceMap::new();
        prices.insert("BTC".to_string(), "50000.00".to_string());
        store
            .commit(StoreWrite::new().prices(prices).stats(StatsMap::new()))
            .await;

        let change = rx.recv().await.unwrap();
        assert!(change.contains(StoreKey::Prices));
        assert!(change.contains(StoreKey::Stats));
        assert!(!change.contains(StoreKey::Watchlist));
        assert!(!change.contains(StoreKey::Trends));

        // Exactly one notification per commit
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_empty_write_does_not_notify() {
        let store = SnapshotStore::in_memory();
        let mut rx = store.subscribe();

        store.commit(StoreWrite::new()).await;

        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_commit_replaces_whole_key() {
        let store = SnapshotStore::in_memory();

        let mut first = PriceMap::new();
        first.insert("BTC".to_string(), "50000.00".to_string());
        store.commit(StoreWrite::new().prices(first)).await;

        let mut second = PriceMap::new();
        second.insert("ETH".to_string(), "3000.00".to_string());
        store.commit(StoreWrite::new().prices(second)).await;

        let snapshot = store.snapshot().await;
        assert_eq!(snapshot.prices.len(), 1);
        assert!(snapshot.prices.contains_key("ETH"));
        assert!(!snapshot.prices.contains_key("BTC"));
    }

    #[tokio::test]
    async fn test_unwritten_keys_survive_commit() {
        let store = SnapshotStore::in_memory();

        store
            .commit(StoreWrite::new().watchlist(vec!["BTC".to_string()]))
            .await;
        let mut trends = TrendMap::new();
        trends.insert("BTC".to_string(), vec![1.0, 2.0]);
        store.commit(StoreWrite::new().trends(trends)).await;

        let snapshot = store.snapshot().await;
        assert_eq!(snapshot.watchlist, vec!["BTC".to_string()]);
        assert_eq!(snapshot.trends["BTC"], vec![1.0, 2.0]);
    }

    #[tokio::test]
    async fn test_concurrent_commits_persist_final_state() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.json");
        let store = std::sync::Arc::new(SnapshotStore::open(&path).await);

        let mut tasks = Vec::new();
        for i in 0..32 {
            let store = store.clone();
            tasks.push(tokio::spawn(async move {
                let mut prices = PriceMap::new();
                prices.insert("BTC".to_string(), format!("{}.0", i));
                store.commit(StoreWrite::new().prices(prices)).await;
            }));
        }
        for task in tasks {
            task.await.unwrap();
        }

        let content = tokio::fs::read_to_string(&path).await.unwrap();
        let on_disk: StoreSnapshot = serde_json::from_str(&content).unwrap();
        assert_eq!(
            on_disk.prices,
            store.snapshot().await.prices,
            "store file must hold the last committed state"
        );
    }

    #[tokio::test]
    async fn test_persistence_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.json");

        let store = SnapshotStore::open(&path).await;
        let mut prices = PriceMap::new();
        prices.insert("BTC".to_string(), "50000.00".to_string());
        store
            .commit(
                StoreWrite::new()
                    .watchlist(vec!["BTC".to_string()])
                    .prices(prices),
            )
            .await;

        let reopened = SnapshotStore::open(&path).await;
        let snapshot = reopened.snapshot().await;
        assert_eq!(snapshot.watchlist, vec!["BTC".to_string()]);
        assert_eq!(snapshot.prices["BTC"], "50000.00");
    }

    #[tokio::test]
    async fn test_lenient_load_drops_malformed_keys() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.json");
        tokio::fs::write(
            &path,
            r#"{"watchlist": ["btc", 42, "ETH"], "prices": "bogus", "trends": {"BTC": [1.0, 2.0]}}"#,
        )
        .await
        .unwrap();

        let store = SnapshotStore::open(&path).await;
        let snapshot = store.snapshot().await;
        assert_eq!(
            snapshot.watchlist,
            vec!["BTC".to_string(), "ETH".to_string()]
        );
        assert!(snapshot.prices.is_empty());
        assert_eq!(snapshot.trends["BTC"], vec![1.0, 2.0]);
    }

    #[tokio::test]
    async fn test_missing_store_file_starts_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = SnapshotStore::open(dir.path().join("absent.json")).await;
        assert_eq!(store.snapshot().await, StoreSnapshot::default());
    }
}
