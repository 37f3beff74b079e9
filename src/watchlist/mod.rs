//! Watch-list sanitation and editing
//!
//! The sanitizer is the single gate between raw symbol input (user edits,
//! persisted files) and the canonical watch-list every poller trusts.

use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info};

use crate::store::{SnapshotStore, StoreWrite};

/// Maximum number of symbols the watch-list will hold.
pub const MAX_WATCHLIST_SYMBOLS: usize = 20;

const MIN_SYMBOL_LEN: usize = 2;
const MAX_SYMBOL_LEN: usize = 10;

/// Rejections surfaced by the watch-list editor.
#[derive(Error, Debug, PartialEq)]
pub enum WatchlistError {
    #[error("Invalid symbol: {0:?}")]
    InvalidSymbol(String),

    #[error("Symbol {0} is already tracked")]
    Duplicate(String),

    #[error("Watch-list is full ({0} symbols)")]
    CapacityReached(usize),
}

/// Normalize one raw symbol: trim, uppercase, validate. Returns `None` for
/// anything that does not match `[A-Z0-9]{2,10}` after normalization.
pub fn normalize_symbol(raw: &str) -> Option<String> {
    let symbol = raw.trim().to_uppercase();
    if symbol.len() < MIN_SYMBOL_LEN || symbol.len() > MAX_SYMBOL_LEN {
        return None;
    }
    if !symbol
        .chars()
        .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit())
    {
        return None;
    }
    Some(symbol)
}

/// Sanitize untrusted list data, e.g. a persisted watch-list read back from
/// disk. Non-string elements are dropped, strings are normalized, duplicates
/// keep their first occurrence, and the result is capped at
/// [`MAX_WATCHLIST_SYMBOLS`].
pub fn sanitize(raw: &[serde_json::Value]) -> Vec<String> {
    collect_sanitized(raw.iter().filter_map(|v| v.as_str()).filter_map(normalize_symbol))
}

/// Sanitize an already-typed list. Pollers run every stored list through
/// this before trusting it; applying it twice changes nothing.
pub fn sanitize_list(raw: &[String]) -> Vec<String> {
    collect_sanitized(raw.iter().filter_map(|s| normalize_symbol(s)))
}

fn collect_sanitized<I>(normalized: I) -> Vec<String>
where
    I: IntoIterator<Item = String>,
{
    let mut symbols: Vec<String> = Vec::new();
    for symbol in normalized {
        if symbols.contains(&symbol) {
            continue;
        }
        symbols.push(symbol);
        if symbols.len() == MAX_WATCHLIST_SYMBOLS {
            break;
        }
    }
    symbols
}

/// Write API for the watch-list. Every successful edit rewrites the full
/// sanitized list through the store, which notifies subscribers.
pub struct WatchlistEditor {
    store: Arc<SnapshotStore>,
}

impl WatchlistEditor {
    pub fn new(store: Arc<SnapshotStore>) -> Self {
        Self { store }
    }

    /// Add a symbol to the watch-list. Returns the normalized form.
    pub async fn add(&self, raw: &str) -> Result<String, WatchlistError> {
        let symbol = normalize_symbol(raw)
            .ok_or_else(|| WatchlistError::InvalidSymbol(raw.trim().to_string()))?;

        let mut symbols = sanitize_list(&self.store.watchlist().await);
        if symbols.contains(&symbol) {
            debug!("Symbol {} is already tracked", symbol);
            return Err(WatchlistError::Duplicate(symbol));
        }
        if symbols.len() >= MAX_WATCHLIST_SYMBOLS {
            return Err(WatchlistError::CapacityReached(MAX_WATCHLIST_SYMBOLS));
        }

        symbols.push(symbol.clone());
        self.store
            .commit(StoreWrite::new().watchlist(symbols))
            .await;

        info!("Added {} to watch-list", symbol);
        Ok(symbol)
    }

    /// Remove a symbol from the watch-list. `Ok(false)` means the symbol was
    /// not tracked; nothing is written in that case.
    pub async fn remove(&self, raw: &str) -> Result<bool, WatchlistError> {
        let symbol = normalize_symbol(raw)
            .ok_or_else(|| WatchlistError::InvalidSymbol(raw.trim().to_string()))?;

        let mut symbols = sanitize_list(&self.store.watchlist().await);
        let before = symbols.len();
        symbols.retain(|s| s != &symbol);
        if symbols.len() == before {
            debug!("Symbol {} was not tracked", symbol);
            return Ok(false);
        }

        self.store
            .commit(StoreWrite::new().watchlist(symbols))
            .await;

        info!("Removed {} from watch-list", symbol);
        Ok(true)
    }

    /// Current sanitized watch-list.
    pub async fn symbols(&self) -> Vec<String> {
        sanitize_list(&self.store.watchlist().await)
    }
}
