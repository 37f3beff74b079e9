//! Simple CLI output implementation
//!
//! Provides colored command-line output for the headless subcommands and the
//! simple (non-TUI) watch mode.

use std::sync::Arc;

use colored::Colorize;
use tokio::sync::broadcast;
use tracing::{debug, info};

use super::format;
use crate::store::{SnapshotStore, StoreChange, StoreKey, StoreSnapshot};
use crate::watchlist::WatchlistError;

/// Apply the configured color preference to all subsequent output
pub fn set_color_mode(enable: bool) {
    if enable {
        colored::control::unset_override();
    } else {
        colored::control::set_override(false);
    }
}

/// Report a successful watch-list addition
pub fn print_added(symbol: &str) {
    println!("{} Added {}", "✓".green(), symbol.bold());
}

/// Report a rejected watch-list addition
pub fn print_add_error(input: &str, error: &WatchlistError) {
    println!("{} Could not add {}: {}", "✗".red(), input.trim(), error);
}

/// Report a successful watch-list removal
pub fn print_removed(symbol: &str) {
    println!("{} Removed {}", "✓".green(), symbol.bold());
}

/// Report a removal of a symbol that was not listed
pub fn print_remove_missing(symbol: &str) {
    println!("{} {} is not on the watch-list", "•".yellow(), symbol);
}

/// Report a rejected watch-list removal
pub fn print_remove_error(input: &str, error: &WatchlistError) {
    println!("{} Could not remove {}: {}", "✗".red(), input.trim(), error);
}

/// Display the watch-list with the latest stored market data
pub fn print_watchlist(snapshot: &StoreSnapshot) {
    if snapshot.watchlist.is_empty() {
        println!("Watch-list is empty.");
        println!("Add symbols with: tickerbar add <symbol> [symbol] ...");
        return;
    }

    println!(
        "{}",
        format!(
            "{:<8} {:>14} {:>9} {:>14} {:>14} {:>10}",
            "SYMBOL", "PRICE", "24H%", "HIGH", "LOW", "VOLUME"
        )
        .bold()
    );

    for symbol in &snapshot.watchlist {
        println!("{}", watchlist_row(snapshot, symbol));
    }
}

/// One aligned table row for a symbol. Cells are padded before coloring so
/// ANSI escapes do not break the alignment.
fn watchlist_row(snapshot: &StoreSnapshot, symbol: &str) -> String {
    let stats = snapshot.stats.get(symbol);
    let change_raw = stats.and_then(|s| s.price_change_percent.as_deref());

    let price = format::format_price(snapshot.prices.get(symbol).map(String::as_str));
    let high = format::format_price(stats.and_then(|s| s.high_price.as_deref()));
    let low = format::format_price(stats.and_then(|s| s.low_price.as_deref()));
    let volume = format::format_volume(stats.and_then(|s| s.quote_volume.as_deref()));

    let change_cell = format!("{:>9}", format::format_change(change_raw));
    let change = match change_raw.and_then(|c| c.trim().parse::<f64>().ok()) {
        Some(v) if v > 0.0 => change_cell.green().to_string(),
        Some(v) if v < 0.0 => change_cell.red().to_string(),
        _ => change_cell,
    };

    format!(
        "{:<8} {:>14} {} {:>14} {:>14} {:>10}",
        symbol, price, change, high, low, volume
    )
}

/// Print one compact update line for the simple watch mode
pub fn print_watch_update(snapshot: &StoreSnapshot) {
    let timestamp = chrono::Local::now().format("%H:%M:%S");

    if snapshot.watchlist.is_empty() {
        println!("{} {}", timestamp, "watch-list is empty".dimmed());
        return;
    }

    let line = snapshot
        .watchlist
        .iter()
        .map(|symbol| watch_cell(snapshot, symbol))
        .collect::<Vec<_>>()
        .join("   ");

    println!("{} {}", timestamp, line);
}

fn watch_cell(snapshot: &StoreSnapshot, symbol: &str) -> String {
    let price = format::format_price(snapshot.prices.get(symbol).map(String::as_str));
    let change_raw = snapshot
        .stats
        .get(symbol)
        .and_then(|s| s.price_change_percent.as_deref());
    let change_text = format::format_change(change_raw);

    let change = match change_raw.and_then(|c| c.trim().parse::<f64>().ok()) {
        Some(v) if v > 0.0 => change_text.green().to_string(),
        Some(v) if v < 0.0 => change_text.red().to_string(),
        _ => change_text,
    };

    if change.is_empty() {
        format!("{} {}", symbol.bold(), price)
    } else {
        format!("{} {} {}", symbol.bold(), price, change)
    }
}

/// Print update lines until the store is dropped. Drives the simple watch mode.
pub async fn run_simple_printer(
    store: Arc<SnapshotStore>,
    mut change_rx: broadcast::Receiver<StoreChange>,
) {
    info!("Simple output mode started");
    println!(
        "{}",
        "Watching for price updates (Ctrl+C to exit)...".dimmed()
    );

    loop {
        match change_rx.recv().await {
            Ok(change) => {
                if !change.contains(StoreKey::Prices) && !change.contains(StoreKey::Watchlist) {
                    continue;
                }
                let snapshot = store.snapshot().await;
                print_watch_update(&snapshot);
            }
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                debug!("Simple printer lagged behind {} updates", skipped);
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::SymbolStats;

    fn snapshot_with_btc() -> StoreSnapshot {
        let mut snapshot = StoreSnapshot::default();
        snapshot.watchlist = vec!["BTC".to_string()];
        snapshot
            .prices
            .insert("BTC".to_string(), "50123.45".to_string());
        snapshot.stats.insert(
            "BTC".to_string(),
            SymbolStats {
                price_change_percent: Some("1.23".to_string()),
                high_price: Some("51000".to_string()),
                low_price: Some("49000".to_string()),
                volume: Some("1000".to_string()),
                quote_volume: Some("1500000000".to_string()),
            },
        );
        snapshot
    }

    #[test]
    fn test_watchlist_row_contains_formatted_values() {
        colored::control::set_override(false);
        let snapshot = snapshot_with_btc();

        let row = watchlist_row(&snapshot, "BTC");
        assert!(row.contains("BTC"));
        assert!(row.contains("50,123.45"));
        assert!(row.contains("+1.23%"));
        assert!(row.contains("1.50B"));
    }

    #[test]
    fn test_watch_cell_omits_change_when_stats_are_missing() {
        colored::control::set_override(false);
        let mut snapshot = snapshot_with_btc();
        snapshot.stats.clear();

        let cell = watch_cell(&snapshot, "BTC");
        assert!(cell.contains("50,123.45"));
        assert!(!cell.contains('%'));
    }
}
