//! Persistence tests across store reopen
//!
//! Simulates the handoff between one-shot commands and a later watch
//! session: whatever one process commits, the next must see.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use serde_json::json;
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use tickerbar::binance::BinanceRestClient;
use tickerbar::poller::{PricePoller, TrendPoller, new_shared_health};
use tickerbar::store::SnapshotStore;
use tickerbar::watchlist::WatchlistEditor;

#[tokio::test]
async fn test_polled_data_survives_reopen() -> Result<()> {
    let dir = TempDir::new()?;
    let store_path = dir.path().join("data").join("tickerbar.json");

    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v3/ticker/price"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "symbol": "BTCUSDT", "price": "50000.10" }
        ])))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v3/ticker/24hr"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "symbol": "BTCUSDT", "priceChangePercent": "2.5", "highPrice": "51000.00" }
        ])))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v3/klines"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            [0, "0", "0", "0", "100.0", "0"],
            [0, "0", "0", "0", "102.0", "0"]
        ])))
        .mount(&server)
        .await;

    {
        let store = Arc::new(SnapshotStore::open(&store_path).await);
        let editor = WatchlistEditor::new(store.clone());
        editor.add("btc").await?;

        let client = Arc::new(BinanceRestClient::new(server.uri(), Duration::from_secs(2)));
        let health = new_shared_health();
        PricePoller::new(
            store.clone(),
            client.clone(),
            "USDT".to_string(),
            health.clone(),
        )
        .poll_once()
        .await;
        TrendPoller::new(
            store.clone(),
            client,
            "USDT".to_string(),
            "1h".to_string(),
            24,
            health,
        )
        .poll_once()
        .await;
    }

    let reopened = SnapshotStore::open(&store_path).await;
    let snapshot = reopened.snapshot().await;

    assert_eq!(snapshot.watchlist, vec!["BTC".to_string()]);
    assert_eq!(
        snapshot.prices.get("BTC").map(String::as_str),
        Some("50000.10")
    );
    assert_eq!(
        snapshot
            .stats
            .get("BTC")
            .and_then(|s| s.price_change_percent.as_deref()),
        Some("2.5")
    );
    assert_eq!(
        snapshot.trends.get("BTC"),
        Some(&vec![100.0, 102.0]),
        "The trend series should survive the reopen"
    );

    Ok(())
}

#[tokio::test]
async fn test_editor_changes_visible_after_reopen() -> Result<()> {
    let dir = TempDir::new()?;
    let store_path = dir.path().join("tickerbar.json");

    {
        let editor = WatchlistEditor::new(Arc::new(SnapshotStore::open(&store_path).await));
        editor.add("btc").await?;
        editor.add("ETH").await?;
        editor.remove("BTC").await?;
    }

    let editor = WatchlistEditor::new(Arc::new(SnapshotStore::open(&store_path).await));
    assert_eq!(
        editor.symbols().await,
        vec!["ETH".to_string()],
        "Edits from the first process should be visible in the second"
    );

    Ok(())
}
