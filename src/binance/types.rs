//! Binance API data types and structures

use serde::Deserialize;

/// Current price for one trading pair
#[derive(Debug, Clone, Deserialize)]
pub struct PriceTicker {
    pub symbol: String,
    pub price: String,
}

/// 24hr rolling statistics for one trading pair. The exchange delivers
/// numbers as strings; fields it omits stay `None`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Ticker24h {
    pub symbol: String,
    pub price_change_percent: Option<String>,
    pub high_price: Option<String>,
    pub low_price: Option<String>,
    pub volume: Option<String>,
    pub quote_volume: Option<String>,
}

/// One kline row as delivered by the exchange: a heterogeneous JSON array
/// where index 4 holds the close price.
pub type Kline = Vec<serde_json::Value>;

const KLINE_CLOSE_INDEX: usize = 4;

/// Extract the close price from a kline row, accepting the exchange's
/// numeric-string form as well as plain numbers. Non-finite and malformed
/// values yield `None`.
pub fn close_price(candle: &[serde_json::Value]) -> Option<f64> {
    let close = match candle.get(KLINE_CLOSE_INDEX)? {
        serde_json::Value::String(s) => s.trim().parse::<f64>().ok()?,
        serde_json::Value::Number(n) => n.as_f64()?,
        _ => return None,
    };
    close.is_finite().then_some(close)
}

/// Build the exchange trading-pair name for a watch-list symbol.
pub fn pair_symbol(symbol: &str, quote_asset: &str) -> String {
    format!("{}{}", symbol, quote_asset)
}

/// Recover the watch-list symbol from a trading-pair name. Returns `None`
/// when the pair does not end in the quote asset.
pub fn base_symbol<'a>(pair: &'a str, quote_asset: &str) -> Option<&'a str> {
    pair.strip_suffix(quote_asset)
        .filter(|base| !base.is_empty())
}

/// Error types for REST API operations
#[derive(Debug, thiserror::Error)]
pub enum RestApiError {
    #[error("HTTP request error: {0}")]
    HttpRequestError(String),
    #[error("HTTP status error: {0} - {1}")]
    HttpStatusError(u16, String),
    #[error("Parse error: {0}")]
    ParseError(String),
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_close_price_from_string_and_number() {
        let candle = vec![
            json!(1700000000000u64),
            json!("100.0"),
            json!("110.0"),
            json!("90.0"),
            json!("105.5"),
            json!("1234.0"),
        ];
        assert_eq!(close_price(&candle), Some(105.5));

        let numeric = vec![json!(0), json!(0), json!(0), json!(0), json!(42.25)];
        assert_eq!(close_price(&numeric), Some(42.25));
    }

    #[test]
    fn test_close_price_rejects_malformed() {
        assert_eq!(close_price(&[]), None);
        assert_eq!(
            close_price(&[json!(0), json!(0), json!(0), json!(0), json!("abc")]),
            None
        );
        assert_eq!(
            close_price(&[json!(0), json!(0), json!(0), json!(0), json!(null)]),
            None
        );
        assert_eq!(
            close_price(&[json!(0), json!(0), json!(0), json!(0), json!("inf")]),
            None
        );
    }

    #[test]
    fn test_pair_symbol_round_trip() {
        assert_eq!(pair_symbol("BTC", "USDT"), "BTCUSDT");
        assert_eq!(base_symbol("BTCUSDT", "USDT"), Some("BTC"));
        assert_eq!(base_symbol("BTCBUSD", "USDT"), None);
        assert_eq!(base_symbol("USDT", "USDT"), None);
    }

    #[test]
    fn test_ticker_24h_tolerates_missing_fields() {
        let ticker: Ticker24h = serde_json::from_value(json!({
            "symbol": "BTCUSDT",
            "priceChangePercent": "1.25",
            "highPrice": null
        }))
        .unwrap();
        assert_eq!(ticker.symbol, "BTCUSDT");
        assert_eq!(ticker.price_change_percent.as_deref(), Some("1.25"));
        assert_eq!(ticker.high_price, None);
        assert_eq!(ticker.volume, None);
    }
}
