//! Binance REST API client implementation

use std::time::Duration;
use tracing::debug;

use super::types::{Kline, PriceTicker, RestApiError, Ticker24h};

/// Binance REST API client
pub struct BinanceRestClient {
    base_url: String,
    client: reqwest::Client,
    timeout: Duration,
}

impl BinanceRestClient {
    pub fn new(base_url: String, timeout: Duration) -> Self {
        Self {
            base_url,
            client: reqwest::Client::new(),
            timeout,
        }
    }

    /// Get current prices for a batch of trading pairs in one request
    pub async fn get_prices(&self, pairs: &[String]) -> Result<Vec<PriceTicker>, RestApiError> {
        let url = format!("{}/api/v3/ticker/price", self.base_url);
        self.get_batched(&url, pairs).await
    }

    /// Get 24hr rolling statistics for a batch of trading pairs in one request
    pub async fn get_ticker_24h(&self, pairs: &[String]) -> Result<Vec<Ticker24h>, RestApiError> {
        let url = format!("{}/api/v3/ticker/24hr", self.base_url);
        self.get_batched(&url, pairs).await
    }

    /// Get recent klines for one trading pair
    pub async fn get_klines(
        &self,
        pair: &str,
        interval: &str,
        limit: u32,
    ) -> Result<Vec<Kline>, RestApiError> {
        let url = format!("{}/api/v3/klines", self.base_url);
        let limit_param = limit.to_string();

        debug!("Fetching {} klines for {} from: {}", limit, pair, url);

        let response = self
            .client
            .get(&url)
            .query(&[
                ("symbol", pair),
                ("interval", interval),
                ("limit", limit_param.as_str()),
            ])
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| RestApiError::HttpRequestError(e.to_string()))?;

        Self::decode(response).await
    }

    /// One GET with the batched `symbols` query parameter (a JSON array of
    /// pair names), decoded as a JSON array of `T`.
    async fn get_batched<T>(&self, url: &str, pairs: &[String]) -> Result<Vec<T>, RestApiError>
    where
        T: serde::de::DeserializeOwned,
    {
        let symbols_param = serde_json::to_string(pairs)?;

        debug!("Fetching {} with symbols={}", url, symbols_param);

        let response = self
            .client
            .get(url)
            .query(&[("symbols", symbols_param.as_str())])
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| RestApiError::HttpRequestError(e.to_string()))?;

        Self::decode(response).await
    }

    async fn decode<T>(response: reqwest::Response) -> Result<T, RestApiError>
    where
        T: serde::de::DeserializeOwned,
    {
        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(RestApiError::HttpStatusError(status, body));
        }

        response
            .json()
            .await
            .map_err(|e| RestApiError::ParseError(e.to_string()))
    }
}
