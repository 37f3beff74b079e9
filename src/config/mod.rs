//! Configuration management module
//!
//! Handles loading, validation, and management of application configuration.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::Path;

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    /// UI refresh rate in milliseconds
    pub refresh_rate_ms: u64,

    /// Logging level
    pub log_level: String,

    /// File-based logging configuration
    pub log: LogConfig,

    /// Binance-specific configuration
    pub binance: BinanceConfig,

    /// Poller cadence configuration
    pub poll: PollConfig,

    /// Snapshot store persistence configuration
    pub store: StoreConfig,

    /// UI-specific configuration
    pub ui: UiConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BinanceConfig {
    /// REST API base URL
    pub rest_url: String,

    /// Request timeout in seconds
    pub timeout_seconds: u64,

    /// Quote asset appended to watch-list symbols to form trading pairs
    pub quote_asset: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PollConfig {
    /// Price and 24h statistics poll interval in milliseconds
    pub price_interval_ms: u64,

    /// Trend series poll interval in milliseconds
    pub trend_interval_ms: u64,

    /// Candle interval for the trend series (Binance kline interval string)
    pub trend_candle_interval: String,

    /// Number of candles fetched per trend request
    pub trend_candle_limit: u32,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StoreConfig {
    /// Path of the JSON file the snapshot store persists to
    pub file_path: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct UiConfig {
    /// Enable colors in terminal output
    pub enable_colors: bool,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LogConfig {
    /// Absolute or relative path to the log file
    pub file_path: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            refresh_rate_ms: 250,
            log_level: "info".to_string(),
            log: LogConfig::default(),
            binance: BinanceConfig::default(),
            poll: PollConfig::default(),
            store: StoreConfig::default(),
            ui: UiConfig::default(),
        }
    }
}

impl Default for BinanceConfig {
    fn default() -> Self {
        Self {
            rest_url: "https://api.binance.com".to_string(),
            timeout_seconds: 10,
            quote_asset: "USDT".to_string(),
        }
    }
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            price_interval_ms: 3000,
            trend_interval_ms: 60_000,
            trend_candle_interval: "1h".to_string(),
            trend_candle_limit: 24,
        }
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            file_path: "data/tickerbar.json".to_string(),
        }
    }
}

impl Default for UiConfig {
    fn default() -> Self {
        Self {
            enable_colors: true,
        }
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            file_path: "logs/tickerbar.log".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from file with environment variable overrides
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;

        let mut config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.as_ref().display()))?;

        // Apply environment variable overrides
        config.apply_env_overrides();

        config.validate()?;
        Ok(config)
    }

    /// Apply environment variable overrides to configuration
    pub fn apply_env_overrides(&mut self) {
        // TICKERBAR_REFRESH_RATE_MS - UI refresh rate
        if let Ok(refresh_rate) = env::var("TICKERBAR_REFRESH_RATE_MS") {
            if let Ok(value) = refresh_rate.parse::<u64>() {
                self.refresh_rate_ms = value;
            }
        }

        // TICKERBAR_LOG_LEVEL - logging level
        if let Ok(log_level) = env::var("TICKERBAR_LOG_LEVEL") {
            self.log_level = log_level;
        }

        // TICKERBAR_LOG_FILE_PATH - logging destination file
        if let Ok(file_path) = env::var("TICKERBAR_LOG_FILE_PATH") {
            if !file_path.trim().is_empty() {
                self.log.file_path = file_path;
            }
        }

        // Binance-specific environment variables
        // TICKERBAR_BINANCE_REST_URL - REST API URL
        if let Ok(rest_url) = env::var("TICKERBAR_BINANCE_REST_URL") {
            self.binance.rest_url = rest_url;
        }

        // TICKERBAR_BINANCE_TIMEOUT_SECONDS - timeout
        if let Ok(timeout) = env::var("TICKERBAR_BINANCE_TIMEOUT_SECONDS") {
            if let Ok(value) = timeout.parse::<u64>() {
                self.binance.timeout_seconds = value;
            }
        }

        // TICKERBAR_BINANCE_QUOTE_ASSET - quote asset suffix
        if let Ok(quote_asset) = env::var("TICKERBAR_BINANCE_QUOTE_ASSET") {
            if !quote_asset.trim().is_empty() {
                self.binance.quote_asset = quote_asset.trim().to_uppercase();
            }
        }

        // Poller-specific environment variables
        // TICKERBAR_PRICE_INTERVAL_MS - price poll cadence
        if let Ok(interval) = env::var("TICKERBAR_PRICE_INTERVAL_MS") {
            if let Ok(value) = interval.parse::<u64>() {
                self.poll.price_interval_ms = value;
            }
        }

        // TICKERBAR_TREND_INTERVAL_MS - trend poll cadence
        if let Ok(interval) = env::var("TICKERBAR_TREND_INTERVAL_MS") {
            if let Ok(value) = interval.parse::<u64>() {
                self.poll.trend_interval_ms = value;
            }
        }

        // TICKERBAR_STORE_FILE_PATH - snapshot store file
        if let Ok(file_path) = env::var("TICKERBAR_STORE_FILE_PATH") {
            if !file_path.trim().is_empty() {
                self.store.file_path = file_path;
            }
        }

        // UI-specific environment variables
        // TICKERBAR_UI_ENABLE_COLORS - enable colors
        if let Ok(enable_colors) = env::var("TICKERBAR_UI_ENABLE_COLORS") {
            self.ui.enable_colors = enable_colors.parse().unwrap_or(self.ui.enable_colors);
        }
    }

    /// Save configuration to file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self).context("Failed to serialize configuration")?;

        std::fs::write(&path, content)
            .with_context(|| format!("Failed to write config file: {}", path.as_ref().display()))?;

        Ok(())
    }

    /// Load configuration with fallback to default
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Self {
        Self::load_from_file(path).unwrap_or_else(|err| {
            tracing::warn!("Failed to load config: {}, using defaults", err);
            Self::default()
        })
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        if self.refresh_rate_ms == 0 {
            anyhow::bail!("Refresh rate must be greater than 0");
        }

        if self.binance.timeout_seconds == 0 {
            anyhow::bail!("Timeout must be greater than 0");
        }

        if self.binance.quote_asset.trim().is_empty() {
            anyhow::bail!("Quote asset must not be empty");
        }

        if self.poll.price_interval_ms == 0 {
            anyhow::bail!("Price poll interval must be greater than 0");
        }

        if self.poll.trend_interval_ms == 0 {
            anyhow::bail!("Trend poll interval must be greater than 0");
        }

        if self.poll.trend_candle_interval.trim().is_empty() {
            anyhow::bail!("Trend candle interval must not be empty");
        }

        // A single candle can never yield a drawable series
        if self.poll.trend_candle_limit < 2 {
            anyhow::bail!("Trend candle limit must be at least 2");
        }

        if self.store.file_path.trim().is_empty() {
            anyhow::bail!("Store file path must not be empty");
        }

        if self.log.file_path.trim().is_empty() {
            anyhow::bail!("Log file path must not be empty");
        }

        Ok(())
    }

    /// Display formatted configuration
    pub fn display(&self) -> Result<()> {
        println!("Current configuration:");
        println!("{:#?}", self);
        Ok(())
    }

    /// Display configuration management help
    pub fn display_help() -> Result<()> {
        println!("Configuration management commands:");
        println!("  tickerbar config show  - Show current configuration");
        println!("  tickerbar config reset - Write default configuration to the config file");
        Ok(())
    }

    /// Handle configuration command
    pub fn handle_command(action: &Option<crate::cli::ConfigAction>, path: &str) -> Result<()> {
        match action {
            Some(crate::cli::ConfigAction::Show) => {
                let config = Config::load_or_default(path);
                config.display()?;
            }
            Some(crate::cli::ConfigAction::Reset) => {
                let default_config = Config::default();
                default_config.save_to_file(path)?;
                println!("Default configuration written to {}", path);
            }
            None => {
                Config::display_help()?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.poll.price_interval_ms, 3000);
        assert_eq!(config.poll.trend_interval_ms, 60_000);
        assert_eq!(config.binance.quote_asset, "USDT");
    }

    #[test]
    fn test_config_serialization() {
        let config = Config::default();
        let serialized = toml::to_string(&config).unwrap();
        let deserialized: Config = toml::from_str(&serialized).unwrap();
        assert_eq!(
            config.poll.trend_candle_limit,
            deserialized.poll.trend_candle_limit
        );
        assert_eq!(config.store.file_path, deserialized.store.file_path);
    }

    #[test]
    fn test_config_file_operations() {
        let config = Config::default();
        let temp_file = NamedTempFile::new().unwrap();

        // Test save
        config.save_to_file(temp_file.path()).unwrap();

        // Test load
        let loaded_config = Config::load_from_file(temp_file.path()).unwrap();
        assert_eq!(config.binance.rest_url, loaded_config.binance.rest_url);
    }

    #[test]
    fn test_validate_rejects_bad_poll_values() {
        let mut config = Config::default();
        config.poll.price_interval_ms = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.poll.trend_candle_limit = 1;
        assert!(config.validate().is_err());
    }
}
