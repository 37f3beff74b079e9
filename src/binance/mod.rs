//! Binance API integration module
//!
//! Handles REST API calls and data parsing for Binance.

pub mod rest;
pub mod types;

// Re-export commonly used types
pub use rest::BinanceRestClient;
pub use types::*;
