//! User Interface module
//!
//! Provides both TUI (Terminal User Interface) and simple CLI output capabilities.

/// TUI application state and rendering
pub mod tui;

/// Simple CLI output functions
pub mod cli;

/// Value formatting helpers shared by the TUI and CLI output
pub mod format;

/// UI event loop driving the TUI from store changes
pub mod ui_manager;

use chrono::{DateTime, Local};
use std::collections::HashMap;

use crate::poller::PollerHealth;
use crate::store::{StoreSnapshot, SymbolStats};

/// Maximum feedback lines kept for the log panel
const MAX_LOG_MESSAGES: usize = 100;

/// Input mode for the interactive session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputMode {
    Normal,
    Command,
}

/// Application state for UI components. Mirrors the latest store snapshot
/// plus renderer-local state (selection, pause, feedback messages).
#[derive(Debug, Clone)]
pub struct AppState {
    pub should_quit: bool,
    pub selected_tab: usize,
    pub watchlist: Vec<String>,
    pub prices: HashMap<String, String>,
    pub stats: HashMap<String, SymbolStats>,
    pub trends: HashMap<String, Vec<f64>>,
    pub health: PollerHealth,
    pub last_refresh: Option<DateTime<Local>>,
    pub paused: bool,
    pub input_mode: InputMode,
    pub command_buffer: String,
    pub log_messages: Vec<String>,
}

impl AppState {
    /// Create new application state
    pub fn new() -> Self {
        Self {
            should_quit: false,
            selected_tab: 0,
            watchlist: Vec::new(),
            prices: HashMap::new(),
            stats: HashMap::new(),
            trends: HashMap::new(),
            health: PollerHealth::default(),
            last_refresh: None,
            paused: false,
            input_mode: InputMode::Normal,
            command_buffer: String::new(),
            log_messages: Vec::new(),
        }
    }

    /// Replace the displayed data with a fresh store snapshot
    pub fn apply_snapshot(&mut self, snapshot: StoreSnapshot) {
        self.watchlist = snapshot.watchlist;
        self.prices = snapshot.prices;
        self.stats = snapshot.stats;
        self.trends = snapshot.trends;

        // Keep the selection on a valid row when the list shrinks
        if self.watchlist.is_empty() {
            self.selected_tab = 0;
        } else if self.selected_tab >= self.watchlist.len() {
            self.selected_tab = self.watchlist.len() - 1;
        }

        self.last_refresh = Some(Local::now());
    }

    /// Refresh the poller counters shown in the header
    pub fn update_health(&mut self, health: PollerHealth) {
        self.health = health;
    }

    /// Stored price string for a symbol, if the last poll delivered one
    pub fn price(&self, symbol: &str) -> Option<&str> {
        self.prices.get(symbol).map(String::as_str)
    }

    /// Stored 24h statistics for a symbol
    pub fn symbol_stats(&self, symbol: &str) -> Option<&SymbolStats> {
        self.stats.get(symbol)
    }

    /// Stored trend series for a symbol; empty when unavailable
    pub fn trend(&self, symbol: &str) -> &[f64] {
        self.trends.get(symbol).map(|v| v.as_slice()).unwrap_or(&[])
    }

    /// Move to next tab
    pub fn next_tab(&mut self) {
        if !self.watchlist.is_empty() {
            self.selected_tab = (self.selected_tab + 1) % self.watchlist.len();
        }
    }

    /// Move to previous tab
    pub fn previous_tab(&mut self) {
        if !self.watchlist.is_empty() {
            self.selected_tab = if self.selected_tab == 0 {
                self.watchlist.len() - 1
            } else {
                self.selected_tab - 1
            };
        }
    }

    /// Get currently selected symbol
    pub fn current_symbol(&self) -> Option<&String> {
        self.watchlist.get(self.selected_tab)
    }

    /// Toggle pause state
    pub fn toggle_pause(&mut self) {
        self.paused = !self.paused;
    }

    /// Leave command mode and discard the buffered input
    pub fn clear_command(&mut self) {
        self.command_buffer.clear();
        self.input_mode = InputMode::Normal;
    }

    pub fn push_log(&mut self, message: impl Into<String>) {
        self.log_messages.push(message.into());
        if self.log_messages.len() > MAX_LOG_MESSAGES {
            let excess = self.log_messages.len() - MAX_LOG_MESSAGES;
            self.log_messages.drain(..excess);
        }
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot_with_watchlist(symbols: &[&str]) -> StoreSnapshot {
        StoreSnapshot {
            watchlist: symbols.iter().map(|s| s.to_string()).collect(),
            ..StoreSnapshot::default()
        }
    }

    #[test]
    fn test_app_state_navigation() {
        let mut app = AppState::new();
        app.apply_snapshot(snapshot_with_watchlist(&["BTC", "ETH"]));
        assert_eq!(app.selected_tab, 0);

        app.next_tab();
        assert_eq!(app.selected_tab, 1);

        app.next_tab();
        assert_eq!(app.selected_tab, 0); // Wrap around

        app.previous_tab();
        assert_eq!(app.selected_tab, 1);
    }

    #[test]
    fn test_apply_snapshot_clamps_selection() {
        let mut app = AppState::new();
        app.apply_snapshot(snapshot_with_watchlist(&["BTC", "ETH", "SOL"]));
        app.selected_tab = 2;

        app.apply_snapshot(snapshot_with_watchlist(&["BTC"]));
        assert_eq!(app.selected_tab, 0);
        assert_eq!(app.current_symbol(), Some(&"BTC".to_string()));

        app.apply_snapshot(snapshot_with_watchlist(&[]));
        assert_eq!(app.current_symbol(), None);
    }

    #[test]
    fn test_trend_defaults_to_empty() {
        let mut app = AppState::new();
        let mut snapshot = snapshot_with_watchlist(&["BTC"]);
        snapshot.trends.insert("BTC".to_string(), vec![1.0, 2.0]);
        app.apply_snapshot(snapshot);

        assert_eq!(app.trend("BTC"), &[1.0, 2.0]);
        assert!(app.trend("ETH").is_empty());
    }

    #[test]
    fn test_toggle_pause() {
        let mut app = AppState::new();
        assert!(!app.paused);

        app.toggle_pause();
        assert!(app.paused);

        app.toggle_pause();
        assert!(!app.paused);
    }

    #[test]
    fn test_clear_command_resets_mode_and_buffer() {
        let mut app = AppState::new();
        app.input_mode = InputMode::Command;
        app.command_buffer.push_str("/add btc");

        app.clear_command();
        assert_eq!(app.input_mode, InputMode::Normal);
        assert!(app.command_buffer.is_empty());
    }

    #[test]
    fn test_push_log_is_bounded() {
        let mut app = AppState::new();
        for i in 0..150 {
            app.push_log(format!("line {i}"));
        }

        assert_eq!(app.log_messages.len(), 100);
        assert_eq!(app.log_messages.first().map(String::as_str), Some("line 50"));
        assert_eq!(app.log_messages.last().map(String::as_str), Some("line 149"));
    }
}
