//! Session Manager for interactive terminal session lifecycle management

use anyhow::Result;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::binance::BinanceRestClient;
use crate::cli::Cli;
use crate::config::Config;
use crate::poller::{PricePoller, SharedPollerHealth, TrendPoller, new_shared_health};
use crate::store::SnapshotStore;
use crate::ui::ui_manager::UIManager;
use crate::watchlist::WatchlistEditor;

use super::action_channel::{ActionChannel, LogsInfo, SessionEvent, StatusInfo};
use super::command_router::{CommandRouter, InteractiveCommand};

/// Session state tracking
#[derive(Debug, Clone, PartialEq)]
pub enum SessionState {
    Starting,
    Running,
    ShuttingDown,
    Terminated,
}

/// Session statistics for monitoring
#[derive(Debug, Clone)]
pub struct SessionStats {
    pub start_time_ms: u64,
    pub commands_processed: u64,
    pub events_processed: u64,
    pub errors_encountered: u64,
}

impl Default for SessionStats {
    fn default() -> Self {
        Self {
            start_time_ms: chrono::Utc::now().timestamp_millis() as u64,
            commands_processed: 0,
            events_processed: 0,
            errors_encountered: 0,
        }
    }
}

impl SessionStats {
    /// Seconds elapsed since the session started
    pub fn uptime_seconds(&self) -> u64 {
        let now = chrono::Utc::now().timestamp_millis() as u64;
        now.saturating_sub(self.start_time_ms) / 1000
    }
}

/// Main session manager for the interactive watch session
pub struct SessionManager {
    /// Application configuration
    app_config: Config,
    /// CLI arguments
    cli: Cli,
    /// Session state
    state: SessionState,
    /// Session statistics
    stats: SessionStats,
    /// Shared snapshot store
    store: Arc<SnapshotStore>,
    /// Watch-list write API over the store
    editor: WatchlistEditor,
    /// Poller counters shared with the UI
    health: SharedPollerHealth,
    /// Whether the full TUI is active (false for simple output mode)
    tui_enabled: bool,
    /// Price poller task handle
    price_task: Option<JoinHandle<()>>,
    /// Trend poller task handle
    trend_task: Option<JoinHandle<()>>,
    /// Simple output printer task handle
    printer_task: Option<JoinHandle<()>>,
    /// UI task handle (optional)
    ui_task: Option<JoinHandle<()>>,
    /// UI event sender (Session -> UI)
    ui_event_tx: Option<mpsc::UnboundedSender<SessionEvent>>,
    /// Action channel
    action_channel: ActionChannel,
}

impl SessionManager {
    /// Create a new SessionManager backed by the configured store file
    pub async fn new(cli: &Cli, app_config: Config, tui_enabled: bool) -> Result<Self> {
        info!("Creating new SessionManager");

        let store = Arc::new(SnapshotStore::open(&app_config.store.file_path).await);
        let editor = WatchlistEditor::new(store.clone());
        let health = new_shared_health();
        let action_channel = ActionChannel::new();

        Ok(Self {
            app_config,
            cli: cli.clone(),
            state: SessionState::Starting,
            stats: SessionStats::default(),
            store,
            editor,
            health,
            tui_enabled,
            price_task: None,
            trend_task: None,
            printer_task: None,
            ui_task: None,
            ui_event_tx: None,
            action_channel,
        })
    }

    /// Initialize the session: start both pollers and the chosen output surface
    pub async fn initialize(&mut self) -> Result<()> {
        info!("Initializing watch session");

        let client = Arc::new(BinanceRestClient::new(
            self.app_config.binance.rest_url.clone(),
            Duration::from_secs(self.app_config.binance.timeout_seconds),
        ));

        let price_poller = Arc::new(PricePoller::new(
            self.store.clone(),
            client.clone(),
            self.app_config.binance.quote_asset.clone(),
            self.health.clone(),
        ));
        self.price_task = Some(price_poller.spawn(Duration::from_millis(
            self.app_config.poll.price_interval_ms,
        )));

        let trend_poller = Arc::new(TrendPoller::new(
            self.store.clone(),
            client,
            self.app_config.binance.quote_asset.clone(),
            self.app_config.poll.trend_candle_interval.clone(),
            self.app_config.poll.trend_candle_limit,
            self.health.clone(),
        ));
        self.trend_task = Some(trend_poller.spawn(Duration::from_millis(
            self.app_config.poll.trend_interval_ms,
        )));

        if self.tui_enabled {
            self.initialize_ui().await?;

            let help_lines = CommandRouter::help_messages()
                .iter()
                .map(|line| (*line).to_string())
                .collect();
            self.forward_to_ui(SessionEvent::HelpInfo { lines: help_lines });
        } else {
            self.initialize_simple_output();
        }

        self.state = SessionState::Running;
        info!("Session initialized successfully");

        Ok(())
    }

    /// Initialize UI manager
    async fn initialize_ui(&mut self) -> Result<()> {
        info!("Initializing UI manager");

        let mut ui_manager = UIManager::new(
            self.store.clone(),
            self.health.clone(),
            self.action_channel.event_tx(),
            self.app_config.clone(),
        );

        self.ui_event_tx = Some(ui_manager.ui_event_sender());

        self.ui_task = Some(tokio::spawn(async move {
            if let Err(e) = ui_manager.run().await {
                error!("UI manager error: {}", e);
            }
        }));

        Ok(())
    }

    /// Start the simple output printer and a Ctrl+C forwarder.
    /// In TUI mode the UI loop owns both concerns.
    fn initialize_simple_output(&mut self) {
        let store = self.store.clone();
        let change_rx = self.store.subscribe();
        self.printer_task = Some(tokio::spawn(async move {
            crate::ui::cli::run_simple_printer(store, change_rx).await;
        }));

        let action_channel = self.action_channel.clone();
        tokio::spawn(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!("Failed to listen for Ctrl+C: {}", e);
                return;
            }

            info!("Ctrl+C received, initiating shutdown");
            let _ = action_channel.request_shutdown();
        });
    }

    /// Run the main session loop
    pub async fn run(&mut self) -> Result<()> {
        info!("Starting session loop");

        while self.state != SessionState::Terminated {
            tokio::select! {
                maybe_event = self.action_channel.next_event() => {
                    match maybe_event {
                        Some(event) => self.handle_event(event).await?,
                        None => {
                            warn!("Action channel closed");
                            self.shutdown().await?;
                        }
                    }
                }

                // Catch the UI task exiting without a shutdown event
                _ = tokio::time::sleep(Duration::from_millis(200)) => {
                    if self.ui_task.as_ref().is_some_and(|task| task.is_finished()) {
                        info!("UI task ended, shutting down session");
                        self.shutdown().await?;
                    }
                }
            }
        }

        info!("Session loop terminated");
        Ok(())
    }

    /// Handle session event
    async fn handle_event(&mut self, event: SessionEvent) -> Result<()> {
        debug!("Handling session event: {:?}", event);

        self.stats.events_processed += 1;

        match event {
            SessionEvent::ShutdownRequested => {
                self.shutdown().await?;
            }
            SessionEvent::Error { message } => {
                error!("Session error: {}", message);
                self.stats.errors_encountered += 1;
                self.forward_to_ui(SessionEvent::Error { message });
            }
            SessionEvent::UserCommand { command } => {
                self.handle_command(command).await?;
            }
            other => {
                self.forward_to_ui(other);
            }
        }

        Ok(())
    }

    /// Handle user command
    async fn handle_command(&mut self, command: InteractiveCommand) -> Result<()> {
        debug!("Handling command: {:?}", command);

        self.stats.commands_processed += 1;

        match command {
            InteractiveCommand::Add { symbols } => self.handle_add(symbols).await,
            InteractiveCommand::Remove { symbols } => self.handle_remove(symbols).await,
            InteractiveCommand::List => self.handle_list().await,
            InteractiveCommand::Status => self.handle_status().await,
            InteractiveCommand::Logs => self.handle_logs().await,
            InteractiveCommand::Help => self.handle_help().await,
            InteractiveCommand::Quit => self.handle_quit().await,
        }
    }

    /// Handle add command
    async fn handle_add(&mut self, symbols: Vec<String>) -> Result<()> {
        for raw in symbols {
            match self.editor.add(&raw).await {
                Ok(symbol) => {
                    info!("Added {} to the watch-list", symbol);
                    self.action_channel.send_event(SessionEvent::Info {
                        message: format!("Added {}", symbol),
                    })?;
                }
                Err(e) => {
                    warn!("Could not add {:?} to the watch-list: {}", raw, e);
                    self.action_channel
                        .send_error(format!("Could not add {}: {}", raw.trim(), e))?;
                }
            }
        }

        Ok(())
    }

    /// Handle remove command
    async fn handle_remove(&mut self, symbols: Vec<String>) -> Result<()> {
        for raw in symbols {
            let shown = raw.trim().to_uppercase();
            match self.editor.remove(&raw).await {
                Ok(true) => {
                    info!("Removed {} from the watch-list", shown);
                    self.action_channel.send_event(SessionEvent::Info {
                        message: format!("Removed {}", shown),
                    })?;
                }
                Ok(false) => {
                    self.action_channel.send_event(SessionEvent::Info {
                        message: format!("{} is not on the watch-list", shown),
                    })?;
                }
                Err(e) => {
                    warn!("Could not remove {:?} from the watch-list: {}", raw, e);
                    self.action_channel
                        .send_error(format!("Could not remove {}: {}", raw.trim(), e))?;
                }
            }
        }

        Ok(())
    }

    /// Handle list command
    async fn handle_list(&mut self) -> Result<()> {
        let symbols = self.store.watchlist().await;

        info!("Current watch-list: {:?}", symbols);

        let message = if symbols.is_empty() {
            "Watch-list is empty".to_string()
        } else {
            format!("Watch-list: {}", symbols.join(", "))
        };
        self.action_channel
            .send_event(SessionEvent::Info { message })?;

        Ok(())
    }

    /// Handle status command
    async fn handle_status(&mut self) -> Result<()> {
        let watchlist = self.store.watchlist().await;
        let poller_health = self.health.read().await.clone();

        let status_info = StatusInfo {
            version: env!("CARGO_PKG_VERSION").to_string(),
            state: format!("{:?}", self.state),
            watchlist,
            poller_health,
            session_stats: self.stats.clone(),
        };

        self.action_channel
            .send_event(SessionEvent::StatusInfo { info: status_info })?;

        Ok(())
    }

    /// Handle logs command
    async fn handle_logs(&mut self) -> Result<()> {
        info!("User requested logs");

        let mut recent_logs = crate::recent_logs(100);
        if recent_logs.is_empty() {
            recent_logs.push("(no log entries captured yet)".to_string());
        }

        let logs_info = LogsInfo {
            recent_logs,
            log_file_path: self.app_config.log.file_path.clone(),
            log_level: self.cli.effective_log_level(),
        };

        self.action_channel
            .send_event(SessionEvent::LogsInfo { info: logs_info })?;

        Ok(())
    }

    /// Handle help command
    async fn handle_help(&mut self) -> Result<()> {
        let lines = CommandRouter::help_messages()
            .iter()
            .map(|line| (*line).to_string())
            .collect();
        self.action_channel
            .send_event(SessionEvent::HelpInfo { lines })?;

        Ok(())
    }

    /// Handle quit command
    async fn handle_quit(&mut self) -> Result<()> {
        info!("User requested quit");
        self.shutdown().await
    }

    /// Forward an event to the UI if the channel is available
    fn forward_to_ui(&self, event: SessionEvent) {
        if let Some(ui_event_tx) = &self.ui_event_tx {
            if let Err(e) = ui_event_tx.send(event) {
                error!("Failed to forward event to UI: {}", e);
            }
        }
    }

    /// Graceful shutdown
    pub async fn shutdown(&mut self) -> Result<()> {
        if matches!(
            self.state,
            SessionState::ShuttingDown | SessionState::Terminated
        ) {
            return Ok(());
        }

        info!("Initiating graceful shutdown");
        self.state = SessionState::ShuttingDown;

        // Notify UI to shutdown and wait for task completion
        if let Some(ui_event_tx) = self.ui_event_tx.take() {
            if let Err(e) = ui_event_tx.send(SessionEvent::ShutdownRequested) {
                error!("Failed to notify UI of shutdown: {}", e);
            }
        }
        if let Some(ui_task) = self.ui_task.take() {
            if let Err(e) = ui_task.await {
                error!("UI task terminated with error: {}", e);
            }
        }

        // Stop the pollers and the simple printer
        for task in [
            self.price_task.take(),
            self.trend_task.take(),
            self.printer_task.take(),
        ]
        .into_iter()
        .flatten()
        {
            task.abort();
            let _ = task.await;
        }

        self.state = SessionState::Terminated;
        info!("Shutdown completed");

        Ok(())
    }
}

impl Drop for SessionManager {
    fn drop(&mut self) {
        if self.state != SessionState::Terminated {
            warn!("SessionManager dropped without proper shutdown");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_cli() -> Cli {
        Cli {
            command: None,
            config_file: "config.toml".to_string(),
            log_level: "info".to_string(),
            verbose: false,
        }
    }

    async fn test_session(dir: &tempfile::TempDir) -> SessionManager {
        let mut config = Config::default();
        config.store.file_path = dir
            .path()
            .join("store.json")
            .to_string_lossy()
            .into_owned();
        SessionManager::new(&test_cli(), config, false).await.unwrap()
    }

    #[tokio::test]
    async fn test_add_command_updates_watchlist_and_reports() {
        let dir = tempfile::tempdir().unwrap();
        let mut session = test_session(&dir).await;

        session
            .handle_command(InteractiveCommand::Add {
                symbols: vec!["btc".to_string(), "btc".to_string()],
            })
            .await
            .unwrap();

        assert_eq!(session.store.watchlist().await, vec!["BTC".to_string()]);
        assert_eq!(session.stats.commands_processed, 1);

        match session.action_channel.next_event().await {
            Some(SessionEvent::Info { message }) => assert_eq!(message, "Added BTC"),
            other => panic!("unexpected event: {:?}", other),
        }
        // The duplicate add reports an error instead of mutating the list
        match session.action_channel.next_event().await {
            Some(SessionEvent::Error { message }) => assert!(message.contains("btc")),
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_remove_present_symbol_reports_and_updates() {
        let dir = tempfile::tempdir().unwrap();
        let mut session = test_session(&dir).await;
        session.editor.add("eth").await.unwrap();

        session
            .handle_command(InteractiveCommand::Remove {
                symbols: vec![" eth ".to_string()],
            })
            .await
            .unwrap();

        assert!(session.store.watchlist().await.is_empty());
        match session.action_channel.next_event().await {
            Some(SessionEvent::Info { message }) => assert_eq!(message, "Removed ETH"),
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_remove_missing_symbol_reports_info() {
        let dir = tempfile::tempdir().unwrap();
        let mut session = test_session(&dir).await;

        session
            .handle_command(InteractiveCommand::Remove {
                symbols: vec!["eth".to_string()],
            })
            .await
            .unwrap();

        match session.action_channel.next_event().await {
            Some(SessionEvent::Info { message }) => {
                assert_eq!(message, "ETH is not on the watch-list");
            }
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_status_command_reports_watchlist_and_version() {
        let dir = tempfile::tempdir().unwrap();
        let mut session = test_session(&dir).await;
        session.editor.add("sol").await.unwrap();

        session
            .handle_command(InteractiveCommand::Status)
            .await
            .unwrap();

        match session.action_channel.next_event().await {
            Some(SessionEvent::StatusInfo { info }) => {
                assert_eq!(info.watchlist, vec!["SOL".to_string()]);
                assert_eq!(info.version, env!("CARGO_PKG_VERSION"));
                assert_eq!(info.poller_health.price_cycles, 0);
            }
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_shutdown_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let mut session = test_session(&dir).await;

        session.shutdown().await.unwrap();
        assert_eq!(session.state, SessionState::Terminated);

        session.shutdown().await.unwrap();
        assert_eq!(session.state, SessionState::Terminated);
    }
}
