//! UI Manager for the interactive terminal interface

use anyhow::Result;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, error, info};

use crossterm::event::{self, Event};

use crate::config::Config;
use crate::poller::SharedPollerHealth;
use crate::session::action_channel::SessionEvent;
use crate::session::command_router::{CommandRouter, InteractiveCommand};
use crate::session::session_manager::SessionStats;
use crate::store::{SnapshotStore, StoreChange};

use super::AppState;
use super::tui::{Tui, UiAction, handle_key_event};

/// UI Manager driving the TUI from store changes and session events
pub struct UIManager {
    /// Shared snapshot store the display mirrors
    store: Arc<SnapshotStore>,
    /// Poller counters shown in the header
    health: SharedPollerHealth,
    /// Event sender for session events (UI -> Session)
    session_event_tx: mpsc::UnboundedSender<SessionEvent>,
    /// Event sender for UI events (Session -> UI)
    ui_event_tx: mpsc::UnboundedSender<SessionEvent>,
    /// Event receiver for UI events
    event_rx: Option<mpsc::UnboundedReceiver<SessionEvent>>,
    /// Store change notifications
    store_rx: broadcast::Receiver<StoreChange>,
    /// Set when a store change arrived while the display was paused
    missed_store_update: bool,
    /// Application state
    app_state: AppState,
    /// UI rendering state
    render_state: RenderState,
    /// TUI terminal handle
    tui: Option<Tui>,
    /// Desired refresh cadence
    refresh_interval: Duration,
    /// Time of the last successful render
    last_render: Instant,
    /// Latest session statistics from the backend
    session_stats: SessionStats,
}

/// UI rendering state
#[derive(Debug, Clone)]
pub struct RenderState {
    pub should_quit: bool,
    pub should_redraw: bool,
    pub render_count: u64,
    pub error_message: Option<String>,
    pub info_message: Option<String>,
}

impl Default for RenderState {
    fn default() -> Self {
        Self {
            should_quit: false,
            should_redraw: true,
            render_count: 0,
            error_message: None,
            info_message: None,
        }
    }
}

impl UIManager {
    /// Create a new UIManager
    pub fn new(
        store: Arc<SnapshotStore>,
        health: SharedPollerHealth,
        session_event_tx: mpsc::UnboundedSender<SessionEvent>,
        config: Config,
    ) -> Self {
        let (ui_event_tx, ui_event_rx) = mpsc::unbounded_channel();

        let store_rx = store.subscribe();
        let refresh_interval = Duration::from_millis(config.refresh_rate_ms.clamp(16, 1000));

        Self {
            store,
            health,
            session_event_tx,
            ui_event_tx,
            event_rx: Some(ui_event_rx),
            store_rx,
            missed_store_update: false,
            app_state: AppState::new(),
            render_state: RenderState::default(),
            tui: None,
            refresh_interval,
            last_render: Instant::now(),
            session_stats: SessionStats::default(),
        }
    }

    /// Get UI event sender (Session -> UI)
    pub fn ui_event_sender(&self) -> mpsc::UnboundedSender<SessionEvent> {
        self.ui_event_tx.clone()
    }

    /// Run the UI manager
    pub async fn run(&mut self) -> Result<()> {
        info!("Starting UI manager");

        self.initialize_ui().await?;
        self.run_ui_loop().await?;

        info!("UI manager stopped");
        Ok(())
    }

    /// Initialize UI state from the current store contents
    async fn initialize_ui(&mut self) -> Result<()> {
        info!("Initializing UI components");

        let snapshot = self.store.snapshot().await;
        self.app_state.apply_snapshot(snapshot);

        info!(
            "UI initialized with {} symbols",
            self.app_state.watchlist.len()
        );

        let message = "Interactive mode ready. Press '/' for commands.";
        self.app_state.push_log(message);
        self.render_state.info_message = Some(message.to_string());
        self.render_state.should_redraw = true;

        Ok(())
    }

    /// Main UI rendering loop
    async fn run_ui_loop(&mut self) -> Result<()> {
        info!("Starting UI rendering loop");

        let ui_shutdown_tx = self.ui_event_tx.clone();
        let session_shutdown_tx = self.session_event_tx.clone();

        tokio::spawn(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!("Failed to listen for Ctrl+C: {}", e);
                return;
            }

            tracing::info!("Ctrl+C received, initiating shutdown");
            let _ = ui_shutdown_tx.send(SessionEvent::ShutdownRequested);
            let _ = session_shutdown_tx.send(SessionEvent::ShutdownRequested);
        });

        self.tui =
            Some(Tui::new().map_err(|e| anyhow::anyhow!("Failed to initialise terminal: {}", e))?);
        self.render_state.should_redraw = true;
        self.last_render = Instant::now()
            .checked_sub(self.refresh_interval)
            .unwrap_or_else(Instant::now);

        while !self.render_state.should_quit && !self.app_state.should_quit {
            // Process async events from the session layer and the store
            self.process_events().await?;

            // Handle terminal input (non-blocking)
            self.poll_terminal_events()?;

            // Render on dirty state or cadence tick
            let now = Instant::now();
            if self.render_state.should_redraw
                || now.duration_since(self.last_render) >= self.refresh_interval
            {
                self.app_state
                    .update_health(self.health.read().await.clone());

                if let Some(tui) = self.tui.as_mut() {
                    self.render_state.render_count += 1;
                    tui.draw(&self.app_state, &self.render_state, &self.session_stats)
                        .map_err(|e| anyhow::anyhow!("Failed to render frame: {}", e))?;
                }
                self.render_state.should_redraw = false;
                self.last_render = now;
            }

            // Prevent busy loop
            tokio::time::sleep(Duration::from_millis(16)).await;
        }

        if let Some(tui) = self.tui.as_mut() {
            tui.restore()
                .map_err(|e| anyhow::anyhow!("Failed to restore terminal state: {}", e))?;
        }

        Ok(())
    }

    /// Poll for keyboard/terminal events and translate into session actions
    fn poll_terminal_events(&mut self) -> Result<()> {
        while event::poll(Duration::from_millis(0))? {
            match event::read()? {
                Event::Key(key_event) => {
                    let action = handle_key_event(&mut self.app_state, key_event);
                    self.render_state.should_redraw = true;

                    match action {
                        UiAction::None => {}
                        UiAction::QuitRequested => {
                            self.render_state.should_quit = true;
                            let _ = self.session_event_tx.send(SessionEvent::ShutdownRequested);
                        }
                        UiAction::SubmitCommand(cmd) => {
                            if let Err(e) = self.process_user_command(&cmd) {
                                let message = format!("Command error: {}", e);
                                self.render_state.error_message = Some(message.clone());
                                self.app_state.push_log(message);
                            }
                        }
                    }
                }
                Event::Resize(_, _) => {
                    self.render_state.should_redraw = true;
                }
                _ => {}
            }
        }

        if self.app_state.should_quit {
            self.render_state.should_quit = true;
        }

        Ok(())
    }

    /// Process incoming session events and store change notifications
    async fn process_events(&mut self) -> Result<()> {
        // Process session events
        let mut events_to_process = Vec::new();
        if let Some(event_rx) = &mut self.event_rx {
            while let Ok(event) = event_rx.try_recv() {
                events_to_process.push(event);
            }
        }

        for event in events_to_process {
            self.handle_event(event)?;
        }

        self.sync_store_state().await;

        Ok(())
    }

    /// Drain store change notifications and mirror the latest snapshot.
    /// While paused, changes are remembered and applied on resume.
    async fn sync_store_state(&mut self) {
        let mut store_dirty = false;

        loop {
            match self.store_rx.try_recv() {
                Ok(change) => {
                    debug!("Store changed: {:?}", change.keys);
                    store_dirty = true;
                }
                Err(broadcast::error::TryRecvError::Lagged(skipped)) => {
                    debug!("UI lagged behind {} store notifications", skipped);
                    store_dirty = true;
                }
                Err(broadcast::error::TryRecvError::Empty)
                | Err(broadcast::error::TryRecvError::Closed) => break,
            }
        }

        if store_dirty && self.app_state.paused {
            self.missed_store_update = true;
            return;
        }

        if !self.app_state.paused && (store_dirty || self.missed_store_update) {
            let snapshot = self.store.snapshot().await;
            self.app_state.apply_snapshot(snapshot);
            self.missed_store_update = false;
            self.render_state.should_redraw = true;
        }
    }

    /// Process user command from input
    fn process_user_command(&mut self, input: &str) -> Result<()> {
        debug!("Processing user command: {}", input);

        let command_router = CommandRouter::new();
        let default_symbol = self.app_state.current_symbol().map(|s| s.as_str());
        let command_result =
            command_router.parse_interactive_command_with_default(input, default_symbol);

        match command_result {
            Ok(Some(InteractiveCommand::Quit)) => {
                info!("User requested quit");
                self.render_state.should_quit = true;
                self.session_event_tx
                    .send(SessionEvent::ShutdownRequested)
                    .map_err(|e| anyhow::anyhow!("Failed to send shutdown request: {}", e))?;
                self.app_state.push_log("Shutdown requested via command");
            }
            Ok(Some(command)) => {
                self.session_event_tx
                    .send(SessionEvent::UserCommand { command })
                    .map_err(|e| anyhow::anyhow!("Failed to send user command: {}", e))?;
            }
            Ok(None) => {
                debug!("Empty command input");
            }
            Err(e) => {
                let message = format!("Command error: {}", e);
                self.render_state.error_message = Some(message.clone());
                self.app_state.push_log(message);
                error!("Command parsing error: {}", e);
            }
        }

        Ok(())
    }

    /// Handle session event
    fn handle_event(&mut self, event: SessionEvent) -> Result<()> {
        debug!("Handling UI event: {:?}", event);
        self.render_state.should_redraw = true;

        match event {
            SessionEvent::ShutdownRequested => {
                self.render_state.should_quit = true;
                self.app_state
                    .push_log("Shutdown requested by session manager");
                info!("UI received shutdown request");
            }
            SessionEvent::Error { message } => {
                let formatted = format!("Error: {}", message);
                self.render_state.error_message = Some(formatted.clone());
                self.app_state.push_log(formatted);
            }
            SessionEvent::Info { message } => {
                self.render_state.info_message = Some(message.clone());
                self.app_state.push_log(message);
            }
            SessionEvent::StatusInfo { info } => {
                let message = format!(
                    "Status → v{} | {} | {} symbols | price {} ok / {} err | trend {} ok / {} err | up {}s",
                    info.version,
                    info.state,
                    info.watchlist.len(),
                    info.poller_health.price_cycles - info.poller_health.price_failures,
                    info.poller_health.price_failures,
                    info.poller_health.trend_cycles,
                    info.poller_health.trend_failures,
                    info.session_stats.uptime_seconds(),
                );
                self.render_state.info_message = Some(message.clone());
                self.session_stats = info.session_stats.clone();
                self.app_state.push_log(message);
            }
            SessionEvent::LogsInfo { mut info } => {
                let message = format!(
                    "{} recent log lines (level {}, file {})",
                    info.recent_logs.len(),
                    info.log_level,
                    info.log_file_path
                );
                self.render_state.info_message = Some(message.clone());
                self.app_state.push_log(message);
                for log in info.recent_logs.drain(..) {
                    self.app_state.push_log(log);
                }
            }
            SessionEvent::HelpInfo { lines } => {
                for line in lines {
                    self.app_state.push_log(format!("[help] {}", line));
                }
            }
            SessionEvent::UserCommand { .. } => {
                debug!("Ignoring user command event on the UI channel");
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::poller::new_shared_health;
    use crate::store::StoreWrite;

    fn test_ui_manager() -> (UIManager, mpsc::UnboundedReceiver<SessionEvent>) {
        let store = Arc::new(SnapshotStore::in_memory());
        let (session_tx, session_rx) = mpsc::unbounded_channel();
        let manager = UIManager::new(store, new_shared_health(), session_tx, Config::default());
        (manager, session_rx)
    }

    #[tokio::test]
    async fn test_info_event_updates_render_state() {
        let (mut manager, _session_rx) = test_ui_manager();

        manager
            .handle_event(SessionEvent::Info {
                message: "Added BTC".to_string(),
            })
            .unwrap();

        assert_eq!(manager.render_state.info_message.as_deref(), Some("Added BTC"));
        assert!(
            manager
                .app_state
                .log_messages
                .iter()
                .any(|line| line == "Added BTC")
        );
    }

    #[tokio::test]
    async fn test_store_changes_reach_the_display() {
        let (mut manager, _session_rx) = test_ui_manager();

        manager
            .store
            .commit(
                StoreWrite::new().prices(
                    [("BTC".to_string(), "50000".to_string())]
                        .into_iter()
                        .collect(),
                ),
            )
            .await;

        manager.sync_store_state().await;
        assert_eq!(manager.app_state.price("BTC"), Some("50000"));
    }

    #[tokio::test]
    async fn test_pause_defers_snapshot_until_resume() {
        let (mut manager, _session_rx) = test_ui_manager();
        manager.app_state.paused = true;

        manager
            .store
            .commit(
                StoreWrite::new().prices(
                    [("ETH".to_string(), "2000".to_string())]
                        .into_iter()
                        .collect(),
                ),
            )
            .await;

        manager.sync_store_state().await;
        assert_eq!(manager.app_state.price("ETH"), None);
        assert!(manager.missed_store_update);

        manager.app_state.paused = false;
        manager.sync_store_state().await;
        assert_eq!(manager.app_state.price("ETH"), Some("2000"));
        assert!(!manager.missed_store_update);
    }

    #[tokio::test]
    async fn test_quit_command_requests_shutdown() {
        let (mut manager, mut session_rx) = test_ui_manager();

        manager.process_user_command("/quit").unwrap();

        assert!(manager.render_state.should_quit);
        assert!(matches!(
            session_rx.recv().await,
            Some(SessionEvent::ShutdownRequested)
        ));
    }
}
