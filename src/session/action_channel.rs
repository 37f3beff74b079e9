//! Action Channel for asynchronous event processing

use anyhow::Result;
use tokio::sync::mpsc;

use crate::poller::PollerHealth;
use crate::session::command_router::InteractiveCommand;

/// Session events for communication between components
#[derive(Debug, Clone)]
pub enum SessionEvent {
    /// Shutdown request
    ShutdownRequested,
    /// Error event
    Error { message: String },
    /// Informational feedback shown to the user
    Info { message: String },
    /// Status information
    StatusInfo { info: StatusInfo },
    /// Logs information
    LogsInfo { info: LogsInfo },
    /// Interactive command help lines
    HelpInfo { lines: Vec<String> },
    /// User command from interactive input
    UserCommand { command: InteractiveCommand },
}

/// Status information for session
#[derive(Debug, Clone)]
pub struct StatusInfo {
    pub version: String,
    pub state: String,
    pub watchlist: Vec<String>,
    pub poller_health: PollerHealth,
    pub session_stats: super::session_manager::SessionStats,
}

/// Logs information for session
#[derive(Debug, Clone)]
pub struct LogsInfo {
    pub recent_logs: Vec<String>,
    pub log_file_path: String,
    pub log_level: String,
}

/// Action channel for event processing
pub struct ActionChannel {
    /// Event sender
    event_tx: mpsc::UnboundedSender<SessionEvent>,
    /// Event receiver
    event_rx: Option<mpsc::UnboundedReceiver<SessionEvent>>,
}

impl Clone for ActionChannel {
    fn clone(&self) -> Self {
        Self {
            event_tx: self.event_tx.clone(),
            event_rx: None, // Receivers cannot be cloned
        }
    }
}

impl ActionChannel {
    /// Create a new ActionChannel
    pub fn new() -> Self {
        let (event_tx, event_rx) = mpsc::unbounded_channel();

        Self {
            event_tx,
            event_rx: Some(event_rx),
        }
    }

    /// Send event to channel
    pub fn send_event(&self, event: SessionEvent) -> Result<()> {
        self.event_tx
            .send(event)
            .map_err(|e| anyhow::anyhow!("Failed to send event: {}", e))
    }

    /// Get next event from channel
    pub async fn next_event(&mut self) -> Option<SessionEvent> {
        if let Some(event_rx) = &mut self.event_rx {
            event_rx.recv().await
        } else {
            None
        }
    }

    /// Get event sender for external use
    pub fn event_tx(&self) -> mpsc::UnboundedSender<SessionEvent> {
        self.event_tx.clone()
    }

    /// Send error event
    pub fn send_error(&self, message: String) -> Result<()> {
        self.send_event(SessionEvent::Error { message })
    }

    /// Send shutdown request
    pub fn request_shutdown(&self) -> Result<()> {
        self.send_event(SessionEvent::ShutdownRequested)
    }
}

impl Default for ActionChannel {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_events_arrive_in_order() {
        let mut channel = ActionChannel::new();
        channel.send_error("boom".to_string()).unwrap();
        channel.request_shutdown().unwrap();

        match channel.next_event().await {
            Some(SessionEvent::Error { message }) => assert_eq!(message, "boom"),
            other => panic!("unexpected event: {:?}", other),
        }
        assert!(matches!(
            channel.next_event().await,
            Some(SessionEvent::ShutdownRequested)
        ));
    }

    #[tokio::test]
    async fn test_cloned_channel_has_no_receiver() {
        let channel = ActionChannel::new();
        let mut clone = channel.clone();

        clone.send_error("via clone".to_string()).unwrap();
        assert!(clone.next_event().await.is_none());
    }
}
