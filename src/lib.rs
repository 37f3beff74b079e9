//! Tickerbar Watch-list Ticker Library
//!
//! A background synchronization pipeline that keeps a small watch-list of
//! market symbols fresh in a shared snapshot store, plus the terminal
//! surfaces that edit and render it.

pub mod binance;
pub mod cli;
pub mod config;
pub mod poller;
pub mod session;
pub mod store;
pub mod ui;
pub mod watchlist;

use anyhow::Result;
use std::collections::VecDeque;
use std::sync::{Mutex, OnceLock};

/// Application result type for consistent error handling
pub type AppResult<T> = Result<T, Box<dyn std::error::Error + Send + Sync>>;

const LOG_CAPTURE_CAPACITY: usize = 256;

static LOG_CAPTURE: OnceLock<Mutex<VecDeque<String>>> = OnceLock::new();

fn log_buffer() -> &'static Mutex<VecDeque<String>> {
    LOG_CAPTURE.get_or_init(|| Mutex::new(VecDeque::with_capacity(LOG_CAPTURE_CAPACITY)))
}

/// Most recent captured log lines, oldest first.
pub fn recent_logs(limit: usize) -> Vec<String> {
    let buffer = log_buffer().lock().unwrap_or_else(|e| e.into_inner());
    let skip = buffer.len().saturating_sub(limit);
    buffer.iter().skip(skip).cloned().collect()
}

/// Layer that mirrors formatted events into the in-memory ring buffer
/// behind [`recent_logs`].
struct CaptureLayer;

impl<S: tracing::Subscriber> tracing_subscriber::Layer<S> for CaptureLayer {
    fn on_event(
        &self,
        event: &tracing::Event<'_>,
        _ctx: tracing_subscriber::layer::Context<'_, S>,
    ) {
        let mut message = String::new();
        event.record(&mut MessageVisitor(&mut message));
        if message.is_empty() {
            return;
        }

        let line = format!(
            "{} {:>5} {}: {}",
            chrono::Local::now().format("%H:%M:%S"),
            event.metadata().level(),
            event.metadata().target(),
            message
        );

        let mut buffer = log_buffer().lock().unwrap_or_else(|e| e.into_inner());
        if buffer.len() == LOG_CAPTURE_CAPACITY {
            buffer.pop_front();
        }
        buffer.push_back(line);
    }
}

struct MessageVisitor<'a>(&'a mut String);

impl tracing::field::Visit for MessageVisitor<'_> {
    fn record_debug(&mut self, field: &tracing::field::Field, value: &dyn std::fmt::Debug) {
        if field.name() == "message" {
            use std::fmt::Write;
            let _ = write!(self.0, "{:?}", value);
        }
    }
}

/// Initialize tracing: an env-filtered console layer (suppressed while the
/// TUI owns the terminal), a non-blocking file layer, and the in-memory
/// capture feeding [`recent_logs`]. The returned guard must stay alive for
/// the process lifetime or buffered file output is lost.
pub fn init_logging(
    level: &str,
    log_file: &str,
    console: bool,
) -> Result<tracing_appender::non_blocking::WorkerGuard> {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    let path = std::path::Path::new(log_file);
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => std::path::Path::new("."),
    };
    let file_name = path
        .file_name()
        .map(|name| name.to_os_string())
        .unwrap_or_else(|| "tickerbar.log".into());
    std::fs::create_dir_all(dir)?;

    let file_appender = tracing_appender::rolling::never(dir, file_name);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| format!("tickerbar={}", level).into());

    let console_layer = if console {
        Some(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
    } else {
        None
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(console_layer)
        .with(
            tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(non_blocking),
        )
        .with(CaptureLayer)
        .init();

    Ok(guard)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recent_logs_returns_newest_tail() {
        {
            let mut buffer = log_buffer().lock().unwrap();
            buffer.clear();
            for i in 0..10 {
                buffer.push_back(format!("line {}", i));
            }
        }

        let logs = recent_logs(3);
        assert_eq!(logs, vec!["line 7", "line 8", "line 9"]);
    }
}
