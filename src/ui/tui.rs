//! Terminal User Interface implementation
//!
//! Renders the watch-list table, the hourly trend sparkline for the selected
//! symbol, its 24h statistics, recent messages, and a command palette. Key
//! handling translates keystrokes into [`UiAction`]s for the session loop.

use std::io::{Stdout, stdout};

use crossterm::{
    cursor,
    event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{
    Frame, Terminal,
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Cell, List, ListItem, Paragraph, Row, Sparkline, Table},
};

use super::{AppState, InputMode, format};
use crate::AppResult;
use crate::session::session_manager::SessionStats;
use crate::ui::ui_manager::RenderState;

/// Actions generated from key handling
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UiAction {
    None,
    SubmitCommand(String),
    QuitRequested,
}

/// RAII helper controlling the terminal lifecycle
pub struct Tui {
    terminal: Terminal<CrosstermBackend<Stdout>>,
}

impl Tui {
    /// Create a new TUI terminal instance
    pub fn new() -> AppResult<Self> {
        enable_raw_mode()?;
        let mut stdout = stdout();
        execute!(stdout, EnterAlternateScreen, cursor::Hide)?;
        let backend = CrosstermBackend::new(stdout);
        let terminal = Terminal::new(backend)?;

        Ok(Self { terminal })
    }

    /// Render one full frame from the current application state
    pub fn draw(
        &mut self,
        app: &AppState,
        render_state: &RenderState,
        session_stats: &SessionStats,
    ) -> AppResult<()> {
        self.terminal
            .draw(|frame| render_root(frame, app, render_state, session_stats))?;
        Ok(())
    }

    /// Restore the terminal to its original state
    pub fn restore(&mut self) -> AppResult<()> {
        disable_raw_mode()?;
        execute!(
            self.terminal.backend_mut(),
            LeaveAlternateScreen,
            cursor::Show
        )?;
        Ok(())
    }
}

impl Drop for Tui {
    fn drop(&mut self) {
        // Attempt to restore the terminal; ignore errors because we are in Drop
        let _ = self.restore();
    }
}

/// Translate a key event into state changes and an optional action
pub fn handle_key_event(app: &mut AppState, key: KeyEvent) -> UiAction {
    // Windows terminals emit release events as well
    if key.kind == KeyEventKind::Release {
        return UiAction::None;
    }

    if key.modifiers.contains(KeyModifiers::CONTROL) {
        match key.code {
            KeyCode::Char('c') | KeyCode::Char('d') => return UiAction::QuitRequested,
            KeyCode::Char('p') => {
                app.toggle_pause();
                return UiAction::None;
            }
            _ => {}
        }
    }

    match app.input_mode {
        InputMode::Normal => handle_normal_mode_keys(app, key),
        InputMode::Command => handle_command_mode_keys(app, key),
    }
}

fn handle_normal_mode_keys(app: &mut AppState, key: KeyEvent) -> UiAction {
    match key.code {
        KeyCode::Char('q') | KeyCode::Esc => return UiAction::QuitRequested,
        KeyCode::Char('/') | KeyCode::Char(':') => {
            app.input_mode = InputMode::Command;
            app.command_buffer.clear();
            app.command_buffer.push('/');
        }
        KeyCode::Char('p') | KeyCode::Char(' ') => app.toggle_pause(),
        KeyCode::Left | KeyCode::Char('h') | KeyCode::BackTab => app.previous_tab(),
        KeyCode::Right | KeyCode::Char('l') | KeyCode::Tab => app.next_tab(),
        KeyCode::Char('a') => prefill_command(app, "/add "),
        KeyCode::Char('r') => prefill_command(app, "/remove "),
        KeyCode::Char('s') => prefill_command(app, "/status"),
        KeyCode::Char('L') => prefill_command(app, "/logs"),
        _ => {}
    }
    UiAction::None
}

fn handle_command_mode_keys(app: &mut AppState, key: KeyEvent) -> UiAction {
    match key.code {
        KeyCode::Esc => app.clear_command(),
        KeyCode::Enter => {
            let command = app.command_buffer.trim().to_string();
            app.clear_command();
            if !command.is_empty() {
                return UiAction::SubmitCommand(command);
            }
        }
        KeyCode::Backspace => {
            app.command_buffer.pop();
            if app.command_buffer.is_empty() {
                app.input_mode = InputMode::Normal;
            }
        }
        KeyCode::Char(c) => app.command_buffer.push(c),
        _ => {}
    }
    UiAction::None
}

fn prefill_command(app: &mut AppState, text: &str) {
    app.input_mode = InputMode::Command;
    app.command_buffer.clear();
    app.command_buffer.push_str(text);
}

fn render_root(frame: &mut Frame, app: &AppState, render_state: &RenderState, stats: &SessionStats) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(10),
            Constraint::Length(7),
            Constraint::Length(3),
        ])
        .split(frame.size());

    render_header(frame, chunks[0], app, stats);

    let body = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(55), Constraint::Percentage(45)])
        .split(chunks[1]);

    render_watchlist_table(frame, body[0], app);

    let right = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(6), Constraint::Length(7)])
        .split(body[1]);

    render_trend_sparkline(frame, right[0], app);
    render_day_stats(frame, right[1], app);

    render_logs(frame, chunks[2], app, render_state);
    render_command_palette(frame, chunks[3], app);
}

fn render_header(frame: &mut Frame, area: Rect, app: &AppState, stats: &SessionStats) {
    let (status_text, status_style) = if app.paused {
        ("PAUSED", Style::default().fg(Color::Yellow))
    } else {
        ("LIVE", Style::default().fg(Color::Green))
    };
    let last_refresh = app
        .last_refresh
        .map(|t| t.format("%H:%M:%S").to_string())
        .unwrap_or_else(|| "--:--:--".to_string());

    let line = Line::from(vec![
        Span::styled(
            "Tickerbar",
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        ),
        Span::raw(format!("  {} symbols", app.watchlist.len())),
        Span::raw(format!(
            "  price {}/{} err",
            app.health.price_cycles, app.health.price_failures
        )),
        Span::raw(format!(
            "  trend {}/{} err",
            app.health.trend_cycles, app.health.trend_failures
        )),
        Span::raw(format!(
            "  cmds {} evts {}",
            stats.commands_processed, stats.events_processed
        )),
        Span::raw(format!("  updated {last_refresh}  ")),
        Span::styled(status_text, status_style.add_modifier(Modifier::BOLD)),
    ]);

    let header =
        Paragraph::new(line).block(Block::default().borders(Borders::ALL).title(" Session "));
    frame.render_widget(header, area);
}

fn render_watchlist_table(frame: &mut Frame, area: Rect, app: &AppState) {
    let block = Block::default().borders(Borders::ALL).title(" Watch-list ");

    if app.watchlist.is_empty() {
        let placeholder = Paragraph::new("Watch-list is empty. Type /add <symbol> to begin.")
            .block(block)
            .style(Style::default().fg(Color::DarkGray));
        frame.render_widget(placeholder, area);
        return;
    }

    let header = Row::new(vec!["Symbol", "Price", "24h %", "High", "Low", "Volume"])
        .style(Style::default().add_modifier(Modifier::BOLD));

    let rows: Vec<Row> = app
        .watchlist
        .iter()
        .enumerate()
        .map(|(idx, symbol)| {
            let stats = app.symbol_stats(symbol);
            let change_raw = stats.and_then(|s| s.price_change_percent.as_deref());
            let change_style = match change_raw.and_then(|c| c.trim().parse::<f64>().ok()) {
                Some(v) if v > 0.0 => Style::default().fg(Color::Green),
                Some(v) if v < 0.0 => Style::default().fg(Color::Red),
                _ => Style::default(),
            };

            let row = Row::new(vec![
                Cell::from(symbol.clone()),
                Cell::from(format::format_price(app.price(symbol))),
                Cell::from(format::format_change(change_raw)).style(change_style),
                Cell::from(format::format_price(
                    stats.and_then(|s| s.high_price.as_deref()),
                )),
                Cell::from(format::format_price(
                    stats.and_then(|s| s.low_price.as_deref()),
                )),
                Cell::from(format::format_volume(
                    stats.and_then(|s| s.quote_volume.as_deref()),
                )),
            ]);

            if idx == app.selected_tab {
                row.style(
                    Style::default()
                        .bg(Color::Blue)
                        .fg(Color::White)
                        .add_modifier(Modifier::BOLD),
                )
            } else {
                row
            }
        })
        .collect();

    let widths = [
        Constraint::Length(8),
        Constraint::Length(14),
        Constraint::Length(9),
        Constraint::Length(14),
        Constraint::Length(14),
        Constraint::Length(10),
    ];

    let table = Table::new(rows, widths)
        .header(header)
        .block(block)
        .column_spacing(1);
    frame.render_widget(table, area);
}

fn render_trend_sparkline(frame: &mut Frame, area: Rect, app: &AppState) {
    let title = match app.current_symbol() {
        Some(symbol) => format!(" {symbol} hourly trend "),
        None => " Trend ".to_string(),
    };
    let block = Block::default().borders(Borders::ALL).title(title);

    let series = app
        .current_symbol()
        .map(|symbol| app.trend(symbol))
        .unwrap_or(&[]);

    if series.len() < 2 {
        let placeholder = Paragraph::new("Collecting trend data...")
            .block(block)
            .style(Style::default().fg(Color::DarkGray));
        frame.render_widget(placeholder, area);
        return;
    }

    let scaled = scale_series(series);
    let sparkline = Sparkline::default()
        .block(block)
        .data(&scaled)
        .style(Style::default().fg(Color::LightCyan));
    frame.render_widget(sparkline, area);
}

/// Normalize a close series into sparkline bucket heights. The widget scales
/// bars against the data maximum, so raw prices hovering far above zero would
/// all render at full height. A constant series maps to zero height.
fn scale_series(series: &[f64]) -> Vec<u64> {
    let min = series.iter().copied().fold(f64::INFINITY, f64::min);
    let max = series.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let range = if max > min { max - min } else { 1.0 };
    series
        .iter()
        .map(|v| (((v - min) / range) * 100.0).round() as u64)
        .collect()
}

fn render_day_stats(frame: &mut Frame, area: Rect, app: &AppState) {
    let block = Block::default()
        .borders(Borders::ALL)
        .title(" 24h Statistics ");

    let Some(symbol) = app.current_symbol() else {
        let placeholder = Paragraph::new("No symbol selected")
            .block(block)
            .style(Style::default().fg(Color::DarkGray));
        frame.render_widget(placeholder, area);
        return;
    };

    let stats = app.symbol_stats(symbol);
    let lines = vec![
        Line::from(vec![
            Span::raw("Last       "),
            Span::styled(
                format::format_price(app.price(symbol)),
                Style::default().add_modifier(Modifier::BOLD),
            ),
        ]),
        Line::from(format!(
            "High       {}",
            format::format_price(stats.and_then(|s| s.high_price.as_deref()))
        )),
        Line::from(format!(
            "Low        {}",
            format::format_price(stats.and_then(|s| s.low_price.as_deref()))
        )),
        Line::from(format!(
            "Volume     {}",
            format::format_volume(stats.and_then(|s| s.volume.as_deref()))
        )),
        Line::from(format!(
            "Quote vol  {}",
            format::format_volume(stats.and_then(|s| s.quote_volume.as_deref()))
        )),
    ];

    let paragraph = Paragraph::new(lines).block(block);
    frame.render_widget(paragraph, area);
}

fn render_logs(frame: &mut Frame, area: Rect, app: &AppState, render_state: &RenderState) {
    let mut items: Vec<ListItem> = Vec::new();

    if let Some(error) = &render_state.error_message {
        items.push(ListItem::new(format!("✗ {error}")).style(Style::default().fg(Color::Red)));
    }
    if let Some(info) = &render_state.info_message {
        items.push(ListItem::new(format!("• {info}")).style(Style::default().fg(Color::LightBlue)));
    }

    let remaining = 5usize.saturating_sub(items.len());
    for message in app.log_messages.iter().rev().take(remaining) {
        items.push(ListItem::new(message.clone()).style(Style::default().fg(Color::Gray)));
    }

    if items.is_empty() {
        items.push(ListItem::new("No messages yet").style(Style::default().fg(Color::DarkGray)));
    }

    let list = List::new(items).block(Block::default().borders(Borders::ALL).title(" Logs "));
    frame.render_widget(list, area);
}

fn render_command_palette(frame: &mut Frame, area: Rect, app: &AppState) {
    let block = Block::default().borders(Borders::ALL).title(" Command ");

    let content = match app.input_mode {
        InputMode::Command => Line::from(vec![
            Span::styled("> ", Style::default().fg(Color::Cyan)),
            Span::raw(app.command_buffer.clone()),
            Span::styled("_", Style::default().add_modifier(Modifier::SLOW_BLINK)),
        ]),
        InputMode::Normal => {
            let key_style = Style::default().fg(Color::Cyan);
            Line::from(vec![
                Span::styled("/", key_style),
                Span::raw(" command  "),
                Span::styled("a", key_style),
                Span::raw(" add  "),
                Span::styled("r", key_style),
                Span::raw(" remove  "),
                Span::styled("Tab", key_style),
                Span::raw(" next  "),
                Span::styled("p", key_style),
                Span::raw(" pause  "),
                Span::styled("s", key_style),
                Span::raw(" status  "),
                Span::styled("q", key_style),
                Span::raw(" quit"),
            ])
        }
    };

    let paragraph = Paragraph::new(content).block(block);
    frame.render_widget(paragraph, area);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    #[test]
    fn test_quit_keys() {
        let mut app = AppState::new();
        assert_eq!(
            handle_key_event(&mut app, key(KeyCode::Char('q'))),
            UiAction::QuitRequested
        );

        let mut app = AppState::new();
        let ctrl_c = KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL);
        assert_eq!(handle_key_event(&mut app, ctrl_c), UiAction::QuitRequested);
    }

    #[test]
    fn test_command_mode_entry_and_submit() {
        let mut app = AppState::new();
        handle_key_event(&mut app, key(KeyCode::Char('/')));
        assert_eq!(app.input_mode, InputMode::Command);
        assert_eq!(app.command_buffer, "/");

        for c in "add btc".chars() {
            handle_key_event(&mut app, key(KeyCode::Char(c)));
        }
        let action = handle_key_event(&mut app, key(KeyCode::Enter));
        assert_eq!(action, UiAction::SubmitCommand("/add btc".to_string()));
        assert_eq!(app.input_mode, InputMode::Normal);
        assert!(app.command_buffer.is_empty());
    }

    #[test]
    fn test_prefill_shortcuts() {
        let mut app = AppState::new();
        handle_key_event(&mut app, key(KeyCode::Char('a')));
        assert_eq!(app.input_mode, InputMode::Command);
        assert_eq!(app.command_buffer, "/add ");

        app.clear_command();
        handle_key_event(&mut app, key(KeyCode::Char('s')));
        assert_eq!(app.command_buffer, "/status");
    }

    #[test]
    fn test_backspace_leaves_empty_command_mode() {
        let mut app = AppState::new();
        handle_key_event(&mut app, key(KeyCode::Char('/')));
        handle_key_event(&mut app, key(KeyCode::Backspace));
        assert_eq!(app.input_mode, InputMode::Normal);
    }

    #[test]
    fn test_escape_cancels_command() {
        let mut app = AppState::new();
        handle_key_event(&mut app, key(KeyCode::Char('/')));
        handle_key_event(&mut app, key(KeyCode::Char('x')));
        let action = handle_key_event(&mut app, key(KeyCode::Esc));
        assert_eq!(action, UiAction::None);
        assert_eq!(app.input_mode, InputMode::Normal);
        assert!(app.command_buffer.is_empty());
    }

    #[test]
    fn test_space_toggles_pause() {
        let mut app = AppState::new();
        handle_key_event(&mut app, key(KeyCode::Char(' ')));
        assert!(app.paused);
        handle_key_event(&mut app, key(KeyCode::Char(' ')));
        assert!(!app.paused);
    }

    #[test]
    fn test_scale_series_normalizes_range() {
        let scaled = scale_series(&[100.0, 150.0, 200.0]);
        assert_eq!(scaled, vec![0, 50, 100]);
    }

    #[test]
    fn test_scale_series_flat_input() {
        let scaled = scale_series(&[42.0, 42.0, 42.0]);
        assert_eq!(scaled, vec![0, 0, 0]);
    }
}
