//! Command Router for interactive command processing

use anyhow::Result;

/// Interactive commands for the terminal session
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InteractiveCommand {
    /// Add symbols to the watch-list
    Add { symbols: Vec<String> },
    /// Remove symbols from the watch-list
    Remove { symbols: Vec<String> },
    /// List the current watch-list
    List,
    /// Show session status and poller statistics
    Status,
    /// Show recent logs
    Logs,
    /// Show interactive command help
    Help,
    /// Quit the application
    Quit,
}

/// Command router for parsing interactive input
pub struct CommandRouter;

impl CommandRouter {
    /// Create a new CommandRouter
    pub fn new() -> Self {
        Self
    }

    /// Parse interactive command from string input
    pub fn parse_interactive_command(&self, input: &str) -> Result<Option<InteractiveCommand>> {
        self.parse_interactive_command_with_default(input, None)
    }

    /// Parse interactive command, substituting the currently selected symbol
    /// when a command that accepts symbols is given none
    pub fn parse_interactive_command_with_default(
        &self,
        input: &str,
        default_symbol: Option<&str>,
    ) -> Result<Option<InteractiveCommand>> {
        let input = input.trim();

        if input.is_empty() {
            return Ok(None);
        }

        let parts: Vec<&str> = input.split_whitespace().collect();

        match parts[0] {
            "/add" => {
                if parts.len() < 2 {
                    return Err(anyhow::anyhow!("Usage: /add <symbol1> [symbol2] ..."));
                }
                let symbols = parts[1..].iter().map(|s| s.to_string()).collect();
                Ok(Some(InteractiveCommand::Add { symbols }))
            }
            "/remove" | "/rm" => {
                if parts.len() < 2 {
                    return match default_symbol {
                        Some(symbol) => Ok(Some(InteractiveCommand::Remove {
                            symbols: vec![symbol.to_string()],
                        })),
                        None => Err(anyhow::anyhow!("Usage: /remove <symbol1> [symbol2] ...")),
                    };
                }
                let symbols = parts[1..].iter().map(|s| s.to_string()).collect();
                Ok(Some(InteractiveCommand::Remove { symbols }))
            }
            "/list" | "/ls" => Ok(Some(InteractiveCommand::List)),
            "/status" => Ok(Some(InteractiveCommand::Status)),
            "/logs" => Ok(Some(InteractiveCommand::Logs)),
            "/help" | "?" => Ok(Some(InteractiveCommand::Help)),
            "/quit" | "/exit" | "/q" => Ok(Some(InteractiveCommand::Quit)),
            _ => Err(anyhow::anyhow!(
                "Unknown command: {}. Type /help for available commands.",
                parts[0]
            )),
        }
    }

    /// Interactive command help lines shared by the TUI log panel and stdout
    pub fn help_messages() -> &'static [&'static str] {
        &[
            "/add <symbol1> [symbol2] ...    - Add symbols to the watch-list",
            "/remove [symbol1] ...           - Remove symbols (defaults to the selected row)",
            "/list                           - Show the current watch-list",
            "/status                         - Show session statistics",
            "/logs                           - Show recent log entries",
            "/help                           - Show this help",
            "/quit                           - Exit the application",
        ]
    }
}

impl Default for CommandRouter {
    fn default() -> Self {
        Self::new()
    }
}
