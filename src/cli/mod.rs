//! Command Line Interface module
//!
//! Implements the CLI commands and argument parsing for tickerbar.

use clap::{Parser, Subcommand};

#[derive(Parser, Debug, Clone)]
#[command(name = "tickerbar")]
#[command(about = "Tickerbar Watch-list Ticker")]
#[command(long_about = "A live cryptocurrency watch-list ticker for the terminal")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Configuration file path
    #[arg(long, default_value = "config.toml")]
    pub config_file: String,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    pub log_level: String,

    /// Enable verbose output
    #[arg(short, long)]
    pub verbose: bool,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Start the interactive watch session (default)
    Watch {
        /// Use simple CLI output instead of full TUI
        #[arg(long)]
        simple: bool,
    },

    /// Add symbols to the watch-list
    Add {
        /// Symbols to add (e.g. BTC ETH SOL)
        #[arg(required = true)]
        symbols: Vec<String>,
    },

    /// Remove symbols from the watch-list
    Remove {
        /// Symbols to remove
        #[arg(required = true)]
        symbols: Vec<String>,
    },

    /// Show the watch-list with the latest stored data
    List,

    /// Configuration management
    Config {
        #[command(subcommand)]
        action: Option<ConfigAction>,
    },
}

impl Default for Commands {
    fn default() -> Self {
        Commands::Watch { simple: false }
    }
}

#[derive(Subcommand, Debug, Clone)]
pub enum ConfigAction {
    /// Show current configuration
    Show,

    /// Reset configuration to defaults
    Reset,
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Get the actual command, using default if none provided
    pub fn command(&self) -> Commands {
        self.command.clone().unwrap_or_default()
    }

    /// Adjust log level based on verbose flag
    pub fn effective_log_level(&self) -> String {
        if self.verbose {
            "debug".to_string()
        } else {
            self.log_level.clone()
        }
    }
}
