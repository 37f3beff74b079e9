use std::sync::Arc;

use tickerbar::cli::{Cli, Commands};
use tickerbar::config::Config;
use tickerbar::session::SessionManager;
use tickerbar::store::SnapshotStore;
use tickerbar::ui::cli as output;
use tickerbar::watchlist::WatchlistEditor;
use tickerbar::{AppResult, init_logging};

#[tokio::main]
async fn main() -> AppResult<()> {
    let cli = Cli::parse_args();
    let command = cli.command();

    // Watch sessions own the terminal, so console logging stays off there
    // and is opt-in via --verbose for the one-shot commands.
    let console = !matches!(command, Commands::Watch { .. }) && cli.verbose;

    let config = Config::load_or_default(&cli.config_file);
    let _guard = init_logging(&cli.effective_log_level(), &config.log.file_path, console)?;

    tracing::info!("Tickerbar starting...");
    tracing::debug!("CLI arguments: {:?}", cli);

    output::set_color_mode(config.ui.enable_colors);

    match command {
        Commands::Watch { simple } => run_watch(&cli, config, !simple).await,
        Commands::Add { symbols } => run_add(&config, &symbols).await,
        Commands::Remove { symbols } => run_remove(&config, &symbols).await,
        Commands::List => run_list(&config).await,
        Commands::Config { action } => {
            Config::handle_command(&action, &cli.config_file)?;
            Ok(())
        }
    }
}

async fn run_watch(cli: &Cli, config: Config, tui_enabled: bool) -> AppResult<()> {
    let mut session = SessionManager::new(cli, config, tui_enabled).await?;
    session.initialize().await?;
    session.run().await?;
    Ok(())
}

async fn run_add(config: &Config, symbols: &[String]) -> AppResult<()> {
    let store = Arc::new(SnapshotStore::open(&config.store.file_path).await);
    let editor = WatchlistEditor::new(store);

    for symbol in symbols {
        match editor.add(symbol).await {
            Ok(added) => output::print_added(&added),
            Err(err) => output::print_add_error(symbol, &err),
        }
    }
    Ok(())
}

async fn run_remove(config: &Config, symbols: &[String]) -> AppResult<()> {
    let store = Arc::new(SnapshotStore::open(&config.store.file_path).await);
    let editor = WatchlistEditor::new(store);

    for symbol in symbols {
        match editor.remove(symbol).await {
            Ok(true) => output::print_removed(&symbol.trim().to_uppercase()),
            Ok(false) => output::print_remove_missing(&symbol.trim().to_uppercase()),
            Err(err) => output::print_remove_error(symbol, &err),
        }
    }
    Ok(())
}

async fn run_list(config: &Config) -> AppResult<()> {
    let store = SnapshotStore::open(&config.store.file_path).await;
    let snapshot = store.snapshot().await;
    output::print_watchlist(&snapshot);
    Ok(())
}
