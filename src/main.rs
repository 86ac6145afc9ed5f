use anyhow::Result;
use dotenvy::dotenv;
use std::sync::Arc;
use teloxide::prelude::*;
use teloxide::update_listeners::Polling;

use mediagrab::cli::{Cli, Commands};
use mediagrab::core::admin::render_stats;
use mediagrab::core::moderation::is_explicit_title;
use mediagrab::core::{config, init_logger, log_startup_configuration, BotState};
use mediagrab::download::{DownloadOrchestrator, FullSongSearch, MediaExtractor, YtDlpExtractor};
use mediagrab::storage::RecordStore;
use mediagrab::telegram::{create_bot, schema, setup_bot_commands, HandlerDeps};

/// Main entry point for the Telegram bot
///
/// Parses CLI arguments and dispatches to the appropriate subcommand.
///
/// # Errors
/// Returns an error if initialization fails (logging, record files, bot creation).
#[tokio::main]
async fn main() -> Result<()> {
    std::panic::set_hook(Box::new(|panic_info| {
        log::error!("Panic caught: {:?}", panic_info);
        if let Some(location) = panic_info.location() {
            log::error!("Panic location: {}:{}", location.file(), location.line());
        }
    }));

    let _ = dotenv();
    init_logger(&config::LOG_FILE_PATH)?;

    let cli = Cli::parse_args();
    match cli.command {
        Some(Commands::Info { url }) => run_cli_info(&url).await,
        Some(Commands::Stats) => run_cli_stats(),
        Some(Commands::Run) | None => run_bot().await,
    }
}

async fn run_bot() -> Result<()> {
    let started = std::time::Instant::now();
    log_startup_configuration();

    let mut state = BotState::open(&config::DATA_DIR)?;
    let seeded = state.store.seed_admins(&config::admin::ADMIN_IDS)?;
    if seeded > 0 {
        log::info!("Seeded {} bootstrap admin(s) at level 3", seeded);
    }
    let state = state.shared();

    let extractor: Arc<dyn MediaExtractor> = Arc::new(YtDlpExtractor::default());
    let orchestrator = DownloadOrchestrator::new(
        Arc::clone(&state),
        extractor,
        FullSongSearch::default(),
        config::DOWNLOAD_FOLDER.clone(),
    );
    let deps = HandlerDeps::new(state, Arc::new(orchestrator));

    let bot = create_bot()?;
    if let Err(e) = setup_bot_commands(&bot).await {
        log::warn!("Failed to register bot commands: {}", e);
    }

    log::info!("================================================");
    log::info!("🎉 Bot initialization complete in {:.2}s", started.elapsed().as_secs_f64());
    log::info!("📡 Starting long polling");
    log::info!("================================================");

    let listener = Polling::builder(bot.clone()).drop_pending_updates().build();
    Dispatcher::builder(bot, schema(deps))
        .enable_ctrlc_handler()
        .build()
        .dispatch_with_listener(
            listener,
            LoggingErrorHandler::with_custom_text("An error from the update listener"),
        )
        .await;

    log::info!("Dispatcher shutdown gracefully");
    Ok(())
}

/// Probes a URL and prints what the bot would see for it.
async fn run_cli_info(url: &str) -> Result<()> {
    let extractor = YtDlpExtractor::default();
    let metadata = extractor.probe(url).await?;
    let title = metadata.display_title();

    println!("URL:      {}", url);
    println!("Title:    {}", title.unwrap_or("-"));
    println!("Artist:   {}", metadata.artist.as_deref().unwrap_or("-"));
    println!("Explicit: {}", if is_explicit_title(title) { "yes" } else { "no" });
    Ok(())
}

fn run_cli_stats() -> Result<()> {
    let store = RecordStore::open(&config::DATA_DIR)?;
    println!("{}", render_stats(&store));
    Ok(())
}
