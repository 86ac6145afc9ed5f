//! Logging initialization
//!
//! Call sites use the `log` facade; records are bridged into a
//! `tracing-subscriber` registry that writes to the console and to a file.

use anyhow::Result;
use std::sync::Arc;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

/// Initialize logger for both console and file output
///
/// The filter defaults to `info` and can be overridden with `RUST_LOG`.
///
/// # Arguments
/// * `log_file_path` - Path to the log file
///
/// # Returns
/// * `Ok(())` - Logger initialized successfully
/// * `Err(anyhow::Error)` - Failed to create the log file or a logger was already installed
pub fn init_logger(log_file_path: &str) -> Result<()> {
    let log_file =
        fs_err::File::create(log_file_path).map_err(|e| anyhow::anyhow!("Failed to create log file: {}", e))?;
    let log_file = Arc::new(log_file.into_parts().0);

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false))
        .with(fmt::layer().with_ansi(false).with_writer(log_file))
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to initialize logger: {}", e))?;

    Ok(())
}

/// Logs the effective configuration at startup
pub fn log_startup_configuration() {
    use crate::core::config;

    log::info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    log::info!("Data directory: {}", config::DATA_DIR.display());
    log::info!("Download folder: {}", config::DOWNLOAD_FOLDER.display());
    log::info!("Downloader binary: {}", config::YTDL_BIN.as_str());
    log::info!("Search endpoint: {}", config::SEARCH_BASE_URL.as_str());
    if config::admin::ADMIN_IDS.is_empty() {
        log::warn!("ADMIN_IDS not set: only admins already in admins.json can moderate");
    } else {
        log::info!("Bootstrap admins: {:?}", *config::admin::ADMIN_IDS);
    }
    log::info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
}
