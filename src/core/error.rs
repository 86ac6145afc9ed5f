use thiserror::Error;

use crate::download::error::DownloadError;

/// Centralized error types for the application
///
/// Storage, network and extractor failures are converted to this enum so that
/// handlers can log them uniformly and reply with one generic message.
///
/// # Example
///
/// ```no_run
/// use mediagrab::core::error::AppError;
///
/// fn handle_error(err: AppError) {
///     eprintln!("Error: {}", err);
/// }
/// ```
#[derive(Error, Debug)]
pub enum AppError {
    /// IO errors (record files, downloaded artifacts)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Record (de)serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Telegram API errors
    #[error("Telegram error: {0}")]
    Telegram(#[from] teloxide::RequestError),

    /// HTTP/Fetch errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Download/yt-dlp errors
    #[error("Download error: {0}")]
    Download(#[from] DownloadError),

    /// Validation errors
    #[error("Validation error: {0}")]
    Validation(String),
}

/// Type alias for Result with AppError
pub type AppResult<T> = Result<T, AppError>;
