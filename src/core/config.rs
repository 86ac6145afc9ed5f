use once_cell::sync::Lazy;
use std::env;
use std::path::PathBuf;
use std::time::Duration;

/// Bot token
/// Read from BOT_TOKEN or TELOXIDE_TOKEN environment variable
pub static BOT_TOKEN: Lazy<String> = Lazy::new(|| {
    env::var("BOT_TOKEN")
        .or_else(|_| env::var("TELOXIDE_TOKEN"))
        .unwrap_or_else(|_| String::new())
});

/// Directory holding the JSON record files (admins, bans, warns, ...)
/// Read from DATA_DIR environment variable
/// Default: data
pub static DATA_DIR: Lazy<PathBuf> = Lazy::new(|| {
    let raw = env::var("DATA_DIR").unwrap_or_else(|_| "data".to_string());
    PathBuf::from(shellexpand::tilde(&raw).to_string())
});

/// Download folder path
/// Read from DOWNLOAD_FOLDER environment variable
/// Supports tilde (~) expansion for home directory
/// Default: downloads
pub static DOWNLOAD_FOLDER: Lazy<PathBuf> = Lazy::new(|| {
    let raw = env::var("DOWNLOAD_FOLDER").unwrap_or_else(|_| "downloads".to_string());
    PathBuf::from(shellexpand::tilde(&raw).to_string())
});

/// Cached yt-dlp binary path
/// Read once at startup from YTDL_BIN environment variable or defaults to "yt-dlp"
pub static YTDL_BIN: Lazy<String> = Lazy::new(|| env::var("YTDL_BIN").unwrap_or_else(|_| "yt-dlp".to_string()));

/// Log file path
/// Read from LOG_FILE_PATH environment variable
/// Default: app.log
pub static LOG_FILE_PATH: Lazy<String> =
    Lazy::new(|| env::var("LOG_FILE_PATH").unwrap_or_else(|_| "app.log".to_string()));

/// Base URL of the search page used by the "full song" lookup
/// Read from SEARCH_BASE_URL environment variable
/// Default: https://www.youtube.com
pub static SEARCH_BASE_URL: Lazy<String> = Lazy::new(|| {
    env::var("SEARCH_BASE_URL")
        .ok()
        .map(|v| v.trim().trim_end_matches('/').to_string())
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| "https://www.youtube.com".to_string())
});

/// Moderation policy constants
pub mod moderation {

    /// Warnings that trigger an automatic ban
    pub const WARN_LIMIT: usize = 3;

    /// Length of the automatic ban after reaching the warn limit (days)
    pub const WARN_BAN_DAYS: i64 = 1;

    /// Requests allowed inside the anti-spam window
    pub const ANTI_SPAM_COUNT: usize = 5;

    /// Anti-spam window (seconds)
    pub const ANTI_SPAM_WINDOW_SECS: i64 = 5 * 60;

    /// Ban length for anti-spam violations (days)
    pub const ANTI_SPAM_PUNISH_DAYS: i64 = 1;

    /// Anti-spam window duration
    pub fn anti_spam_window() -> chrono::Duration {
        chrono::Duration::seconds(ANTI_SPAM_WINDOW_SECS)
    }
}

/// Download configuration
pub mod download {
    use super::Duration;

    /// Largest artifact we attempt to deliver (2 GiB)
    pub const MAX_FILE_SIZE: u64 = 2 * 1024 * 1024 * 1024;

    /// Bitrate audio is normalized to
    pub const AUDIO_BITRATE: &str = "192K";

    /// Timeout for the metadata probe (in seconds)
    pub const PROBE_TIMEOUT_SECS: u64 = 120;

    /// Metadata probe timeout duration
    pub fn probe_timeout() -> Duration {
        Duration::from_secs(PROBE_TIMEOUT_SECS)
    }
}

/// Progress message configuration
pub mod progress {
    use super::Duration;

    /// Minimum interval between two edits of the progress message (in milliseconds)
    pub const EDIT_INTERVAL_MS: u64 = 1500;

    /// Progress edit cadence
    pub fn edit_interval() -> Duration {
        Duration::from_millis(EDIT_INTERVAL_MS)
    }
}

/// Audit history configuration
pub mod history {
    /// Number of entries shown by /history
    pub const DISPLAY_LIMIT: usize = 30;
}

/// Network configuration
pub mod network {
    use super::Duration;

    /// Request timeout for HTTP requests (in seconds)
    /// Large uploads go through the Bot API, so this stays generous
    pub const REQUEST_TIMEOUT_SECS: u64 = 900;

    /// Request timeout duration
    pub fn timeout() -> Duration {
        Duration::from_secs(REQUEST_TIMEOUT_SECS)
    }

    /// Timeout for one full-song search page (in seconds)
    pub const SEARCH_TIMEOUT_SECS: u64 = 30;

    pub fn search_timeout() -> Duration {
        Duration::from_secs(SEARCH_TIMEOUT_SECS)
    }
}

/// Admin configuration
pub mod admin {
    use once_cell::sync::Lazy;
    use std::env;

    pub(crate) fn parse_admin_ids(raw: &str) -> Vec<i64> {
        raw.split([',', ' ', '\n', '\t'])
            .filter_map(|part| part.trim().parse::<i64>().ok())
            .collect()
    }

    /// Bootstrap admin user IDs (comma-separated)
    /// Read from ADMIN_IDS environment variable
    /// Every listed id is guaranteed level 3 at startup
    pub static ADMIN_IDS: Lazy<Vec<i64>> = Lazy::new(|| {
        env::var("ADMIN_IDS")
            .ok()
            .map(|raw| parse_admin_ids(&raw))
            .unwrap_or_default()
    });
}
