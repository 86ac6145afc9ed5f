use std::fmt;

/// Structured error type for download operations.
///
/// Every variant ends the job with the same generic reply to the user; the
/// category only matters for logs.
#[derive(Debug)]
pub enum DownloadError {
    /// yt-dlp specific failures (binary not found, bad exit code, unparsable output)
    YtDlp(String),
    /// Expected file not found after the extractor finished
    FileNotFound(String),
    /// Artifact exceeds the delivery ceiling
    Oversized { size: u64, limit: u64 },
    /// Full-song search failed (HTTP error, no result)
    Search(String),
    /// Failed to send file via Telegram API
    SendFailed(String),
    /// Metadata probe timed out
    Timeout(String),
    /// Filesystem failure around the artifact
    Io(String),
}

impl fmt::Display for DownloadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DownloadError::YtDlp(msg) => write!(f, "{}", msg),
            DownloadError::FileNotFound(msg) => write!(f, "{}", msg),
            DownloadError::Oversized { size, limit } => {
                write!(f, "file is {} bytes, limit is {} bytes", size, limit)
            }
            DownloadError::Search(msg) => write!(f, "{}", msg),
            DownloadError::SendFailed(msg) => write!(f, "{}", msg),
            DownloadError::Timeout(msg) => write!(f, "{}", msg),
            DownloadError::Io(msg) => write!(f, "{}", msg),
        }
    }
}

impl std::error::Error for DownloadError {}

impl DownloadError {
    /// Returns subcategory for logs
    pub fn subcategory(&self) -> &'static str {
        match self {
            DownloadError::YtDlp(_) => "ytdlp",
            DownloadError::FileNotFound(_) => "file_not_found",
            DownloadError::Oversized { .. } => "oversized",
            DownloadError::Search(_) => "search",
            DownloadError::SendFailed(_) => "send_failed",
            DownloadError::Timeout(_) => "timeout",
            DownloadError::Io(_) => "io",
        }
    }
}

impl From<std::io::Error> for DownloadError {
    fn from(e: std::io::Error) -> Self {
        DownloadError::Io(e.to_string())
    }
}
