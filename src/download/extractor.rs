//! Media extractor abstraction.
//!
//! The orchestrator only knows `probe` and `fetch`; the production backend is
//! [`crate::download::ytdlp::YtDlpExtractor`] and tests plug in their own.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use strum::{Display, EnumIter, EnumString};
use tokio::sync::mpsc;

use crate::core::error::AppError;
use crate::download::progress::ProgressInfo;
use crate::storage::models::MediaKind;

/// Metadata returned by a probe
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MediaMetadata {
    pub title: Option<String>,
    pub artist: Option<String>,
    pub track: Option<String>,
}

impl MediaMetadata {
    pub fn titled(title: impl Into<String>) -> Self {
        Self {
            title: Some(title.into()),
            ..Self::default()
        }
    }

    /// Title used for captions, falling back to the track name
    pub fn display_title(&self) -> Option<&str> {
        self.title
            .as_deref()
            .or(self.track.as_deref())
            .filter(|t| !t.trim().is_empty())
    }
}

/// Closed set of video qualities offered to users
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, EnumIter)]
pub enum VideoQuality {
    #[strum(serialize = "360")]
    P360,
    #[strum(serialize = "720")]
    P720,
    #[strum(serialize = "1080")]
    P1080,
    #[strum(serialize = "best")]
    Best,
}

impl VideoQuality {
    pub fn max_height(self) -> Option<u32> {
        match self {
            VideoQuality::P360 => Some(360),
            VideoQuality::P720 => Some(720),
            VideoQuality::P1080 => Some(1080),
            VideoQuality::Best => None,
        }
    }

    /// yt-dlp `--format` selector
    pub fn format_selector(self) -> String {
        match self.max_height() {
            Some(height) => format!("bestvideo[height<={}]+bestaudio/best/best", height),
            None => "bestvideo+bestaudio/best".to_string(),
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            VideoQuality::P360 => "360p",
            VideoQuality::P720 => "720p",
            VideoQuality::P1080 => "1080p",
            VideoQuality::Best => "🔝 Best",
        }
    }
}

/// What the user asked for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaRequest {
    Audio,
    Video(VideoQuality),
}

impl MediaRequest {
    pub fn kind(self) -> MediaKind {
        match self {
            MediaRequest::Audio => MediaKind::Audio,
            MediaRequest::Video(_) => MediaKind::Video,
        }
    }

    pub fn format_selector(self) -> String {
        match self {
            MediaRequest::Audio => "bestaudio/best".to_string(),
            MediaRequest::Video(quality) => quality.format_selector(),
        }
    }
}

/// One fetch job
#[derive(Debug, Clone)]
pub struct FetchRequest {
    pub url: String,
    pub media: MediaRequest,
    /// Output path without extension; the extractor picks the extension
    pub output_stem: PathBuf,
}

impl FetchRequest {
    /// Output template understood by yt-dlp
    pub fn output_template(&self) -> String {
        format!("{}.%(ext)s", self.output_stem.display())
    }

    pub fn output_dir(&self) -> &Path {
        self.output_stem.parent().unwrap_or_else(|| Path::new("."))
    }
}

/// Backend that can inspect and download media URLs
#[async_trait]
pub trait MediaExtractor: Send + Sync {
    /// Human-readable backend name for logs
    fn name(&self) -> &str;

    /// Reads metadata without downloading.
    async fn probe(&self, url: &str) -> Result<MediaMetadata, AppError>;

    /// Downloads the media, sending progress through the channel, and
    /// returns the produced file.
    async fn fetch(
        &self,
        request: &FetchRequest,
        progress_tx: mpsc::UnboundedSender<ProgressInfo>,
    ) -> Result<PathBuf, AppError>;
}
