//! Download orchestration: probe, content check, fetch with progress,
//! size check, delivery and bookkeeping.
//!
//! Moderation and cache state change only after a successful delivery
//! (or, for flagged titles, through the warning system). Any failure on the
//! way ends the job with one generic message.

use async_trait::async_trait;
use chrono::Utc;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

use crate::core::config;
use crate::core::error::AppError;
use crate::core::moderation::{is_explicit_title, WarnOutcome};
use crate::core::state::SharedState;
use crate::download::error::DownloadError;
use crate::download::extractor::{FetchRequest, MediaExtractor, MediaRequest, VideoQuality};
use crate::download::progress::{ProgressInfo, ProgressTracker};
use crate::download::search::FullSongSearch;
use crate::storage::cache;
use crate::storage::models::{MediaKind, WarnSource};

/// Reply for every failure that is not the user's fault
pub const GENERIC_FAILURE: &str = "⚠️ Download failed. Please try again later.";

/// Where a job reports status and delivers files
#[async_trait]
pub trait DeliveryTarget: Send + Sync {
    /// Replaces the status text. Failures are handled by the implementation.
    async fn status(&self, text: &str);

    async fn send_audio(&self, file: &Path, caption: Option<&str>) -> Result<(), AppError>;

    async fn send_video(&self, file: &Path, caption: Option<&str>) -> Result<(), AppError>;
}

/// How a job ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobOutcome {
    Delivered { file: PathBuf, cached: bool },
    /// Title matched the explicit-content filter; a warning was issued instead
    Flagged(WarnOutcome),
    Oversized { size: u64 },
    NotFound,
    Failed,
}

pub struct DownloadOrchestrator {
    state: SharedState,
    extractor: Arc<dyn MediaExtractor>,
    search: FullSongSearch,
    download_dir: PathBuf,
    max_file_size: u64,
    edit_interval: Duration,
}

impl DownloadOrchestrator {
    pub fn new(
        state: SharedState,
        extractor: Arc<dyn MediaExtractor>,
        search: FullSongSearch,
        download_dir: PathBuf,
    ) -> Self {
        Self {
            state,
            extractor,
            search,
            download_dir,
            max_file_size: config::download::MAX_FILE_SIZE,
            edit_interval: config::progress::edit_interval(),
        }
    }

    pub fn with_max_file_size(mut self, max_file_size: u64) -> Self {
        self.max_file_size = max_file_size;
        self
    }

    pub fn with_edit_interval(mut self, edit_interval: Duration) -> Self {
        self.edit_interval = edit_interval;
        self
    }

    /// Re-sends a cached artifact for `url` if one of the right kind exists.
    ///
    /// Returns `None` on a cache miss, otherwise how the cached delivery ended.
    pub async fn try_cached(
        &self,
        user_id: i64,
        url: &str,
        kind: MediaKind,
        target: &dyn DeliveryTarget,
    ) -> Option<JobOutcome> {
        let entry = {
            let state = self.state.lock().await;
            cache::lookup_for(&state.store, url, kind).cloned()
        };
        let entry = entry?;

        log::info!("Cache hit for {} ({}) -> {}", url, kind, entry.file.display());
        let (notice, sent) = match kind {
            MediaKind::Video => (
                "♻️ Found a previous video, sending...",
                target.send_video(&entry.file, entry.title.as_deref()).await,
            ),
            _ => (
                "♻️ Found a previous audio, sending...",
                target.send_audio(&entry.file, entry.title.as_deref()).await,
            ),
        };
        if let Err(e) = sent {
            log::error!("Failed to send cached file {}: {}", entry.file.display(), e);
            target.status(GENERIC_FAILURE).await;
            return Some(JobOutcome::Failed);
        }
        target.status(notice).await;

        let mut state = self.state.lock().await;
        let now = Utc::now();
        if let Err(e) = state.store.record_download(user_id, kind) {
            log::error!("Failed to record cached download stats: {}", e);
        }
        if let Err(e) = state.store.add_history(user_id, "download_cached", url, now) {
            log::error!("Failed to record cached download history: {}", e);
        }
        Some(JobOutcome::Delivered {
            file: entry.file,
            cached: true,
        })
    }

    /// Runs one download job end to end.
    pub async fn run(&self, user_id: i64, url: &str, media: MediaRequest, target: &dyn DeliveryTarget) -> JobOutcome {
        let initial = match media {
            MediaRequest::Audio => "🎧 Downloading... 0%".to_string(),
            MediaRequest::Video(quality) => format!("🎬 Video ({}) downloading... 0%", quality),
        };
        target.status(&initial).await;

        let metadata = match self.extractor.probe(url).await {
            Ok(metadata) => metadata,
            Err(e) => {
                log_failure(&format!("Probe via {}", self.extractor.name()), url, &e);
                target.status(GENERIC_FAILURE).await;
                return JobOutcome::Failed;
            }
        };
        let title = metadata.display_title().map(str::to_string);

        if is_explicit_title(title.as_deref()) {
            return self.flag_explicit(user_id, url, target).await;
        }

        let request = FetchRequest {
            url: url.to_string(),
            media,
            output_stem: self.download_dir.join(uuid::Uuid::new_v4().to_string()),
        };
        let file = match self.fetch(&request, target).await {
            Ok(file) => file,
            Err(e) => {
                log_failure("Download", url, &e);
                remove_partials(&request);
                target.status(GENERIC_FAILURE).await;
                return JobOutcome::Failed;
            }
        };

        if let Err(e) = self.check_size(&file) {
            log_failure("Size check", url, &e);
            discard(&file);
            return match e {
                AppError::Download(DownloadError::Oversized { size, .. }) => {
                    target.status("❗ File is too large (over 2 GB).").await;
                    JobOutcome::Oversized { size }
                }
                _ => {
                    target.status(GENERIC_FAILURE).await;
                    JobOutcome::Failed
                }
            };
        }

        let sent = match media {
            MediaRequest::Audio => target.send_audio(&file, title.as_deref()).await,
            MediaRequest::Video(_) => target.send_video(&file, title.as_deref()).await,
        };
        if let Err(e) = sent {
            log_failure("Delivery", url, &e);
            discard(&file);
            target.status(GENERIC_FAILURE).await;
            return JobOutcome::Failed;
        }

        self.record_success(user_id, url, &file, media.kind(), title).await;
        JobOutcome::Delivered { file, cached: false }
    }

    /// Finds the full version of the probed title and downloads it as audio.
    pub async fn full_song(&self, user_id: i64, url: &str, target: &dyn DeliveryTarget) -> JobOutcome {
        target.status("🔎 Searching for the full version...").await;

        let found = match self.extractor.probe(url).await {
            Ok(metadata) => match metadata.display_title() {
                Some(title) => self.search.find_full_version(title).await,
                None => Ok(None),
            },
            Err(e) => Err(e),
        };
        let full_url = match found {
            Ok(Some(full_url)) => full_url,
            Ok(None) => {
                target.status("❌ Could not find the full version.").await;
                return JobOutcome::NotFound;
            }
            Err(e) => {
                log_failure("Full song search", url, &e);
                target.status(GENERIC_FAILURE).await;
                return JobOutcome::Failed;
            }
        };

        target.status("🎵 Downloading the full song...").await;
        if let Some(outcome) = self.try_cached(user_id, &full_url, MediaKind::Audio, target).await {
            return outcome;
        }
        self.run(user_id, &full_url, MediaRequest::Audio, target).await
    }

    async fn flag_explicit(&self, user_id: i64, url: &str, target: &dyn DeliveryTarget) -> JobOutcome {
        log::info!("Explicit title detected for {} (user {})", url, user_id);
        let outcome = {
            let mut guard = self.state.lock().await;
            let state = &mut *guard;
            state.moderation.warn(
                &mut state.store,
                user_id,
                "Explicit title detected (auto)",
                WarnSource::Auto,
                Utc::now(),
            )
        };
        match outcome {
            Ok(WarnOutcome::Banned) => {
                target
                    .status("🚫 You reached 3 warnings and have been banned for 1 day.")
                    .await;
                JobOutcome::Flagged(WarnOutcome::Banned)
            }
            Ok(warned @ WarnOutcome::Warned { count, limit }) => {
                target
                    .status(&format!("⚠️ Inappropriate title detected. ({}/{})", count, limit))
                    .await;
                JobOutcome::Flagged(warned)
            }
            Err(e) => {
                log::error!("Failed to store warning for {}: {}", user_id, e);
                target.status(GENERIC_FAILURE).await;
                JobOutcome::Failed
            }
        }
    }

    /// Runs the extractor in its own task and relays progress on a fixed cadence.
    async fn fetch(&self, request: &FetchRequest, target: &dyn DeliveryTarget) -> Result<PathBuf, AppError> {
        fs_err::create_dir_all(request.output_dir())?;

        let (progress_tx, mut progress_rx) = mpsc::unbounded_channel::<ProgressInfo>();
        let extractor = Arc::clone(&self.extractor);
        let owned = request.clone();
        let mut job = tokio::spawn(async move { extractor.fetch(&owned, progress_tx).await });

        let mut ticker = tokio::time::interval(self.edit_interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        let mut tracker = ProgressTracker::new();
        let mut latest: Option<ProgressInfo> = None;

        let result = loop {
            tokio::select! {
                joined = &mut job => break joined,
                Some(info) = progress_rx.recv() => latest = Some(info),
                _ = ticker.tick() => {
                    if let Some(text) = latest.take().and_then(|info| tracker.next_text(&info)) {
                        target.status(&text).await;
                    }
                }
            }
        };

        result.map_err(|e| DownloadError::Io(format!("download task failed: {}", e)))?
    }

    fn check_size(&self, file: &Path) -> Result<(), AppError> {
        let size = fs_err::metadata(file)?.len();
        if size > self.max_file_size {
            return Err(DownloadError::Oversized {
                size,
                limit: self.max_file_size,
            }
            .into());
        }
        Ok(())
    }

    async fn record_success(&self, user_id: i64, url: &str, file: &Path, kind: MediaKind, title: Option<String>) {
        let now = Utc::now();
        let mut state = self.state.lock().await;
        if let Err(e) = cache::store(&mut state.store, url, file, kind, title, now) {
            log::error!("Failed to cache {}: {}", url, e);
        }
        if let Err(e) = state.store.record_download(user_id, kind) {
            log::error!("Failed to record download stats: {}", e);
        }
        let event = match kind {
            MediaKind::Video => "download_video",
            _ => "download_audio",
        };
        if let Err(e) = state.store.add_history(user_id, event, url, now) {
            log::error!("Failed to record download history: {}", e);
        }
        log::info!("Delivered {} to user {} as {}", url, user_id, kind);
    }
}

fn log_failure(stage: &str, url: &str, err: &AppError) {
    match err {
        AppError::Download(e) => log::error!("{} failed for {} [{}]: {}", stage, url, e.subcategory(), e),
        other => log::error!("{} failed for {}: {}", stage, url, other),
    }
}

/// Deletes an artifact that will not be delivered or cached
fn discard(file: &Path) {
    if let Err(e) = fs_err::remove_file(file) {
        log::warn!("Failed to remove {}: {}", file.display(), e);
    }
}

/// Deletes whatever the extractor left under the request's output stem
fn remove_partials(request: &FetchRequest) {
    let Some(prefix) = request
        .output_stem
        .file_name()
        .and_then(|name| name.to_str())
        .map(|stem| format!("{}.", stem))
    else {
        return;
    };
    let entries = match fs_err::read_dir(request.output_dir()) {
        Ok(entries) => entries,
        Err(e) => {
            log::warn!("Cannot scan for partial downloads: {}", e);
            return;
        }
    };
    for entry in entries.flatten() {
        let matches = entry
            .file_name()
            .to_str()
            .is_some_and(|name| name.starts_with(&prefix));
        if matches {
            log::debug!("Removing partial download {}", entry.path().display());
            discard(&entry.path());
        }
    }
}

/// Quality chosen when the host offers no quality menu
pub fn default_video_request() -> MediaRequest {
    MediaRequest::Video(VideoQuality::Best)
}
