//! Mock extractor and recording delivery target

#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;
use tokio::sync::mpsc;

use mediagrab::core::error::AppError;
use mediagrab::download::error::DownloadError;
use mediagrab::download::progress::ProgressInfo;
use mediagrab::download::{DeliveryTarget, FetchRequest, MediaExtractor, MediaMetadata, MediaRequest};

/// Behaviour of the mock extractor
#[derive(Debug, Clone)]
pub struct MockExtractorConfig {
    /// Title reported by `probe`, per URL; `default_title` otherwise
    pub titles: HashMap<String, String>,
    pub default_title: Option<String>,
    /// Bytes written to the produced file
    pub file_size: usize,
    pub fail_probe: bool,
    pub fail_fetch: bool,
    /// Percentages emitted as progress before the file is written
    pub progress: Vec<u8>,
    /// Pause after each progress report
    pub progress_delay: Option<Duration>,
}

impl Default for MockExtractorConfig {
    fn default() -> Self {
        Self {
            titles: HashMap::new(),
            default_title: Some("Some Song".to_string()),
            file_size: 1024,
            fail_probe: false,
            fail_fetch: false,
            progress: vec![10, 55, 100],
            progress_delay: None,
        }
    }
}

/// Extractor that fabricates a file of the configured size
pub struct MockExtractor {
    config: MockExtractorConfig,
    probes: AtomicUsize,
    fetches: AtomicUsize,
}

impl MockExtractor {
    pub fn new(config: MockExtractorConfig) -> Self {
        Self {
            config,
            probes: AtomicUsize::new(0),
            fetches: AtomicUsize::new(0),
        }
    }

    pub fn with_title(title: &str) -> Self {
        Self::new(MockExtractorConfig {
            default_title: Some(title.to_string()),
            ..Default::default()
        })
    }

    pub fn probe_count(&self) -> usize {
        self.probes.load(Ordering::SeqCst)
    }

    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MediaExtractor for MockExtractor {
    fn name(&self) -> &str {
        "mock"
    }

    async fn probe(&self, url: &str) -> Result<MediaMetadata, AppError> {
        self.probes.fetch_add(1, Ordering::SeqCst);
        if self.config.fail_probe {
            return Err(DownloadError::YtDlp("probe failed".into()).into());
        }
        let title = self
            .config
            .titles
            .get(url)
            .cloned()
            .or_else(|| self.config.default_title.clone());
        Ok(MediaMetadata {
            title,
            ..Default::default()
        })
    }

    async fn fetch(
        &self,
        request: &FetchRequest,
        progress_tx: mpsc::UnboundedSender<ProgressInfo>,
    ) -> Result<PathBuf, AppError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        for percent in &self.config.progress {
            let _ = progress_tx.send(ProgressInfo {
                percent: *percent,
                ..Default::default()
            });
            if let Some(delay) = self.config.progress_delay {
                tokio::time::sleep(delay).await;
            }
        }
        if self.config.fail_fetch {
            fs_err::write(request.output_stem.with_extension("part"), b"partial")?;
            return Err(DownloadError::YtDlp("ERROR: Video unavailable".into()).into());
        }
        let ext = match request.media {
            MediaRequest::Audio => "mp3",
            MediaRequest::Video(_) => "mp4",
        };
        let file = request.output_stem.with_extension(ext);
        fs_err::write(&file, vec![0u8; self.config.file_size])?;
        Ok(file)
    }
}

/// One file handed to the chat
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Sent {
    Audio(PathBuf),
    Video(PathBuf),
}

/// Delivery target that remembers status texts and sent files
#[derive(Default)]
pub struct RecordingTarget {
    statuses: Mutex<Vec<String>>,
    sent: Mutex<Vec<Sent>>,
    pub fail_send: bool,
}

impl RecordingTarget {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self {
            fail_send: true,
            ..Default::default()
        }
    }

    pub fn statuses(&self) -> Vec<String> {
        self.statuses.lock().unwrap().clone()
    }

    pub fn last_status(&self) -> Option<String> {
        self.statuses.lock().unwrap().last().cloned()
    }

    pub fn sent(&self) -> Vec<Sent> {
        self.sent.lock().unwrap().clone()
    }

    fn deliver(&self, item: Sent) -> Result<(), AppError> {
        if self.fail_send {
            return Err(DownloadError::SendFailed("chat unreachable".into()).into());
        }
        self.sent.lock().unwrap().push(item);
        Ok(())
    }
}

#[async_trait]
impl DeliveryTarget for RecordingTarget {
    async fn status(&self, text: &str) {
        self.statuses.lock().unwrap().push(text.to_string());
    }

    async fn send_audio(&self, file: &Path, _caption: Option<&str>) -> Result<(), AppError> {
        self.deliver(Sent::Audio(file.to_path_buf()))
    }

    async fn send_video(&self, file: &Path, _caption: Option<&str>) -> Result<(), AppError> {
        self.deliver(Sent::Video(file.to_path_buf()))
    }
}
