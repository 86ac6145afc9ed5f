//! Media download pipeline

pub mod error;
pub mod extractor;
pub mod orchestrator;
pub mod progress;
pub mod search;
pub mod ytdlp;

pub use error::DownloadError;
pub use extractor::{FetchRequest, MediaExtractor, MediaMetadata, MediaRequest, VideoQuality};
pub use orchestrator::{DeliveryTarget, DownloadOrchestrator, JobOutcome};
pub use search::FullSongSearch;
pub use ytdlp::YtDlpExtractor;
