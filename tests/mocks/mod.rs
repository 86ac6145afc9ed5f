//! Mock implementations of the download seams
//!
//! An extractor that writes a file instead of calling yt-dlp, and a delivery
//! target that records what would have been sent to the chat.

pub mod mock_extractor;

#[allow(unused_imports)]
pub use mock_extractor::{MockExtractor, MockExtractorConfig, RecordingTarget, Sent};
