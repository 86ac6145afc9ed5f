//! mediagrab - Telegram bot that downloads YouTube/Instagram media as audio or video
//!
//! # Module Structure
//!
//! - `core`: configuration, errors, logging, moderation and admin commands
//! - `storage`: JSON record files, the record store and the URL cache
//! - `download`: extractor backends, progress parsing and the job orchestrator
//! - `telegram`: bot setup, keyboards, delivery and update handlers

pub mod cli;
pub mod core;
pub mod download;
pub mod storage;
pub mod telegram;

// Re-export commonly used types for convenience
pub use core::{config, AppError, AppResult, BotState, SharedState};
pub use download::{DownloadOrchestrator, JobOutcome, MediaExtractor};
pub use storage::RecordStore;
