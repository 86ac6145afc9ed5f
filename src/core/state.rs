//! Shared mutable state of a running bot.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::core::error::AppResult;
use crate::core::moderation::ModerationEngine;
use crate::storage::store::RecordStore;

/// Everything handlers mutate, guarded by one async mutex.
///
/// The lock is never held across chat or network calls.
#[derive(Debug)]
pub struct BotState {
    pub store: RecordStore,
    pub moderation: ModerationEngine,
    /// Last URL each user submitted, waiting for a format choice
    pub pending_urls: HashMap<i64, String>,
}

pub type SharedState = Arc<Mutex<BotState>>;

impl BotState {
    pub fn new(store: RecordStore, moderation: ModerationEngine) -> Self {
        Self {
            store,
            moderation,
            pending_urls: HashMap::new(),
        }
    }

    /// Opens the record store in `dir` with the default moderation policy.
    pub fn open(dir: &Path) -> AppResult<Self> {
        Ok(Self::new(RecordStore::open(dir)?, ModerationEngine::default()))
    }

    pub fn shared(self) -> SharedState {
        Arc::new(Mutex::new(self))
    }
}
