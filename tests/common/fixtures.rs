//! Test fixtures: a throwaway data directory with a record store and
//! a fixed clock.

#![allow(dead_code)]

use chrono::{DateTime, Duration, TimeZone, Utc};
use mediagrab::core::moderation::ModerationEngine;
use mediagrab::storage::{RecordStore, UserIdentity};
use tempfile::TempDir;

/// Fixed reference instant for scenario tests
pub fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
}

/// `t0()` shifted by `offset`
pub fn at(offset: Duration) -> DateTime<Utc> {
    t0() + offset
}

pub fn known_user(id: i64, username: &str) -> UserIdentity {
    UserIdentity::new(id).with_username(username)
}

/// Record store in a fresh temp directory plus a default moderation engine
pub struct TestEnvironment {
    pub dir: TempDir,
    pub store: RecordStore,
    pub moderation: ModerationEngine,
}

impl TestEnvironment {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let store = RecordStore::open(&dir.path().join("data")).unwrap();
        Self {
            dir,
            store,
            moderation: ModerationEngine::default(),
        }
    }

    /// Registers a user so `@username` and numeric targets resolve.
    pub fn add_user(&mut self, id: i64, username: &str) {
        self.store.register_user(&known_user(id, username), t0()).unwrap();
    }

    pub fn add_admin(&mut self, id: i64, username: &str, level: u8) {
        self.add_user(id, username);
        self.store.set_admin_level(id, level).unwrap();
    }

    /// Reopens the store from disk, as a restart would.
    pub fn reopen(&self) -> RecordStore {
        RecordStore::open(self.store.dir()).unwrap()
    }
}

impl Default for TestEnvironment {
    fn default() -> Self {
        Self::new()
    }
}
