//! The single owner of every record table.

use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};

use crate::core::error::AppResult;
use crate::storage::models::{
    AdminTable, BanTable, CacheTable, HistoryEntry, HistoryTable, MediaKind, Stats, UserRecord,
    UserTable, WarnTable,
};
use crate::storage::records::{Domain, Table};

/// Highest admin level; also the level seeded from `ADMIN_IDS`
pub const MAX_ADMIN_LEVEL: u8 = 3;

/// Identity of whoever sent an update, independent of the chat library
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserIdentity {
    pub id: i64,
    pub username: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

impl UserIdentity {
    pub fn new(id: i64) -> Self {
        Self {
            id,
            ..Self::default()
        }
    }

    pub fn with_username(mut self, username: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self
    }
}

/// All record tables loaded from one data directory.
///
/// Built once at startup and shared behind a single async mutex.
#[derive(Debug)]
pub struct RecordStore {
    dir: PathBuf,
    pub admins: Table<AdminTable>,
    pub bans: Table<BanTable>,
    pub warnings: Table<WarnTable>,
    pub history: Table<HistoryTable>,
    pub cache: Table<CacheTable>,
    pub stats: Table<Stats>,
    pub users: Table<UserTable>,
}

impl RecordStore {
    /// Creates `dir` if needed and loads every domain from it.
    pub fn open(dir: &Path) -> AppResult<Self> {
        fs_err::create_dir_all(dir)?;
        let store = Self {
            dir: dir.to_path_buf(),
            admins: Table::open(dir, Domain::Admins),
            bans: Table::open(dir, Domain::Bans),
            warnings: Table::open(dir, Domain::Warnings),
            history: Table::open(dir, Domain::History),
            cache: Table::open(dir, Domain::Cache),
            stats: Table::open(dir, Domain::Stats),
            users: Table::open(dir, Domain::Users),
        };
        log::info!(
            "Record store opened at {} ({} users, {} admins, {} bans, {} cache entries)",
            dir.display(),
            store.users.get().len(),
            store.admins.get().len(),
            store.bans.get().len(),
            store.cache.get().len()
        );
        Ok(store)
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    // ==================== Admins ====================

    /// Admin level of `user_id`, 0 when the user is not an admin
    pub fn admin_level(&self, user_id: i64) -> u8 {
        self.admins.get().get(&user_id).copied().unwrap_or(0)
    }

    /// Sets the admin level; level 0 removes the entry.
    pub fn set_admin_level(&mut self, user_id: i64, level: u8) -> AppResult<()> {
        let level = level.min(MAX_ADMIN_LEVEL);
        self.admins.update(|admins| {
            if level == 0 {
                admins.remove(&user_id);
            } else {
                admins.insert(user_id, level);
            }
        })
    }

    /// Ensures every id in `ids` holds the top admin level. Returns how many changed.
    pub fn seed_admins(&mut self, ids: &[i64]) -> AppResult<usize> {
        let missing: Vec<i64> = ids
            .iter()
            .copied()
            .filter(|id| self.admin_level(*id) != MAX_ADMIN_LEVEL)
            .collect();
        if missing.is_empty() {
            return Ok(0);
        }
        self.admins.update(|admins| {
            for id in &missing {
                admins.insert(*id, MAX_ADMIN_LEVEL);
            }
        })?;
        log::info!("Seeded {} admin(s) at level {}", missing.len(), MAX_ADMIN_LEVEL);
        Ok(missing.len())
    }

    // ==================== Users ====================

    /// Registers a user on first contact and refreshes changed names.
    ///
    /// Returns `true` when the user was not known before. Nothing is written
    /// when the stored record already matches.
    pub fn register_user(&mut self, identity: &UserIdentity, now: DateTime<Utc>) -> AppResult<bool> {
        match self.users.get().get(&identity.id) {
            Some(existing)
                if existing.username == identity.username
                    && existing.first_name == identity.first_name
                    && existing.last_name == identity.last_name =>
            {
                Ok(false)
            }
            Some(_) => {
                self.users.update(|users| {
                    if let Some(record) = users.get_mut(&identity.id) {
                        record.username = identity.username.clone();
                        record.first_name = identity.first_name.clone();
                        record.last_name = identity.last_name.clone();
                    }
                })?;
                Ok(false)
            }
            None => {
                self.users.update(|users| {
                    users.insert(
                        identity.id,
                        UserRecord {
                            username: identity.username.clone(),
                            first_name: identity.first_name.clone(),
                            last_name: identity.last_name.clone(),
                            added: now,
                        },
                    );
                })?;
                log::info!("New user registered: {} (@{:?})", identity.id, identity.username);
                Ok(true)
            }
        }
    }

    /// Resolves `@username` (case-insensitive) or a numeric id to a known user.
    pub fn resolve_user(&self, target: &str) -> Option<i64> {
        let target = target.trim();
        if let Some(name) = target.strip_prefix('@') {
            if name.is_empty() {
                return None;
            }
            return self
                .users
                .get()
                .iter()
                .find(|(_, user)| {
                    user.username
                        .as_deref()
                        .is_some_and(|u| u.eq_ignore_ascii_case(name))
                })
                .map(|(id, _)| *id);
        }
        let id: i64 = target.parse().ok()?;
        self.users.get().contains_key(&id).then_some(id)
    }

    /// Human readable label for replies: `@name` when known, else the id
    pub fn display_name(&self, user_id: i64) -> String {
        match self.users.get().get(&user_id).and_then(|u| u.username.as_deref()) {
            Some(name) => format!("@{}", name),
            None => user_id.to_string(),
        }
    }

    pub fn user_ids(&self) -> Vec<i64> {
        self.users.get().keys().copied().collect()
    }

    // ==================== History & stats ====================

    /// Appends one audit entry for `user_id`
    pub fn add_history(
        &mut self,
        user_id: i64,
        event: &str,
        note: impl Into<String>,
        now: DateTime<Utc>,
    ) -> AppResult<()> {
        let entry = HistoryEntry {
            time: now,
            event: event.to_string(),
            note: note.into(),
        };
        self.history
            .update(|history| history.entry(user_id).or_default().push(entry))
    }

    /// The most recent `limit` entries, oldest first
    pub fn recent_history(&self, user_id: i64, limit: usize) -> &[HistoryEntry] {
        match self.history.get().get(&user_id) {
            Some(entries) => &entries[entries.len().saturating_sub(limit)..],
            None => &[],
        }
    }

    /// Counts one delivered file
    pub fn record_download(&mut self, user_id: i64, kind: MediaKind) -> AppResult<()> {
        self.stats.update(|stats| stats.record(user_id, kind))
    }

    /// Number of stored warnings for `user_id`
    pub fn warn_count(&self, user_id: i64) -> usize {
        self.warnings.get().get(&user_id).map_or(0, Vec::len)
    }

    pub fn total_warnings(&self) -> usize {
        self.warnings.get().values().map(Vec::len).sum()
    }
}
