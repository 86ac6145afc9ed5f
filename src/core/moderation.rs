//! Ban, warning and anti-spam policy.
//!
//! The three axes are independent: warnings accumulate into a ban at a fixed
//! limit, the spam guard bans on request frequency alone, and bans are checked
//! (and lazily expired) on every access. All state lives in the
//! [`RecordStore`] except the spam windows, which are kept in memory.

use chrono::{DateTime, Duration, Utc};
use std::fmt;

use crate::core::config;
use crate::core::error::{AppError, AppResult};
use crate::core::rate_limiter::RateLimiter;
use crate::storage::models::{BanExpiry, BanRecord, WarnEntry, WarnSource};
use crate::storage::store::RecordStore;

/// Title fragments that mark content as explicit (matched case-insensitively)
const EXPLICIT_TERMS: &[&str] = &[
    "18+", "sex", "porn", "xxx", "nude", "boobs", "adult", "fuck", "erotic", "nsfw", "sexy",
    "hardcore", "naked", "hot video", "anal", "pornhub", "onlyfans",
];

/// Returns true when the title contains a denylisted term.
///
/// Absent and empty titles are never flagged.
pub fn is_explicit_title(title: Option<&str>) -> bool {
    let Some(title) = title.filter(|t| !t.trim().is_empty()) else {
        return false;
    };
    let lowered = title.to_lowercase();
    EXPLICIT_TERMS.iter().any(|term| lowered.contains(term))
}

/// How long a ban lasts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BanDuration {
    Permanent,
    For(Duration),
}

impl BanDuration {
    /// `days <= 0` means permanent
    pub fn days(days: i64) -> Self {
        if days <= 0 {
            BanDuration::Permanent
        } else {
            BanDuration::For(Duration::days(days))
        }
    }

    /// Parses `Nd`, `Nh` or `permanent`. `0d` and `0h` are permanent.
    pub fn parse(raw: &str) -> Result<Self, AppError> {
        let raw = raw.trim().to_lowercase();
        if raw == "permanent" {
            return Ok(BanDuration::Permanent);
        }
        let invalid = || AppError::Validation(format!("invalid ban duration: {}", raw));

        let (digits, hours) = if let Some(d) = raw.strip_suffix('d') {
            (d, false)
        } else if let Some(h) = raw.strip_suffix('h') {
            (h, true)
        } else {
            return Err(invalid());
        };
        let amount: i64 = digits.parse().map_err(|_| invalid())?;
        match (amount, hours) {
            (n, _) if n < 0 => Err(invalid()),
            (0, _) => Ok(BanDuration::Permanent),
            (n, true) => Ok(BanDuration::For(Duration::hours(n))),
            (n, false) => Ok(BanDuration::For(Duration::days(n))),
        }
    }

    pub fn expiry(self, now: DateTime<Utc>) -> BanExpiry {
        match self {
            BanDuration::Permanent => BanExpiry::Permanent,
            BanDuration::For(duration) => BanExpiry::At(now + duration),
        }
    }
}

impl fmt::Display for BanDuration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BanDuration::Permanent => write!(f, "permanently"),
            BanDuration::For(d) if d.num_hours() % 24 == 0 => write!(f, "for {} day(s)", d.num_days()),
            BanDuration::For(d) => write!(f, "for {} hour(s)", d.num_hours()),
        }
    }
}

/// Result of adding a warning
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WarnOutcome {
    /// Warning stored; `count` warnings are now on record
    Warned { count: usize, limit: usize },
    /// The limit was reached, the user got banned and the warnings were cleared
    Banned,
}

/// Why a request was refused before reaching any handler logic
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    Banned,
    Throttled,
}

impl Rejection {
    pub fn user_message(self) -> &'static str {
        match self {
            Rejection::Banned => "🚫 You are currently banned.",
            Rejection::Throttled => "🚫 Too many requests. You have been banned for 1 day (anti-spam).",
        }
    }
}

/// Fixed thresholds of the moderation policy
#[derive(Debug, Clone, Copy)]
pub struct ModerationPolicy {
    pub warn_limit: usize,
    pub warn_ban: BanDuration,
    pub spam_count: usize,
    pub spam_window: Duration,
    pub spam_ban: BanDuration,
}

impl Default for ModerationPolicy {
    fn default() -> Self {
        Self {
            warn_limit: config::moderation::WARN_LIMIT,
            warn_ban: BanDuration::days(config::moderation::WARN_BAN_DAYS),
            spam_count: config::moderation::ANTI_SPAM_COUNT,
            spam_window: config::moderation::anti_spam_window(),
            spam_ban: BanDuration::days(config::moderation::ANTI_SPAM_PUNISH_DAYS),
        }
    }
}

/// Applies the moderation policy against a [`RecordStore`].
///
/// Every operation takes an explicit `now` so the clock can be controlled.
#[derive(Debug, Clone)]
pub struct ModerationEngine {
    policy: ModerationPolicy,
    spam: RateLimiter,
}

impl Default for ModerationEngine {
    fn default() -> Self {
        Self::new(ModerationPolicy::default())
    }
}

impl ModerationEngine {
    pub fn new(policy: ModerationPolicy) -> Self {
        Self {
            spam: RateLimiter::new(policy.spam_window),
            policy,
        }
    }

    pub fn policy(&self) -> &ModerationPolicy {
        &self.policy
    }

    /// True for a permanent ban or a temporary one that has not expired.
    ///
    /// An expired record is removed before returning `false`. A failure to
    /// persist that removal is logged; the answer is unaffected.
    pub fn is_banned(&self, store: &mut RecordStore, user_id: i64, now: DateTime<Utc>) -> bool {
        let Some(record) = store.bans.get().get(&user_id) else {
            return false;
        };
        if !record.until.has_expired(now) {
            return true;
        }

        log::info!("Ban for user {} expired ({}), removing", user_id, record.until);
        if let Err(e) = store.bans.update(|bans| bans.remove(&user_id)) {
            log::warn!("Failed to persist expired ban removal for {}: {}", user_id, e);
        }
        false
    }

    /// Bans `user_id`, replacing any existing ban.
    pub fn ban(
        &self,
        store: &mut RecordStore,
        user_id: i64,
        duration: BanDuration,
        reason: &str,
        now: DateTime<Utc>,
    ) -> AppResult<()> {
        let record = BanRecord {
            until: duration.expiry(now),
            reason: reason.to_string(),
        };
        store.bans.update(|bans| bans.insert(user_id, record))?;
        store.add_history(user_id, "ban", reason, now)?;
        log::info!("User {} banned {}: {}", user_id, duration, reason);
        Ok(())
    }

    /// Bans on behalf of the policy, never shortening an active ban.
    ///
    /// Returns `false` when the existing ban already lasts at least as long.
    fn auto_ban(
        &self,
        store: &mut RecordStore,
        user_id: i64,
        duration: BanDuration,
        reason: &str,
        now: DateTime<Utc>,
    ) -> AppResult<bool> {
        let expiry = duration.expiry(now);
        if let Some(existing) = store.bans.get().get(&user_id) {
            if !existing.until.has_expired(now) && existing.until.outlasts(&expiry) {
                log::info!(
                    "User {} already banned until {}, keeping it over \"{}\"",
                    user_id,
                    existing.until,
                    reason
                );
                return Ok(false);
            }
        }
        self.ban(store, user_id, duration, reason, now)?;
        Ok(true)
    }

    /// Lifts a ban. Returns whether a ban record existed.
    pub fn unban(&self, store: &mut RecordStore, user_id: i64, reason: &str, now: DateTime<Utc>) -> AppResult<bool> {
        if !store.bans.get().contains_key(&user_id) {
            return Ok(false);
        }
        store.bans.update(|bans| bans.remove(&user_id))?;
        store.add_history(user_id, "unban_manual", reason, now)?;
        log::info!("User {} unbanned: {}", user_id, reason);
        Ok(true)
    }

    /// Adds a warning and bans the user once the limit is reached.
    ///
    /// On the ban path the warning sequence is emptied, so the count restarts at zero.
    pub fn warn(
        &self,
        store: &mut RecordStore,
        user_id: i64,
        reason: &str,
        source: WarnSource,
        now: DateTime<Utc>,
    ) -> AppResult<WarnOutcome> {
        let entry = WarnEntry {
            time: now,
            reason: reason.to_string(),
            source,
        };
        let count = store.warnings.update(|warnings| {
            let list = warnings.entry(user_id).or_default();
            list.push(entry);
            list.len()
        })?;
        store.add_history(user_id, "warn", format!("{} (source={})", reason, source), now)?;
        log::info!(
            "User {} warned ({}/{}, source={}): {}",
            user_id,
            count,
            self.policy.warn_limit,
            source,
            reason
        );

        if count < self.policy.warn_limit {
            return Ok(WarnOutcome::Warned {
                count,
                limit: self.policy.warn_limit,
            });
        }

        let ban_reason = format!("{} warns reached", self.policy.warn_limit);
        self.auto_ban(store, user_id, self.policy.warn_ban, &ban_reason, now)?;
        store.warnings.update(|warnings| {
            warnings.insert(user_id, Vec::new());
        })?;
        store.add_history(user_id, "auto-ban", format!("{} warns", self.policy.warn_limit), now)?;
        log::info!("User {} auto-banned after {} warnings", user_id, count);
        Ok(WarnOutcome::Banned)
    }

    /// Empties the user's warnings. Safe to repeat.
    pub fn clear_warnings(&self, store: &mut RecordStore, user_id: i64, now: DateTime<Utc>) -> AppResult<()> {
        if store.warn_count(user_id) > 0 {
            store.warnings.update(|warnings| {
                warnings.insert(user_id, Vec::new());
            })?;
        }
        store.add_history(user_id, "unwarn", "Cleared by admin", now)?;
        log::info!("Warnings cleared for user {}", user_id);
        Ok(())
    }

    /// Records one request and bans the user when the window overflows.
    ///
    /// Returns `true` when this request triggered the ban. No warning is added.
    pub fn record_request_and_check_spam(
        &mut self,
        store: &mut RecordStore,
        user_id: i64,
        now: DateTime<Utc>,
    ) -> AppResult<bool> {
        let count = self.spam.record(user_id, now);
        if count <= self.policy.spam_count {
            log::trace!("User {} has {} request(s) in the spam window", user_id, count);
            return Ok(false);
        }

        let window_secs = self.policy.spam_window.num_seconds();
        let reason = format!("Anti-spam: {} in {}min", count, window_secs / 60);
        if !self.auto_ban(store, user_id, self.policy.spam_ban, &reason, now)? {
            return Ok(false);
        }
        store.add_history(
            user_id,
            "antispam-ban",
            format!("{} msg in {} sec", count, window_secs),
            now,
        )?;
        log::info!("User {} banned by anti-spam ({} requests)", user_id, count);
        Ok(true)
    }

    /// Screens a free-text request: spam accounting first, then the ban check.
    pub fn screen_request(
        &mut self,
        store: &mut RecordStore,
        user_id: i64,
        now: DateTime<Utc>,
    ) -> Result<(), Rejection> {
        match self.record_request_and_check_spam(store, user_id, now) {
            Ok(true) => return Err(Rejection::Throttled),
            Ok(false) => {}
            Err(e) => {
                log::error!("Failed to persist anti-spam ban for {}: {}", user_id, e);
                return Err(Rejection::Throttled);
            }
        }
        self.check_access(store, user_id, now)
    }

    /// Ban check used by callbacks and commands
    pub fn check_access(&self, store: &mut RecordStore, user_id: i64, now: DateTime<Utc>) -> Result<(), Rejection> {
        if self.is_banned(store, user_id, now) {
            Err(Rejection::Banned)
        } else {
            Ok(())
        }
    }
}
