//! Admin commands: level checks, argument parsing and execution.
//!
//! Everything here works on the [`RecordStore`] and [`ModerationEngine`] only;
//! the chat layer turns a [`CommandOutcome`] or [`CommandError`] into replies.

use chrono::{DateTime, Utc};
use std::fmt::Write as _;
use strum::{Display, EnumIter, EnumString};
use thiserror::Error;

use crate::core::config;
use crate::core::error::AppError;
use crate::core::moderation::{BanDuration, ModerationEngine, Rejection, WarnOutcome};
use crate::storage::models::WarnSource;
use crate::storage::store::{RecordStore, MAX_ADMIN_LEVEL};

/// Reply sent whenever the caller's level is too low
pub const DENIAL_MESSAGE: &str = "⛔ Permission denied.";

const DEFAULT_REASON: &str = "No reason given";

/// Admin command names as typed after the slash
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, EnumIter)]
#[strum(serialize_all = "lowercase")]
pub enum AdminCommandKind {
    MakeAdmin,
    UnmakeAdmin,
    Warn,
    Unwarn,
    Warns,
    Ban,
    Unban,
    Stats,
    History,
    SendAll,
}

impl AdminCommandKind {
    /// Minimum admin level needed to run the command
    pub fn required_level(self) -> u8 {
        match self {
            AdminCommandKind::Warn | AdminCommandKind::Unwarn | AdminCommandKind::Warns => 1,
            AdminCommandKind::MakeAdmin
            | AdminCommandKind::UnmakeAdmin
            | AdminCommandKind::Ban
            | AdminCommandKind::Stats
            | AdminCommandKind::History => 2,
            AdminCommandKind::Unban | AdminCommandKind::SendAll => 3,
        }
    }

    fn usage(self) -> &'static str {
        match self {
            AdminCommandKind::MakeAdmin => "/makeadmin @username level\nExample: /makeadmin @user 2",
            AdminCommandKind::UnmakeAdmin => "/unmakeadmin @username",
            AdminCommandKind::Warn => "/warn @username [reason]",
            AdminCommandKind::Unwarn => "/unwarn @username",
            AdminCommandKind::Warns => "/warns @username",
            AdminCommandKind::Ban => "/ban @username 1d|5h|permanent [reason]",
            AdminCommandKind::Unban => "/unban @username [reason]",
            AdminCommandKind::Stats => "/stats",
            AdminCommandKind::History => "/history @username",
            AdminCommandKind::SendAll => "/sendall message_text",
        }
    }
}

/// A parsed admin command with its arguments
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdminCommand {
    MakeAdmin { target: String, level: u8 },
    UnmakeAdmin { target: String },
    Warn { target: String, reason: String },
    Unwarn { target: String },
    Warns { target: String },
    Ban { target: String, duration: BanDuration, reason: String },
    Unban { target: String, reason: String },
    Stats,
    History { target: String },
    SendAll { text: String },
}

impl AdminCommand {
    /// Parses the text following the command name.
    pub fn parse(kind: AdminCommandKind, args: &str) -> Result<Self, CommandError> {
        let usage = || CommandError::Usage(kind.usage());
        let args = args.trim();
        let mut words = args.split_whitespace();
        let mut target = || words.next().map(str::to_string).ok_or_else(usage);

        let command = match kind {
            AdminCommandKind::MakeAdmin => {
                let target = target()?;
                let raw_level = args.split_whitespace().nth(1).ok_or_else(usage)?;
                let level: u8 = raw_level
                    .parse()
                    .ok()
                    .filter(|l| (1..=MAX_ADMIN_LEVEL).contains(l))
                    .ok_or_else(|| CommandError::Validation("Level must be 1, 2 or 3.".to_string()))?;
                AdminCommand::MakeAdmin { target, level }
            }
            AdminCommandKind::UnmakeAdmin => AdminCommand::UnmakeAdmin { target: target()? },
            AdminCommandKind::Warn => {
                let (target, rest) = split_target(args).ok_or_else(usage)?;
                AdminCommand::Warn {
                    target,
                    reason: reason_or_default(rest),
                }
            }
            AdminCommandKind::Unwarn => AdminCommand::Unwarn { target: target()? },
            AdminCommandKind::Warns => AdminCommand::Warns { target: target()? },
            AdminCommandKind::Ban => {
                let (target, rest) = split_target(args).ok_or_else(usage)?;
                if rest.is_empty() {
                    return Err(usage());
                }
                let (raw_duration, reason) = rest.split_once(char::is_whitespace).unwrap_or((rest, ""));
                let reason = reason_or_default(reason.trim());
                let duration = BanDuration::parse(raw_duration).map_err(|_| {
                    CommandError::Validation("Invalid duration. Examples: 1d, 5h, permanent".to_string())
                })?;
                AdminCommand::Ban {
                    target,
                    duration,
                    reason,
                }
            }
            AdminCommandKind::Unban => {
                let (target, rest) = split_target(args).ok_or_else(usage)?;
                AdminCommand::Unban {
                    target,
                    reason: reason_or_default(rest),
                }
            }
            AdminCommandKind::Stats => AdminCommand::Stats,
            AdminCommandKind::History => AdminCommand::History { target: target()? },
            AdminCommandKind::SendAll => {
                if args.is_empty() {
                    return Err(usage());
                }
                AdminCommand::SendAll { text: args.to_string() }
            }
        };
        Ok(command)
    }
}

/// Splits `@user rest of text` into the target and the trimmed remainder.
fn split_target(args: &str) -> Option<(String, &str)> {
    let mut parts = args.trim().splitn(2, char::is_whitespace);
    let target = parts.next().filter(|t| !t.is_empty())?.to_string();
    let rest = parts.next().map(str::trim).unwrap_or("");
    Some((target, rest))
}

fn reason_or_default(text: &str) -> String {
    if text.is_empty() {
        DEFAULT_REASON.to_string()
    } else {
        text.to_string()
    }
}

/// What the chat layer should do after a successful command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandOutcome {
    Reply(String),
    /// Send `text` to every recipient, then report the counts with [`broadcast_report`]
    Broadcast { text: String, recipients: Vec<i64> },
}

/// Command failures, each mapped to one reply
#[derive(Debug, Error)]
pub enum CommandError {
    #[error("caller rejected: {0:?}")]
    Rejected(Rejection),

    #[error("requires admin level {required}")]
    Unauthorized { required: u8 },

    #[error("usage: {0}")]
    Usage(&'static str),

    #[error("{0}")]
    Validation(String),

    #[error("unknown user {0}")]
    UnknownUser(String),

    #[error("storage error: {0}")]
    Storage(#[from] AppError),
}

impl CommandError {
    pub fn user_message(&self) -> String {
        match self {
            CommandError::Rejected(rejection) => rejection.user_message().to_string(),
            CommandError::Unauthorized { .. } => DENIAL_MESSAGE.to_string(),
            CommandError::Usage(usage) => format!("❗ Usage: {}", usage),
            CommandError::Validation(msg) => format!("❗ {}", msg),
            CommandError::UnknownUser(name) => format!("❗ User {} not found. They must message the bot first.", name),
            CommandError::Storage(_) => "⚠️ Failed to save changes, try again later.".to_string(),
        }
    }
}

/// Reply for a finished broadcast
pub fn broadcast_report(success: usize, failed: usize) -> String {
    format!("✅ Sent: {}\n❌ Failed: {}", success, failed)
}

/// Runs an admin command for `caller`.
///
/// Order of checks: the caller's ban, then the level, then the arguments.
pub fn execute(
    store: &mut RecordStore,
    moderation: &ModerationEngine,
    caller: i64,
    kind: AdminCommandKind,
    args: &str,
    now: DateTime<Utc>,
) -> Result<CommandOutcome, CommandError> {
    moderation
        .check_access(store, caller, now)
        .map_err(CommandError::Rejected)?;

    let caller_level = store.admin_level(caller);
    let required = kind.required_level();
    if caller_level < required {
        log::info!(
            "User {} (level {}) denied /{} (needs {})",
            caller,
            caller_level,
            kind,
            required
        );
        return Err(CommandError::Unauthorized { required });
    }

    let command = AdminCommand::parse(kind, args)?;
    log::info!("Admin {} (level {}) runs /{}", caller, caller_level, kind);
    run(store, moderation, caller_level, command, now)
}

fn resolve(store: &RecordStore, target: &str) -> Result<i64, CommandError> {
    store
        .resolve_user(target)
        .ok_or_else(|| CommandError::UnknownUser(target.to_string()))
}

fn run(
    store: &mut RecordStore,
    moderation: &ModerationEngine,
    caller_level: u8,
    command: AdminCommand,
    now: DateTime<Utc>,
) -> Result<CommandOutcome, CommandError> {
    let reply = match command {
        AdminCommand::MakeAdmin { target, level } => {
            if level > caller_level {
                return Err(CommandError::Validation(format!(
                    "You cannot grant a level above your own ({}).",
                    caller_level
                )));
            }
            let user = resolve(store, &target)?;
            store.set_admin_level(user, level)?;
            store.add_history(user, "promoted", format!("level={}", level), now)?;
            log::info!("User {} promoted to admin level {}", user, level);
            format!("✅ {} is now an admin (level={}).", store.display_name(user), level)
        }
        AdminCommand::UnmakeAdmin { target } => {
            let user = resolve(store, &target)?;
            let level = store.admin_level(user);
            if level == 0 {
                return Ok(CommandOutcome::Reply("ℹ️ This user is not an admin.".to_string()));
            }
            if level > caller_level {
                return Err(CommandError::Validation(
                    "You cannot demote an admin above your own level.".to_string(),
                ));
            }
            store.set_admin_level(user, 0)?;
            store.add_history(user, "demoted", "", now)?;
            log::info!("User {} demoted from admin level {}", user, level);
            format!("✅ {} is no longer an admin.", store.display_name(user))
        }
        AdminCommand::Warn { target, reason } => {
            let user = resolve(store, &target)?;
            let name = store.display_name(user);
            match moderation.warn(store, user, &reason, WarnSource::Manual, now)? {
                WarnOutcome::Banned => format!(
                    "⚠️ {} reached {} warnings and was banned.",
                    name,
                    moderation.policy().warn_limit
                ),
                WarnOutcome::Warned { count, limit } => {
                    format!("✅ {} warned. Current warnings: {}/{}", name, count, limit)
                }
            }
        }
        AdminCommand::Unwarn { target } => {
            let user = resolve(store, &target)?;
            moderation.clear_warnings(store, user, now)?;
            format!("✅ Warnings of {} cleared.", store.display_name(user))
        }
        AdminCommand::Warns { target } => {
            let user = resolve(store, &target)?;
            let name = store.display_name(user);
            match store.warnings.get().get(&user).filter(|w| !w.is_empty()) {
                None => format!("ℹ️ {} has no warnings.", name),
                Some(entries) => {
                    let mut text = format!("⚠️ Warnings of {} ({}):\n", name, entries.len());
                    for e in entries {
                        let _ = writeln!(text, "- {}: {} (source={})", e.time.to_rfc3339(), e.reason, e.source);
                    }
                    text
                }
            }
        }
        AdminCommand::Ban {
            target,
            duration,
            reason,
        } => {
            let user = resolve(store, &target)?;
            moderation.ban(store, user, duration, &reason, now)?;
            format!("✅ {} banned {}. Reason: {}", store.display_name(user), duration, reason)
        }
        AdminCommand::Unban { target, reason } => {
            let user = resolve(store, &target)?;
            if moderation.unban(store, user, &reason, now)? {
                format!("✅ {} has been unbanned.", store.display_name(user))
            } else {
                "ℹ️ This user is not banned.".to_string()
            }
        }
        AdminCommand::Stats => render_stats(store),
        AdminCommand::History { target } => {
            let user = resolve(store, &target)?;
            let entries = store.recent_history(user, config::history::DISPLAY_LIMIT);
            if entries.is_empty() {
                "ℹ️ No history found.".to_string()
            } else {
                let mut text = format!("📜 History of {}:\n", store.display_name(user));
                for e in entries {
                    let _ = writeln!(text, "- {}: {} ({})", e.time.to_rfc3339(), e.event, e.note);
                }
                text
            }
        }
        AdminCommand::SendAll { text } => {
            return Ok(CommandOutcome::Broadcast {
                text,
                recipients: store.user_ids(),
            })
        }
    };
    Ok(CommandOutcome::Reply(reply))
}

/// Aggregate counters as shown by /stats
pub fn render_stats(store: &RecordStore) -> String {
    let stats = store.stats.get();
    format!(
        "📊 Statistics:\n\
         - Downloads: {}\n\
         - Audio: {} | Video: {}\n\
         - Banned: {}\n\
         - Total warnings: {}\n\
         - Admins: {}\n\
         - Users: {}\n\
         - Cache entries: {}\n",
        stats.downloads,
        stats.audio,
        stats.video,
        store.bans.get().len(),
        store.total_warnings(),
        store.admins.get().len(),
        store.users.get().len(),
        store.cache.get().len()
    )
}
