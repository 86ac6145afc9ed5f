//! Scenario tests over moderation and admin commands with a controlled clock
//!
//! Run with: cargo test --test moderation_scenarios_test

mod common;

use chrono::Duration;
use common::{at, t0, TestEnvironment};
use mediagrab::core::admin::{execute, AdminCommandKind, CommandError, CommandOutcome, DENIAL_MESSAGE};
use mediagrab::core::moderation::{is_explicit_title, BanDuration, Rejection, WarnOutcome};
use mediagrab::storage::{BanExpiry, WarnSource};
use pretty_assertions::assert_eq;

const ADMIN: i64 = 100;
const ALICE: i64 = 201;
const BOB: i64 = 202;

fn reply(outcome: Result<CommandOutcome, CommandError>) -> String {
    match outcome {
        Ok(CommandOutcome::Reply(text)) => text,
        Ok(other) => panic!("expected a reply, got {:?}", other),
        Err(e) => e.user_message(),
    }
}

// ============================================================================
// Bans
// ============================================================================

#[test]
fn test_day_ban_expires_after_25_hours() {
    let mut env = TestEnvironment::new();
    env.add_admin(ADMIN, "root", 2);
    env.add_user(ALICE, "alice");

    let text = reply(execute(
        &mut env.store,
        &env.moderation,
        ADMIN,
        AdminCommandKind::Ban,
        "@alice 1d spam",
        t0(),
    ));
    assert!(text.starts_with("✅"), "unexpected reply: {}", text);
    assert_eq!(env.store.bans.get()[&ALICE].reason, "spam");

    assert!(env.moderation.is_banned(&mut env.store, ALICE, t0()));
    assert!(env.moderation.is_banned(&mut env.store, ALICE, at(Duration::hours(23))));
    assert!(!env.moderation.is_banned(&mut env.store, ALICE, at(Duration::hours(25))));

    // the expired record is gone, also after a restart
    assert!(!env.store.bans.get().contains_key(&ALICE));
    assert!(!env.reopen().bans.get().contains_key(&ALICE));
}

#[test]
fn test_zero_day_ban_is_permanent_until_unban() {
    let mut env = TestEnvironment::new();
    env.add_admin(ADMIN, "root", 3);
    env.add_user(ALICE, "alice");

    reply(execute(
        &mut env.store,
        &env.moderation,
        ADMIN,
        AdminCommandKind::Ban,
        "@alice 0d",
        t0(),
    ));
    assert_eq!(env.store.bans.get()[&ALICE].until, BanExpiry::Permanent);
    assert_eq!(env.store.bans.get()[&ALICE].reason, "No reason given");
    assert!(env.moderation.is_banned(&mut env.store, ALICE, at(Duration::days(3650))));

    let text = reply(execute(
        &mut env.store,
        &env.moderation,
        ADMIN,
        AdminCommandKind::Unban,
        "@alice appeal accepted",
        at(Duration::days(1)),
    ));
    assert!(text.contains("unbanned"), "unexpected reply: {}", text);
    assert!(!env.moderation.is_banned(&mut env.store, ALICE, at(Duration::days(1))));

    let events: Vec<_> = env
        .store
        .recent_history(ALICE, 10)
        .iter()
        .map(|e| e.event.as_str())
        .collect();
    assert_eq!(events, vec!["ban", "unban_manual"]);
}

#[test]
fn test_invalid_ban_duration_is_rejected() {
    let mut env = TestEnvironment::new();
    env.add_admin(ADMIN, "root", 2);
    env.add_user(ALICE, "alice");

    let result = execute(
        &mut env.store,
        &env.moderation,
        ADMIN,
        AdminCommandKind::Ban,
        "@alice soon",
        t0(),
    );
    assert!(matches!(result, Err(CommandError::Validation(_))));
    assert!(env.store.bans.get().is_empty());
}

#[test]
fn test_banned_admin_cannot_run_commands() {
    let mut env = TestEnvironment::new();
    env.add_admin(ADMIN, "root", 3);
    env.moderation
        .ban(&mut env.store, ADMIN, BanDuration::days(1), "test", t0())
        .unwrap();

    let result = execute(
        &mut env.store,
        &env.moderation,
        ADMIN,
        AdminCommandKind::Stats,
        "",
        at(Duration::hours(1)),
    );
    assert!(matches!(result, Err(CommandError::Rejected(Rejection::Banned))));
}

// ============================================================================
// Warnings
// ============================================================================

#[test]
fn test_three_manual_warns_ban_and_clear() {
    let mut env = TestEnvironment::new();
    env.add_admin(ADMIN, "root", 1);
    env.add_user(BOB, "bob");

    for i in 0..3 {
        let text = reply(execute(
            &mut env.store,
            &env.moderation,
            ADMIN,
            AdminCommandKind::Warn,
            "@bob",
            at(Duration::minutes(i)),
        ));
        assert!(!text.starts_with("❗"), "unexpected reply: {}", text);
    }

    let text = reply(execute(
        &mut env.store,
        &env.moderation,
        ADMIN,
        AdminCommandKind::Warns,
        "@bob",
        at(Duration::minutes(5)),
    ));
    assert!(text.contains("no warnings"), "unexpected reply: {}", text);
    assert_eq!(env.store.warn_count(BOB), 0);
    assert_eq!(env.store.bans.get()[&BOB].reason, "3 warns reached");
}

#[test]
fn test_mixed_warn_sources_count_together() {
    let mut env = TestEnvironment::new();
    env.add_user(BOB, "bob");

    let first = env
        .moderation
        .warn(&mut env.store, BOB, "Explicit title detected (auto)", WarnSource::Auto, t0())
        .unwrap();
    assert_eq!(first, WarnOutcome::Warned { count: 1, limit: 3 });
    env.moderation
        .warn(&mut env.store, BOB, "rude", WarnSource::Manual, t0())
        .unwrap();
    let third = env
        .moderation
        .warn(&mut env.store, BOB, "Explicit title detected (auto)", WarnSource::Auto, t0())
        .unwrap();

    assert_eq!(third, WarnOutcome::Banned);
    assert!(env.moderation.is_banned(&mut env.store, BOB, at(Duration::hours(1))));
    assert_eq!(env.reopen().warn_count(BOB), 0);

    let events: Vec<_> = env
        .store
        .recent_history(BOB, 10)
        .iter()
        .map(|e| e.event.as_str())
        .collect();
    assert_eq!(events, vec!["warn", "warn", "warn", "ban", "auto-ban"]);
}

#[test]
fn test_unwarn_resets_the_count() {
    let mut env = TestEnvironment::new();
    env.add_admin(ADMIN, "root", 1);
    env.add_user(BOB, "bob");

    for _ in 0..2 {
        execute(&mut env.store, &env.moderation, ADMIN, AdminCommandKind::Warn, "@bob flood", t0()).unwrap();
    }
    execute(&mut env.store, &env.moderation, ADMIN, AdminCommandKind::Unwarn, "@bob", t0()).unwrap();
    let outcome = env
        .moderation
        .warn(&mut env.store, BOB, "again", WarnSource::Manual, t0())
        .unwrap();
    assert_eq!(outcome, WarnOutcome::Warned { count: 1, limit: 3 });
}

// ============================================================================
// Permissions
// ============================================================================

#[test]
fn test_non_admin_stats_is_denied_and_changes_nothing() {
    let mut env = TestEnvironment::new();
    env.add_user(ALICE, "alice");
    let before = env.store.stats.get().clone();

    let result = execute(&mut env.store, &env.moderation, ALICE, AdminCommandKind::Stats, "", t0());

    assert_eq!(reply(result), DENIAL_MESSAGE);
    assert_eq!(env.store.stats.get(), &before);
}

#[test]
fn test_level_one_cannot_ban() {
    let mut env = TestEnvironment::new();
    env.add_admin(ADMIN, "root", 1);
    env.add_user(ALICE, "alice");

    let result = execute(
        &mut env.store,
        &env.moderation,
        ADMIN,
        AdminCommandKind::Ban,
        "@alice 1d",
        t0(),
    );
    assert!(matches!(result, Err(CommandError::Unauthorized { required: 2 })));
    assert!(env.store.bans.get().is_empty());
}

#[test]
fn test_admin_cannot_grant_above_own_level() {
    let mut env = TestEnvironment::new();
    env.add_admin(ADMIN, "root", 2);
    env.add_user(ALICE, "alice");

    let result = execute(
        &mut env.store,
        &env.moderation,
        ADMIN,
        AdminCommandKind::MakeAdmin,
        "@alice 3",
        t0(),
    );
    assert!(matches!(result, Err(CommandError::Validation(_))));
    assert_eq!(env.store.admin_level(ALICE), 0);

    execute(
        &mut env.store,
        &env.moderation,
        ADMIN,
        AdminCommandKind::MakeAdmin,
        "@ALICE 2",
        t0(),
    )
    .unwrap();
    assert_eq!(env.store.admin_level(ALICE), 2);
    assert_eq!(env.reopen().admin_level(ALICE), 2);
}

#[test]
fn test_unknown_target_is_reported() {
    let mut env = TestEnvironment::new();
    env.add_admin(ADMIN, "root", 2);

    let result = execute(
        &mut env.store,
        &env.moderation,
        ADMIN,
        AdminCommandKind::History,
        "@nobody",
        t0(),
    );
    assert!(matches!(result, Err(CommandError::UnknownUser(_))));
}

#[test]
fn test_sendall_targets_every_known_user() {
    let mut env = TestEnvironment::new();
    env.add_admin(ADMIN, "root", 3);
    env.add_user(ALICE, "alice");
    env.add_user(BOB, "bob");

    let outcome = execute(
        &mut env.store,
        &env.moderation,
        ADMIN,
        AdminCommandKind::SendAll,
        "maintenance tonight",
        t0(),
    )
    .unwrap();
    match outcome {
        CommandOutcome::Broadcast { text, mut recipients } => {
            recipients.sort_unstable();
            assert_eq!(text, "maintenance tonight");
            assert_eq!(recipients, vec![ADMIN, ALICE, BOB]);
        }
        other => panic!("expected a broadcast, got {:?}", other),
    }
}

// ============================================================================
// Anti-spam
// ============================================================================

#[test]
fn test_sixth_request_in_window_bans_without_warning() {
    let mut env = TestEnvironment::new();
    env.add_user(ALICE, "alice");

    for i in 0..5 {
        let screened = env
            .moderation
            .screen_request(&mut env.store, ALICE, at(Duration::seconds(i * 10)));
        assert_eq!(screened, Ok(()));
    }
    let sixth = env
        .moderation
        .screen_request(&mut env.store, ALICE, at(Duration::seconds(60)));

    assert_eq!(sixth, Err(Rejection::Throttled));
    assert_eq!(env.store.bans.get()[&ALICE].reason, "Anti-spam: 6 in 5min");
    assert_eq!(env.store.warn_count(ALICE), 0);
    assert!(env
        .store
        .recent_history(ALICE, 10)
        .iter()
        .any(|e| e.event == "antispam-ban"));
}

#[test]
fn test_spam_does_not_shorten_a_permanent_ban() {
    let mut env = TestEnvironment::new();
    env.add_user(ALICE, "alice");
    env.moderation
        .ban(&mut env.store, ALICE, BanDuration::Permanent, "abuse", t0())
        .unwrap();

    for i in 0..6 {
        let screened = env
            .moderation
            .screen_request(&mut env.store, ALICE, at(Duration::seconds(i)));
        assert_eq!(screened, Err(Rejection::Banned));
    }

    let record = &env.store.bans.get()[&ALICE];
    assert_eq!(record.until, BanExpiry::Permanent);
    assert_eq!(record.reason, "abuse");
    assert!(env.moderation.is_banned(&mut env.store, ALICE, at(Duration::days(2))));
    assert!(!env
        .store
        .recent_history(ALICE, 10)
        .iter()
        .any(|e| e.event == "antispam-ban"));
}

#[test]
fn test_spam_extends_a_shorter_ban() {
    let mut env = TestEnvironment::new();
    env.add_user(ALICE, "alice");
    env.moderation
        .ban(&mut env.store, ALICE, BanDuration::parse("1h").unwrap(), "cool down", t0())
        .unwrap();

    let outcomes: Vec<_> = (0..6)
        .map(|i| {
            env.moderation
                .screen_request(&mut env.store, ALICE, at(Duration::seconds(i)))
        })
        .collect();

    assert_eq!(outcomes.last(), Some(&Err(Rejection::Throttled)));
    assert_eq!(
        env.store.bans.get()[&ALICE].until,
        BanExpiry::At(at(Duration::seconds(5) + Duration::days(1)))
    );
}

#[test]
fn test_requests_spread_beyond_window_are_fine() {
    let mut env = TestEnvironment::new();
    env.add_user(ALICE, "alice");

    for i in 0..12 {
        let screened = env
            .moderation
            .screen_request(&mut env.store, ALICE, at(Duration::minutes(i * 2)));
        assert_eq!(screened, Ok(()));
    }
    assert!(env.store.bans.get().is_empty());
}

#[test]
fn test_explicit_title_filter() {
    assert!(!is_explicit_title(None));
    assert!(!is_explicit_title(Some("")));
    assert!(is_explicit_title(Some("XXX Official Video")));
    assert!(!is_explicit_title(Some("Lo-fi beats to study to")));
}
