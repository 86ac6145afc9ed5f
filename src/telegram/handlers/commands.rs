//! Slash command handlers

use chrono::Utc;
use indoc::formatdoc;
use teloxide::prelude::*;

use super::types::{identity_of, register_user, HandlerDeps, HandlerError};
use crate::core::admin::{self, broadcast_report, CommandOutcome};
use crate::core::config;
use crate::telegram::bot::Command;
use crate::telegram::Bot;

fn welcome_text() -> String {
    let window_minutes = config::moderation::ANTI_SPAM_WINDOW_SECS / 60;
    formatdoc! {"
        🎬 Hi! Send me a YouTube or Instagram URL.
        🎥 I can download it as video or 🎧 audio.
        ⚠️ Explicit titles earn an automatic warning. Anti-spam: {count} requests / {window} min.",
        count = config::moderation::ANTI_SPAM_COUNT,
        window = window_minutes,
    }
}

/// Handles every command from the [`Command`] enum.
pub(super) async fn handle_command(bot: Bot, msg: Message, cmd: Command, deps: HandlerDeps) -> Result<(), HandlerError> {
    let Some(identity) = msg.from.as_ref().and_then(identity_of) else {
        return Ok(());
    };
    log::info!("Received command {:?} from user {}", cmd, identity.id);
    register_user(&deps, &identity).await;

    let Some((kind, args)) = cmd.as_admin() else {
        return handle_start(&bot, &msg, identity.id, &deps).await;
    };

    let outcome = {
        let mut guard = deps.state.lock().await;
        let state = &mut *guard;
        admin::execute(&mut state.store, &state.moderation, identity.id, kind, args, Utc::now())
    };

    match outcome {
        Ok(CommandOutcome::Reply(text)) => {
            bot.send_message(msg.chat.id, text).await?;
        }
        Ok(CommandOutcome::Broadcast { text, recipients }) => {
            bot.send_message(msg.chat.id, "📣 Broadcast starting...").await?;
            let report = broadcast(&bot, &text, &recipients).await;
            bot.send_message(msg.chat.id, report).await?;
        }
        Err(e) => {
            log::info!("/{} from {} failed: {}", kind, identity.id, e);
            bot.send_message(msg.chat.id, e.user_message()).await?;
        }
    }
    Ok(())
}

async fn handle_start(bot: &Bot, msg: &Message, user_id: i64, deps: &HandlerDeps) -> Result<(), HandlerError> {
    let rejected = {
        let mut guard = deps.state.lock().await;
        let state = &mut *guard;
        state.moderation.check_access(&mut state.store, user_id, Utc::now())
    };
    let text = match rejected {
        Err(rejection) => rejection.user_message().to_string(),
        Ok(()) => welcome_text(),
    };
    bot.send_message(msg.chat.id, text).await?;
    Ok(())
}

/// Sends `text` to every recipient and returns the summary reply.
async fn broadcast(bot: &Bot, text: &str, recipients: &[i64]) -> String {
    let mut success = 0;
    let mut failed = 0;
    for &user_id in recipients {
        match bot.send_message(ChatId(user_id), text).await {
            Ok(_) => success += 1,
            Err(e) => {
                log::warn!("Broadcast to {} failed: {}", user_id, e);
                failed += 1;
            }
        }
    }
    log::info!("Broadcast finished: {} sent, {} failed", success, failed);
    broadcast_report(success, failed)
}
