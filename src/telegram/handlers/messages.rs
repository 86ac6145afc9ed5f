//! Free-text messages: the URL submission path

use chrono::Utc;
use teloxide::prelude::*;

use super::types::{identity_of, register_user, HandlerDeps, HandlerError};
use crate::core::validation::parse_media_url;
use crate::telegram::keyboards::format_keyboard;
use crate::telegram::Bot;

/// Slash-prefixed text that no command handler matched
fn is_command_text(text: &str) -> bool {
    text.trim_start().starts_with('/')
}

/// Spam accounting, ban check, URL validation, then the format keyboard.
pub(super) async fn handle_text(bot: Bot, msg: Message, deps: HandlerDeps) -> Result<(), HandlerError> {
    let (Some(identity), Some(text)) = (msg.from.as_ref().and_then(identity_of), msg.text()) else {
        return Ok(());
    };
    if is_command_text(text) {
        log::debug!("Ignoring unknown command from {}: {}", identity.id, text);
        return Ok(());
    }
    register_user(&deps, &identity).await;

    let screened = {
        let mut guard = deps.state.lock().await;
        let state = &mut *guard;
        state.moderation.screen_request(&mut state.store, identity.id, Utc::now())
    };
    if let Err(rejection) = screened {
        log::info!("Request from {} rejected: {:?}", identity.id, rejection);
        bot.send_message(msg.chat.id, rejection.user_message()).await?;
        return Ok(());
    }

    let url = match parse_media_url(text) {
        Ok(url) => url,
        Err(e) => {
            log::debug!("User {} sent non-URL text: {}", identity.id, e);
            bot.send_message(msg.chat.id, "❌ Please send a valid URL.").await?;
            return Ok(());
        }
    };

    log::info!("User {} submitted {}", identity.id, url);
    deps.state
        .lock()
        .await
        .pending_urls
        .insert(identity.id, url.to_string());

    bot.send_message(msg.chat.id, "⬇️ Choose a format:")
        .reply_markup(format_keyboard())
        .await?;
    Ok(())
}
