//! Inline button callbacks: format and quality choices

use chrono::Utc;
use teloxide::prelude::*;
use teloxide::types::MessageId;

use super::types::{identity_of, register_user, HandlerDeps, HandlerError};
use crate::core::validation::is_youtube_url;
use crate::download::extractor::MediaRequest;
use crate::download::orchestrator::default_video_request;
use crate::storage::cache;
use crate::storage::models::MediaKind;
use crate::telegram::delivery::ChatDelivery;
use crate::telegram::keyboards::{quality_keyboard, CallbackAction};
use crate::telegram::Bot;

pub(super) async fn handle_callback(bot: Bot, q: CallbackQuery, deps: HandlerDeps) -> Result<(), HandlerError> {
    if let Err(e) = bot.answer_callback_query(q.id.clone()).await {
        log::debug!("Failed to answer callback query: {}", e);
    }

    let Some(identity) = identity_of(&q.from) else {
        return Ok(());
    };
    let Some((chat_id, message_id)) = q.message.as_ref().map(|m| (m.chat().id, m.id())) else {
        return Ok(());
    };
    register_user(&deps, &identity).await;

    let pending = {
        let mut guard = deps.state.lock().await;
        let state = &mut *guard;
        state
            .moderation
            .check_access(&mut state.store, identity.id, Utc::now())
            .map(|()| state.pending_urls.get(&identity.id).cloned())
    };
    let url = match pending {
        Err(rejection) => {
            bot.edit_message_text(chat_id, message_id, rejection.user_message()).await?;
            return Ok(());
        }
        Ok(None) => {
            bot.edit_message_text(chat_id, message_id, "⛔ Send a URL first.").await?;
            return Ok(());
        }
        Ok(Some(url)) => url,
    };

    let Some(action) = q.data.as_deref().and_then(CallbackAction::parse) else {
        log::warn!("Unknown callback data from {}: {:?}", identity.id, q.data);
        return Ok(());
    };
    log::info!("User {} chose {:?} for {}", identity.id, action, url);

    if action == CallbackAction::Video && is_youtube_url(&url) && !has_cached_video(&deps, &url).await {
        bot.edit_message_text(chat_id, message_id, "📺 Choose a quality:")
            .reply_markup(quality_keyboard())
            .await?;
        return Ok(());
    }

    spawn_job(bot, chat_id, message_id, identity.id, url, action, deps);
    Ok(())
}

/// Runs the download in its own task so the dispatcher is not blocked.
fn spawn_job(
    bot: Bot,
    chat_id: ChatId,
    message_id: MessageId,
    user_id: i64,
    url: String,
    action: CallbackAction,
    deps: HandlerDeps,
) {
    let target = ChatDelivery::new(bot, chat_id, message_id);
    let orchestrator = deps.orchestrator;
    tokio::spawn(async move {
        let outcome = match action {
            CallbackAction::FullSong => orchestrator.full_song(user_id, &url, &target).await,
            CallbackAction::Audio => match orchestrator.try_cached(user_id, &url, MediaKind::Audio, &target).await {
                Some(outcome) => outcome,
                None => orchestrator.run(user_id, &url, MediaRequest::Audio, &target).await,
            },
            CallbackAction::Video => match orchestrator.try_cached(user_id, &url, MediaKind::Video, &target).await {
                Some(outcome) => outcome,
                None => orchestrator.run(user_id, &url, default_video_request(), &target).await,
            },
            CallbackAction::Quality(quality) => {
                orchestrator
                    .run(user_id, &url, MediaRequest::Video(quality), &target)
                    .await
            }
        };
        log::info!("Job for user {} ({}) finished: {:?}", user_id, url, outcome);
    });
}

async fn has_cached_video(deps: &HandlerDeps, url: &str) -> bool {
    let state = deps.state.lock().await;
    cache::lookup_for(&state.store, url, MediaKind::Video).is_some()
}
