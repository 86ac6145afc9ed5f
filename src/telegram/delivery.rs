//! Chat-backed [`DeliveryTarget`].

use async_trait::async_trait;
use std::path::Path;
use teloxide::prelude::*;
use teloxide::types::{InputFile, MessageId};

use crate::core::error::AppError;
use crate::download::error::DownloadError;
use crate::download::orchestrator::DeliveryTarget;
use crate::telegram::Bot;

/// Edits one status message and sends files into the same chat.
#[derive(Clone)]
pub struct ChatDelivery {
    bot: Bot,
    chat_id: ChatId,
    status_message: MessageId,
}

impl ChatDelivery {
    pub fn new(bot: Bot, chat_id: ChatId, status_message: MessageId) -> Self {
        Self {
            bot,
            chat_id,
            status_message,
        }
    }
}

#[async_trait]
impl DeliveryTarget for ChatDelivery {
    async fn status(&self, text: &str) {
        if let Err(e) = self
            .bot
            .edit_message_text(self.chat_id, self.status_message, text)
            .await
        {
            // Same text as before is not an error worth reporting
            if e.to_string().contains("message is not modified") {
                return;
            }
            log::warn!("Failed to edit status message in chat {}: {}", self.chat_id, e);
        }
    }

    async fn send_audio(&self, file: &Path, caption: Option<&str>) -> Result<(), AppError> {
        let mut request = self.bot.send_audio(self.chat_id, InputFile::file(file));
        if let Some(caption) = caption {
            request = request.caption(caption);
        }
        request
            .await
            .map_err(|e| DownloadError::SendFailed(format!("send_audio: {}", e)))?;
        Ok(())
    }

    async fn send_video(&self, file: &Path, caption: Option<&str>) -> Result<(), AppError> {
        let mut request = self
            .bot
            .send_video(self.chat_id, InputFile::file(file))
            .supports_streaming(true);
        if let Some(caption) = caption {
            request = request.caption(caption);
        }
        request
            .await
            .map_err(|e| DownloadError::SendFailed(format!("send_video: {}", e)))?;
        Ok(())
    }
}
