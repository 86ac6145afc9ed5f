//! Inline keyboards and their callback payloads.

use std::str::FromStr;
use strum::IntoEnumIterator;
use teloxide::types::{InlineKeyboardButton, InlineKeyboardMarkup};

use crate::download::extractor::VideoQuality;

/// Parsed callback data of an inline button
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallbackAction {
    Video,
    Audio,
    FullSong,
    Quality(VideoQuality),
}

impl CallbackAction {
    /// Parses `video`, `audio`, `full_song` or `q_<quality>`.
    pub fn parse(data: &str) -> Option<Self> {
        match data {
            "video" => Some(CallbackAction::Video),
            "audio" => Some(CallbackAction::Audio),
            "full_song" => Some(CallbackAction::FullSong),
            other => other
                .strip_prefix("q_")
                .and_then(|q| VideoQuality::from_str(q).ok())
                .map(CallbackAction::Quality),
        }
    }

    pub fn data(self) -> String {
        match self {
            CallbackAction::Video => "video".to_string(),
            CallbackAction::Audio => "audio".to_string(),
            CallbackAction::FullSong => "full_song".to_string(),
            CallbackAction::Quality(q) => format!("q_{}", q),
        }
    }
}

/// Video / audio / full song choice shown after a URL
pub fn format_keyboard() -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(vec![
        vec![InlineKeyboardButton::callback("🎥 Video", CallbackAction::Video.data())],
        vec![InlineKeyboardButton::callback("🎵 Audio", CallbackAction::Audio.data())],
        vec![InlineKeyboardButton::callback("🎶 Full song", CallbackAction::FullSong.data())],
    ])
}

/// Two-by-two grid of video qualities
pub fn quality_keyboard() -> InlineKeyboardMarkup {
    let buttons: Vec<InlineKeyboardButton> = VideoQuality::iter()
        .map(|q| InlineKeyboardButton::callback(q.label(), CallbackAction::Quality(q).data()))
        .collect();
    InlineKeyboardMarkup::new(buttons.chunks(2).map(<[InlineKeyboardButton]>::to_vec))
}
