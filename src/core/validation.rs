//! Validation of URLs submitted by users.

use thiserror::Error;
use url::Url;

/// Validation errors
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    /// Text is not an absolute http(s) URL
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),
}

/// Parses free text as a media URL.
///
/// Only absolute `http`/`https` URLs with a host are accepted; the host itself
/// is not restricted, the extractor decides what it supports.
///
/// # Examples
/// ```
/// use mediagrab::core::validation::parse_media_url;
///
/// assert!(parse_media_url("https://youtu.be/dQw4w9WgXcQ").is_ok());
/// assert!(parse_media_url("  https://www.instagram.com/reel/abc/ ").is_ok());
/// assert!(parse_media_url("ftp://youtube.com/video").is_err());
/// assert!(parse_media_url("hello there").is_err());
/// ```
pub fn parse_media_url(text: &str) -> Result<Url, ValidationError> {
    let text = text.trim();
    let parsed = Url::parse(text).map_err(|_| ValidationError::InvalidUrl(text.to_string()))?;

    if parsed.scheme() != "http" && parsed.scheme() != "https" {
        return Err(ValidationError::InvalidUrl(format!(
            "{} (invalid scheme: {})",
            text,
            parsed.scheme()
        )));
    }
    if matches!(parsed.host_str(), None | Some("")) {
        return Err(ValidationError::InvalidUrl(format!("{} (no host)", text)));
    }

    Ok(parsed)
}

/// True for youtube.com (and subdomains), youtu.be and youtube-nocookie.com
pub fn is_youtube_url(url: &str) -> bool {
    let Ok(parsed) = Url::parse(url) else {
        return false;
    };
    let Some(host) = parsed.host_str() else {
        return false;
    };
    host == "youtube.com"
        || host.ends_with(".youtube.com")
        || host == "youtu.be"
        || host.ends_with(".youtube-nocookie.com")
}
