//! "Full song" lookup: turns a clip title into the URL of its full version.

use lazy_regex::regex_captures;
use std::time::Duration;

use crate::core::config;
use crate::core::error::AppError;
use crate::download::error::DownloadError;

/// Canonical watch URL built from a found video id
const WATCH_URL: &str = "https://www.youtube.com/watch?v=";

const USER_AGENT: &str =
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0 Safari/537.36";

/// Keeps ASCII letters, digits and spaces only.
pub fn build_search_query(title: &str) -> String {
    title
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == ' ')
        .collect::<String>()
        .trim()
        .to_string()
}

/// First `watch?v=<11 chars>` id on a results page
pub fn extract_first_video_id(page: &str) -> Option<&str> {
    regex_captures!(r"watch\?v=([^\s]{11})", page).map(|(_, id)| id)
}

/// Queries the search results page for a title's official audio.
#[derive(Debug, Clone)]
pub struct FullSongSearch {
    client: reqwest::Client,
    base_url: String,
}

impl Default for FullSongSearch {
    fn default() -> Self {
        Self::new(config::SEARCH_BASE_URL.clone())
    }
}

impl FullSongSearch {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_timeout(base_url, config::network::search_timeout())
    }

    /// Like [`FullSongSearch::new`] with an explicit per-request timeout
    pub fn with_timeout(base_url: impl Into<String>, timeout: Duration) -> Self {
        let client = match reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()
        {
            Ok(client) => client,
            Err(e) => {
                log::error!("Failed to build search HTTP client, using defaults: {}", e);
                reqwest::Client::new()
            }
        };
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn search_url(&self, query: &str) -> String {
        format!(
            "{}/results?search_query={}+official+audio",
            self.base_url,
            urlencoding::encode(query)
        )
    }

    /// Returns the watch URL of the first result, or `None` when nothing matched.
    pub async fn find_full_version(&self, title: &str) -> Result<Option<String>, AppError> {
        let query = build_search_query(title);
        if query.is_empty() {
            return Err(DownloadError::Search(format!("nothing to search for in title {:?}", title)).into());
        }

        let url = self.search_url(&query);
        log::debug!("Full song search: {}", url);
        let page = self
            .client
            .get(&url)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;

        let found = extract_first_video_id(&page).map(|id| format!("{}{}", WATCH_URL, id));
        match &found {
            Some(watch) => log::info!("Full song for {:?}: {}", title, watch),
            None => log::info!("No full song result for {:?}", title),
        }
        Ok(found)
    }
}
