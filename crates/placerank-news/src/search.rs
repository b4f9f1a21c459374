//! Client for the Naver news search API.

use std::time::Duration;

use reqwest::{Client, Url};
use serde::Deserialize;

use crate::error::NewsError;

const DEFAULT_BASE_URL: &str = "https://openapi.naver.com/";
const NEWS_SEARCH_PATH: &str = "v1/search/news.json";
const SEARCH_TIMEOUT_SECS: u64 = 5;

/// One search hit. `title` and `description` carry inline `<b>` markup.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct NewsItem {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub originallink: Option<String>,
    #[serde(default)]
    pub link: Option<String>,
    #[serde(default, rename = "pubDate")]
    pub pub_date: Option<String>,
}

impl NewsItem {
    /// Publisher URL if present, else the portal link.
    #[must_use]
    pub fn source_url(&self) -> Option<&str> {
        [self.originallink.as_deref(), self.link.as_deref()]
            .into_iter()
            .flatten()
            .map(str::trim)
            .find(|url| !url.is_empty())
    }
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    items: Vec<NewsItem>,
}

pub struct NewsSearchClient {
    client: Client,
    client_id: String,
    client_secret: String,
    base_url: Url,
}

impl std::fmt::Debug for NewsSearchClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NewsSearchClient")
            .field("base_url", &self.base_url.as_str())
            .field("client_id", &"[redacted]")
            .field("client_secret", &"[redacted]")
            .finish()
    }
}

impl NewsSearchClient {
    /// # Errors
    ///
    /// Returns [`NewsError::Http`] if the underlying `reqwest::Client` cannot
    /// be constructed.
    pub fn new(client_id: &str, client_secret: &str) -> Result<Self, NewsError> {
        Self::with_base_url(client_id, client_secret, DEFAULT_BASE_URL)
    }

    /// Creates a client against a custom base URL (for testing with wiremock).
    ///
    /// # Errors
    ///
    /// Returns [`NewsError::Http`] if the client cannot be constructed, or
    /// [`NewsError::InvalidBaseUrl`] if `base_url` does not parse.
    pub fn with_base_url(
        client_id: &str,
        client_secret: &str,
        base_url: &str,
    ) -> Result<Self, NewsError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(SEARCH_TIMEOUT_SECS))
            .build()?;
        let normalised = format!("{}/", base_url.trim_end_matches('/'));
        let base_url = Url::parse(&normalised).map_err(|e| NewsError::InvalidBaseUrl {
            url: base_url.to_owned(),
            reason: e.to_string(),
        })?;
        Ok(Self {
            client,
            client_id: client_id.to_owned(),
            client_secret: client_secret.to_owned(),
            base_url,
        })
    }

    /// Latest news for `keyword`, newest first, at most `display` items.
    ///
    /// # Errors
    ///
    /// - [`NewsError::Http`] on network failure or timeout.
    /// - [`NewsError::UnexpectedStatus`] on a non-2xx response.
    /// - [`NewsError::Deserialize`] if the body is not the expected JSON.
    pub async fn search(&self, keyword: &str, display: u32) -> Result<Vec<NewsItem>, NewsError> {
        let url = self
            .base_url
            .join(NEWS_SEARCH_PATH)
            .map_err(|e| NewsError::InvalidBaseUrl {
                url: self.base_url.to_string(),
                reason: e.to_string(),
            })?;

        let response = self
            .client
            .get(url.clone())
            .header("X-Naver-Client-Id", &self.client_id)
            .header("X-Naver-Client-Secret", &self.client_secret)
            .query(&[
                ("query", keyword),
                ("display", &display.to_string()),
                ("sort", "date"),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(NewsError::UnexpectedStatus {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        let body = response.text().await?;
        let parsed: SearchResponse =
            serde_json::from_str(&body).map_err(|e| NewsError::Deserialize {
                context: format!("news search for '{keyword}'"),
                source: e,
            })?;
        Ok(parsed.items)
    }
}
