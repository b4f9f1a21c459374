//! Full-article enrichment through an ordered list of extraction endpoints.

use std::time::Duration;

use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use reqwest::Client;
use serde::Deserialize;

use crate::error::NewsError;

/// Tried in order when no endpoint is configured.
pub const DEFAULT_ENDPOINTS: [&str; 3] = [
    "http://localhost:3003",
    "http://127.0.0.1:3003",
    "https://naver-keyword-tool.onrender.com",
];

/// Everything except unreserved characters is escaped, `/` and `:` included.
const URL_PARAM: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

/// Extracted article body, as returned by the first endpoint that succeeded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnrichedArticle {
    pub content: String,
    /// Canonical source URL reported by the extractor, if any.
    pub source_url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FetchEnvelope {
    #[serde(default)]
    success: bool,
    data: Option<FetchData>,
}

#[derive(Debug, Deserialize)]
struct FetchData {
    #[serde(default)]
    content: Option<String>,
    #[serde(default, rename = "sourceUrl")]
    source_url: Option<String>,
}

/// Ordered, deduplicated candidate bases with trailing slashes removed.
///
/// Falls back to [`DEFAULT_ENDPOINTS`] when nothing usable is configured.
#[must_use]
pub fn candidate_bases(configured: &[String]) -> Vec<String> {
    let mut bases: Vec<String> = Vec::new();
    for base in configured {
        let base = base.trim().trim_end_matches('/');
        if !base.is_empty() && !bases.iter().any(|b| b == base) {
            bases.push(base.to_owned());
        }
    }
    if bases.is_empty() {
        bases = DEFAULT_ENDPOINTS.iter().map(|b| (*b).to_owned()).collect();
    }
    bases
}

#[derive(Debug)]
pub struct EnrichmentChain {
    client: Client,
    bases: Vec<String>,
}

impl EnrichmentChain {
    /// # Errors
    ///
    /// Returns [`NewsError::Http`] if the underlying `reqwest::Client` cannot
    /// be constructed.
    pub fn new(configured: &[String], timeout_secs: u64) -> Result<Self, NewsError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()?;
        Ok(Self {
            client,
            bases: candidate_bases(configured),
        })
    }

    #[must_use]
    pub fn bases(&self) -> &[String] {
        &self.bases
    }

    /// Tries each endpoint in order and returns the first non-empty article.
    ///
    /// Timeouts, non-200 responses, malformed payloads and empty content all
    /// move on to the next candidate. `None` means every candidate failed.
    pub async fn enrich(&self, source_url: &str) -> Option<EnrichedArticle> {
        let encoded = utf8_percent_encode(source_url, URL_PARAM).to_string();

        for base in &self.bases {
            let fetch_url = format!("{base}/api/news-fetch?url={encoded}");
            match self.try_endpoint(&fetch_url).await {
                Ok(Some(article)) => return Some(article),
                Ok(None) => {
                    tracing::debug!(endpoint = %base, source_url, "extractor returned no content");
                }
                Err(e) => {
                    tracing::warn!(endpoint = %base, source_url, error = %e, "extractor failed");
                }
            }
        }

        tracing::info!(source_url, "all extractors failed; using summary fallback");
        None
    }

    async fn try_endpoint(&self, fetch_url: &str) -> Result<Option<EnrichedArticle>, NewsError> {
        let response = self.client.get(fetch_url).send().await?;
        let status = response.status();
        if status != reqwest::StatusCode::OK {
            return Err(NewsError::UnexpectedStatus {
                status: status.as_u16(),
                url: fetch_url.to_owned(),
            });
        }

        let body = response.text().await?;
        let envelope: FetchEnvelope =
            serde_json::from_str(&body).map_err(|e| NewsError::Deserialize {
                context: "news-fetch response".to_owned(),
                source: e,
            })?;

        if !envelope.success {
            return Ok(None);
        }
        let Some(data) = envelope.data else {
            return Ok(None);
        };
        let Some(content) = data.content.filter(|c| !c.trim().is_empty()) else {
            return Ok(None);
        };
        Ok(Some(EnrichedArticle {
            content,
            source_url: data.source_url.filter(|u| !u.trim().is_empty()),
        }))
    }
}
