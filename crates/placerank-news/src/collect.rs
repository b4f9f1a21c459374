use std::collections::BTreeMap;
use std::time::Duration;

use placerank_core::{AbortFlag, AppConfig};

use crate::enrich::EnrichmentChain;
use crate::payload::{build_news_payload, NewsPayload};
use crate::search::NewsSearchClient;

#[derive(Debug, Clone)]
pub struct NewsCollectSettings {
    pub limit_per_category: usize,
    pub results_per_keyword: u32,
    pub keyword_delay: Duration,
}

impl NewsCollectSettings {
    #[must_use]
    pub fn from_app_config(config: &AppConfig) -> Self {
        Self {
            limit_per_category: config.news_limit_per_category,
            results_per_keyword: config.news_results_per_keyword,
            ..Self::default()
        }
    }
}

impl Default for NewsCollectSettings {
    fn default() -> Self {
        Self {
            limit_per_category: 10,
            results_per_keyword: 20,
            keyword_delay: Duration::from_millis(400),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct NewsHarvest {
    pub payloads: Vec<NewsPayload>,
    /// `(category, keyword, reason)` for searches that failed.
    pub failed_searches: Vec<(String, String, String)>,
    pub aborted: bool,
}

/// Gathers up to `limit_per_category` payloads for each news category.
pub struct NewsCollector<'a> {
    search: &'a NewsSearchClient,
    chain: &'a EnrichmentChain,
    settings: NewsCollectSettings,
    abort: AbortFlag,
}

impl<'a> NewsCollector<'a> {
    #[must_use]
    pub fn new(
        search: &'a NewsSearchClient,
        chain: &'a EnrichmentChain,
        settings: NewsCollectSettings,
        abort: AbortFlag,
    ) -> Self {
        Self {
            search,
            chain,
            settings,
            abort,
        }
    }

    /// Searches each category's keywords in order until the category limit
    /// is met. A failed search is recorded and the next keyword tried.
    pub async fn collect(&self, categories: &BTreeMap<String, Vec<String>>) -> NewsHarvest {
        let mut harvest = NewsHarvest::default();
        let mut first_call = true;

        'categories: for (category, keywords) in categories {
            let mut kept = 0usize;

            for keyword in keywords {
                if kept >= self.settings.limit_per_category {
                    break;
                }
                if self.abort.is_raised() {
                    harvest.aborted = true;
                    break 'categories;
                }
                if !first_call && !self.settings.keyword_delay.is_zero() {
                    tokio::time::sleep(self.settings.keyword_delay).await;
                }
                first_call = false;

                let items = match self
                    .search
                    .search(keyword, self.settings.results_per_keyword)
                    .await
                {
                    Ok(items) => items,
                    Err(e) => {
                        tracing::warn!(category, keyword, error = %e, "news search failed");
                        harvest.failed_searches.push((
                            category.clone(),
                            keyword.clone(),
                            e.to_string(),
                        ));
                        continue;
                    }
                };
                tracing::debug!(category, keyword, hits = items.len(), "news search done");

                for item in &items {
                    if kept >= self.settings.limit_per_category {
                        break;
                    }
                    if let Some(payload) = build_news_payload(item, category, self.chain).await {
                        harvest.payloads.push(payload);
                        kept += 1;
                    }
                }
            }

            tracing::info!(category, kept, "news category collected");
        }

        harvest
    }
}
