use std::collections::HashSet;

use placerank_core::{canonical_place_url, AbortFlag, AppConfig, Credentials, Entity};
use serde::{Deserialize, Serialize};

use crate::error::ScraperError;
use crate::extract::{extract_entity_id, extract_numeric_fields};
use crate::fetcher::PageFetcher;
use crate::html::{parse_links, parse_options, parse_tables, TableRow};
use crate::pagination::{find_next_page, join_href};
use crate::session::{fetch_with_reauth, Session};
use crate::throttle::Throttle;

/// Why the collector stopped paging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    TargetReached,
    PageLimit,
    NoNextPage,
    PageAdvanceFailed,
    Aborted,
}

impl StopReason {
    /// `true` when the harvest covered the whole population the source offered
    /// within the configured bounds, so absent entities may be deactivated.
    #[must_use]
    pub fn is_complete(self) -> bool {
        matches!(
            self,
            StopReason::TargetReached | StopReason::NoNextPage | StopReason::PageLimit
        )
    }
}

#[derive(Debug, Clone)]
pub struct CollectorSettings {
    pub listing_url: String,
    pub target_count: usize,
    pub max_pages: usize,
    pub page_delay_ms: u64,
}

impl CollectorSettings {
    #[must_use]
    pub fn from_app_config(config: &AppConfig) -> Self {
        Self {
            listing_url: config.listing_path.clone(),
            target_count: config.target_entity_count,
            max_pages: config.max_pages,
            page_delay_ms: config.page_delay_ms,
        }
    }
}

#[derive(Debug, Clone)]
pub struct CollectOutcome {
    pub entities: Vec<Entity>,
    pub pages_fetched: usize,
    /// Entities that came from the select-box fallback rather than table rows.
    pub from_options: usize,
    pub stop_reason: StopReason,
}

/// Pages through the listing source and harvests distinct entities.
pub struct Collector<'a, F: PageFetcher + ?Sized> {
    fetcher: &'a F,
    credentials: &'a Credentials,
    settings: CollectorSettings,
    abort: AbortFlag,
}

impl<'a, F: PageFetcher + ?Sized> Collector<'a, F> {
    #[must_use]
    pub fn new(
        fetcher: &'a F,
        credentials: &'a Credentials,
        settings: CollectorSettings,
        abort: AbortFlag,
    ) -> Self {
        Self {
            fetcher,
            credentials,
            settings,
            abort,
        }
    }

    /// Harvests up to `target_count` distinct entities.
    ///
    /// Rows without a resolvable detail-page key are skipped. Once any page
    /// has been read, later fetch failures end collection with
    /// [`StopReason::PageAdvanceFailed`] instead of an error.
    ///
    /// # Errors
    ///
    /// Returns the fetch error when the first page cannot be retrieved.
    pub async fn collect(&self, session: &mut Session) -> Result<CollectOutcome, ScraperError> {
        let target = self.settings.target_count;
        let mut harvest = Harvest::new(target);
        let mut throttle = Throttle::from_millis(self.settings.page_delay_ms);
        let mut url = self.settings.listing_url.clone();
        let mut page = 1usize;
        let mut pages_fetched = 0usize;
        let mut last_page: Option<String> = None;

        let stop_reason = loop {
            if self.abort.is_raised() {
                tracing::warn!(page, collected = harvest.len(), "collection aborted");
                break StopReason::Aborted;
            }

            throttle.wait().await;
            let html = match fetch_with_reauth(self.fetcher, session, self.credentials, &url, &[])
                .await
            {
                Ok(html) => html,
                Err(e) if pages_fetched == 0 => return Err(e),
                Err(e) => {
                    tracing::warn!(page, url = %url, error = %e, "page advance failed; keeping partial harvest");
                    break StopReason::PageAdvanceFailed;
                }
            };
            pages_fetched += 1;

            let added = harvest.absorb_rows(&html);
            tracing::debug!(page, added, total = harvest.len(), "listing page harvested");

            let next = find_next_page(&parse_links(&html), page);
            last_page = Some(html);

            if harvest.is_full() {
                break StopReason::TargetReached;
            }
            if page >= self.settings.max_pages {
                break StopReason::PageLimit;
            }
            match next {
                Some(href) => {
                    url = join_href(&url, &href);
                    page += 1;
                }
                None => break StopReason::NoNextPage,
            }
        };

        let mut from_options = 0;
        if stop_reason != StopReason::Aborted && !harvest.is_full() {
            if let Some(html) = last_page.as_deref() {
                from_options = harvest.absorb_options(html);
                if from_options > 0 {
                    tracing::info!(from_options, "supplemented harvest from select options");
                }
            }
        }

        tracing::info!(
            pages_fetched,
            collected = harvest.len(),
            ?stop_reason,
            "entity collection finished"
        );

        Ok(CollectOutcome {
            entities: harvest.entities,
            pages_fetched,
            from_options,
            stop_reason,
        })
    }
}

/// Deduplicating, target-bounded accumulator.
struct Harvest {
    target: usize,
    seen: HashSet<String>,
    entities: Vec<Entity>,
}

impl Harvest {
    fn new(target: usize) -> Self {
        Self {
            target,
            seen: HashSet::new(),
            entities: Vec::new(),
        }
    }

    fn len(&self) -> usize {
        self.entities.len()
    }

    fn is_full(&self) -> bool {
        self.entities.len() >= self.target
    }

    fn push(&mut self, entity: Entity) -> bool {
        if self.is_full() || !self.seen.insert(entity.entity_id.clone()) {
            return false;
        }
        self.entities.push(entity);
        true
    }

    fn absorb_rows(&mut self, html: &str) -> usize {
        let mut added = 0;
        for table in parse_tables(html) {
            for row in &table.rows {
                if self.is_full() {
                    return added;
                }
                if let Some(entity) = entity_from_row(row) {
                    if self.push(entity) {
                        added += 1;
                    }
                }
            }
        }
        added
    }

    fn absorb_options(&mut self, html: &str) -> usize {
        let mut added = 0;
        for option in parse_options(html) {
            if self.is_full() {
                break;
            }
            if !option.value.contains("place.naver.com") || option.text.is_empty() {
                continue;
            }
            let Some(id) = extract_entity_id(&option.value) else {
                continue;
            };
            if self.push(Entity::minimal(&id, &option.text)) {
                added += 1;
            }
        }
        added
    }
}

fn non_empty(cell: Option<&String>) -> Option<String> {
    cell.filter(|c| !c.is_empty()).cloned()
}

/// Builds an entity from a listing row, or `None` when the row has fewer
/// than two filled cells or no resolvable detail-page key.
fn entity_from_row(row: &TableRow) -> Option<Entity> {
    if row.non_empty_cells() < 2 {
        return None;
    }
    let link = row.place_link()?;
    let entity_id = extract_entity_id(&link.href)?;
    let name = non_empty(row.cells.get(1)).or_else(|| {
        let text = link.text.trim();
        (!text.is_empty()).then(|| text.to_owned())
    })?;

    Some(Entity {
        source_url: canonical_place_url(&entity_id),
        entity_id,
        name,
        category: non_empty(row.cells.get(2)),
        address: non_empty(row.cells.get(3)),
        phone: None,
        numeric: extract_numeric_fields(&row.cells),
    })
}
