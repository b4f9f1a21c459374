use std::collections::HashSet;

use placerank_core::{AppConfig, Credentials, RankedEntry};

use crate::error::ScraperError;
use crate::extract::{extract_entity_id, extract_numeric_fields};
use crate::fetcher::PageFetcher;
use crate::html::{parse_tables, Table, TableRow};
use crate::session::{fetch_with_reauth, Session};

#[derive(Debug, Clone)]
pub struct SnapshotSettings {
    pub rank_check_url: String,
    /// Maximum entries kept per keyword.
    pub cap: usize,
}

impl SnapshotSettings {
    #[must_use]
    pub fn from_app_config(config: &AppConfig) -> Self {
        Self {
            rank_check_url: config.rank_check_path.clone(),
            cap: config.snapshot_cap,
        }
    }
}

/// Captures the ranked result list for one keyword at a time.
pub struct SnapshotEngine<'a, F: PageFetcher + ?Sized> {
    fetcher: &'a F,
    credentials: &'a Credentials,
    settings: SnapshotSettings,
}

impl<'a, F: PageFetcher + ?Sized> SnapshotEngine<'a, F> {
    #[must_use]
    pub fn new(fetcher: &'a F, credentials: &'a Credentials, settings: SnapshotSettings) -> Self {
        Self {
            fetcher,
            credentials,
            settings,
        }
    }

    /// Issues one rank-check query for `keyword` and extracts its top list.
    ///
    /// An expired session is renewed once and the query retried.
    ///
    /// # Errors
    ///
    /// Returns the fetch error; the caller skips the keyword and continues.
    pub async fn snapshot(
        &self,
        session: &mut Session,
        keyword: &str,
    ) -> Result<Vec<RankedEntry>, ScraperError> {
        let query = [("keyword".to_owned(), keyword.to_owned())];
        let html = fetch_with_reauth(
            self.fetcher,
            session,
            self.credentials,
            &self.settings.rank_check_url,
            &query,
        )
        .await?;

        let entries = parse_ranking(&html, self.settings.cap);
        if entries.is_empty() {
            tracing::warn!(keyword, "rank-check page had no ranking rows");
        } else {
            tracing::debug!(keyword, entries = entries.len(), "keyword snapshot captured");
        }
        Ok(entries)
    }
}

/// Extracts up to `cap` ranked entries from a rank-check result page.
///
/// Reads the first table whose class mentions `ranking`, else the first
/// table. A listing that appears more than once (an ad slot and its organic
/// slot) keeps only its first row. Ranks are the 1-based ordinal among rows
/// that contribute, so they are contiguous even when rows are skipped.
#[must_use]
pub fn parse_ranking(html: &str, cap: usize) -> Vec<RankedEntry> {
    let tables = parse_tables(html);
    let Some(table) = pick_ranking_table(&tables) else {
        return Vec::new();
    };

    let mut seen: HashSet<String> = HashSet::new();
    table
        .rows
        .iter()
        .filter_map(entry_fields)
        .filter(|(entity_id, name, _)| {
            let key = match entity_id {
                Some(id) => format!("id:{id}"),
                None => format!("name:{name}"),
            };
            seen.insert(key)
        })
        .take(cap)
        .zip(1..)
        .map(|((entity_id, name, row), rank)| RankedEntry {
            rank,
            entity_id,
            name,
            numeric: extract_numeric_fields(&row.cells),
        })
        .collect()
}

fn pick_ranking_table(tables: &[Table]) -> Option<&Table> {
    tables
        .iter()
        .find(|t| {
            t.class
                .as_deref()
                .is_some_and(|c| c.to_ascii_lowercase().contains("ranking"))
        })
        .or_else(|| tables.first())
}

fn entry_fields(row: &TableRow) -> Option<(Option<String>, String, &TableRow)> {
    if row.non_empty_cells() < 2 {
        return None;
    }
    let link = row.place_link();
    let name = row
        .cells
        .get(1)
        .filter(|c| !c.is_empty())
        .cloned()
        .or_else(|| link.map(|l| l.text.clone()).filter(|t| !t.is_empty()))?;
    let entity_id = link.and_then(|l| extract_entity_id(&l.href));
    Some((entity_id, name, row))
}
