//! Heuristic classification of untyped table cells.
//!
//! The listing source does not label its columns and reorders them between
//! layouts, so counts and scores are recognised by the shape of the text
//! rather than by position.

use std::str::FromStr;
use std::sync::LazyLock;

use placerank_core::NumericFields;
use regex::Regex;
use rust_decimal::Decimal;

static COUNT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d{1,3}(,\d{3})+$").expect("valid count regex"));
static SCORE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d+\.\d+$").expect("valid score regex"));

/// Path segments that precede the listing key in a detail-page link.
const CATEGORY_MARKERS: [&str; 6] = [
    "restaurant",
    "place",
    "cafe",
    "hairshop",
    "hospital",
    "accommodation",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ScoreSlot {
    N1,
    N2,
    N3,
}

/// Inclusive bands, in hundredths.
const SCORE_BANDS: [(ScoreSlot, i64, i64); 3] = [
    (ScoreSlot::N1, 56, 58),
    (ScoreSlot::N2, 79, 83),
    (ScoreSlot::N3, 43, 44),
];

fn score_slot(value: Decimal) -> Option<ScoreSlot> {
    SCORE_BANDS.iter().find_map(|&(slot, lo, hi)| {
        let lo = Decimal::new(lo, 2);
        let hi = Decimal::new(hi, 2);
        (value >= lo && value <= hi).then_some(slot)
    })
}

/// Classifies cell texts into typed numeric slots.
///
/// A comma-grouped integer fills `blog_count` first, then
/// `visitor_review_count`. A decimal inside one of the three score bands
/// fills the matching score slot. Filled slots are never overwritten.
#[must_use]
pub fn extract_numeric_fields<S: AsRef<str>>(cells: &[S]) -> NumericFields {
    let mut fields = NumericFields::default();

    for cell in cells {
        let token = cell.as_ref().trim();
        if token.is_empty() {
            continue;
        }

        if COUNT_RE.is_match(token) {
            let Ok(count) = token.replace(',', "").parse::<i64>() else {
                continue;
            };
            if fields.blog_count.is_none() {
                fields.blog_count = Some(count);
            } else if fields.visitor_review_count.is_none() {
                fields.visitor_review_count = Some(count);
            }
            continue;
        }

        if SCORE_RE.is_match(token) {
            let Ok(value) = Decimal::from_str(token) else {
                continue;
            };
            let slot = match score_slot(value) {
                Some(ScoreSlot::N1) => &mut fields.n1_score,
                Some(ScoreSlot::N2) => &mut fields.n2_score,
                Some(ScoreSlot::N3) => &mut fields.n3_score,
                None => continue,
            };
            if slot.is_none() {
                *slot = Some(value);
            }
        }
    }

    fields
}

/// Extracts the listing key from a detail-page link.
///
/// Only `place.naver.com` links (any subdomain) qualify. The key is the path
/// segment after a category marker, or the last non-empty segment when no
/// marker is present. Query and fragment are ignored.
#[must_use]
pub fn extract_entity_id(href: &str) -> Option<String> {
    let href = href.trim().replace("&amp;", "&");
    let absolute = if href.starts_with("//") {
        format!("https:{href}")
    } else {
        href
    };

    let url = reqwest::Url::parse(&absolute).ok()?;
    let host = url.host_str()?;
    if host != "place.naver.com" && !host.ends_with(".place.naver.com") {
        return None;
    }

    let segments: Vec<&str> = url
        .path_segments()?
        .filter(|segment| !segment.is_empty())
        .collect();

    let after_marker = segments
        .iter()
        .position(|segment| CATEGORY_MARKERS.contains(segment))
        .and_then(|idx| segments.get(idx + 1));

    let id = match after_marker {
        Some(id) => *id,
        None => *segments.last()?,
    };

    (!id.is_empty()).then(|| id.to_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn counts_fill_blog_then_visitor() {
        let fields = extract_numeric_fields(&["1", "교촌치킨", "1,204", "12,345", "99,999"]);
        assert_eq!(fields.blog_count, Some(1_204));
        assert_eq!(fields.visitor_review_count, Some(12_345));
    }

    #[test]
    fn plain_integers_are_not_counts() {
        let fields = extract_numeric_fields(&["3", "1204", "치킨"]);
        assert!(fields.blog_count.is_none());
        assert!(fields.visitor_review_count.is_none());
    }

    #[test]
    fn malformed_grouping_is_not_a_count() {
        let fields = extract_numeric_fields(&["1,20", "12,3456", ",123"]);
        assert!(fields.is_empty());
    }

    #[test]
    fn scores_fill_their_bands_regardless_of_column_order() {
        let fields = extract_numeric_fields(&["0.435", "0.812345", "0.571"]);
        assert_eq!(fields.n1_score, Some(dec("0.571")));
        assert_eq!(fields.n2_score, Some(dec("0.812345")));
        assert_eq!(fields.n3_score, Some(dec("0.435")));
    }

    #[test]
    fn band_edges_are_inclusive() {
        let fields = extract_numeric_fields(&["0.56", "0.83", "0.44"]);
        assert_eq!(fields.n1_score, Some(dec("0.56")));
        assert_eq!(fields.n2_score, Some(dec("0.83")));
        assert_eq!(fields.n3_score, Some(dec("0.44")));
    }

    #[test]
    fn out_of_band_scores_are_ignored() {
        let fields = extract_numeric_fields(&["0.59", "0.50", "4.5"]);
        assert!(fields.is_empty());
    }

    #[test]
    fn first_score_in_band_wins() {
        let fields = extract_numeric_fields(&["0.57", "0.565"]);
        assert_eq!(fields.n1_score, Some(dec("0.57")));
    }

    #[test]
    fn cells_are_trimmed_before_matching() {
        let fields = extract_numeric_fields(&[" 2,048 ", "\t0.80\n"]);
        assert_eq!(fields.blog_count, Some(2_048));
        assert_eq!(fields.n2_score, Some(dec("0.80")));
    }

    #[test]
    fn entity_id_after_restaurant_marker() {
        assert_eq!(
            extract_entity_id("https://m.place.naver.com/restaurant/1234567/home?entry=pll")
                .as_deref(),
            Some("1234567")
        );
    }

    #[test]
    fn entity_id_after_other_category_markers() {
        assert_eq!(
            extract_entity_id("https://m.place.naver.com/cafe/98765").as_deref(),
            Some("98765")
        );
        assert_eq!(
            extract_entity_id("https://map.place.naver.com/place/555#info").as_deref(),
            Some("555")
        );
    }

    #[test]
    fn entity_id_falls_back_to_last_segment() {
        assert_eq!(
            extract_entity_id("https://m.place.naver.com/1122334/").as_deref(),
            Some("1122334")
        );
    }

    #[test]
    fn protocol_relative_link_is_accepted() {
        assert_eq!(
            extract_entity_id("//m.place.naver.com/restaurant/42").as_deref(),
            Some("42")
        );
    }

    #[test]
    fn non_place_links_are_rejected() {
        assert!(extract_entity_id("https://blog.naver.com/restaurant/42").is_none());
        assert!(extract_entity_id("https://evilplace.naver.com.example/restaurant/1").is_none());
        assert!(extract_entity_id("/adlog/naver_place_rank_check.php?page=2").is_none());
    }

    #[test]
    fn link_without_path_is_rejected() {
        assert!(extract_entity_id("https://m.place.naver.com/").is_none());
    }
}
