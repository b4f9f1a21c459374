use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Typed slots filled from untyped table cells.
///
/// Every slot is optional: a row that carries no recognisable count or score
/// leaves the slot empty rather than zero.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NumericFields {
    pub blog_count: Option<i64>,
    pub visitor_review_count: Option<i64>,
    pub n1_score: Option<Decimal>,
    pub n2_score: Option<Decimal>,
    pub n3_score: Option<Decimal>,
}

impl NumericFields {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.blog_count.is_none()
            && self.visitor_review_count.is_none()
            && self.n1_score.is_none()
            && self.n2_score.is_none()
            && self.n3_score.is_none()
    }
}

/// A tracked business listing as harvested from the listing source.
///
/// `entity_id` is the natural key taken from the listing's detail-page link
/// and is stable across runs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entity {
    pub entity_id: String,
    pub name: String,
    pub category: Option<String>,
    pub address: Option<String>,
    pub phone: Option<String>,
    pub source_url: String,
    pub numeric: NumericFields,
}

impl Entity {
    /// Builds a name-only entity, used when a listing is known only by its
    /// key and display name (ranking rows, select-box options).
    #[must_use]
    pub fn minimal(entity_id: &str, name: &str) -> Self {
        Self {
            entity_id: entity_id.to_owned(),
            name: name.to_owned(),
            category: None,
            address: None,
            phone: None,
            source_url: canonical_place_url(entity_id),
            numeric: NumericFields::default(),
        }
    }
}

/// Canonical mobile detail-page URL for a listing key.
#[must_use]
pub fn canonical_place_url(entity_id: &str) -> String {
    format!("https://m.place.naver.com/restaurant/{entity_id}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonical_place_url_uses_mobile_restaurant_path() {
        assert_eq!(
            canonical_place_url("1234567"),
            "https://m.place.naver.com/restaurant/1234567"
        );
    }

    #[test]
    fn minimal_entity_has_no_numeric_fields() {
        let entity = Entity::minimal("42", "BBQ치킨 강남점");
        assert_eq!(entity.entity_id, "42");
        assert_eq!(entity.name, "BBQ치킨 강남점");
        assert!(entity.numeric.is_empty());
        assert!(entity.source_url.ends_with("/42"));
    }

    #[test]
    fn numeric_fields_with_one_slot_is_not_empty() {
        let fields = NumericFields {
            blog_count: Some(1_204),
            ..NumericFields::default()
        };
        assert!(!fields.is_empty());
    }
}
