use std::collections::{BTreeMap, HashSet};
use std::path::Path;

use serde::Deserialize;

use crate::ConfigError;

/// Keywords tracked by the snapshot engine plus the news search categories.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TrackingFile {
    pub keywords: Vec<String>,
    #[serde(default)]
    pub news_categories: BTreeMap<String, Vec<String>>,
}

/// Load and validate the tracking configuration from a YAML file.
///
/// Keywords are trimmed in place; validation runs on the trimmed values.
///
/// # Errors
///
/// Returns `ConfigError` if the file cannot be read, parsed, or fails validation.
pub fn load_tracking(path: &Path) -> Result<TrackingFile, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::TrackingFileIo {
        path: path.display().to_string(),
        source: e,
    })?;

    let mut tracking: TrackingFile =
        serde_yaml::from_str(&content).map_err(ConfigError::TrackingFileParse)?;

    normalize(&mut tracking);
    validate_tracking(&tracking)?;

    Ok(tracking)
}

fn normalize(tracking: &mut TrackingFile) {
    for keyword in &mut tracking.keywords {
        *keyword = keyword.trim().to_string();
    }
    for keywords in tracking.news_categories.values_mut() {
        keywords.retain(|k| !k.trim().is_empty());
        for keyword in keywords.iter_mut() {
            *keyword = keyword.trim().to_string();
        }
    }
}

fn validate_tracking(tracking: &TrackingFile) -> Result<(), ConfigError> {
    if tracking.keywords.is_empty() {
        return Err(ConfigError::Validation(
            "at least one keyword is required".to_string(),
        ));
    }

    let mut seen = HashSet::new();
    for keyword in &tracking.keywords {
        if keyword.is_empty() {
            return Err(ConfigError::Validation(
                "keyword must be non-empty".to_string(),
            ));
        }
        if !seen.insert(keyword.to_lowercase()) {
            return Err(ConfigError::Validation(format!(
                "duplicate keyword: '{keyword}'"
            )));
        }
    }

    for category in tracking.news_categories.keys() {
        if category.trim().is_empty() {
            return Err(ConfigError::Validation(
                "news category name must be non-empty".to_string(),
            ));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tracking(keywords: &[&str]) -> TrackingFile {
        TrackingFile {
            keywords: keywords.iter().map(|k| (*k).to_string()).collect(),
            news_categories: BTreeMap::new(),
        }
    }

    #[test]
    fn validate_rejects_empty_keyword_list() {
        let err = validate_tracking(&tracking(&[])).unwrap_err();
        assert!(err.to_string().contains("at least one keyword"));
    }

    #[test]
    fn validate_rejects_blank_keyword() {
        let mut file = tracking(&["강남 맛집", "   "]);
        normalize(&mut file);
        let err = validate_tracking(&file).unwrap_err();
        assert!(err.to_string().contains("non-empty"));
    }

    #[test]
    fn validate_rejects_duplicate_keyword_case_insensitively() {
        let mut file = tracking(&["Gangnam Cafe", " gangnam cafe "]);
        normalize(&mut file);
        let err = validate_tracking(&file).unwrap_err();
        assert!(err.to_string().contains("duplicate keyword"));
    }

    #[test]
    fn validate_rejects_blank_category_name() {
        let mut file = tracking(&["강남 맛집"]);
        file.news_categories
            .insert(" ".to_string(), vec!["외식 트렌드".to_string()]);
        let err = validate_tracking(&file).unwrap_err();
        assert!(err.to_string().contains("category"));
    }

    #[test]
    fn news_categories_are_optional() {
        let parsed: TrackingFile = serde_yaml::from_str("keywords: [\"서초 맛집\"]").unwrap();
        assert!(parsed.news_categories.is_empty());
        assert!(validate_tracking(&parsed).is_ok());
    }

    #[test]
    fn normalize_drops_blank_news_keywords() {
        let mut file = tracking(&["서초 맛집"]);
        file.news_categories.insert(
            "trend".to_string(),
            vec![" 외식 트렌드 ".to_string(), String::new()],
        );
        normalize(&mut file);
        assert_eq!(file.news_categories["trend"], vec!["외식 트렌드"]);
    }

    #[test]
    fn load_tracking_from_real_file() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR"))
            .join("..")
            .join("..")
            .join("config")
            .join("tracking.yaml");
        let result = load_tracking(&path);
        assert!(result.is_ok(), "failed to load tracking.yaml: {result:?}");
        let file = result.unwrap();
        assert!(file.keywords.iter().any(|k| k == "강남 맛집"));
        assert!(file.news_categories.contains_key("policy"));
    }

    #[test]
    fn load_tracking_missing_file_is_io_error() {
        let result = load_tracking(Path::new("/nonexistent/tracking.yaml"));
        assert!(matches!(result, Err(ConfigError::TrackingFileIo { .. })));
    }
}
