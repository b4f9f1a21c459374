use crate::app_config::{AppConfig, Credentials, Environment, ScheduleTime};
use crate::ConfigError;

const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// Load application configuration from environment variables.
///
/// Calls `dotenvy::dotenv().ok()` to load `.env` files before reading env vars.
///
/// # Errors
///
/// Returns `ConfigError` if required env vars are missing or values are invalid.
pub fn load_app_config() -> Result<AppConfig, ConfigError> {
    dotenvy::dotenv().ok();
    load_app_config_from_env()
}

/// Load application configuration from environment variables already in the process.
///
/// Unlike [`load_app_config`], this does NOT load `.env` files.
///
/// # Errors
///
/// Returns `ConfigError` if required env vars are missing or values are invalid.
pub fn load_app_config_from_env() -> Result<AppConfig, ConfigError> {
    build_app_config(|key| std::env::var(key))
}

/// Build application configuration using the provided env-var lookup function.
///
/// Parsing and validation live here, decoupled from the process environment,
/// so tests can drive it with a plain `HashMap` lookup.
fn build_app_config<F>(lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    use std::path::PathBuf;

    let require = |var: &str| -> Result<String, ConfigError> {
        lookup(var)
            .ok()
            .filter(|v| !v.trim().is_empty())
            .ok_or_else(|| ConfigError::MissingEnvVar(var.to_string()))
    };

    let optional = |var: &str| -> Option<String> {
        lookup(var)
            .ok()
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    };

    let or_default = |var: &str, default: &str| -> String {
        lookup(var).unwrap_or_else(|_| default.to_string())
    };

    let invalid = |var: &str, reason: String| ConfigError::InvalidEnvVar {
        var: var.to_string(),
        reason,
    };

    let parse_u32 = |var: &str, default: &str| -> Result<u32, ConfigError> {
        or_default(var, default)
            .parse::<u32>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let parse_u64 = |var: &str, default: &str| -> Result<u64, ConfigError> {
        or_default(var, default)
            .parse::<u64>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let parse_usize = |var: &str, default: &str| -> Result<usize, ConfigError> {
        or_default(var, default)
            .parse::<usize>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let database_url = require("DATABASE_URL")?;
    let credentials = Credentials {
        username: require("ADLOG_USERNAME")?,
        password: require("ADLOG_PASSWORD")?,
    };

    let env = parse_environment(&or_default("PLACERANK_ENV", "development"));
    let log_level = or_default("PLACERANK_LOG_LEVEL", "info");
    let tracking_path = PathBuf::from(or_default(
        "PLACERANK_TRACKING_PATH",
        "./config/tracking.yaml",
    ));

    let source_base_url = or_default("PLACERANK_SOURCE_BASE_URL", "https://adlog.kr")
        .trim_end_matches('/')
        .to_string();
    let login_path = or_default("PLACERANK_LOGIN_PATH", "/login");
    let listing_path = or_default(
        "PLACERANK_LISTING_PATH",
        "/adlog/naver_place_rank_check.php",
    );
    let rank_check_path = or_default(
        "PLACERANK_RANK_CHECK_PATH",
        "/adlog/naver_place_rank_check.php",
    );
    let user_agent = or_default("PLACERANK_USER_AGENT", DEFAULT_USER_AGENT);

    let target_entity_count = parse_usize("PLACERANK_TARGET_ENTITY_COUNT", "500")?;
    let max_pages = parse_usize("PLACERANK_MAX_PAGES", "10")?;
    let snapshot_cap = parse_usize("PLACERANK_SNAPSHOT_CAP", "20")?;
    if target_entity_count == 0 {
        return Err(invalid(
            "PLACERANK_TARGET_ENTITY_COUNT",
            "must be at least 1".to_string(),
        ));
    }
    if max_pages == 0 {
        return Err(invalid("PLACERANK_MAX_PAGES", "must be at least 1".to_string()));
    }
    if snapshot_cap == 0 {
        return Err(invalid(
            "PLACERANK_SNAPSHOT_CAP",
            "must be at least 1".to_string(),
        ));
    }

    let request_timeout_secs = parse_u64("PLACERANK_REQUEST_TIMEOUT_SECS", "10")?;
    if !(1..=60).contains(&request_timeout_secs) {
        return Err(invalid(
            "PLACERANK_REQUEST_TIMEOUT_SECS",
            format!("{request_timeout_secs} is outside 1..=60"),
        ));
    }
    let page_delay_ms = parse_u64("PLACERANK_PAGE_DELAY_MS", "1000")?;
    let keyword_delay_ms = parse_u64("PLACERANK_KEYWORD_DELAY_MS", "3000")?;

    let schedule_times = parse_schedule_times(&or_default("PLACERANK_SCHEDULE_TIMES", "06:00,18:00"))
        .map_err(|reason| invalid("PLACERANK_SCHEDULE_TIMES", reason))?;
    let utc_offset_hours = or_default("PLACERANK_UTC_OFFSET_HOURS", "9")
        .parse::<i32>()
        .map_err(|e| invalid("PLACERANK_UTC_OFFSET_HOURS", e.to_string()))?;
    if !(-12..=14).contains(&utc_offset_hours) {
        return Err(invalid(
            "PLACERANK_UTC_OFFSET_HOURS",
            format!("{utc_offset_hours} is outside -12..=14"),
        ));
    }

    let my_entity_name = optional("PLACERANK_MY_ENTITY_NAME");

    let enrich_endpoints = ["NEWS_FETCH_API_BASE", "NEWS_FETCH_FALLBACK_BASE"]
        .iter()
        .filter_map(|var| optional(*var))
        .collect();
    let enrich_timeout_secs = parse_u64("NEWS_ENRICH_TIMEOUT_SECS", "12")?;
    let news_limit_per_category = parse_usize("NEWS_FETCH_LIMIT_PER_CATEGORY", "10")?;
    let news_results_per_keyword = parse_u32("NAVER_RESULTS_PER_KEYWORD", "20")?;
    let news_client_id = optional("NAVER_SEARCH_CLIENT_ID");
    let news_client_secret = optional("NAVER_SEARCH_CLIENT_SECRET");
    let news_schedule_time = optional("PLACERANK_NEWS_SCHEDULE_TIME")
        .map(|raw| ScheduleTime::parse(&raw))
        .transpose()
        .map_err(|reason| invalid("PLACERANK_NEWS_SCHEDULE_TIME", reason))?;

    let db_max_connections = parse_u32("PLACERANK_DB_MAX_CONNECTIONS", "10")?;
    let db_min_connections = parse_u32("PLACERANK_DB_MIN_CONNECTIONS", "1")?;
    let db_acquire_timeout_secs = parse_u64("PLACERANK_DB_ACQUIRE_TIMEOUT_SECS", "10")?;

    Ok(AppConfig {
        database_url,
        env,
        log_level,
        tracking_path,
        credentials,
        source_base_url,
        login_path,
        listing_path,
        rank_check_path,
        user_agent,
        target_entity_count,
        max_pages,
        snapshot_cap,
        request_timeout_secs,
        page_delay_ms,
        keyword_delay_ms,
        schedule_times,
        utc_offset_hours,
        my_entity_name,
        enrich_endpoints,
        enrich_timeout_secs,
        news_limit_per_category,
        news_results_per_keyword,
        news_client_id,
        news_client_secret,
        news_schedule_time,
        db_max_connections,
        db_min_connections,
        db_acquire_timeout_secs,
    })
}

/// Parse a string into an `Environment` variant.
///
/// Unrecognized values default to `Environment::Development`.
fn parse_environment(s: &str) -> Environment {
    match s {
        "production" => Environment::Production,
        "test" => Environment::Test,
        _ => Environment::Development,
    }
}

/// Parse a comma-separated list of `HH:MM` times, sorted and deduplicated.
fn parse_schedule_times(raw: &str) -> Result<Vec<ScheduleTime>, String> {
    let mut times = raw
        .split(',')
        .filter(|s| !s.trim().is_empty())
        .map(ScheduleTime::parse)
        .collect::<Result<Vec<_>, _>>()?;
    if times.is_empty() {
        return Err("at least one time is required".to_string());
    }
    times.sort();
    times.dedup();
    Ok(times)
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
