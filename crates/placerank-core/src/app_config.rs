use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Environment {
    Development,
    Test,
    Production,
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Environment::Development => write!(f, "development"),
            Environment::Test => write!(f, "test"),
            Environment::Production => write!(f, "production"),
        }
    }
}

/// Login credentials for the ranking source.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"[redacted]")
            .finish()
    }
}

/// A daily trigger time on the tracking clock (`HH:MM`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct ScheduleTime {
    pub hour: u8,
    pub minute: u8,
}

impl ScheduleTime {
    /// Parses `HH:MM` (24-hour clock).
    ///
    /// # Errors
    ///
    /// Returns a human-readable reason when the value is not a valid time.
    pub fn parse(raw: &str) -> Result<Self, String> {
        let (h, m) = raw
            .trim()
            .split_once(':')
            .ok_or_else(|| format!("'{raw}' is not in HH:MM form"))?;
        let hour: u8 = h
            .parse()
            .map_err(|_| format!("'{raw}' has an invalid hour"))?;
        let minute: u8 = m
            .parse()
            .map_err(|_| format!("'{raw}' has an invalid minute"))?;
        if hour > 23 || minute > 59 {
            return Err(format!("'{raw}' is out of range"));
        }
        Ok(Self { hour, minute })
    }
}

impl std::fmt::Display for ScheduleTime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:02}:{:02}", self.hour, self.minute)
    }
}

#[derive(Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub env: Environment,
    pub log_level: String,
    pub tracking_path: PathBuf,
    pub credentials: Credentials,
    pub source_base_url: String,
    pub login_path: String,
    pub listing_path: String,
    pub rank_check_path: String,
    pub user_agent: String,
    pub target_entity_count: usize,
    pub max_pages: usize,
    pub snapshot_cap: usize,
    pub request_timeout_secs: u64,
    pub page_delay_ms: u64,
    pub keyword_delay_ms: u64,
    pub schedule_times: Vec<ScheduleTime>,
    pub utc_offset_hours: i32,
    pub my_entity_name: Option<String>,
    pub enrich_endpoints: Vec<String>,
    pub enrich_timeout_secs: u64,
    pub news_limit_per_category: usize,
    pub news_results_per_keyword: u32,
    pub news_client_id: Option<String>,
    pub news_client_secret: Option<String>,
    pub news_schedule_time: Option<ScheduleTime>,
    pub db_max_connections: u32,
    pub db_min_connections: u32,
    pub db_acquire_timeout_secs: u64,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("env", &self.env)
            .field("log_level", &self.log_level)
            .field("tracking_path", &self.tracking_path)
            .field("database_url", &"[redacted]")
            .field("credentials", &self.credentials)
            .field("source_base_url", &self.source_base_url)
            .field("login_path", &self.login_path)
            .field("listing_path", &self.listing_path)
            .field("rank_check_path", &self.rank_check_path)
            .field("user_agent", &self.user_agent)
            .field("target_entity_count", &self.target_entity_count)
            .field("max_pages", &self.max_pages)
            .field("snapshot_cap", &self.snapshot_cap)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("page_delay_ms", &self.page_delay_ms)
            .field("keyword_delay_ms", &self.keyword_delay_ms)
            .field("schedule_times", &self.schedule_times)
            .field("utc_offset_hours", &self.utc_offset_hours)
            .field("my_entity_name", &self.my_entity_name)
            .field("enrich_endpoints", &self.enrich_endpoints)
            .field("enrich_timeout_secs", &self.enrich_timeout_secs)
            .field("news_limit_per_category", &self.news_limit_per_category)
            .field("news_results_per_keyword", &self.news_results_per_keyword)
            .field(
                "news_client_id",
                &self.news_client_id.as_ref().map(|_| "[redacted]"),
            )
            .field(
                "news_client_secret",
                &self.news_client_secret.as_ref().map(|_| "[redacted]"),
            )
            .field("news_schedule_time", &self.news_schedule_time)
            .field("db_max_connections", &self.db_max_connections)
            .field("db_min_connections", &self.db_min_connections)
            .field("db_acquire_timeout_secs", &self.db_acquire_timeout_secs)
            .finish()
    }
}

impl AppConfig {
    /// Returns `true` when both news search credentials are configured.
    #[must_use]
    pub fn news_enabled(&self) -> bool {
        self.news_client_id.is_some() && self.news_client_secret.is_some()
    }
}
