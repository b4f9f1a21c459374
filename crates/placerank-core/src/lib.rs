pub mod abort;
pub mod app_config;
pub mod config;
pub mod entities;
pub mod rankings;
pub mod tracking;

pub use abort::AbortFlag;
pub use app_config::{AppConfig, Credentials, Environment, ScheduleTime};
pub use config::{load_app_config, load_app_config_from_env};
pub use entities::{canonical_place_url, Entity, NumericFields};
pub use rankings::{RankedEntry, RankingSnapshot, Trend};
pub use tracking::{load_tracking, TrackingFile};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("invalid value for {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },

    #[error("failed to read tracking file {path}: {source}")]
    TrackingFileIo {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse tracking file: {0}")]
    TrackingFileParse(#[from] serde_yaml::Error),

    #[error("tracking file validation failed: {0}")]
    Validation(String),
}
