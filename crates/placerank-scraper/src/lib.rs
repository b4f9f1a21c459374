pub mod collector;
pub mod error;
pub mod extract;
pub mod fetcher;
pub mod html;
pub mod pagination;
pub mod session;
pub mod snapshot;
pub mod throttle;

pub use collector::{CollectOutcome, Collector, CollectorSettings, StopReason};
pub use error::ScraperError;
pub use extract::{extract_entity_id, extract_numeric_fields};
pub use fetcher::{HttpFetcherConfig, HttpPageFetcher, PageFetcher};
pub use session::{fetch_with_reauth, Session};
pub use snapshot::{parse_ranking, SnapshotEngine, SnapshotSettings};
pub use throttle::Throttle;
