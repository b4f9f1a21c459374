pub mod collect;
pub mod enrich;
pub mod error;
pub mod payload;
pub mod search;

pub use collect::{NewsCollectSettings, NewsCollector, NewsHarvest};
pub use enrich::{candidate_bases, EnrichedArticle, EnrichmentChain, DEFAULT_ENDPOINTS};
pub use error::NewsError;
pub use payload::{
    assemble_payload, build_news_payload, clean_html, fallback_content, is_relevant, NewsPayload,
    RELEVANCE_KEYWORDS,
};
pub use search::{NewsItem, NewsSearchClient};
