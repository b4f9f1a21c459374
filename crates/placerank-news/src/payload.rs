use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::enrich::{EnrichedArticle, EnrichmentChain};
use crate::search::NewsItem;

pub const AUTHOR: &str = "NAVER_AUTO";
const TITLE_MAX_CHARS: usize = 255;

/// Terms marking an article as relevant to small-business owners. A hit
/// whose title, summary and article text contain none of them is dropped.
pub const RELEVANCE_KEYWORDS: &[&str] = &[
    "소상공인",
    "소상공",
    "자영업",
    "자영업자",
    "소기업",
    "중소기업",
    "중기부",
    "사장님",
    "점주",
    "창업",
    "창업자",
    "가게",
    "매장",
    "점포",
    "상권",
    "골목상권",
    "상인",
    "장사",
    "식당",
    "음식점",
    "외식업",
    "요식업",
    "카페",
    "베이커리",
    "주점",
    "분식",
    "프랜차이즈",
    "배달",
    "배달앱",
    "배달업",
    "배달 플랫폼",
    "포장매장",
    "테이크아웃",
    "식재료",
    "원재료",
    "원가",
    "위생",
    "임대료",
    "부가세",
    "세무",
    "지원금",
    "보조금",
    "정책자금",
    "대출",
    "융자",
    "상생",
    "협동조합",
    "지역 상점",
];

static TAG_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<[^>]+>").expect("valid tag regex"));
static WHITESPACE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("valid whitespace regex"));

/// A news board row ready for insertion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewsPayload {
    pub title: String,
    pub content: String,
    pub category: String,
    pub image_url: Option<String>,
    pub source_url: String,
    pub author: String,
    pub is_featured: bool,
}

/// Strips tags and collapses whitespace. Search snippets wrap hits in `<b>`.
#[must_use]
pub fn clean_html(text: &str) -> String {
    let without_tags = TAG_RE.replace_all(text, " ");
    let decoded = without_tags
        .replace("&quot;", "\"")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&apos;", "'")
        .replace("&#39;", "'")
        .replace("&amp;", "&");
    WHITESPACE_RE.replace_all(&decoded, " ").trim().to_owned()
}

/// Minimal content used when no extractor returned the article body.
#[must_use]
pub fn fallback_content(summary: &str, source_url: &str) -> String {
    let source_line = format!(
        r#"<p>출처: <a href="{source_url}" target="_blank" rel="noopener">{source_url}</a></p>"#
    );
    if summary.is_empty() {
        format!("<p>자세한 내용은 아래 원문 링크를 참고해주세요.</p><p><br></p>{source_line}")
    } else {
        format!("<p>{summary}</p><p><br></p>{source_line}")
    }
}

/// True when `text` mentions any of [`RELEVANCE_KEYWORDS`].
#[must_use]
pub fn is_relevant(text: &str) -> bool {
    let text = text.to_lowercase();
    RELEVANCE_KEYWORDS.iter().any(|keyword| text.contains(keyword))
}

/// Assembles a payload from a search hit and an optional enrichment result.
///
/// Returns `None` when the hit has no usable title or source URL, or when
/// neither the hit nor the extracted article is relevant.
#[must_use]
pub fn assemble_payload(
    item: &NewsItem,
    category: &str,
    article: Option<EnrichedArticle>,
) -> Option<NewsPayload> {
    let title = clean_html(&item.title);
    let source_url = item.source_url()?.to_owned();
    if title.is_empty() {
        return None;
    }

    let summary = clean_html(&item.description);
    let article_text = article
        .as_ref()
        .map(|a| clean_html(&a.content))
        .unwrap_or_default();
    if !is_relevant(&format!("{title} {summary} {article_text}")) {
        tracing::debug!(title = %title, source_url = %source_url, "skipping unrelated news hit");
        return None;
    }

    let (content, final_source) = match article {
        Some(article) => {
            let final_source = article.source_url.unwrap_or(source_url);
            (article.content, final_source)
        }
        None => (fallback_content(&summary, &source_url), source_url),
    };

    Some(NewsPayload {
        title: title.chars().take(TITLE_MAX_CHARS).collect(),
        content,
        category: category.to_owned(),
        image_url: None,
        source_url: final_source,
        author: AUTHOR.to_owned(),
        is_featured: false,
    })
}

/// Builds the payload for a search hit, enriching it through `chain` first.
pub async fn build_news_payload(
    item: &NewsItem,
    category: &str,
    chain: &EnrichmentChain,
) -> Option<NewsPayload> {
    if clean_html(&item.title).is_empty() {
        return None;
    }
    let source_url = item.source_url()?;
    let article = chain.enrich(source_url).await;
    assemble_payload(item, category, article)
}
