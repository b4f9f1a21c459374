//! Minimal regex-based HTML extraction for the listing and rank-check pages.
//!
//! Only the handful of structures the collector and snapshot engine read are
//! supported: tables with `td` rows, anchors, and `select` options. Nested
//! tables are not supported.

use std::sync::LazyLock;

use regex::Regex;

static TABLE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)<table\b([^>]*)>(.*?)</table\s*>").expect("valid table regex")
});
static ROW_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<tr\b[^>]*>(.*?)</tr\s*>").expect("valid row regex"));
static CELL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)<(td|th)\b[^>]*>(.*?)</(?:td|th)\s*>").expect("valid cell regex")
});
static ANCHOR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<a\b([^>]*)>(.*?)</a\s*>").expect("valid anchor regex"));
static OPTION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)<option\b([^>]*)>(.*?)</option\s*>").expect("valid option regex")
});
static TAG_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<[^>]*>").expect("valid tag regex"));
static WHITESPACE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("valid whitespace regex"));
static ATTR_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)([a-z][a-z0-9_:-]*)\s*=\s*["']([^"']*)["']"#).expect("valid attribute regex")
});

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Link {
    pub href: String,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectOption {
    pub value: String,
    pub text: String,
}

/// A data row: the text of each `td` cell plus every anchor in the row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableRow {
    pub cells: Vec<String>,
    pub links: Vec<Link>,
}

impl TableRow {
    #[must_use]
    pub fn non_empty_cells(&self) -> usize {
        self.cells.iter().filter(|c| !c.is_empty()).count()
    }

    /// First anchor pointing at a `place.naver.com` detail page.
    #[must_use]
    pub fn place_link(&self) -> Option<&Link> {
        self.links
            .iter()
            .find(|link| link.href.contains("place.naver.com"))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Table {
    pub class: Option<String>,
    /// Rows with at least one `td`; header rows made only of `th` are dropped.
    pub rows: Vec<TableRow>,
}

#[must_use]
pub fn parse_tables(html: &str) -> Vec<Table> {
    TABLE_RE
        .captures_iter(html)
        .map(|cap| {
            let attrs = cap.get(1).map_or("", |m| m.as_str());
            let body = cap.get(2).map_or("", |m| m.as_str());
            Table {
                class: extract_attr(attrs, "class"),
                rows: parse_rows(body),
            }
        })
        .collect()
}

fn parse_rows(table_body: &str) -> Vec<TableRow> {
    ROW_RE
        .captures_iter(table_body)
        .filter_map(|cap| {
            let row_html = cap.get(1)?.as_str();
            let cells: Vec<String> = CELL_RE
                .captures_iter(row_html)
                .filter(|c| c.get(1).is_some_and(|tag| tag.as_str().eq_ignore_ascii_case("td")))
                .map(|c| strip_tags(c.get(2).map_or("", |m| m.as_str())))
                .collect();
            if cells.is_empty() {
                return None;
            }
            Some(TableRow {
                cells,
                links: parse_links(row_html),
            })
        })
        .collect()
}

#[must_use]
pub fn parse_links(html: &str) -> Vec<Link> {
    ANCHOR_RE
        .captures_iter(html)
        .filter_map(|cap| {
            let attrs = cap.get(1)?.as_str();
            let href = extract_attr(attrs, "href")?;
            Some(Link {
                href: decode_entities(&href),
                text: strip_tags(cap.get(2).map_or("", |m| m.as_str())),
            })
        })
        .collect()
}

#[must_use]
pub fn parse_options(html: &str) -> Vec<SelectOption> {
    OPTION_RE
        .captures_iter(html)
        .filter_map(|cap| {
            let attrs = cap.get(1)?.as_str();
            let value = extract_attr(attrs, "value")?;
            Some(SelectOption {
                value: decode_entities(&value),
                text: strip_tags(cap.get(2).map_or("", |m| m.as_str())),
            })
        })
        .collect()
}

/// Removes tags, decodes common entities and collapses whitespace.
#[must_use]
pub fn strip_tags(fragment: &str) -> String {
    let without_tags = TAG_RE.replace_all(fragment, " ");
    let decoded = decode_entities(&without_tags);
    WHITESPACE_RE.replace_all(&decoded, " ").trim().to_owned()
}

fn decode_entities(text: &str) -> String {
    text.replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&amp;", "&")
}

fn extract_attr(tag: &str, attr: &str) -> Option<String> {
    ATTR_RE
        .captures_iter(tag)
        .find(|c| c[1].eq_ignore_ascii_case(attr))
        .map(|c| c[2].trim().to_string())
}
