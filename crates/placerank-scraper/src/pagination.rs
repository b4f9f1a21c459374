//! Next-page detection for the listing source's numbered pagination.

use crate::html::Link;

/// Link texts that advance one page when no numbered link is present.
const NEXT_LINK_TEXTS: [&str; 5] = ["다음", "Next", ">", ">>", "다음 페이지"];

/// Finds the href of the page after `current_page`.
///
/// A link whose text is exactly `current_page + 1` wins; otherwise the first
/// link labelled as a "next" control. Script and fragment-only links are
/// ignored.
#[must_use]
pub fn find_next_page(links: &[Link], current_page: usize) -> Option<String> {
    let wanted = (current_page + 1).to_string();
    let usable = || links.iter().filter(|link| is_navigable(&link.href));

    usable()
        .find(|link| link.text.trim() == wanted)
        .or_else(|| usable().find(|link| NEXT_LINK_TEXTS.contains(&link.text.trim())))
        .map(|link| link.href.clone())
}

fn is_navigable(href: &str) -> bool {
    let href = href.trim();
    !href.is_empty()
        && !href.starts_with('#')
        && !href.to_ascii_lowercase().starts_with("javascript:")
}

/// Resolves `href` against the URL of the page it was found on.
///
/// Absolute URLs and root-relative paths are returned unchanged; the fetcher
/// resolves the latter against the source origin.
#[must_use]
pub fn join_href(current: &str, href: &str) -> String {
    let href = href.trim();
    if href.starts_with("http://") || href.starts_with("https://") || href.starts_with('/') {
        return href.to_owned();
    }

    let without_query = current.split(['?', '#']).next().unwrap_or(current);
    if href.starts_with('?') {
        return format!("{without_query}{href}");
    }

    match without_query.rfind('/') {
        Some(idx) => format!("{}{href}", &without_query[..=idx]),
        None => href.to_owned(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn link(href: &str, text: &str) -> Link {
        Link {
            href: href.to_owned(),
            text: text.to_owned(),
        }
    }

    #[test]
    fn numbered_link_wins_over_next_control() {
        let links = vec![
            link("?page=1", "1"),
            link("?page=3", "다음"),
            link("?page=2", "2"),
        ];
        assert_eq!(find_next_page(&links, 1).as_deref(), Some("?page=2"));
    }

    #[test]
    fn falls_back_to_next_control_text() {
        let links = vec![link("?page=1", "1"), link("?page=11", ">")];
        assert_eq!(find_next_page(&links, 10).as_deref(), Some("?page=11"));
    }

    #[test]
    fn returns_none_on_last_page() {
        let links = vec![link("?page=1", "1"), link("?page=2", "2")];
        assert!(find_next_page(&links, 2).is_none());
    }

    #[test]
    fn ignores_script_and_fragment_links() {
        let links = vec![
            link("javascript:goPage(2)", "2"),
            link("#", "다음"),
            link("?page=2", "다음 페이지"),
        ];
        assert_eq!(find_next_page(&links, 1).as_deref(), Some("?page=2"));
    }

    #[test]
    fn join_query_only_href() {
        assert_eq!(
            join_href("/adlog/naver_place_rank_check.php?page=1", "?page=2"),
            "/adlog/naver_place_rank_check.php?page=2"
        );
    }

    #[test]
    fn join_relative_file_href() {
        assert_eq!(
            join_href("https://adlog.kr/adlog/list.php", "list.php?page=2"),
            "https://adlog.kr/adlog/list.php?page=2"
        );
    }

    #[test]
    fn join_keeps_absolute_and_root_relative() {
        assert_eq!(join_href("/a/b", "/c?page=2"), "/c?page=2");
        assert_eq!(
            join_href("/a/b", "https://adlog.kr/c"),
            "https://adlog.kr/c"
        );
    }
}
