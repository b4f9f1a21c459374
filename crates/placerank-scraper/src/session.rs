use placerank_core::Credentials;

use crate::error::ScraperError;
use crate::fetcher::PageFetcher;

/// An authenticated session with the ranking source.
///
/// Acquired once per run and threaded through every fetch by reference.
/// Re-authentication replaces it in place.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Session {
    cookies: Vec<(String, String)>,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names: Vec<&str> = self.cookies.iter().map(|(name, _)| name.as_str()).collect();
        f.debug_struct("Session")
            .field("cookies", &names)
            .finish()
    }
}

impl Session {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a cookie, replacing any earlier value with the same name.
    pub fn set_cookie(&mut self, name: &str, value: &str) {
        if let Some(existing) = self.cookies.iter_mut().find(|(n, _)| n == name) {
            value.clone_into(&mut existing.1);
        } else {
            self.cookies.push((name.to_owned(), value.to_owned()));
        }
    }

    /// Absorbs one raw `Set-Cookie` header value (`name=value; attrs...`).
    pub fn absorb_set_cookie(&mut self, header: &str) {
        let pair = header.split(';').next().unwrap_or_default();
        if let Some((name, value)) = pair.split_once('=') {
            let name = name.trim();
            if !name.is_empty() {
                self.set_cookie(name, value.trim());
            }
        }
    }

    /// Value for a `Cookie` request header, or `None` when no cookie is held.
    #[must_use]
    pub fn cookie_header(&self) -> Option<String> {
        if self.cookies.is_empty() {
            return None;
        }
        Some(
            self.cookies
                .iter()
                .map(|(name, value)| format!("{name}={value}"))
                .collect::<Vec<_>>()
                .join("; "),
        )
    }
}

/// Fetches `url`, re-authenticating once if the session has expired.
///
/// On [`ScraperError::SessionExpired`] a fresh session replaces `session` and
/// the request is retried exactly once; the outcome of that retry is returned
/// as-is.
///
/// # Errors
///
/// Returns the fetch error, or the login error if re-authentication fails.
pub async fn fetch_with_reauth<F>(
    fetcher: &F,
    session: &mut Session,
    credentials: &Credentials,
    url: &str,
    query: &[(String, String)],
) -> Result<String, ScraperError>
where
    F: PageFetcher + ?Sized,
{
    match fetcher.fetch(session, url, query).await {
        Err(ScraperError::SessionExpired { .. }) => {
            tracing::warn!(url, "session expired; re-authenticating");
            *session = fetcher.authenticate(credentials).await?;
            fetcher.fetch(session, url, query).await
        }
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn absorbs_set_cookie_headers() {
        let mut session = Session::new();
        session.absorb_set_cookie("PHPSESSID=abc123; path=/; HttpOnly");
        session.absorb_set_cookie("remember=1; Max-Age=3600");
        assert_eq!(
            session.cookie_header().as_deref(),
            Some("PHPSESSID=abc123; remember=1")
        );
    }

    #[test]
    fn later_cookie_replaces_earlier_value() {
        let mut session = Session::new();
        session.absorb_set_cookie("PHPSESSID=old");
        session.absorb_set_cookie("PHPSESSID=new; path=/");
        assert_eq!(session.cookie_header().as_deref(), Some("PHPSESSID=new"));
    }

    #[test]
    fn empty_session_has_no_cookie_header() {
        assert!(Session::new().cookie_header().is_none());
    }

    #[test]
    fn debug_hides_cookie_values() {
        let mut session = Session::new();
        session.set_cookie("PHPSESSID", "secret-token");
        let rendered = format!("{session:?}");
        assert!(rendered.contains("PHPSESSID"));
        assert!(!rendered.contains("secret-token"));
    }
}
