use thiserror::Error;

#[derive(Debug, Error)]
pub enum ScraperError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("unexpected HTTP status {status} from {url}")]
    UnexpectedStatus { status: u16, url: String },

    #[error("session expired while fetching {url}")]
    SessionExpired { url: String },

    #[error("authentication failed: {reason}")]
    AuthenticationFailed { reason: String },

    #[error("invalid URL \"{url}\": {reason}")]
    InvalidUrl { url: String, reason: String },
}

impl ScraperError {
    /// `true` for failures that a fresh login may cure (or that a login caused).
    #[must_use]
    pub fn is_auth_failure(&self) -> bool {
        matches!(
            self,
            ScraperError::SessionExpired { .. } | ScraperError::AuthenticationFailed { .. }
        )
    }

    /// `true` for network failures, timeouts and non-success responses.
    #[must_use]
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            ScraperError::Http(_) | ScraperError::UnexpectedStatus { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_expired_is_auth_failure_not_transport() {
        let err = ScraperError::SessionExpired {
            url: "/adlog/naver_place_rank_check.php".to_owned(),
        };
        assert!(err.is_auth_failure());
        assert!(!err.is_transport());
    }

    #[test]
    fn unexpected_status_is_transport() {
        let err = ScraperError::UnexpectedStatus {
            status: 502,
            url: "https://adlog.kr/".to_owned(),
        };
        assert!(err.is_transport());
        assert!(!err.is_auth_failure());
        assert!(err.to_string().contains("502"));
    }

    #[test]
    fn invalid_url_is_neither() {
        let err = ScraperError::InvalidUrl {
            url: "::".to_owned(),
            reason: "relative URL without a base".to_owned(),
        };
        assert!(!err.is_transport());
        assert!(!err.is_auth_failure());
    }
}
