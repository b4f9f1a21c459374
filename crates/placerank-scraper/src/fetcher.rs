use std::sync::LazyLock;
use std::time::Duration;

use async_trait::async_trait;
use placerank_core::{AppConfig, Credentials};
use regex::Regex;
use reqwest::header::{HeaderMap, COOKIE, LOCATION, SET_COOKIE};
use reqwest::{Client, Url};

use crate::error::ScraperError;
use crate::session::Session;

/// The login form's password input; its presence means we are on a login page.
static LOGIN_FORM_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)<input\b[^>]*\bname\s*=\s*["']passwd["']"#).expect("valid login form regex")
});

/// Retrieves pages from the ranking source on behalf of an authenticated session.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    /// Logs in and returns a fresh session.
    async fn authenticate(&self, credentials: &Credentials) -> Result<Session, ScraperError>;

    /// Fetches `url` (absolute, or relative to the source origin) with the
    /// given query pairs and returns the response body.
    async fn fetch(
        &self,
        session: &Session,
        url: &str,
        query: &[(String, String)],
    ) -> Result<String, ScraperError>;
}

#[derive(Debug, Clone)]
pub struct HttpFetcherConfig {
    pub base_url: String,
    pub login_path: String,
    pub user_agent: String,
    pub timeout_secs: u64,
}

impl HttpFetcherConfig {
    #[must_use]
    pub fn from_app_config(config: &AppConfig) -> Self {
        Self {
            base_url: config.source_base_url.clone(),
            login_path: config.login_path.clone(),
            user_agent: config.user_agent.clone(),
            timeout_secs: config.request_timeout_secs,
        }
    }
}

/// [`PageFetcher`] over plain HTTP with a cookie-based login.
///
/// Redirects are not followed: a redirect towards a login URL is how the
/// source signals an expired session, and it must be observed rather than
/// silently followed.
pub struct HttpPageFetcher {
    client: Client,
    base_url: Url,
    login_path: String,
}

impl HttpPageFetcher {
    /// # Errors
    ///
    /// Returns [`ScraperError::InvalidUrl`] if `base_url` does not parse, or
    /// [`ScraperError::Http`] if the HTTP client cannot be constructed.
    pub fn new(config: &HttpFetcherConfig) -> Result<Self, ScraperError> {
        let base_url = Url::parse(&config.base_url).map_err(|e| ScraperError::InvalidUrl {
            url: config.base_url.clone(),
            reason: e.to_string(),
        })?;
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .connect_timeout(Duration::from_secs(config.timeout_secs.min(10)))
            .user_agent(config.user_agent.as_str())
            .redirect(reqwest::redirect::Policy::none())
            .build()?;
        Ok(Self {
            client,
            base_url,
            login_path: config.login_path.clone(),
        })
    }

    fn resolve(&self, url: &str) -> Result<Url, ScraperError> {
        self.base_url
            .join(url)
            .map_err(|e| ScraperError::InvalidUrl {
                url: url.to_owned(),
                reason: e.to_string(),
            })
    }
}

#[async_trait]
impl PageFetcher for HttpPageFetcher {
    async fn authenticate(&self, credentials: &Credentials) -> Result<Session, ScraperError> {
        let login_url = self.resolve(&self.login_path)?;
        let mut session = Session::new();

        // The login page hands out the pre-auth session cookie.
        let landing = self.client.get(login_url.clone()).send().await?;
        absorb_cookies(&mut session, landing.headers());

        let mut request = self.client.post(login_url.clone()).form(&[
            ("userid", credentials.username.as_str()),
            ("passwd", credentials.password.as_str()),
        ]);
        if let Some(cookie) = session.cookie_header() {
            request = request.header(COOKIE, cookie);
        }
        let response = request.send().await?;
        let status = response.status();
        absorb_cookies(&mut session, response.headers());

        if status.is_redirection() {
            if redirect_target(response.headers()).is_some_and(|loc| is_login_url(&loc)) {
                return Err(ScraperError::AuthenticationFailed {
                    reason: "redirected back to the login page".to_owned(),
                });
            }
        } else if status.is_success() {
            let body = response.text().await?;
            if is_login_page(&body) {
                return Err(ScraperError::AuthenticationFailed {
                    reason: "login form returned again".to_owned(),
                });
            }
        } else {
            return Err(ScraperError::UnexpectedStatus {
                status: status.as_u16(),
                url: login_url.to_string(),
            });
        }

        tracing::info!(base_url = %self.base_url, "authenticated with ranking source");
        Ok(session)
    }

    async fn fetch(
        &self,
        session: &Session,
        url: &str,
        query: &[(String, String)],
    ) -> Result<String, ScraperError> {
        let target = self.resolve(url)?;
        let mut request = self.client.get(target.clone());
        if !query.is_empty() {
            request = request.query(query);
        }
        if let Some(cookie) = session.cookie_header() {
            request = request.header(COOKIE, cookie);
        }

        let response = request.send().await?;
        let status = response.status();

        if status.is_redirection() {
            return match redirect_target(response.headers()) {
                Some(location) if is_login_url(&location) => Err(ScraperError::SessionExpired {
                    url: target.to_string(),
                }),
                _ => Err(ScraperError::UnexpectedStatus {
                    status: status.as_u16(),
                    url: target.to_string(),
                }),
            };
        }

        if !status.is_success() {
            return Err(ScraperError::UnexpectedStatus {
                status: status.as_u16(),
                url: target.to_string(),
            });
        }

        let body = response.text().await?;
        if is_login_page(&body) {
            return Err(ScraperError::SessionExpired {
                url: target.to_string(),
            });
        }
        Ok(body)
    }
}

fn absorb_cookies(session: &mut Session, headers: &HeaderMap) {
    for value in headers.get_all(SET_COOKIE) {
        if let Ok(raw) = value.to_str() {
            session.absorb_set_cookie(raw);
        }
    }
}

fn redirect_target(headers: &HeaderMap) -> Option<String> {
    headers
        .get(LOCATION)
        .and_then(|v| v.to_str().ok())
        .map(str::to_owned)
}

fn is_login_url(location: &str) -> bool {
    location.to_ascii_lowercase().contains("login")
}

/// `true` when `body` is (or embeds) the source's login form.
#[must_use]
pub fn is_login_page(body: &str) -> bool {
    LOGIN_FORM_RE.is_match(body)
}
