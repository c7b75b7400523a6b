//! The two ways the scoring API accepts award submissions.
//!
//! A token is sent as a bearer `Authorization` header. A browser session is
//! replayed through a cookie jar seeded with the `session` cookie, together
//! with the `CSRF-Token` header the API checks on state-changing requests.
use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use reqwest::cookie::Jar;
use reqwest::header::{
    HeaderMap, HeaderName, HeaderValue, InvalidHeaderValue, ACCEPT, AUTHORIZATION, CONTENT_TYPE,
};
use reqwest::Client;
use url::Url;

pub const SESSION_COOKIE: &str = "session";
pub const CSRF_HEADER: &str = "csrf-token";
pub const SESSION_COOKIE_LIFETIME_HOURS: i64 = 48;

#[derive(Clone, PartialEq, Eq)]
pub enum Credentials {
    Token { token: String },
    Session { session: String, csrf: String },
}

// Secrets stay out of logs.
impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Credentials::Token { .. } => f.debug_struct("Token").finish_non_exhaustive(),
            Credentials::Session { .. } => f.debug_struct("Session").finish_non_exhaustive(),
        }
    }
}

impl Credentials {
    pub fn scheme(&self) -> &'static str {
        match self {
            Credentials::Token { .. } => "token",
            Credentials::Session { .. } => "session",
        }
    }

    /// Headers attached to every award submission.
    pub fn request_headers(&self) -> Result<HeaderMap, InvalidHeaderValue> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        match self {
            Credentials::Token { token } => {
                let mut value = HeaderValue::from_str(&format!("Bearer {token}"))?;
                value.set_sensitive(true);
                headers.insert(AUTHORIZATION, value);
            }
            Credentials::Session { csrf, .. } => {
                let mut value = HeaderValue::from_str(csrf)?;
                value.set_sensitive(true);
                headers.insert(HeaderName::from_static(CSRF_HEADER), value);
            }
        }
        Ok(headers)
    }

    /// Cookie jar pre-seeded with the session cookie for `endpoint`.
    /// Token credentials never carry cookies, so they get no jar.
    pub fn session_jar(&self, endpoint: &Url, issued_at: DateTime<Utc>) -> Option<Arc<Jar>> {
        let Credentials::Session { session, .. } = self else {
            return None;
        };
        let jar = Jar::default();
        jar.add_cookie_str(&session_cookie(session, endpoint, issued_at), endpoint);
        Some(Arc::new(jar))
    }

    pub fn build_client(
        &self,
        endpoint: &Url,
        issued_at: DateTime<Utc>,
    ) -> reqwest::Result<Client> {
        let builder = Client::builder();
        match self.session_jar(endpoint, issued_at) {
            Some(jar) => builder.cookie_provider(jar).build(),
            None => builder.build(),
        }
    }
}

/// `Set-Cookie` style line for the session cookie. The domain is left
/// host-only so the jar scopes it to the endpoint's host.
fn session_cookie(session: &str, endpoint: &Url, issued_at: DateTime<Utc>) -> String {
    let expires = issued_at + Duration::hours(SESSION_COOKIE_LIFETIME_HOURS);
    format!(
        "{SESSION_COOKIE}={session}; Path={}; Expires={}",
        endpoint.path(),
        expires.format("%a, %d %b %Y %H:%M:%S GMT"),
    )
}
