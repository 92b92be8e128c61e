//! HTTP poll transport.
//!
//! Fetches one statistics snapshot per request from
//! `GET {base}/tournaments/{id}/stats`. The caller-supplied [`AuthContext`]
//! is boundary plumbing: it forwards a CSRF token from the page context as a
//! request header without the manager knowing anything about it.

use std::time::Duration;

use async_trait::async_trait;
use url::Url;

use crate::error::{ArenaLinkError, Result};
use crate::models::PollSnapshot;

use super::PollTransport;

const CSRF_HEADER: &str = "X-CSRF-Token";

/// Caller-supplied request context applied to every poll request.
#[derive(Debug, Clone, Default)]
pub struct AuthContext {
    csrf_token: Option<String>,
}

impl AuthContext {
    /// No extra headers.
    pub fn none() -> Self {
        Self::default()
    }

    /// Forward a CSRF token as `X-CSRF-Token` on every poll request.
    pub fn csrf_token(token: impl Into<String>) -> Self {
        Self {
            csrf_token: Some(token.into()),
        }
    }

    fn apply(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.csrf_token {
            Some(token) => request.header(CSRF_HEADER, token),
            None => request,
        }
    }
}

/// HTTP implementation of [`PollTransport`].
#[derive(Debug, Clone)]
pub struct HttpPoll {
    base_url: Url,
    http_client: reqwest::Client,
    auth: AuthContext,
}

impl HttpPoll {
    /// Build a poll transport for the given base URL.
    pub fn new(base_url: &str, auth: AuthContext) -> Result<Self> {
        Self::with_timeout(base_url, auth, Duration::from_secs(30))
    }

    /// Build a poll transport with an explicit per-request timeout.
    pub fn with_timeout(base_url: &str, auth: AuthContext, timeout: Duration) -> Result<Self> {
        let base_url = Url::parse(base_url.trim()).map_err(|e| {
            ArenaLinkError::ConfigurationError(format!("Invalid base_url '{}': {}", base_url, e))
        })?;
        match base_url.scheme() {
            "http" | "https" => {}
            other => {
                return Err(ArenaLinkError::ConfigurationError(format!(
                    "Unsupported base_url scheme '{}' for polling; expected http(s)",
                    other
                )));
            }
        }

        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ArenaLinkError::ConfigurationError(e.to_string()))?;

        Ok(Self {
            base_url,
            http_client,
            auth,
        })
    }

    fn stats_url(&self, tournament_id: &str) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.set_path(&format!("/tournaments/{}/stats", tournament_id));
        url.set_query(None);
        url.set_fragment(None);
        Ok(url)
    }
}

#[async_trait]
impl PollTransport for HttpPoll {
    async fn fetch(&self, tournament_id: &str) -> Result<PollSnapshot> {
        let url = self.stats_url(tournament_id)?;
        log::debug!("[arena-link] [{}] polling {}", tournament_id, url);

        let request = self.auth.apply(self.http_client.get(url));
        let response = request.send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(ArenaLinkError::FetchError(format!(
                "poll request returned HTTP {}",
                status
            )));
        }

        let snapshot = response.json::<PollSnapshot>().await?;
        Ok(snapshot)
    }
}
