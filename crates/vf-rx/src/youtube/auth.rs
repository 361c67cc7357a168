//! OAuth2 access tokens for the YouTube Data API.
//!
//! Tokens come from the refresh-token grant:
//!
//! | Operation     | Method | Path        | Body (form)                                              |
//! |---------------|--------|-------------|----------------------------------------------------------|
//! | Refresh token | POST   | `token_url` | `client_id`, `client_secret`, `refresh_token`, `grant_type=refresh_token` |
//!
//! Obtaining the refresh token in the first place (browser consent) happens
//! outside this crate.

use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;
use tokio::time::Instant;
use tracing::{debug, info};
use vf_core::error::VoteError;

/// Refresh this long before the server-side expiry.
const REFRESH_MARGIN: Duration = Duration::from_secs(60);

/// Lifetime assumed when the token response omits `expires_in`.
const DEFAULT_LIFETIME: Duration = Duration::from_secs(3600);

/// A bearer token and when it stops being usable.
#[derive(Debug, Clone)]
pub struct AccessToken {
    pub token: String,
    pub expires_at: Instant,
}

impl AccessToken {
    /// Whether the token is still good for at least [`REFRESH_MARGIN`].
    pub fn is_fresh(&self) -> bool {
        Instant::now() + REFRESH_MARGIN < self.expires_at
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: Option<u64>,
}

/// Hands out a valid bearer token, refreshing it when it is about to expire.
pub struct TokenSource {
    http: reqwest::Client,
    token_url: String,
    client_id: String,
    client_secret: String,
    refresh_token: String,
    current: Mutex<Option<AccessToken>>,
}

impl TokenSource {
    pub fn new(
        http: reqwest::Client,
        token_url: String,
        client_id: String,
        client_secret: String,
        refresh_token: String,
    ) -> Self {
        Self {
            http,
            token_url,
            client_id,
            client_secret,
            refresh_token,
            current: Mutex::new(None),
        }
    }

    /// A bearer token valid for at least the refresh margin.
    ///
    /// The cache lock is never held across the refresh request. Two callers
    /// that both find the token stale both refresh; the later write wins.
    pub async fn bearer(&self) -> Result<String> {
        if let Some(token) = self.cached() {
            return Ok(token);
        }
        let fresh = self.refresh().await?;
        let token = fresh.token.clone();
        *self.current.lock().unwrap_or_else(PoisonError::into_inner) = Some(fresh);
        Ok(token)
    }

    fn cached(&self) -> Option<String> {
        let current = self.current.lock().unwrap_or_else(PoisonError::into_inner);
        current.as_ref().filter(|t| t.is_fresh()).map(|t| t.token.clone())
    }

    /// Exchange the refresh token for a new access token.
    async fn refresh(&self) -> Result<AccessToken> {
        debug!("[youtube] refreshing access token");
        let resp = self
            .http
            .post(&self.token_url)
            .form(&[
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.as_str()),
                ("refresh_token", self.refresh_token.as_str()),
                ("grant_type", "refresh_token"),
            ])
            .send()
            .await
            .context("token request failed")?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(VoteError::Auth(format!("token endpoint returned {status}: {body}")).into());
        }

        let body: TokenResponse = resp.json().await.context("token response malformed")?;
        let lifetime = body.expires_in.map(Duration::from_secs).unwrap_or(DEFAULT_LIFETIME);
        info!("[youtube] access token refreshed (valid {}s)", lifetime.as_secs());
        Ok(AccessToken { token: body.access_token, expires_at: Instant::now() + lifetime })
    }
}
