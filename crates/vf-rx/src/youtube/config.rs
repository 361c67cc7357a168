//! YouTube receiver configuration.
//!
//! Client ID and secret are required; everything else has a production
//! default.

use std::time::Duration;

use anyhow::Result;
use vf_core::config::ReceiverConfig;
use vf_core::error::VoteError;

/// Parsed YouTube receiver configuration.
#[derive(Debug, Clone)]
pub struct YouTubeConfig {
    /// OAuth client ID.
    pub client_id: String,
    /// OAuth client secret.
    pub client_secret: String,
    /// OAuth refresh token. Without it `init` cannot authenticate.
    pub refresh_token: Option<String>,
    /// YouTube Data API v3 base URL.
    pub api_base_url: String,
    /// OAuth token endpoint.
    pub token_url: String,
    /// Loop timings.
    pub poll: PollSettings,
}

/// Timings for the poll loop.
#[derive(Debug, Clone, Copy)]
pub struct PollSettings {
    /// Backoff after a failed cycle, and delay between live-broadcast
    /// lookups while nothing is live (default: 5s).
    pub retry_interval: Duration,
    /// Delay between pages when the server sends no hint (default: 200ms).
    pub default_polling_interval: Duration,
    /// Upper bound on one token or API request (default: 10s).
    pub request_timeout: Duration,
}

impl Default for PollSettings {
    fn default() -> Self {
        Self {
            retry_interval: Duration::from_millis(5000),
            default_polling_interval: Duration::from_millis(200),
            request_timeout: Duration::from_secs(10),
        }
    }
}

impl YouTubeConfig {
    /// Extract YouTube settings from a [`ReceiverConfig`].
    ///
    /// Fails with [`VoteError::Config`] when the client ID or secret is
    /// missing or empty.
    pub fn from_receiver(cfg: &ReceiverConfig) -> Result<Self> {
        let required = |v: &Option<String>| v.clone().filter(|s| !s.trim().is_empty());
        let (Some(client_id), Some(client_secret)) =
            (required(&cfg.client_id), required(&cfg.client_secret))
        else {
            return Err(VoteError::Config(
                "YouTube client ID and secret must be configured".into(),
            )
            .into());
        };

        let defaults = PollSettings::default();
        Ok(Self {
            client_id,
            client_secret,
            refresh_token: required(&cfg.refresh_token),
            api_base_url: cfg.api_base_url.clone().unwrap_or_else(default_api_base_url),
            token_url: cfg.token_url.clone().unwrap_or_else(default_token_url),
            poll: PollSettings {
                retry_interval: cfg
                    .retry_interval_ms
                    .map(Duration::from_millis)
                    .unwrap_or(defaults.retry_interval),
                default_polling_interval: cfg
                    .default_polling_interval_ms
                    .map(Duration::from_millis)
                    .unwrap_or(defaults.default_polling_interval),
                request_timeout: cfg
                    .request_timeout_ms
                    .map(Duration::from_millis)
                    .unwrap_or(defaults.request_timeout),
            },
        })
    }
}

fn default_api_base_url() -> String {
    "https://www.googleapis.com/youtube/v3".into()
}

fn default_token_url() -> String {
    "https://oauth2.googleapis.com/token".into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn credentials_are_required() {
        let mut raw = ReceiverConfig::for_platform("youtube");
        assert!(YouTubeConfig::from_receiver(&raw).is_err());

        raw.client_id = Some("id".into());
        raw.client_secret = Some("   ".into());
        let err = YouTubeConfig::from_receiver(&raw).unwrap_err();
        assert!(matches!(err.downcast_ref::<VoteError>(), Some(VoteError::Config(_))));
    }

    #[test]
    fn defaults_apply() {
        let raw = ReceiverConfig {
            client_id: Some("id".into()),
            client_secret: Some("secret".into()),
            ..ReceiverConfig::for_platform("youtube")
        };
        let cfg = YouTubeConfig::from_receiver(&raw).unwrap();
        assert_eq!(cfg.api_base_url, "https://www.googleapis.com/youtube/v3");
        assert_eq!(cfg.token_url, "https://oauth2.googleapis.com/token");
        assert!(cfg.refresh_token.is_none());
        assert_eq!(cfg.poll.retry_interval, Duration::from_secs(5));
        assert_eq!(cfg.poll.default_polling_interval, Duration::from_millis(200));
        assert_eq!(cfg.poll.request_timeout, Duration::from_secs(10));
    }

    #[test]
    fn request_timeout_is_configurable() {
        let raw = ReceiverConfig {
            client_id: Some("id".into()),
            client_secret: Some("secret".into()),
            request_timeout_ms: Some(1500),
            ..ReceiverConfig::for_platform("youtube")
        };
        let cfg = YouTubeConfig::from_receiver(&raw).unwrap();
        assert_eq!(cfg.poll.request_timeout, Duration::from_millis(1500));
    }
}
