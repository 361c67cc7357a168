//! Configuration parsing for the vote feed.
//!
//! All receivers read their settings from a single JSON config file. The
//! top-level structure contains logging metadata and a `receivers` array
//! where each entry describes one receiver instance.
//!
//! # Example config
//!
//! ```json
//! {
//!   "Voting": { "module_name": "vf-runner", "log_path": "/tmp/log" },
//!   "receivers": [
//!     { "platform": "tiktok", "websocket_url": "ws://localhost:21213" },
//!     { "platform": "youtube", "client_id": "...", "client_secret": "...",
//!       "refresh_token": "..." },
//!     { "platform": "tiktok_test", "enabled": false }
//!   ]
//! }
//! ```
//!
//! Each receiver module turns a [`ReceiverConfig`] into its own typed config
//! and fills in defaults there.

use serde::Deserialize;

/// Top-level application config, deserialized from a JSON file.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Module metadata (name, log path).
    #[serde(rename = "Voting")]
    pub voting: Option<ModuleMeta>,

    /// One entry per receiver instance.
    pub receivers: Vec<ReceiverConfig>,
}

impl AppConfig {
    /// Module name for log files, defaulting to `fallback`.
    pub fn module_name(&self, fallback: &str) -> String {
        self.voting
            .as_ref()
            .and_then(|m| m.module_name.clone())
            .unwrap_or_else(|| fallback.to_string())
    }

    /// Log directory, if configured.
    pub fn log_path(&self) -> Option<String> {
        self.voting.as_ref().and_then(|m| m.log_path.clone())
    }

    /// Receivers that are not explicitly disabled.
    pub fn enabled_receivers(&self) -> impl Iterator<Item = &ReceiverConfig> {
        self.receivers.iter().filter(|r| r.is_enabled())
    }
}

/// Module metadata block.
#[derive(Debug, Clone, Deserialize)]
pub struct ModuleMeta {
    pub module_name: Option<String>,
    pub log_path: Option<String>,
}

/// A single receiver configuration.
///
/// One flat record covers every platform; each platform reads the fields it
/// needs and ignores the rest.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ReceiverConfig {
    /// Receiver kind: `"tiktok"`, `"youtube"`, `"tiktok_test"`, `"youtube_test"`.
    pub platform: String,

    /// Set to `false` to keep the entry without starting it (default: true).
    pub enabled: Option<bool>,

    // --- TikTok (TikFinity WebSocket) ---
    /// TikFinity WebSocket endpoint (default: `ws://localhost:21213`).
    pub websocket_url: Option<String>,

    /// Connect timeout in seconds (default: 10).
    pub connect_timeout_sec: Option<u64>,

    /// Delay between reconnect attempts in seconds (default: 5).
    pub reconnect_interval_sec: Option<u64>,

    /// Report to the operator every N-th failed reconnect (default: 5).
    pub reconnect_report_every: Option<u32>,

    // --- YouTube (Live Chat API) ---
    /// OAuth client ID.
    pub client_id: Option<String>,

    /// OAuth client secret.
    pub client_secret: Option<String>,

    /// OAuth refresh token obtained out of band.
    pub refresh_token: Option<String>,

    /// YouTube Data API base URL.
    pub api_base_url: Option<String>,

    /// OAuth token endpoint.
    pub token_url: Option<String>,

    /// Backoff after a failed poll cycle, and live-broadcast retry delay, in
    /// milliseconds (default: 5000).
    pub retry_interval_ms: Option<u64>,

    /// Poll interval when the server sends no hint, in milliseconds
    /// (default: 200).
    pub default_polling_interval_ms: Option<u64>,

    /// Upper bound on one token or API request, in milliseconds
    /// (default: 10000).
    pub request_timeout_ms: Option<u64>,

    // --- Simulated receivers ---
    /// Interval between synthetic votes in milliseconds (default: 2000).
    pub simulate_interval_ms: Option<u64>,
}

impl ReceiverConfig {
    /// Convenience constructor used by tests and programmatic setups.
    pub fn for_platform(platform: &str) -> Self {
        Self { platform: platform.to_string(), ..Default::default() }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.unwrap_or(true)
    }
}

/// Load and parse a JSON config file.
pub fn load_config(path: &std::path::Path) -> anyhow::Result<AppConfig> {
    let content = std::fs::read_to_string(path)?;
    let config: AppConfig = serde_json::from_str(&content)?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_example_config() {
        let json = r#"{
            "Voting": { "module_name": "votes", "log_path": "/tmp/log" },
            "receivers": [
                { "platform": "tiktok", "websocket_url": "ws://127.0.0.1:9000" },
                { "platform": "youtube", "client_id": "id", "client_secret": "secret" },
                { "platform": "tiktok_test", "enabled": false }
            ]
        }"#;
        let cfg: AppConfig = serde_json::from_str(json).unwrap();
        assert_eq!(cfg.module_name("fallback"), "votes");
        assert_eq!(cfg.log_path().as_deref(), Some("/tmp/log"));
        assert_eq!(cfg.receivers.len(), 3);
        assert_eq!(cfg.receivers[0].websocket_url.as_deref(), Some("ws://127.0.0.1:9000"));
        assert_eq!(cfg.receivers[1].client_id.as_deref(), Some("id"));

        let enabled: Vec<_> = cfg.enabled_receivers().map(|r| r.platform.as_str()).collect();
        assert_eq!(enabled, ["tiktok", "youtube"]);
    }

    #[test]
    fn metadata_is_optional() {
        let cfg: AppConfig = serde_json::from_str(r#"{"receivers": []}"#).unwrap();
        assert_eq!(cfg.module_name("vf-runner"), "vf-runner");
        assert!(cfg.log_path().is_none());
    }
}
