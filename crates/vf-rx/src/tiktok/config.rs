//! TikTok-specific configuration extraction.

use std::time::Duration;

use anyhow::Result;
use vf_core::config::ReceiverConfig;
use vf_core::ws::WsConnConfig;

/// Default TikFinity WebSocket endpoint (local TikFinity desktop app).
pub const DEFAULT_WEBSOCKET_URL: &str = "ws://localhost:21213";

/// Parsed TikTok receiver configuration.
#[derive(Debug, Clone)]
pub struct TikTokConfig {
    /// TikFinity WebSocket URL.
    pub websocket_url: String,
    /// Upper bound on one connect attempt (default: 10s).
    pub connect_timeout: Duration,
    /// Delay between reconnect attempts (default: 5s).
    pub reconnect_interval: Duration,
    /// Report every N-th failed reconnect to the operator (default: 5).
    pub reconnect_report_every: u32,
}

impl Default for TikTokConfig {
    fn default() -> Self {
        Self {
            websocket_url: DEFAULT_WEBSOCKET_URL.into(),
            connect_timeout: Duration::from_secs(10),
            reconnect_interval: Duration::from_secs(5),
            reconnect_report_every: 5,
        }
    }
}

impl TikTokConfig {
    /// Extract TikTok settings from a [`ReceiverConfig`].
    ///
    /// The URL is not validated here; a malformed URL is reported by `init`.
    pub fn from_receiver(cfg: &ReceiverConfig) -> Result<Self> {
        let defaults = Self::default();
        Ok(Self {
            websocket_url: cfg.websocket_url.clone().unwrap_or(defaults.websocket_url),
            connect_timeout: cfg
                .connect_timeout_sec
                .map(Duration::from_secs)
                .unwrap_or(defaults.connect_timeout),
            reconnect_interval: cfg
                .reconnect_interval_sec
                .map(Duration::from_secs)
                .unwrap_or(defaults.reconnect_interval),
            reconnect_report_every: cfg
                .reconnect_report_every
                .unwrap_or(defaults.reconnect_report_every),
        })
    }

    /// Connection settings for the underlying [`WsConnection`](vf_core::ws::WsConnection).
    pub fn ws_config(&self) -> WsConnConfig {
        WsConnConfig {
            url: self.websocket_url.clone(),
            label: "TikFinity".into(),
            connect_timeout: self.connect_timeout,
            reconnect_interval: self.reconnect_interval,
            report_every: self.reconnect_report_every,
            reconnect_hint: "Make sure TikFinity is running.".into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_apply() {
        let cfg = TikTokConfig::from_receiver(&ReceiverConfig::for_platform("tiktok")).unwrap();
        assert_eq!(cfg.websocket_url, "ws://localhost:21213");
        assert_eq!(cfg.connect_timeout, Duration::from_secs(10));
        assert_eq!(cfg.reconnect_interval, Duration::from_secs(5));
        assert_eq!(cfg.reconnect_report_every, 5);
    }

    #[test]
    fn overrides_apply() {
        let raw = ReceiverConfig {
            websocket_url: Some("ws://10.0.0.2:9000".into()),
            reconnect_interval_sec: Some(1),
            reconnect_report_every: Some(10),
            ..ReceiverConfig::for_platform("tiktok")
        };
        let cfg = TikTokConfig::from_receiver(&raw).unwrap();
        assert_eq!(cfg.websocket_url, "ws://10.0.0.2:9000");
        assert_eq!(cfg.reconnect_interval, Duration::from_secs(1));
        let ws = cfg.ws_config();
        assert_eq!(ws.report_every, 10);
        assert_eq!(ws.label, "TikFinity");
    }
}
