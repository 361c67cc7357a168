//! TikTok voting via the TikFinity WebSocket API.
//!
//! TikFinity is a desktop app that relays TikTok LIVE events over a local
//! WebSocket. This receiver keeps one connection to it open, decodes chat
//! frames with [`parser::parse_frame`], and emits every valid vote.
//!
//! # Failure handling
//!
//! | Initial connect failure | Reported | Reconnect loop |
//! |-------------------------|----------|----------------|
//! | Malformed URL           | yes      | no             |
//! | Refused / unreachable   | yes      | yes            |
//! | Timeout / other         | yes      | yes            |
//!
//! After a successful connect, a dropped connection is retried forever at a
//! fixed interval until [`stop`](crate::VotingReceiver::stop).

pub mod config;
pub mod parser;

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use tracing::{info, warn};
use vf_core::bus::{VoteBus, VoteSubscription};
use vf_core::config::ReceiverConfig;
use vf_core::error::VoteError;
use vf_core::sink::ErrorSink;
use vf_core::types::{ConnectionState, StateCell};
use vf_core::ws::{ConnectError, OnMessageCallback, WsConnection};

use self::config::TikTokConfig;

/// TikTok voting receiver.
pub struct TikTokReceiver {
    config: TikTokConfig,
    bus: VoteBus,
    sink: ErrorSink,
    state: StateCell,
    conn: WsConnection,
}

impl TikTokReceiver {
    /// Create a receiver from a generic receiver config.
    pub fn new(cfg: &ReceiverConfig, sink: ErrorSink) -> Result<Self> {
        Ok(Self::with_config(TikTokConfig::from_receiver(cfg)?, sink))
    }

    /// Create a receiver from an already-typed config.
    pub fn with_config(config: TikTokConfig, sink: ErrorSink) -> Self {
        let state = StateCell::new();
        let conn = WsConnection::new(config.ws_config(), state.clone(), sink.clone());
        Self { config, bus: VoteBus::new(), sink, state, conn }
    }

    /// Connect attempts made so far, the initial one included.
    pub fn connect_attempts(&self) -> u64 {
        self.conn.connect_attempts()
    }

    /// Whether the connection task (read or reconnect loop) is alive.
    pub fn is_running(&self) -> bool {
        self.conn.is_running()
    }

    /// Report an initial connect failure in operator terms.
    fn report_init_failure(&self, err: &ConnectError) {
        let url = &self.config.websocket_url;
        let msg = match err {
            ConnectError::InvalidEndpoint(_) => {
                format!("TikTok voting initialization failed: Invalid WebSocket URL '{url}'")
            }
            ConnectError::Unreachable(_) => format!(
                "TikTok voting initialization failed: Could not connect to TikFinity. \
                 Make sure TikFinity is running and listening on {url}"
            ),
            ConnectError::Timeout(d) => format!(
                "TikFinity connection timed out after {}s. \
                 Please check if TikFinity is running and configured correctly.",
                d.as_secs()
            ),
            ConnectError::Other(reason) => {
                format!("TikTok voting initialization failed: {reason}")
            }
            ConnectError::Cancelled => return,
        };
        self.sink.send(msg);
    }
}

#[async_trait]
impl crate::VotingReceiver for TikTokReceiver {
    fn name(&self) -> &str {
        "tiktok"
    }

    fn state(&self) -> ConnectionState {
        self.state.get()
    }

    fn subscribe(&self) -> VoteSubscription {
        self.bus.subscribe()
    }

    async fn init(&mut self) -> bool {
        if self.state.get() == ConnectionState::Stopped {
            warn!("[tiktok] init after stop ignored");
            return false;
        }

        info!("[tiktok] initializing with WebSocket URL {}", self.config.websocket_url);

        let bus = self.bus.clone();
        let on_text: OnMessageCallback = Arc::new(move |text| match parser::parse_frame(text) {
            Ok(Some(vote)) => bus.emit(vote),
            Ok(None) => {}
            Err(e) => warn!("[tiktok] skipping frame: {e}"),
        });

        match self.conn.start(on_text).await {
            Ok(()) => {
                info!("[tiktok] connected to TikFinity");
                true
            }
            Err(e) => {
                self.report_init_failure(&e);
                if e.is_retryable() {
                    info!("[tiktok] reconnecting in the background");
                }
                false
            }
        }
    }

    async fn send_message(&self, _message: &str) -> Result<(), VoteError> {
        Err(VoteError::NotSupported("sending messages"))
    }

    async fn stop(&mut self) {
        self.conn.stop().await;
        if self.state.get() != ConnectionState::Stopped {
            self.state.set(ConnectionState::Stopped);
            info!("[tiktok] stopped");
        }
    }
}
