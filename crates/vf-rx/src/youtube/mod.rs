//! YouTube voting via the Live Chat REST API.
//!
//! `init` exchanges the OAuth refresh token for a session, then a background
//! task polls the chat of the account's current live broadcast:
//!
//! 1. Resolve the live chat ID once (first broadcast whose status is
//!    `live`). While nothing is live, look again every `retry_interval`.
//! 2. Fetch one page with the stored cursor and store the returned one.
//! 3. Emit a vote for every item that passes the grammar check.
//! 4. Sleep for the server's `pollingIntervalMillis` hint.
//!
//! A failed cycle is reported and retried after `retry_interval`. Only
//! [`stop`](crate::VotingReceiver::stop) ends the loop; the cursor and the
//! cached chat ID go with it.

pub mod api;
pub mod auth;
pub mod config;

#[cfg(test)]
mod testutil;

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Result, anyhow};
use async_trait::async_trait;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use vf_core::bus::{VoteBus, VoteSubscription};
use vf_core::config::ReceiverConfig;
use vf_core::dedup::MessageIdDedup;
use vf_core::error::VoteError;
use vf_core::sink::ErrorSink;
use vf_core::types::{ConnectionState, StateCell};

use self::api::{LiveChatApi, LiveChatConnector, YouTubeConnector, decode_item};
use self::config::{PollSettings, YouTubeConfig};

/// How long `stop` waits for the poll task before aborting it.
const STOP_TIMEOUT: Duration = Duration::from_secs(5);

/// YouTube voting receiver.
pub struct YouTubeReceiver {
    poll: PollSettings,
    connector: Arc<dyn LiveChatConnector>,
    bus: VoteBus,
    sink: ErrorSink,
    state: StateCell,
    shutdown_tx: watch::Sender<bool>,
    task: Option<JoinHandle<()>>,
}

impl YouTubeReceiver {
    /// Create a receiver from a generic receiver config.
    ///
    /// Fails when the client ID or secret is missing.
    pub fn new(cfg: &ReceiverConfig, sink: ErrorSink) -> Result<Self> {
        let config = YouTubeConfig::from_receiver(cfg)?;
        let poll = config.poll;
        let connector = YouTubeConnector::new(config)?;
        Ok(Self::with_connector(poll, Arc::new(connector), sink))
    }

    /// Create a receiver around any [`LiveChatConnector`].
    pub fn with_connector(poll: PollSettings, connector: Arc<dyn LiveChatConnector>, sink: ErrorSink) -> Self {
        let (shutdown_tx, _) = watch::channel(false);
        Self {
            poll,
            connector,
            bus: VoteBus::new(),
            sink,
            state: StateCell::new(),
            shutdown_tx,
            task: None,
        }
    }

    /// Whether the poll task is alive.
    pub fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|t| !t.is_finished())
    }
}

#[async_trait]
impl crate::VotingReceiver for YouTubeReceiver {
    fn name(&self) -> &str {
        "youtube"
    }

    fn state(&self) -> ConnectionState {
        self.state.get()
    }

    fn subscribe(&self) -> VoteSubscription {
        self.bus.subscribe()
    }

    async fn init(&mut self) -> bool {
        if self.state.get() == ConnectionState::Stopped {
            warn!("[youtube] init after stop ignored");
            return false;
        }
        if self.task.is_some() {
            warn!("[youtube] already initialized");
            return true;
        }

        info!("[youtube] initializing");
        self.state.set(ConnectionState::Connecting);

        let limit = self.poll.request_timeout;
        let api = match bounded(limit, "credential exchange", self.connector.connect()).await {
            Ok(api) => api,
            Err(e) => {
                self.sink.send(format!("YouTube voting initialization failed: {e:#}"));
                self.state.set(ConnectionState::Disconnected);
                return false;
            }
        };

        let poller = Poller {
            api,
            poll: self.poll,
            bus: self.bus.clone(),
            sink: self.sink.clone(),
            state: self.state.clone(),
            live_chat_id: None,
            cursor: None,
            seen: MessageIdDedup::new(),
        };
        self.task = Some(tokio::spawn(poller.run(self.shutdown_tx.subscribe())));
        true
    }

    async fn send_message(&self, _message: &str) -> Result<(), VoteError> {
        Err(VoteError::NotSupported("sending messages"))
    }

    async fn stop(&mut self) {
        self.shutdown_tx.send_replace(true);
        if let Some(mut task) = self.task.take() {
            if tokio::time::timeout(STOP_TIMEOUT, &mut task).await.is_err() {
                warn!("[youtube] poll task did not exit in {STOP_TIMEOUT:?}, aborting");
                task.abort();
            }
        }
        if self.state.get() != ConnectionState::Stopped {
            self.state.set(ConnectionState::Stopped);
            info!("[youtube] stopped");
        }
    }
}

/// Fail `fut` with [`VoteError::Http`] if it has not finished within `limit`.
async fn bounded<T>(limit: Duration, what: &str, fut: impl Future<Output = Result<T>>) -> Result<T> {
    match tokio::time::timeout(limit, fut).await {
        Ok(result) => result,
        Err(_) => Err(VoteError::Http(format!("{what} timed out after {limit:?}")).into()),
    }
}

/// The poll loop and everything only it touches.
struct Poller {
    api: Arc<dyn LiveChatApi>,
    poll: PollSettings,
    bus: VoteBus,
    sink: ErrorSink,
    state: StateCell,
    live_chat_id: Option<String>,
    cursor: Option<String>,
    seen: MessageIdDedup,
}

impl Poller {
    async fn run(mut self, mut shutdown_rx: watch::Receiver<bool>) {
        while !*shutdown_rx.borrow() {
            // racing the whole cycle aborts an in-flight request on stop
            let outcome = tokio::select! {
                r = self.cycle() => r,
                _ = shutdown_rx.changed() => break,
            };

            let delay = match outcome {
                Ok(delay) => delay,
                Err(e) => {
                    self.sink.send(format!("YouTube voting error: {e:#}"));
                    self.state.set(ConnectionState::Reconnecting);
                    self.poll.retry_interval
                }
            };

            tokio::select! {
                _ = tokio::time::sleep(delay) => {}
                _ = shutdown_rx.changed() => break,
            }
        }
        info!("[youtube] poll task exited");
    }

    /// One page. Returns how long to wait before the next one.
    async fn cycle(&mut self) -> Result<Duration> {
        let live_chat_id = self.resolve_live_chat().await;
        let limit = self.poll.request_timeout;
        let listing = self.api.list_messages(&live_chat_id, self.cursor.as_deref());
        let page = bounded(limit, "live chat request", listing).await?;

        self.cursor = page.next_page_token.filter(|t| !t.is_empty());
        if self.state.get() != ConnectionState::Connected && self.state.set(ConnectionState::Connected) {
            info!("[youtube] receiving live chat");
        }

        for item in &page.items {
            let msg = match decode_item(item) {
                Ok(msg) => msg,
                Err(e) => {
                    warn!("[youtube] skipping chat item: {e}");
                    continue;
                }
            };
            if let Some(id) = msg.id.as_deref() {
                if !self.seen.check_and_insert(id) {
                    debug!("[youtube] duplicate chat item {id}");
                    continue;
                }
            }
            if let Some(vote) = msg.to_vote() {
                self.bus.emit(vote);
            }
        }

        Ok(page
            .polling_interval_millis
            .map(Duration::from_millis)
            .unwrap_or(self.poll.default_polling_interval))
    }

    /// The cached live chat ID, looked up until a live broadcast exists.
    async fn resolve_live_chat(&mut self) -> String {
        if let Some(id) = &self.live_chat_id {
            return id.clone();
        }
        loop {
            match self.find_live_chat().await {
                Ok(Some(id)) => {
                    self.live_chat_id = Some(id.clone());
                    return id;
                }
                Ok(None) => {
                    debug!("[youtube] no live broadcast, retrying in {:?}", self.poll.retry_interval);
                }
                Err(e) => {
                    self.sink.send(format!("Error finding YouTube live stream: {e:#}"));
                }
            }
            tokio::time::sleep(self.poll.retry_interval).await;
        }
    }

    async fn find_live_chat(&self) -> Result<Option<String>> {
        let limit = self.poll.request_timeout;
        let broadcasts = bounded(limit, "broadcast lookup", self.api.list_broadcasts()).await?;
        let Some(live) = broadcasts.iter().find(|b| b.is_live()) else {
            return Ok(None);
        };
        let title = live.snippet.title.as_deref().unwrap_or_default();
        let id = live
            .snippet
            .live_chat_id
            .clone()
            .ok_or_else(|| anyhow!("live broadcast '{title}' has no chat"))?;
        info!("[youtube] live broadcast found: {title}");
        Ok(Some(id))
    }
}
