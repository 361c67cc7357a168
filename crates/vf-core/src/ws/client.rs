//! Single WebSocket connection with a fixed-interval reconnect loop.
//!
//! A `WsConnection` performs one bounded initial connect from
//! [`WsConnection::start`] and then hands the socket to a tokio task that:
//! 1. Reads frames and forwards text frames to a callback.
//! 2. Answers pings.
//! 3. On close frame, read error, or end of stream, reconnects every
//!    `reconnect_interval` until it succeeds or shutdown is requested.
//! 4. Reports every `report_every`-th consecutive reconnect failure through
//!    the [`ErrorSink`].
//!
//! An invalid endpoint is never retried. Everything else is.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use thiserror::Error;
use tokio::net::TcpStream;
use tokio::sync::watch;
use tokio_tungstenite::tungstenite::{self, Message};
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use tracing::{debug, error, info, warn};

use crate::sink::ErrorSink;
use crate::types::{ConnectionState, StateCell};

/// Callback invoked for each received text frame.
pub type OnMessageCallback = Arc<dyn Fn(&str) + Send + Sync>;

/// Client-side WebSocket stream.
pub type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// How long [`WsConnection::stop`] waits for the task before aborting it.
const STOP_TIMEOUT: Duration = Duration::from_secs(5);

/// Configuration for a single WebSocket connection.
#[derive(Debug, Clone)]
pub struct WsConnConfig {
    /// Full WebSocket URL (e.g. `ws://localhost:21213`).
    pub url: String,
    /// Name of the remote side, used in logs and operator messages.
    pub label: String,
    /// Upper bound on one connect attempt (TCP + handshake).
    pub connect_timeout: Duration,
    /// Sleep between failed reconnect attempts.
    pub reconnect_interval: Duration,
    /// Report every N-th consecutive reconnect failure. `0` disables reports.
    pub report_every: u32,
    /// Appended to reconnect reports (e.g. "Make sure TikFinity is running.").
    pub reconnect_hint: String,
}

/// Why a connect attempt failed.
#[derive(Debug, Error)]
pub enum ConnectError {
    /// The URL can never work. Not retried.
    #[error("invalid endpoint: {0}")]
    InvalidEndpoint(String),

    /// Refused, reset, or no route to host.
    #[error("unreachable: {0}")]
    Unreachable(String),

    /// No handshake within the connect timeout.
    #[error("timed out after {0:?}")]
    Timeout(Duration),

    /// Any other transport or handshake failure.
    #[error("{0}")]
    Other(String),

    /// Shutdown was requested while connecting.
    #[error("shutdown requested")]
    Cancelled,
}

impl ConnectError {
    /// Whether the reconnect loop should keep trying after this error.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Unreachable(_) | Self::Timeout(_) | Self::Other(_))
    }
}

/// Everything the background task needs, cloned out of the connection.
#[derive(Clone)]
struct SessionCtx {
    config: WsConnConfig,
    on_text: OnMessageCallback,
    state: StateCell,
    sink: ErrorSink,
    attempts: Arc<AtomicU64>,
}

/// How a read loop ended.
enum ReadOutcome {
    Shutdown,
    Disconnected(String),
}

/// A single WebSocket connection managed by a background tokio task.
pub struct WsConnection {
    config: WsConnConfig,
    state: StateCell,
    sink: ErrorSink,
    /// Total connect attempts, initial one included.
    attempts: Arc<AtomicU64>,
    /// Shutdown signal; `true` once [`stop`](Self::stop) has been called.
    shutdown_tx: watch::Sender<bool>,
    /// Session task (read loop + reconnect loop).
    task: Option<tokio::task::JoinHandle<()>>,
}

impl WsConnection {
    /// Create a new (not yet started) connection.
    pub fn new(config: WsConnConfig, state: StateCell, sink: ErrorSink) -> Self {
        let (shutdown_tx, _) = watch::channel(false);
        Self {
            config,
            state,
            sink,
            attempts: Arc::new(AtomicU64::new(0)),
            shutdown_tx,
            task: None,
        }
    }

    /// Connect once and start the session task.
    ///
    /// Returns the outcome of the initial connect. On a retryable failure the
    /// reconnect loop is already running when this returns; on
    /// [`ConnectError::InvalidEndpoint`] or [`ConnectError::Cancelled`] no task
    /// is started.
    pub async fn start(&mut self, on_text: OnMessageCallback) -> Result<(), ConnectError> {
        let label = &self.config.label;
        if self.task.is_some() {
            warn!("[{label}] already started");
            return Ok(());
        }

        let mut shutdown_rx = self.shutdown_tx.subscribe();
        if *shutdown_rx.borrow() {
            return Err(ConnectError::Cancelled);
        }

        self.state.set(ConnectionState::Connecting);
        info!("[{label}] connecting to {}", self.config.url);

        let ctx = SessionCtx {
            config: self.config.clone(),
            on_text,
            state: self.state.clone(),
            sink: self.sink.clone(),
            attempts: Arc::clone(&self.attempts),
        };

        let result = connect_once(&ctx.config, &ctx.attempts, &mut shutdown_rx).await;
        let (initial, outcome) = match result {
            Ok(stream) => {
                info!("[{label}] connected");
                self.state.set(ConnectionState::Connected);
                (Some(stream), Ok(()))
            }
            Err(e) if e.is_retryable() => {
                error!("[{label}] connection failed: {e}");
                self.state.set(ConnectionState::Disconnected);
                (None, Err(e))
            }
            Err(e) => {
                error!("[{label}] not connecting: {e}");
                self.state.set(ConnectionState::Disconnected);
                return Err(e);
            }
        };

        self.task = Some(tokio::spawn(session_loop(ctx, initial, shutdown_rx)));
        outcome
    }

    /// Total connect attempts so far, the initial one included.
    pub fn connect_attempts(&self) -> u64 {
        self.attempts.load(Ordering::Relaxed)
    }

    /// Whether the session task is still alive.
    pub fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|t| !t.is_finished())
    }

    /// Stop the connection and wait for the task to finish.
    ///
    /// Idempotent. Safe to call before [`start`](Self::start); a later start
    /// then returns [`ConnectError::Cancelled`].
    pub async fn stop(&mut self) {
        self.shutdown_tx.send_replace(true);
        let Some(mut task) = self.task.take() else {
            return;
        };
        if tokio::time::timeout(STOP_TIMEOUT, &mut task).await.is_err() {
            warn!("[{}] session task did not exit in {STOP_TIMEOUT:?}, aborting", self.config.label);
            task.abort();
        }
    }
}

/// Read until disconnected, reconnect, repeat. Exits only on shutdown.
async fn session_loop(
    ctx: SessionCtx,
    mut initial: Option<WsStream>,
    mut shutdown_rx: watch::Receiver<bool>,
) {
    let label = ctx.config.label.clone();

    loop {
        let stream = match initial.take() {
            Some(s) => s,
            None => match reconnect_loop(&ctx, &mut shutdown_rx).await {
                Some(s) => s,
                None => break,
            },
        };

        ctx.state.set(ConnectionState::Connected);

        match read_loop(&ctx, stream, &mut shutdown_rx).await {
            ReadOutcome::Shutdown => break,
            ReadOutcome::Disconnected(reason) => {
                warn!("[{label}] disconnected: {reason}");
                ctx.state.set(ConnectionState::Disconnected);
            }
        }
    }

    info!("[{label}] session task exited");
}

/// Retry every `reconnect_interval` until connected or shut down.
async fn reconnect_loop(
    ctx: &SessionCtx,
    shutdown_rx: &mut watch::Receiver<bool>,
) -> Option<WsStream> {
    let cfg = &ctx.config;
    let label = &cfg.label;
    let mut failures: u32 = 0;

    loop {
        if *shutdown_rx.borrow() {
            return None;
        }

        ctx.state.set(ConnectionState::Reconnecting);
        info!("[{label}] reconnecting (attempt {})", failures.saturating_add(1));

        match connect_once(cfg, &ctx.attempts, shutdown_rx).await {
            Ok(stream) => {
                info!("[{label}] reconnected after {failures} failed attempt(s)");
                return Some(stream);
            }
            Err(ConnectError::Cancelled) => return None,
            Err(e) => {
                failures = failures.saturating_add(1);
                error!("[{label}] reconnect attempt {failures} failed: {e}");
                if cfg.report_every > 0 && failures % cfg.report_every == 0 {
                    ctx.sink.send(format!(
                        "Still trying to reconnect to {label} (attempt {failures}). {}",
                        cfg.reconnect_hint
                    ));
                }
            }
        }

        tokio::select! {
            _ = tokio::time::sleep(cfg.reconnect_interval) => {},
            _ = shutdown_rx.changed() => return None,
        }
    }
}

/// Forward text frames until the connection drops or shutdown is requested.
async fn read_loop(
    ctx: &SessionCtx,
    stream: WsStream,
    shutdown_rx: &mut watch::Receiver<bool>,
) -> ReadOutcome {
    let label = &ctx.config.label;
    let (mut ws_write, mut ws_read) = stream.split();

    loop {
        tokio::select! {
            _ = shutdown_rx.changed() => {
                info!("[{label}] shutdown signal received");
                let _ = ws_write.close().await;
                return ReadOutcome::Shutdown;
            }

            msg = ws_read.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        (ctx.on_text)(text.as_str());
                    }
                    Some(Ok(Message::Binary(data))) => {
                        debug!("[{label}] ignoring binary frame ({} bytes)", data.len());
                    }
                    Some(Ok(Message::Ping(data))) => {
                        let _ = ws_write.send(Message::Pong(data)).await;
                    }
                    Some(Ok(Message::Close(frame))) => {
                        return ReadOutcome::Disconnected(format!("close frame {frame:?}"));
                    }
                    Some(Err(e)) => {
                        return ReadOutcome::Disconnected(format!("read error: {e}"));
                    }
                    None => {
                        return ReadOutcome::Disconnected("stream ended".into());
                    }
                    _ => {} // Pong, Frame
                }
            }
        }
    }
}

/// One bounded connect attempt, abandoned early on shutdown.
async fn connect_once(
    config: &WsConnConfig,
    attempts: &AtomicU64,
    shutdown_rx: &mut watch::Receiver<bool>,
) -> Result<WsStream, ConnectError> {
    attempts.fetch_add(1, Ordering::Relaxed);
    let url = validate_endpoint(&config.url)?;

    tokio::select! {
        res = tokio::time::timeout(config.connect_timeout, tokio_tungstenite::connect_async(url)) => {
            match res {
                Ok(Ok((stream, _response))) => Ok(stream),
                Ok(Err(e)) => Err(classify(e)),
                Err(_) => Err(ConnectError::Timeout(config.connect_timeout)),
            }
        }
        _ = shutdown_rx.changed() => Err(ConnectError::Cancelled),
    }
}

/// Reject URLs that no number of retries will fix.
pub fn validate_endpoint(raw: &str) -> Result<String, ConnectError> {
    let url = url::Url::parse(raw.trim())
        .map_err(|e| ConnectError::InvalidEndpoint(format!("{raw}: {e}")))?;
    if !matches!(url.scheme(), "ws" | "wss") {
        return Err(ConnectError::InvalidEndpoint(format!(
            "{raw}: scheme must be ws or wss, got {}",
            url.scheme()
        )));
    }
    if url.host_str().is_none_or(str::is_empty) {
        return Err(ConnectError::InvalidEndpoint(format!("{raw}: missing host")));
    }
    Ok(url.into())
}

/// Map a tungstenite error onto the retry policy.
fn classify(e: tungstenite::Error) -> ConnectError {
    use std::io::ErrorKind;

    match e {
        tungstenite::Error::Url(u) => ConnectError::InvalidEndpoint(u.to_string()),
        tungstenite::Error::HttpFormat(h) => ConnectError::InvalidEndpoint(h.to_string()),
        tungstenite::Error::Io(io) => match io.kind() {
            ErrorKind::ConnectionRefused
            | ErrorKind::ConnectionReset
            | ErrorKind::ConnectionAborted
            | ErrorKind::NotConnected
            | ErrorKind::AddrNotAvailable
            | ErrorKind::HostUnreachable
            | ErrorKind::NetworkUnreachable
            | ErrorKind::TimedOut => ConnectError::Unreachable(io.to_string()),
            _ => ConnectError::Other(io.to_string()),
        },
        other => ConnectError::Other(other.to_string()),
    }
}
