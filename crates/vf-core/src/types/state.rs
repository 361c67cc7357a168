//! Receiver connection lifecycle.

use std::sync::Arc;

use serde::Serialize;
use tokio::sync::watch;

/// Lifecycle of one receiver.
///
/// ```text
/// Uninitialized ─► Connecting ─► Connected ◄─► Disconnected ─► Reconnecting
///                                    ▲                              │
///                                    └──────────────────────────────┘
/// any state ─(stop)─► Stopped
/// ```
///
/// Votes are only emitted while `Connected`. `Stopped` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionState {
    #[default]
    Uninitialized,
    Connecting,
    Connected,
    Disconnected,
    Reconnecting,
    Stopped,
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Uninitialized => write!(f, "uninitialized"),
            Self::Connecting => write!(f, "connecting"),
            Self::Connected => write!(f, "connected"),
            Self::Disconnected => write!(f, "disconnected"),
            Self::Reconnecting => write!(f, "reconnecting"),
            Self::Stopped => write!(f, "stopped"),
        }
    }
}

/// Shared, observable [`ConnectionState`].
///
/// The receiver's own loop publishes transitions; the owner reads the current
/// value or awaits a particular one. Once `Stopped` has been published every
/// other transition is ignored.
#[derive(Debug, Clone)]
pub struct StateCell {
    tx: Arc<watch::Sender<ConnectionState>>,
}

impl StateCell {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(ConnectionState::Uninitialized);
        Self { tx: Arc::new(tx) }
    }

    /// Current state.
    pub fn get(&self) -> ConnectionState {
        *self.tx.borrow()
    }

    /// Publish a transition. Returns `false` if the cell is already stopped.
    pub fn set(&self, next: ConnectionState) -> bool {
        self.tx.send_if_modified(|current| {
            if *current == ConnectionState::Stopped || *current == next {
                return false;
            }
            *current = next;
            true
        }) || self.get() == next
    }

    /// Watch transitions.
    pub fn subscribe(&self) -> watch::Receiver<ConnectionState> {
        self.tx.subscribe()
    }
}

impl Default for StateCell {
    fn default() -> Self {
        Self::new()
    }
}
