//! Fan-out of [`VoteEvent`]s to any number of subscribers.
//!
//! Each receiver owns one [`VoteBus`]. Every subscriber gets its own unbounded
//! channel, so a slow consumer never blocks the receiver's loop and never
//! causes another subscriber to miss a vote.

use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::mpsc;
use tracing::debug;

use crate::types::VoteEvent;

/// Sender half of one subscription.
pub type VoteSender = mpsc::UnboundedSender<VoteEvent>;

/// Receiver half of one subscription.
pub type VoteSubscription = mpsc::UnboundedReceiver<VoteEvent>;

/// Observer registration list for votes.
///
/// Cloning yields another handle to the same list.
#[derive(Debug, Clone, Default)]
pub struct VoteBus {
    subscribers: Arc<Mutex<Vec<VoteSender>>>,
}

impl VoteBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new subscriber. It sees every vote emitted from now on.
    pub fn subscribe(&self) -> VoteSubscription {
        let (tx, rx) = mpsc::unbounded_channel();
        self.subscribers.lock().unwrap_or_else(PoisonError::into_inner).push(tx);
        rx
    }

    /// Deliver `vote` to every live subscriber, dropping the closed ones.
    pub fn emit(&self, vote: VoteEvent) {
        let mut subs = self.subscribers.lock().unwrap_or_else(PoisonError::into_inner);
        let before = subs.len();
        subs.retain(|tx| tx.send(vote.clone()).is_ok());
        if subs.len() < before {
            debug!("vote bus: pruned {} closed subscriber(s)", before - subs.len());
        }
    }

    /// Number of registered subscribers (closed ones are pruned lazily).
    #[cfg(test)]
    fn subscriber_count(&self) -> usize {
        self.subscribers.lock().unwrap_or_else(PoisonError::into_inner).len()
    }
}
