//! Operator-visible error reporting.
//!
//! Receivers report human-readable problems ("could not connect to
//! TikFinity", "YouTube voting error: ...") through an [`ErrorSink`]. The
//! owning process drains the matching [`ErrorReceiver`] and forwards the text
//! wherever the operator will see it.
//!
//! Sending never blocks and never fails from the caller's point of view: once
//! the receiving side is gone, messages are dropped.

use tokio::sync::mpsc;
use tracing::{debug, error};

/// Receiving half of an error sink.
pub type ErrorReceiver = mpsc::UnboundedReceiver<String>;

/// Fire-and-forget channel for operator-facing error strings.
#[derive(Debug, Clone)]
pub struct ErrorSink {
    tx: Option<mpsc::UnboundedSender<String>>,
}

impl ErrorSink {
    /// Create a connected sink/receiver pair.
    pub fn channel() -> (Self, ErrorReceiver) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx: Some(tx) }, rx)
    }

    /// A sink with no receiver. Messages are only logged.
    pub fn detached() -> Self {
        Self { tx: None }
    }

    /// Report `message`. Failure to deliver is ignored.
    pub fn send(&self, message: impl Into<String>) {
        let message = message.into();
        error!("{message}");
        let Some(tx) = &self.tx else {
            return;
        };
        if tx.send(message).is_err() {
            debug!("error sink closed, message dropped");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delivers_in_order() {
        let (sink, mut rx) = ErrorSink::channel();
        sink.send("first");
        sink.clone().send(String::from("second"));
        assert_eq!(rx.try_recv().unwrap(), "first");
        assert_eq!(rx.try_recv().unwrap(), "second");
    }

    #[test]
    fn send_after_teardown_is_ignored() {
        let (sink, rx) = ErrorSink::channel();
        drop(rx);
        sink.send("nobody listening");
        ErrorSink::detached().send("also fine");
    }
}
