//! Typed error definitions for the vote feed.
//!
//! Provides [`VoteError`] for the failure kinds callers branch on. All variants
//! implement `std::error::Error` via `thiserror`, so they compose with
//! `anyhow::Result` at I/O boundaries.
//!
//! Errors inside a running receiver never reach the owning process. They are
//! logged and, when operator-visible, forwarded through the
//! [`ErrorSink`](crate::sink::ErrorSink).

use thiserror::Error;

/// Domain-specific errors for the vote feed.
#[derive(Debug, Error)]
pub enum VoteError {
    /// Configuration missing or invalid. Never retried.
    #[error("config error: {0}")]
    Config(String),

    /// A frame or page item that could not be decoded.
    #[error("parse error: {0}")]
    Parse(String),

    /// REST call failed (transport or non-success status).
    #[error("http error: {0}")]
    Http(String),

    /// Credential exchange failed.
    #[error("auth error: {0}")]
    Auth(String),

    /// The receiver does not implement the requested operation.
    #[error("{0} is not supported by this receiver")]
    NotSupported(&'static str),
}
