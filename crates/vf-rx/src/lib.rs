//! # vf-rx
//!
//! Voting receivers: adapters that turn chat on third-party platforms into a
//! stream of [`VoteEvent`](vf_core::VoteEvent)s.
//!
//! ## Receivers
//!
//! | Platform | Module      | Transport                          |
//! |----------|-------------|------------------------------------|
//! | TikTok   | `tiktok`    | TikFinity WebSocket (push)         |
//! | YouTube  | `youtube`   | Live Chat REST API (cursor polling)|
//! | Testing  | `simulated` | Timer-driven synthetic votes       |
//!
//! [`registry::create_receiver`] builds any of them from a
//! [`ReceiverConfig`](vf_core::config::ReceiverConfig).

pub mod registry;
pub mod simulated;
pub mod tiktok;
pub mod youtube;

use async_trait::async_trait;
use vf_core::bus::VoteSubscription;
use vf_core::error::VoteError;
use vf_core::types::ConnectionState;

/// Trait implemented by all voting receivers.
///
/// # Lifecycle
///
/// 1. Construct via the platform-specific `new(config, sink)`.
/// 2. [`subscribe`](VotingReceiver::subscribe) as many consumers as needed.
/// 3. Call [`init`](VotingReceiver::init) once. Votes may arrive any time
///    after it starts connecting, including after it has returned.
/// 4. Call [`stop`](VotingReceiver::stop) once at shutdown.
///
/// Failures never surface as errors from a running receiver. The owner only
/// sees the boolean from `init`; everything else goes through the receiver's
/// [`ErrorSink`](vf_core::sink::ErrorSink).
#[async_trait]
pub trait VotingReceiver: Send + Sync {
    /// Human-readable receiver name.
    fn name(&self) -> &str;

    /// Current lifecycle state.
    fn state(&self) -> ConnectionState;

    /// Register a consumer. Each subscriber sees every later vote exactly once.
    fn subscribe(&self) -> VoteSubscription;

    /// Establish the initial connection or session.
    ///
    /// Returns `false` on an expected failure (bad URL, unreachable
    /// endpoint, rejected credentials) after reporting it. A background
    /// reconnect may still be running when this returns `false`.
    async fn init(&mut self) -> bool;

    /// Send a chat message back to the platform.
    async fn send_message(&self, message: &str) -> Result<(), VoteError>;

    /// Stop all background work and wait for it to finish. Idempotent.
    async fn stop(&mut self);
}
