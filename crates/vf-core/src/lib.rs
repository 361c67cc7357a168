//! # vf-core
//!
//! Core crate for the vote feed, providing:
//!
//! - **Types** (`types`): the normalized [`VoteEvent`] and receiver [`ConnectionState`]
//! - **Vote bus** (`bus`): fan-out of votes to every subscriber
//! - **Error sink** (`sink`): fire-and-forget operator error reporting
//! - **Configuration** (`config`): JSON config deserialization
//! - **Error types** (`error`): domain-specific `VoteError` via thiserror
//! - **Deduplication** (`dedup`): chat message ID dedup table
//! - **WebSocket** (`ws`): WS client with fixed-interval reconnect
//! - **Logging** (`logging`): tracing-based structured logging

pub mod bus;
pub mod config;
pub mod dedup;
pub mod error;
pub mod logging;
pub mod sink;
pub mod types;
pub mod ws;

// Re-export types at crate root for convenience.
pub use types::*;
