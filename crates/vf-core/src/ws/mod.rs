//! WebSocket client with a fixed-interval reconnect loop.

pub mod client;

pub use client::{ConnectError, OnMessageCallback, WsConnConfig, WsConnection, WsStream};
