//! Core data types: the normalized vote event and receiver lifecycle state.

pub mod state;
pub mod vote;

pub use state::*;
pub use vote::*;
