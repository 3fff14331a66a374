//! Concrete [`Transport`](crate::connection::Transport) implementations.
//!
//! - [`MemoryTransport`]: in-process pair for tests and offline previews.
//! - [`WebSocketTransport`]: the real link to a renderer (feature
//!   `websocket`, on by default).

mod memory;
#[cfg(feature = "websocket")]
mod websocket;

pub use memory::{MemoryPeer, MemoryTransport};
#[cfg(feature = "websocket")]
pub use websocket::WebSocketTransport;
