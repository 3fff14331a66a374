//! Core library for the adaptive music controller.
//!
//! A host (game or simulation) describes the desired musical mood as a
//! four-dimensional [`MusicContext`]. The crate blends that context over
//! time, maps gameplay events onto it, and streams it to a remote renderer
//! over a lossy control channel. Each module owns one piece of that path;
//! [`MusicDirector`] ties them together for the host.

pub mod channel;
pub mod config;
pub mod connection;
pub mod context;
pub mod director;
pub mod error;
pub mod events;
pub mod transition;
pub mod transport;

pub use channel::{ChannelStats, ControlChannel};
pub use config::{AppConfig, ReconnectConfig, ServerConfig, TickConfig, TransitionConfig};
pub use connection::{
    ConnectionController, ConnectionHooks, ConnectionState, Transport, TransportEvent,
};
pub use context::MusicContext;
pub use director::MusicDirector;
pub use error::{MusicError, Result};
pub use events::{EventMapper, EventOutcome, Preset};
pub use transition::TransitionEngine;
pub use transport::{MemoryPeer, MemoryTransport};
#[cfg(feature = "websocket")]
pub use transport::WebSocketTransport;
