use std::fmt;

use crate::{MusicError, Result};

/// Close code reported when the peer vanished without a close handshake.
pub const ABNORMAL_CLOSE: u16 = 1006;

/// Lifecycle of the link to the remote renderer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connecting,
    Connected,
    /// The current attempt failed. Settles to `Disconnected` once reported.
    Errored,
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ConnectionState::Disconnected => "disconnected",
            ConnectionState::Connecting => "connecting",
            ConnectionState::Connected => "connected",
            ConnectionState::Errored => "errored",
        };
        f.write_str(label)
    }
}

/// Something a transport observed on its connection.
#[derive(Debug, Clone, PartialEq)]
pub enum TransportEvent {
    Connected,
    Error(String),
    Closed {
        code: u16,
        reason: String,
        clean: bool,
    },
    Text(String),
    Binary(Vec<u8>),
}

/// Duplex message connection the controller drives.
///
/// `connect` and `send_text` must not block on the network: a transport
/// reports the outcome later through [`Transport::poll_event`], which the
/// controller drains on the host thread.
pub trait Transport {
    fn connect(&mut self, url: &str) -> Result<()>;

    fn close(&mut self);

    fn send_text(&mut self, frame: &str) -> Result<()>;

    fn poll_event(&mut self) -> Option<TransportEvent>;
}

type ConnectedHook = Box<dyn FnMut()>;
type ErrorHook = Box<dyn FnMut(&str)>;
type ClosedHook = Box<dyn FnMut(u16, &str, bool)>;
type TextHook = Box<dyn FnMut(&str)>;
type BinaryHook = Box<dyn FnMut(&[u8])>;

/// Host callbacks fired after the controller has handled an event. Retry and
/// timeout policy hang off `on_error` and `on_closed`; audio payloads go to
/// `on_binary`.
#[derive(Default)]
pub struct ConnectionHooks {
    on_connected: Option<ConnectedHook>,
    on_error: Option<ErrorHook>,
    on_closed: Option<ClosedHook>,
    on_text: Option<TextHook>,
    on_binary: Option<BinaryHook>,
}

impl ConnectionHooks {
    pub fn on_connected(&mut self, hook: impl FnMut() + 'static) {
        self.on_connected = Some(Box::new(hook));
    }

    pub fn on_error(&mut self, hook: impl FnMut(&str) + 'static) {
        self.on_error = Some(Box::new(hook));
    }

    pub fn on_closed(&mut self, hook: impl FnMut(u16, &str, bool) + 'static) {
        self.on_closed = Some(Box::new(hook));
    }

    pub fn on_text(&mut self, hook: impl FnMut(&str) + 'static) {
        self.on_text = Some(Box::new(hook));
    }

    pub fn on_binary(&mut self, hook: impl FnMut(&[u8]) + 'static) {
        self.on_binary = Some(Box::new(hook));
    }
}

impl fmt::Debug for ConnectionHooks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionHooks")
            .field("on_connected", &self.on_connected.is_some())
            .field("on_error", &self.on_error.is_some())
            .field("on_closed", &self.on_closed.is_some())
            .field("on_text", &self.on_text.is_some())
            .field("on_binary", &self.on_binary.is_some())
            .finish()
    }
}

/// Sole owner of the transport and of [`ConnectionState`].
///
/// State only moves in response to `connect`, `disconnect` and the events
/// the transport reports. Nothing here retries on its own.
pub struct ConnectionController<T: Transport> {
    transport: T,
    state: ConnectionState,
    url: Option<String>,
    last_error: Option<String>,
    hooks: ConnectionHooks,
}

impl<T: Transport> ConnectionController<T> {
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            state: ConnectionState::Disconnected,
            url: None,
            last_error: None,
            hooks: ConnectionHooks::default(),
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn is_connected(&self) -> bool {
        self.state == ConnectionState::Connected
    }

    /// Endpoint of the most recent `connect` call.
    pub fn url(&self) -> Option<&str> {
        self.url.as_deref()
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn hooks_mut(&mut self) -> &mut ConnectionHooks {
        &mut self.hooks
    }

    /// Read-only view of the transport, mostly for diagnostics.
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Starts connecting to `url`. Ignored with a warning while a socket is
    /// already open or opening. A transport that refuses outright is
    /// reported like any other connection error and returned to the caller.
    pub fn connect(&mut self, url: &str) -> Result<()> {
        if matches!(
            self.state,
            ConnectionState::Connected | ConnectionState::Connecting
        ) {
            tracing::warn!(url, state = %self.state, "already connected");
            return Ok(());
        }

        self.url = Some(url.to_string());
        self.state = ConnectionState::Connecting;
        tracing::info!(url, "connecting to renderer");

        if let Err(err) = self.transport.connect(url) {
            self.fail(&err.to_string());
            return Err(err);
        }
        Ok(())
    }

    /// Closes the transport from any state. Idempotent.
    pub fn disconnect(&mut self) {
        if self.state == ConnectionState::Disconnected {
            tracing::warn!("disconnect requested while already disconnected");
            return;
        }

        self.transport.close();
        self.state = ConnectionState::Disconnected;
        tracing::info!("disconnected");
    }

    /// Drains every pending transport event. Returns true when a connection
    /// was established during the drain, which calls for a full resync.
    pub fn pump(&mut self) -> bool {
        let mut established = false;
        while let Some(event) = self.transport.poll_event() {
            established |= self.handle_event(event);
        }
        established
    }

    /// Applies a single transport event. Returns true on a fresh connection.
    pub fn handle_event(&mut self, event: TransportEvent) -> bool {
        match event {
            TransportEvent::Connected => return self.on_open(),
            TransportEvent::Error(error) => {
                if self.state == ConnectionState::Disconnected {
                    tracing::debug!(error = error.as_str(), "ignoring error from a closed connection");
                } else {
                    self.fail(&error);
                }
            }
            TransportEvent::Closed {
                code,
                reason,
                clean,
            } => self.on_close(code, &reason, clean),
            TransportEvent::Text(message) => {
                tracing::debug!(frame = message.as_str(), "received message");
                if let Some(hook) = self.hooks.on_text.as_mut() {
                    hook(&message);
                }
            }
            TransportEvent::Binary(payload) => {
                tracing::trace!(bytes = payload.len(), "received binary payload");
                if let Some(hook) = self.hooks.on_binary.as_mut() {
                    hook(&payload);
                }
            }
        }
        false
    }

    /// Sends one text frame. Refused unless connected.
    pub(crate) fn send_text(&mut self, frame: &str) -> Result<()> {
        if !self.is_connected() {
            return Err(MusicError::Transport(format!(
                "cannot send while {}",
                self.state
            )));
        }
        self.transport.send_text(frame)
    }

    /// Closes the transport and releases it.
    pub fn shutdown(mut self) -> T {
        if self.state != ConnectionState::Disconnected {
            self.disconnect();
        }
        self.transport
    }

    fn on_open(&mut self) -> bool {
        if self.state != ConnectionState::Connecting {
            tracing::debug!(state = %self.state, "ignoring stale open notification");
            return false;
        }

        self.state = ConnectionState::Connected;
        self.last_error = None;
        tracing::info!(url = self.url.as_deref().unwrap_or_default(), "connected");
        if let Some(hook) = self.hooks.on_connected.as_mut() {
            hook();
        }
        true
    }

    fn on_close(&mut self, code: u16, reason: &str, clean: bool) {
        if self.state == ConnectionState::Disconnected {
            tracing::debug!(code, "ignoring close of an already closed connection");
            return;
        }

        self.state = ConnectionState::Disconnected;
        if clean {
            tracing::info!(code, reason, "connection closed");
        } else {
            tracing::warn!(code, reason, "connection closed uncleanly");
        }
        if let Some(hook) = self.hooks.on_closed.as_mut() {
            hook(code, reason, clean);
        }
    }

    fn fail(&mut self, error: &str) {
        self.state = ConnectionState::Errored;
        self.last_error = Some(error.to_string());
        tracing::error!(error, "connection error");
        if let Some(hook) = self.hooks.on_error.as_mut() {
            hook(error);
        }

        self.transport.close();
        self.state = ConnectionState::Disconnected;
    }
}

impl<T: Transport + fmt::Debug> fmt::Debug for ConnectionController<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionController")
            .field("transport", &self.transport)
            .field("state", &self.state)
            .field("url", &self.url)
            .field("last_error", &self.last_error)
            .field("hooks", &self.hooks)
            .finish()
    }
}
