//! WebSocket transport backed by `tokio-tungstenite`.
//!
//! The socket lives in a task on a private tokio runtime. The controller
//! side never awaits anything: `connect` spawns the task and returns,
//! outgoing frames are queued on a channel, and everything the socket
//! observes comes back through [`Transport::poll_event`].

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use futures::{SinkExt, StreamExt};
use tokio::{
    runtime::{Builder, Runtime},
    sync::mpsc::{self, UnboundedReceiver, UnboundedSender},
    task::JoinHandle,
};
use tokio_tungstenite::{connect_async, tungstenite::Message};

use crate::{
    connection::{Transport, TransportEvent, ABNORMAL_CLOSE},
    MusicError, Result,
};

/// Close code used when the peer's close frame carried no status.
const NO_STATUS: u16 = 1005;

pub struct WebSocketTransport {
    runtime: Runtime,
    outgoing: Option<UnboundedSender<Message>>,
    events: Option<UnboundedReceiver<TransportEvent>>,
    task: Option<JoinHandle<()>>,
    /// Set by the task once the handshake finished.
    opened: Arc<AtomicBool>,
}

impl WebSocketTransport {
    /// Creates the transport and its single-worker runtime.
    pub fn new() -> Result<Self> {
        let runtime = Builder::new_multi_thread()
            .worker_threads(1)
            .thread_name("adaptive-music-ws")
            .enable_all()
            .build()?;

        Ok(Self {
            runtime,
            outgoing: None,
            events: None,
            task: None,
            opened: Arc::new(AtomicBool::new(false)),
        })
    }

    /// Whether a socket task is still alive.
    pub fn is_active(&self) -> bool {
        self.task
            .as_ref()
            .map(|task| !task.is_finished())
            .unwrap_or(false)
    }
}

impl Transport for WebSocketTransport {
    fn connect(&mut self, url: &str) -> Result<()> {
        if !url.starts_with("ws://") {
            return Err(MusicError::InvalidUrl(url.to_string()));
        }

        self.close();

        let (outgoing_tx, outgoing_rx) = mpsc::unbounded_channel();
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let opened = Arc::new(AtomicBool::new(false));
        let task = self.runtime.spawn(run_socket(
            url.to_string(),
            outgoing_rx,
            event_tx,
            Arc::clone(&opened),
        ));

        self.outgoing = Some(outgoing_tx);
        self.events = Some(event_rx);
        self.task = Some(task);
        self.opened = opened;
        Ok(())
    }

    fn close(&mut self) {
        // An open socket sees its sender dropped and leaves with a close
        // frame. A handshake still in flight never reaches that loop, so it
        // is cancelled outright. Dropping the receiver keeps late events
        // away from the caller.
        if let Some(task) = self.task.as_ref() {
            if !self.opened.load(Ordering::SeqCst) {
                task.abort();
            }
        }
        self.outgoing = None;
        self.events = None;
    }

    fn send_text(&mut self, frame: &str) -> Result<()> {
        let outgoing = self
            .outgoing
            .as_ref()
            .ok_or_else(|| MusicError::transport("no socket open"))?;
        outgoing
            .send(Message::Text(frame.to_string()))
            .map_err(|_| MusicError::transport("socket task has stopped"))
    }

    fn poll_event(&mut self) -> Option<TransportEvent> {
        self.events.as_mut()?.try_recv().ok()
    }
}

impl std::fmt::Debug for WebSocketTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WebSocketTransport")
            .field("open", &self.outgoing.is_some())
            .field("active", &self.is_active())
            .finish()
    }
}

async fn run_socket(
    url: String,
    mut outgoing: UnboundedReceiver<Message>,
    events: UnboundedSender<TransportEvent>,
    opened: Arc<AtomicBool>,
) {
    let stream = match connect_async(url.as_str()).await {
        Ok((stream, _response)) => stream,
        Err(err) => {
            let _ = events.send(TransportEvent::Error(err.to_string()));
            return;
        }
    };
    opened.store(true, Ordering::SeqCst);
    let _ = events.send(TransportEvent::Connected);

    let (mut sink, mut source) = stream.split();

    loop {
        tokio::select! {
            frame = outgoing.recv() => match frame {
                Some(frame) => {
                    if let Err(err) = sink.send(frame).await {
                        let _ = events.send(TransportEvent::Error(err.to_string()));
                        break;
                    }
                }
                None => {
                    let _ = sink.close().await;
                    break;
                }
            },
            incoming = source.next() => match incoming {
                Some(Ok(Message::Text(text))) => {
                    let _ = events.send(TransportEvent::Text(text));
                }
                Some(Ok(Message::Binary(payload))) => {
                    let _ = events.send(TransportEvent::Binary(payload));
                }
                Some(Ok(Message::Close(frame))) => {
                    let (code, reason) = frame
                        .map(|frame| (u16::from(frame.code), frame.reason.into_owned()))
                        .unwrap_or((NO_STATUS, String::new()));
                    let _ = sink.close().await;
                    let _ = events.send(TransportEvent::Closed {
                        code,
                        reason,
                        clean: true,
                    });
                    break;
                }
                // ping/pong is answered by tungstenite
                Some(Ok(_)) => {}
                Some(Err(err)) => {
                    let _ = events.send(TransportEvent::Error(err.to_string()));
                    break;
                }
                None => {
                    let _ = events.send(TransportEvent::Closed {
                        code: ABNORMAL_CLOSE,
                        reason: String::new(),
                        clean: false,
                    });
                    break;
                }
            },
        }
    }
}
