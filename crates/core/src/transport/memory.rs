//! In-process transport pair.
//!
//! [`MemoryTransport`] goes to the controller; the matching [`MemoryPeer`]
//! plays the remote renderer. The peer decides when the connection opens,
//! fails or closes, injects inbound frames, and records everything the
//! controller sent.

use std::{cell::RefCell, collections::VecDeque, rc::Rc};

use crate::{
    connection::{Transport, TransportEvent, ABNORMAL_CLOSE},
    MusicError, Result,
};

#[derive(Debug, Default)]
struct Link {
    pending: VecDeque<TransportEvent>,
    sent: Vec<String>,
    connects: Vec<String>,
    closes: usize,
    refuse_connect: Option<String>,
    refuse_sends: bool,
    auto_open: bool,
}

/// Controller half of the in-process pair.
#[derive(Debug)]
pub struct MemoryTransport {
    link: Rc<RefCell<Link>>,
}

/// Renderer half of the in-process pair.
#[derive(Debug, Clone)]
pub struct MemoryPeer {
    link: Rc<RefCell<Link>>,
}

impl MemoryTransport {
    pub fn pair() -> (MemoryTransport, MemoryPeer) {
        let link = Rc::new(RefCell::new(Link::default()));
        (
            MemoryTransport {
                link: Rc::clone(&link),
            },
            MemoryPeer { link },
        )
    }

    /// A pair whose connections open as soon as they are requested.
    pub fn loopback() -> (MemoryTransport, MemoryPeer) {
        let (transport, peer) = Self::pair();
        peer.set_auto_open(true);
        (transport, peer)
    }
}

impl Transport for MemoryTransport {
    fn connect(&mut self, url: &str) -> Result<()> {
        let mut link = self.link.borrow_mut();
        if let Some(reason) = link.refuse_connect.take() {
            return Err(MusicError::Transport(reason));
        }
        link.connects.push(url.to_string());
        if link.auto_open {
            link.pending.push_back(TransportEvent::Connected);
        }
        Ok(())
    }

    fn close(&mut self) {
        let mut link = self.link.borrow_mut();
        link.closes += 1;
        link.pending.clear();
    }

    fn send_text(&mut self, frame: &str) -> Result<()> {
        let mut link = self.link.borrow_mut();
        if link.refuse_sends {
            return Err(MusicError::transport("send buffer full"));
        }
        link.sent.push(frame.to_string());
        Ok(())
    }

    fn poll_event(&mut self) -> Option<TransportEvent> {
        self.link.borrow_mut().pending.pop_front()
    }
}

impl MemoryPeer {
    pub fn set_auto_open(&self, enabled: bool) {
        self.link.borrow_mut().auto_open = enabled;
    }

    /// Accepts the pending connection.
    pub fn open(&self) {
        self.push(TransportEvent::Connected);
    }

    pub fn fail(&self, error: &str) {
        self.push(TransportEvent::Error(error.to_string()));
    }

    /// Closes with a proper close handshake.
    pub fn close(&self, code: u16, reason: &str) {
        self.push(TransportEvent::Closed {
            code,
            reason: reason.to_string(),
            clean: true,
        });
    }

    /// Vanishes without a close handshake.
    pub fn drop_connection(&self) {
        self.push(TransportEvent::Closed {
            code: ABNORMAL_CLOSE,
            reason: String::new(),
            clean: false,
        });
    }

    pub fn reply_text(&self, text: &str) {
        self.push(TransportEvent::Text(text.to_string()));
    }

    pub fn reply_binary(&self, payload: Vec<u8>) {
        self.push(TransportEvent::Binary(payload));
    }

    /// Makes the next `connect` fail synchronously with `reason`.
    pub fn refuse_next_connect(&self, reason: &str) {
        self.link.borrow_mut().refuse_connect = Some(reason.to_string());
    }

    pub fn refuse_sends(&self, refuse: bool) {
        self.link.borrow_mut().refuse_sends = refuse;
    }

    pub fn sent_frames(&self) -> Vec<String> {
        self.link.borrow().sent.clone()
    }

    /// Returns and forgets everything sent so far.
    pub fn take_sent_frames(&self) -> Vec<String> {
        std::mem::take(&mut self.link.borrow_mut().sent)
    }

    pub fn connect_calls(&self) -> Vec<String> {
        self.link.borrow().connects.clone()
    }

    pub fn close_calls(&self) -> usize {
        self.link.borrow().closes
    }

    fn push(&self, event: TransportEvent) {
        self.link.borrow_mut().pending.push_back(event);
    }
}
