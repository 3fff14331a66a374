use serde::Serialize;

use crate::{
    connection::{ConnectionController, Transport},
    MusicContext,
};

/// Running counters for the outbound stream.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ChannelStats {
    pub frames_sent: u64,
    /// Pushes dropped because the link was down or the send was refused.
    pub frames_skipped: u64,
    pub last_frame: Option<String>,
}

/// Fire-and-forget outbound stream of context frames.
///
/// No queue, batching or acknowledgement: every frame carries the absolute
/// state, so a lost one is superseded by the next.
#[derive(Debug, Default)]
pub struct ControlChannel {
    stats: ChannelStats,
}

impl ControlChannel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stats(&self) -> &ChannelStats {
        &self.stats
    }

    /// Sends `context` as one text frame if the connection is up. Returns
    /// whether the frame was handed to the transport.
    pub fn push<T: Transport>(
        &mut self,
        connection: &mut ConnectionController<T>,
        context: &MusicContext,
    ) -> bool {
        if !connection.is_connected() {
            self.stats.frames_skipped += 1;
            return false;
        }

        let frame = context.to_wire();
        match connection.send_text(&frame) {
            Ok(()) => {
                tracing::debug!(frame = frame.as_str(), "sent context");
                self.stats.frames_sent += 1;
                self.stats.last_frame = Some(frame);
                true
            }
            Err(err) => {
                tracing::warn!(error = %err, "dropping context frame");
                self.stats.frames_skipped += 1;
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::{MemoryPeer, MemoryTransport};

    fn connected() -> (ConnectionController<MemoryTransport>, MemoryPeer) {
        let (transport, peer) = MemoryTransport::loopback();
        let mut connection = ConnectionController::new(transport);
        connection.connect("ws://localhost:8765").unwrap();
        connection.pump();
        (connection, peer)
    }

    #[test]
    fn push_without_connection_sends_nothing() {
        let (transport, peer) = MemoryTransport::pair();
        let mut connection = ConnectionController::new(transport);
        let mut channel = ControlChannel::new();

        assert!(!channel.push(&mut connection, &MusicContext::default()));
        connection.connect("ws://localhost:8765").unwrap();
        assert!(!channel.push(&mut connection, &MusicContext::default()));

        assert!(peer.sent_frames().is_empty());
        assert_eq!(channel.stats().frames_skipped, 2);
    }

    #[test]
    fn push_sends_the_wire_frame() {
        let (mut connection, peer) = connected();
        let mut channel = ControlChannel::new();
        let context = MusicContext::new(0.3, 0.1, 0.2, 0.4);

        assert!(channel.push(&mut connection, &context));
        assert_eq!(
            peer.sent_frames(),
            vec![r#"{"energy":0.30,"tension":0.10,"darkness":0.20,"complexity":0.40}"#]
        );
        assert_eq!(channel.stats().frames_sent, 1);
        assert_eq!(channel.stats().last_frame.as_deref(), Some(context.to_wire().as_str()));
    }

    #[test]
    fn send_failure_is_dropped_without_touching_the_connection() {
        let (mut connection, peer) = connected();
        let mut channel = ControlChannel::new();
        peer.refuse_sends(true);

        assert!(!channel.push(&mut connection, &MusicContext::default()));
        assert!(connection.is_connected());
        assert_eq!(channel.stats().frames_skipped, 1);
        assert_eq!(channel.stats().last_frame, None);
    }

    #[test]
    fn stats_serialize_for_reporting() {
        let (mut connection, _peer) = connected();
        let mut channel = ControlChannel::new();
        channel.push(&mut connection, &MusicContext::default());

        let json: serde_json::Value = serde_json::to_value(channel.stats()).unwrap();
        assert_eq!(json["frames_sent"], 1);
        assert_eq!(json["frames_skipped"], 0);
        assert_eq!(
            json["last_frame"],
            r#"{"energy":0.50,"tension":0.50,"darkness":0.50,"complexity":0.50}"#
        );
    }
}
