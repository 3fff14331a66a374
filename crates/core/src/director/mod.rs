use crate::{
    channel::{ChannelStats, ControlChannel},
    config::AppConfig,
    connection::{ConnectionController, ConnectionHooks, ConnectionState, Transport},
    events::{EventMapper, EventOutcome, Preset},
    MusicContext, Result, TransitionEngine,
};

/// Host-facing surface of the adaptive music controller.
///
/// The host owns the cadence: call [`MusicDirector::advance`] once per
/// frame. Everything else is driven by the calls below and by transport
/// events drained during `advance` (or an explicit [`MusicDirector::pump`]).
pub struct MusicDirector<T: Transport> {
    engine: TransitionEngine,
    mapper: EventMapper,
    connection: ConnectionController<T>,
    channel: ControlChannel,
    default_url: String,
}

impl<T: Transport> MusicDirector<T> {
    /// Builds a director at rest on the neutral context. Nothing connects
    /// until [`MusicDirector::connect`] is called.
    pub fn create(transport: T, config: &AppConfig) -> Self {
        tracing::info!(
            url = config.server.url.as_str(),
            default_seconds = config.transition.default_seconds,
            "creating music director"
        );
        Self {
            engine: TransitionEngine::with_default_duration(config.transition.default_seconds),
            mapper: EventMapper::new(),
            connection: ConnectionController::new(transport),
            channel: ControlChannel::new(),
            default_url: config.server.url.clone(),
        }
    }

    /// Closes the connection and hands the transport back.
    pub fn shutdown(self) -> T {
        tracing::info!("shutting down music director");
        self.connection.shutdown()
    }

    pub fn connect(&mut self, url: &str) -> Result<()> {
        self.connection.connect(url)
    }

    /// Connects to the configured server.
    pub fn connect_default(&mut self) -> Result<()> {
        self.connection.connect(&self.default_url)
    }

    pub fn disconnect(&mut self) {
        self.connection.disconnect();
    }

    pub fn is_connected(&self) -> bool {
        self.connection.is_connected()
    }

    pub fn connection_state(&self) -> ConnectionState {
        self.connection.state()
    }

    pub fn connection(&self) -> &ConnectionController<T> {
        &self.connection
    }

    pub fn hooks_mut(&mut self) -> &mut ConnectionHooks {
        self.connection.hooks_mut()
    }

    /// Jumps to `context` and sends it right away.
    pub fn set_music_context(&mut self, context: MusicContext) {
        self.engine.set_immediate(context);
        self.push_current();
    }

    pub fn transition_to_context(&mut self, context: MusicContext, duration_seconds: f32) {
        self.engine.transition_to(context, duration_seconds);
    }

    pub fn transition_to_context_default(&mut self, context: MusicContext) {
        self.engine.transition_to_default(context);
    }

    pub fn current_context(&self) -> MusicContext {
        self.engine.current()
    }

    pub fn target_context(&self) -> MusicContext {
        self.engine.target()
    }

    pub fn progress(&self) -> f32 {
        self.engine.progress()
    }

    pub fn apply_preset(&mut self, preset: Preset) {
        self.mapper.apply_preset(&mut self.engine, preset);
    }

    pub fn set_exploration(&mut self) {
        self.apply_preset(Preset::Exploration);
    }

    pub fn set_combat(&mut self) {
        self.apply_preset(Preset::Combat);
    }

    pub fn set_boss(&mut self) {
        self.apply_preset(Preset::Boss);
    }

    pub fn set_puzzle(&mut self) {
        self.apply_preset(Preset::Puzzle);
    }

    pub fn set_victory(&mut self) {
        self.apply_preset(Preset::Victory);
    }

    pub fn push_music_event(&mut self, name: &str, intensity: f32) -> EventOutcome {
        self.mapper.push_event(&mut self.engine, name, intensity)
    }

    /// Drains transport events. A freshly opened connection gets the full
    /// current context once.
    pub fn pump(&mut self) {
        if self.connection.pump() && self.connection.is_connected() {
            self.push_current();
        }
    }

    /// Per-tick entry point: handle transport events, move the transition,
    /// send the context if it changed.
    pub fn advance(&mut self, delta_seconds: f32) {
        self.pump();
        if self.engine.advance(delta_seconds) {
            self.push_current();
        }
    }

    pub fn channel_stats(&self) -> &ChannelStats {
        self.channel.stats()
    }

    fn push_current(&mut self) {
        let context = self.engine.current();
        self.channel.push(&mut self.connection, &context);
    }
}

impl<T: Transport + std::fmt::Debug> std::fmt::Debug for MusicDirector<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MusicDirector")
            .field("engine", &self.engine)
            .field("connection", &self.connection)
            .field("channel", &self.channel)
            .field("default_url", &self.default_url)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::{cell::Cell, rc::Rc};

    use super::*;
    use crate::transport::{MemoryPeer, MemoryTransport};

    const COMBAT_FRAME: &str =
        r#"{"energy":0.90,"tension":0.80,"darkness":0.60,"complexity":0.70}"#;
    const NEUTRAL_FRAME: &str =
        r#"{"energy":0.50,"tension":0.50,"darkness":0.50,"complexity":0.50}"#;

    fn director() -> (MusicDirector<MemoryTransport>, MemoryPeer) {
        let (transport, peer) = MemoryTransport::pair();
        (MusicDirector::create(transport, &AppConfig::default()), peer)
    }

    fn connected_director() -> (MusicDirector<MemoryTransport>, MemoryPeer) {
        let (mut director, peer) = director();
        director.connect_default().unwrap();
        peer.open();
        director.pump();
        peer.take_sent_frames();
        (director, peer)
    }

    #[test]
    fn combat_reaches_table_values_after_one_second() {
        let (mut director, _peer) = director();
        director.set_combat();
        director.advance(1.0);

        assert_eq!(director.current_context().to_wire(), COMBAT_FRAME);
        assert_eq!(director.progress(), 1.0);
    }

    #[test]
    fn connects_to_configured_default_url() {
        let (mut director, peer) = director();
        director.connect_default().unwrap();
        assert_eq!(peer.connect_calls(), vec!["ws://localhost:8765".to_string()]);
        assert_eq!(director.connection_state(), ConnectionState::Connecting);
    }

    #[test]
    fn fresh_connection_syncs_current_context_before_ticks() {
        let (mut director, peer) = director();
        director.connect("ws://localhost:8765").unwrap();
        director.set_combat();
        director.advance(0.5);
        assert!(peer.sent_frames().is_empty());

        peer.open();
        director.advance(0.5);

        let frames = peer.sent_frames();
        assert_eq!(frames.len(), 2);
        // Resync carries the live value reached before this tick.
        assert_eq!(frames[0], director_context_after_half_combat());
        assert_eq!(frames[1], COMBAT_FRAME);
    }

    fn director_context_after_half_combat() -> String {
        let mut engine = TransitionEngine::new();
        engine.transition_to_default(Preset::Combat.context());
        engine.advance(0.5);
        engine.current().to_wire()
    }

    #[test]
    fn reconnect_resyncs_exactly_once() {
        let (mut director, peer) = connected_director();
        peer.drop_connection();
        director.advance(0.016);
        assert!(!director.is_connected());

        director.connect_default().unwrap();
        peer.open();
        director.advance(0.016);
        director.advance(0.016);

        assert_eq!(peer.sent_frames(), vec![NEUTRAL_FRAME]);
    }

    #[test]
    fn ticks_only_send_when_context_changes() {
        let (mut director, peer) = connected_director();
        director.advance(0.016);
        assert!(peer.sent_frames().is_empty());

        director.set_victory();
        let mut ticks = 0;
        while director.progress() < 1.0 {
            director.advance(0.1);
            ticks += 1;
        }
        director.advance(0.1);

        let frames = peer.sent_frames();
        assert!(!frames.is_empty());
        assert!(frames.len() <= ticks);
        assert_eq!(
            frames.last().map(String::as_str),
            Some(Preset::Victory.context().to_wire().as_str())
        );
    }

    #[test]
    fn set_music_context_pushes_immediately() {
        let (mut director, peer) = connected_director();
        director.set_music_context(MusicContext::new(0.1, 0.2, 0.3, 2.0));

        assert_eq!(
            peer.sent_frames(),
            vec![r#"{"energy":0.10,"tension":0.20,"darkness":0.30,"complexity":1.00}"#]
        );
        director.advance(1.0);
        assert_eq!(peer.sent_frames().len(), 1);
    }

    #[test]
    fn nothing_is_sent_while_disconnected() {
        let (mut director, peer) = director();
        director.set_music_context(MusicContext::default());
        director.set_boss();
        for _ in 0..10 {
            director.advance(0.1);
        }

        assert!(peer.sent_frames().is_empty());
        assert!(director.channel_stats().frames_skipped > 0);
    }

    #[test]
    fn errors_leave_state_intact_for_the_next_connection() {
        let (mut director, peer) = director();
        director.connect_default().unwrap();
        peer.fail("connection refused");
        director.set_puzzle();
        director.advance(1.0);
        assert_eq!(director.connection_state(), ConnectionState::Disconnected);

        director.connect_default().unwrap();
        peer.open();
        director.advance(0.0);
        assert_eq!(
            peer.sent_frames(),
            vec![Preset::Puzzle.context().to_wire()]
        );
    }

    #[test]
    fn unknown_events_nudge_tension_from_live_context() {
        let (mut director, _peer) = director();
        director.set_music_context(MusicContext::new(0.2, 0.3, 0.4, 0.6));
        let outcome = director.push_music_event("door_slam", 0.75);

        assert_eq!(outcome, EventOutcome::TensionNudge { tension: 0.75 });
        assert_eq!(director.target_context(), MusicContext::new(0.2, 0.75, 0.4, 0.6));
    }

    #[test]
    fn hooks_see_connection_lifecycle() {
        let (mut director, peer) = director();
        let opened = Rc::new(Cell::new(0));
        let counter = Rc::clone(&opened);
        director.hooks_mut().on_connected(move || counter.set(counter.get() + 1));

        director.connect_default().unwrap();
        peer.open();
        director.advance(0.016);
        assert_eq!(opened.get(), 1);
    }

    #[test]
    fn shutdown_closes_the_transport() {
        let (director, peer) = connected_director();
        let _transport = director.shutdown();
        assert_eq!(peer.close_calls(), 1);
    }
}
