use crate::MusicContext;

/// Duration used when the caller does not pick one.
pub const DEFAULT_TRANSITION_SECONDS: f32 = 1.0;

/// Shortest transition accepted. Anything below snaps to this.
pub const MIN_TRANSITION_SECONDS: f32 = 0.1;

/// Owns the live and target contexts and blends one toward the other as the
/// host advances time.
///
/// Each tick re-lerps from the *live* value toward the fixed target with the
/// accumulated progress as blend factor, so motion eases out rather than
/// moving at constant speed. Retargeting mid-flight starts from wherever the
/// live value currently is.
#[derive(Debug, Clone)]
pub struct TransitionEngine {
    current: MusicContext,
    target: MusicContext,
    progress: f32,
    duration_seconds: f32,
    default_duration: f32,
}

impl Default for TransitionEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl TransitionEngine {
    /// Creates an engine at rest on the neutral context.
    pub fn new() -> Self {
        Self::with_default_duration(DEFAULT_TRANSITION_SECONDS)
    }

    /// Creates an engine whose presets and default transitions last
    /// `seconds` (floored at [`MIN_TRANSITION_SECONDS`]).
    pub fn with_default_duration(seconds: f32) -> Self {
        let default_duration = floor_duration(seconds);
        Self {
            current: MusicContext::default(),
            target: MusicContext::default(),
            progress: 1.0,
            duration_seconds: default_duration,
            default_duration,
        }
    }

    pub fn current(&self) -> MusicContext {
        self.current
    }

    pub fn target(&self) -> MusicContext {
        self.target
    }

    /// Blend progress of the active transition; `1.0` means at rest.
    pub fn progress(&self) -> f32 {
        self.progress
    }

    pub fn duration_seconds(&self) -> f32 {
        self.duration_seconds
    }

    pub fn default_duration(&self) -> f32 {
        self.default_duration
    }

    pub fn is_transitioning(&self) -> bool {
        self.progress < 1.0
    }

    /// Jumps straight to `context`, cancelling any transition in flight.
    pub fn set_immediate(&mut self, context: MusicContext) {
        let context = context.clamped();
        self.current = context;
        self.target = context;
        self.progress = 1.0;
    }

    /// Starts blending toward `context` over `duration_seconds`. The newest
    /// call always wins; the live context is left where it is.
    pub fn transition_to(&mut self, context: MusicContext, duration_seconds: f32) {
        self.target = context.clamped();
        self.duration_seconds = floor_duration(duration_seconds);
        self.progress = 0.0;
    }

    /// [`TransitionEngine::transition_to`] with the engine's default duration.
    pub fn transition_to_default(&mut self, context: MusicContext) {
        self.transition_to(context, self.default_duration);
    }

    /// Moves the live context by `delta_seconds`. Returns true when the live
    /// context changed at wire granularity, which is when it needs sending.
    pub fn advance(&mut self, delta_seconds: f32) -> bool {
        if self.progress >= 1.0 {
            return false;
        }

        let step = if delta_seconds.is_nan() {
            0.0
        } else {
            delta_seconds.max(0.0)
        };
        self.progress = (self.progress + step / self.duration_seconds).clamp(0.0, 1.0);

        let before = self.current;
        self.current.lerp_toward(&self.target, self.progress);
        !before.wire_eq(&self.current)
    }
}

fn floor_duration(seconds: f32) -> f32 {
    if seconds.is_nan() {
        MIN_TRANSITION_SECONDS
    } else {
        seconds.max(MIN_TRANSITION_SECONDS)
    }
}
