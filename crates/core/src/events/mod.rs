use std::{fmt, str::FromStr};

use crate::{MusicContext, MusicError, TransitionEngine};

/// Duration of the tension nudge applied for unrecognised events.
pub const EVENT_NUDGE_SECONDS: f32 = 0.5;

/// Named target contexts for common gameplay situations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Preset {
    Exploration,
    Combat,
    Boss,
    Puzzle,
    Victory,
}

impl Preset {
    pub const ALL: [Preset; 5] = [
        Preset::Exploration,
        Preset::Combat,
        Preset::Boss,
        Preset::Puzzle,
        Preset::Victory,
    ];

    /// The fixed target context for this preset.
    pub fn context(self) -> MusicContext {
        match self {
            Preset::Exploration => MusicContext::new(0.3, 0.1, 0.2, 0.4),
            Preset::Combat => MusicContext::new(0.9, 0.8, 0.6, 0.7),
            Preset::Boss => MusicContext::new(1.0, 0.95, 0.8, 0.9),
            Preset::Puzzle => MusicContext::new(0.4, 0.5, 0.3, 0.6),
            Preset::Victory => MusicContext::new(0.7, 0.2, 0.1, 0.5),
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Preset::Exploration => "exploration",
            Preset::Combat => "combat",
            Preset::Boss => "boss",
            Preset::Puzzle => "puzzle",
            Preset::Victory => "victory",
        }
    }

    /// Preset bound to a named gameplay event, if any. The table is closed:
    /// every other name takes the tension-nudge path.
    pub fn for_event(name: &str) -> Option<Preset> {
        match name {
            "combat_start" => Some(Preset::Combat),
            "boss_enter" => Some(Preset::Boss),
            "puzzle_start" => Some(Preset::Puzzle),
            "victory" => Some(Preset::Victory),
            _ => None,
        }
    }
}

impl fmt::Display for Preset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Preset {
    type Err = MusicError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Preset::ALL
            .into_iter()
            .find(|preset| preset.name().eq_ignore_ascii_case(value.trim()))
            .ok_or_else(|| MusicError::msg(format!("unknown preset `{value}`")))
    }
}

/// How a pushed event was resolved.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum EventOutcome {
    /// The event name maps to a preset.
    Preset(Preset),
    /// Unknown name: tension retargeted to the clamped intensity.
    TensionNudge { tension: f32 },
}

/// Translates semantic intents into transitions on a [`TransitionEngine`].
#[derive(Debug, Default, Clone, Copy)]
pub struct EventMapper;

impl EventMapper {
    pub fn new() -> Self {
        Self
    }

    /// Retargets the engine to `preset` over its default duration.
    pub fn apply_preset(&self, engine: &mut TransitionEngine, preset: Preset) {
        tracing::debug!(preset = preset.name(), "applying preset");
        engine.transition_to_default(preset.context());
    }

    /// Dispatches a named gameplay event. Known names select their preset;
    /// anything else keeps the live energy, darkness and complexity and
    /// moves tension to `intensity` over [`EVENT_NUDGE_SECONDS`].
    pub fn push_event(
        &self,
        engine: &mut TransitionEngine,
        name: &str,
        intensity: f32,
    ) -> EventOutcome {
        if let Some(preset) = Preset::for_event(name) {
            self.apply_preset(engine, preset);
            return EventOutcome::Preset(preset);
        }

        let mut context = engine.current();
        context.set_tension(intensity);
        tracing::debug!(event = name, tension = context.tension, "nudging tension");
        engine.transition_to(context, EVENT_NUDGE_SECONDS);
        EventOutcome::TensionNudge {
            tension: context.tension,
        }
    }
}
