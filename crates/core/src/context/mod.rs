use std::fmt;

use serde::{Deserialize, Serialize};

use crate::Result;

/// Value every dimension starts at: a neutral mood rather than silence.
pub const NEUTRAL: f32 = 0.5;

/// Four-dimensional mood vector that the remote renderer reacts to.
///
/// Every field lives in `[0, 1]`. Setters and [`MusicContext::clamp`]
/// project out-of-range input back into that interval instead of
/// rejecting it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MusicContext {
    /// Calm (0) to energetic (1).
    pub energy: f32,
    /// Relaxed (0) to intense (1).
    pub tension: f32,
    /// Bright (0) to dark (1).
    pub darkness: f32,
    /// Simple (0) to complex (1).
    pub complexity: f32,
}

impl Default for MusicContext {
    fn default() -> Self {
        Self {
            energy: NEUTRAL,
            tension: NEUTRAL,
            darkness: NEUTRAL,
            complexity: NEUTRAL,
        }
    }
}

impl MusicContext {
    /// Builds a context from raw values, clamping each into `[0, 1]`.
    pub fn new(energy: f32, tension: f32, darkness: f32, complexity: f32) -> Self {
        Self {
            energy,
            tension,
            darkness,
            complexity,
        }
        .clamped()
    }

    /// Projects every field into `[0, 1]` in place.
    pub fn clamp(&mut self) {
        self.energy = clamp_unit(self.energy);
        self.tension = clamp_unit(self.tension);
        self.darkness = clamp_unit(self.darkness);
        self.complexity = clamp_unit(self.complexity);
    }

    /// Returns a clamped copy.
    pub fn clamped(mut self) -> Self {
        self.clamp();
        self
    }

    pub fn set_energy(&mut self, value: f32) {
        self.energy = clamp_unit(value);
    }

    pub fn set_tension(&mut self, value: f32) {
        self.tension = clamp_unit(value);
    }

    pub fn set_darkness(&mut self, value: f32) {
        self.darkness = clamp_unit(value);
    }

    pub fn set_complexity(&mut self, value: f32) {
        self.complexity = clamp_unit(value);
    }

    /// Canonical text frame sent to the renderer. Two decimals per field,
    /// fixed key order, nothing else.
    pub fn to_wire(&self) -> String {
        format!(
            "{{\"energy\":{:.2},\"tension\":{:.2},\"darkness\":{:.2},\"complexity\":{:.2}}}",
            self.energy, self.tension, self.darkness, self.complexity
        )
    }

    /// Decodes a frame produced by [`MusicContext::to_wire`]. Values outside
    /// `[0, 1]` are clamped on the way in.
    pub fn from_wire(frame: &str) -> Result<Self> {
        let context: MusicContext = serde_json::from_str(frame)?;
        Ok(context.clamped())
    }

    /// Equality at wire granularity: true iff both contexts serialize to the
    /// same frame.
    pub fn wire_eq(&self, other: &MusicContext) -> bool {
        self.to_wire() == other.to_wire()
    }

    /// Linear blend of every field toward `target` by `alpha`.
    pub fn lerp_toward(&mut self, target: &MusicContext, alpha: f32) {
        self.energy = lerp(self.energy, target.energy, alpha);
        self.tension = lerp(self.tension, target.tension, alpha);
        self.darkness = lerp(self.darkness, target.darkness, alpha);
        self.complexity = lerp(self.complexity, target.complexity, alpha);
    }
}

impl fmt::Display for MusicContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_wire())
    }
}

/// Clamps into `[0, 1]`. NaN maps to [`NEUTRAL`] and negative zero to zero so
/// the frame never carries `NaN` or `-0.00`.
pub fn clamp_unit(value: f32) -> f32 {
    if value.is_nan() {
        NEUTRAL
    } else if value <= 0.0 {
        0.0
    } else if value >= 1.0 {
        1.0
    } else {
        value
    }
}

fn lerp(from: f32, to: f32, alpha: f32) -> f32 {
    from + (to - from) * alpha
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_to_neutral_midpoint() {
        let context = MusicContext::default();
        assert_eq!(
            context.to_wire(),
            r#"{"energy":0.50,"tension":0.50,"darkness":0.50,"complexity":0.50}"#
        );
    }

    #[test]
    fn clamping_valid_context_is_identity() {
        let valid = MusicContext {
            energy: 0.0,
            tension: 0.25,
            darkness: 0.999,
            complexity: 1.0,
        };
        assert_eq!(valid.clamped(), valid);
    }

    #[test]
    fn clamping_projects_out_of_range_fields() {
        let mut context = MusicContext {
            energy: -3.0,
            tension: 0.4,
            darkness: 7.5,
            complexity: -0.0,
        };
        context.clamp();

        assert_eq!(context.energy, 0.0);
        assert_eq!(context.tension, 0.4);
        assert_eq!(context.darkness, 1.0);
        assert_eq!(
            context.to_wire(),
            r#"{"energy":0.00,"tension":0.40,"darkness":1.00,"complexity":0.00}"#
        );
    }

    #[test]
    fn nan_becomes_neutral() {
        let context = MusicContext::new(f32::NAN, 0.1, 0.2, 0.3);
        assert_eq!(context.energy, NEUTRAL);
    }

    #[test]
    fn setters_clamp_instead_of_rejecting() {
        let mut context = MusicContext::default();
        context.set_energy(1.7);
        context.set_tension(-0.2);
        context.set_darkness(0.33);
        context.set_complexity(f32::INFINITY);

        assert_eq!(context, MusicContext::new(1.0, 0.0, 0.33, 1.0));
    }

    #[test]
    fn wire_equality_ignores_sub_centesimal_drift() {
        let a = MusicContext::new(0.501, 0.5, 0.5, 0.5);
        let b = MusicContext::new(0.503, 0.5, 0.5, 0.5);
        let c = MusicContext::new(0.51, 0.5, 0.5, 0.5);

        assert!(a.wire_eq(&b));
        assert!(!a.wire_eq(&c));
        assert_ne!(a, b);
    }

    #[test]
    fn decodes_frames_and_clamps_them() {
        let context =
            MusicContext::from_wire(r#"{"energy":0.90,"tension":1.40,"darkness":0.60,"complexity":0.70}"#)
                .unwrap();
        assert_eq!(context.tension, 1.0);
        assert!((context.energy - 0.9).abs() < 1e-6);
    }

    #[test]
    fn rejects_frames_with_extra_fields() {
        let err = MusicContext::from_wire(
            r#"{"energy":0.5,"tension":0.5,"darkness":0.5,"complexity":0.5,"tempo":120}"#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("malformed context frame"));
    }

    #[test]
    fn display_matches_wire_frame() {
        let context = MusicContext::new(0.3, 0.1, 0.2, 0.4);
        assert_eq!(context.to_string(), context.to_wire());
    }
}
