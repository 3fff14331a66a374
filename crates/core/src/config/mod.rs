use std::{path::Path, time::Duration};

use serde::{Deserialize, Serialize};

use crate::{transition::DEFAULT_TRANSITION_SECONDS, Result};

/// Renderer endpoint used when nothing else is configured.
pub const DEFAULT_SERVER_URL: &str = "ws://localhost:8765";

/// Environment variable overriding [`ServerConfig::url`].
pub const URL_ENV: &str = "ADAPTIVE_MUSIC_URL";

/// Top-level configuration structure for the application.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub transition: TransitionConfig,
    pub reconnect: ReconnectConfig,
    pub tick: TickConfig,
}

impl AppConfig {
    /// Reads a TOML file. Missing sections and keys keep their defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path.as_ref())?;
        Self::from_toml_str(&text)
    }

    pub fn from_toml_str(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }

    /// Applies overrides from the process environment.
    pub fn apply_env(&mut self) {
        if let Ok(url) = std::env::var(URL_ENV) {
            self.apply_url_override(&url);
        }
    }

    fn apply_url_override(&mut self, url: &str) {
        let url = url.trim();
        if !url.is_empty() {
            self.server.url = url.to_string();
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub url: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_SERVER_URL.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransitionConfig {
    /// Duration of presets and default transitions, in seconds.
    pub default_seconds: f32,
}

impl Default for TransitionConfig {
    fn default() -> Self {
        Self {
            default_seconds: DEFAULT_TRANSITION_SECONDS,
        }
    }
}

/// Retry policy for the host. The core never reconnects by itself.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReconnectConfig {
    /// Reconnection attempts after an unexpected drop (0 = never).
    pub attempts: u32,
    pub delay_ms: u64,
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            attempts: 0,
            delay_ms: 1000,
        }
    }
}

impl ReconnectConfig {
    pub fn delay(&self) -> Duration {
        Duration::from_millis(self.delay_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TickConfig {
    pub hz: u32,
}

impl Default for TickConfig {
    fn default() -> Self {
        Self { hz: 60 }
    }
}

impl TickConfig {
    /// Seconds per tick. A zero rate falls back to one tick per second.
    pub fn delta_seconds(&self) -> f32 {
        1.0 / self.hz.max(1) as f32
    }
}
