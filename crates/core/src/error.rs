/// Result alias that carries the custom [`MusicError`] type.
pub type Result<T> = std::result::Result<T, MusicError>;

/// Common error type for the core crate.
///
/// Only the I/O edges produce these. Mood parameters and durations are
/// clamped instead of rejected, so nothing on the transition path fails.
#[derive(Debug, thiserror::Error)]
pub enum MusicError {
    /// Free-form message for conditions without a dedicated variant.
    #[error("{0}")]
    Message(String),
    /// Wrapper around standard IO errors.
    #[error("{0}")]
    Io(#[from] std::io::Error),
    /// The transport refused a connect or send request.
    #[error("transport error: {0}")]
    Transport(String),
    /// A configuration file could not be parsed.
    #[error("invalid configuration: {0}")]
    Config(#[from] toml::de::Error),
    /// A wire frame could not be decoded.
    #[error("malformed context frame: {0}")]
    Frame(#[from] serde_json::Error),
    /// The endpoint is not something the transport can dial.
    #[error("invalid server url `{0}`")]
    InvalidUrl(String),
}

impl MusicError {
    /// Creates a new error that simply wraps the provided message.
    pub fn msg<T: Into<String>>(msg: T) -> Self {
        Self::Message(msg.into())
    }

    /// Creates a transport error from anything printable.
    pub fn transport<T: std::fmt::Display>(err: T) -> Self {
        Self::Transport(err.to_string())
    }
}
