/// Result alias that carries the custom [`SoundError`] type.
pub type Result<T> = std::result::Result<T, SoundError>;

/// Common error type for the scheduling core.
///
/// Only configuration and loading paths return these to the caller. Errors
/// raised while handing sounds to the host engine are logged at the point of
/// failure and the affected sound is dropped.
#[derive(Debug, thiserror::Error)]
pub enum SoundError {
    /// The host engine refused or failed to start a playback request.
    #[error("host engine rejected `{identity}`: {reason}")]
    Playback { identity: String, reason: String },
    /// The channel probe could not query the output device.
    #[error("channel probe failed: {0}")]
    Probe(String),
    /// A configuration value is outside its accepted range.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    /// Wrapper around standard IO errors.
    #[error("{0}")]
    Io(#[from] std::io::Error),
    /// Wrapper around JSON (de)serialisation errors.
    #[error("{0}")]
    Json(#[from] serde_json::Error),
    /// Free-form message for host integrations without a richer error type.
    #[error("{0}")]
    Message(String),
}

impl SoundError {
    /// Creates a new error that simply wraps the provided message.
    pub fn msg<T: Into<String>>(msg: T) -> Self {
        Self::Message(msg.into())
    }

    /// Creates a playback rejection for the given sound identity.
    pub fn playback(identity: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Playback {
            identity: identity.into(),
            reason: reason.into(),
        }
    }
}

impl From<&str> for SoundError {
    fn from(value: &str) -> Self {
        Self::msg(value)
    }
}

impl From<String> for SoundError {
    fn from(value: String) -> Self {
        Self::Message(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn playback_error_names_the_identity() {
        let err = SoundError::playback("ambient.rain", "device lost");
        assert_eq!(err.to_string(), "host engine rejected `ambient.rain`: device lost");
    }

    #[test]
    fn strings_convert_into_messages() {
        let err: SoundError = "boom".into();
        assert!(matches!(err, SoundError::Message(ref m) if m == "boom"));
    }
}
