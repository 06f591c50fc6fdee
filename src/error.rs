//! Error types for the Dinner robot backend

use std::any::Any;

use thiserror::Error;

/// Result type alias for robot operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in the robot backend
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// Audio device error
    #[error("audio error: {0}")]
    Audio(String),

    /// Speech-to-text error
    #[error("STT error: {0}")]
    Stt(String),

    /// Text-to-speech error
    #[error("TTS error: {0}")]
    Tts(String),

    /// Language model call failed
    #[error("language model error: {0}")]
    Llm(String),

    /// Language model reply could not be parsed
    #[error("malformed reply: {0}")]
    Reply(String),

    /// Speech output worker is gone
    #[error("speech worker error: {0}")]
    Worker(String),

    /// A collaborator panicked mid-task
    #[error("panicked: {0}")]
    Panicked(String),

    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP error
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// TOML parsing error
    #[error("toml error: {0}")]
    Toml(#[from] toml::de::Error),
}

impl Error {
    /// Convert a caught panic payload into an error
    #[must_use]
    pub fn from_panic(payload: &(dyn Any + Send)) -> Self {
        let message = payload
            .downcast_ref::<&str>()
            .map(|s| (*s).to_string())
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "unknown panic".to_string());
        Self::Panicked(message)
    }
}
