//! Error types for the smart deck

use thiserror::Error;

/// Result type alias for deck operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in the smart deck daemon
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// Voice processing error
    #[error("voice error: {0}")]
    Voice(String),

    /// Audio error
    #[error("audio error: {0}")]
    Audio(String),

    /// Speech-to-text error
    #[error("STT error: {0}")]
    Stt(String),

    /// Text-to-speech error
    #[error("TTS error: {0}")]
    Tts(String),

    /// Weather endpoint error
    #[error("weather error: {0}")]
    Weather(String),

    /// Inference engine error (load phase)
    #[error("inference error: {0}")]
    Inference(String),

    /// Hardware bridge error
    #[error("hardware bridge error: {0}")]
    Hardware(String),

    /// Assistant actor is gone
    #[error("assistant unavailable")]
    AssistantUnavailable,

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
