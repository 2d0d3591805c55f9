//! Error types for Herald

use thiserror::Error;

/// Result type alias for Herald operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in Herald
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// Microphone permission was refused; the session cannot start
    #[error("microphone permission denied: {0}")]
    PermissionDenied(String),

    /// Audio device error
    #[error("audio error: {0}")]
    Audio(String),

    /// Recording could not be started or produced no audio
    #[error("recording error: {0}")]
    Recording(String),

    /// Transcription service reported an error
    #[error("transcription error: {0}")]
    Transcription(String),

    /// Transcription did not reach a terminal status in time
    #[error("transcription timed out after {attempts} polls")]
    TranscriptionTimeout {
        /// Number of status polls made before giving up
        attempts: u32,
    },

    /// Text-to-speech error
    #[error("TTS error: {0}")]
    Tts(String),

    /// News search error
    #[error("news error: {0}")]
    News(String),

    /// Article fetch error (invalid URL, blocked host, request failures)
    #[error("article fetch error: {0}")]
    Fetch(String),

    /// No readable content could be extracted from an article
    #[error("extraction error: {0}")]
    Extraction(String),

    /// Backend proxy error
    #[error("server error: {0}")]
    Server(String),

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
