//! Error types for the voice tutor gateway

use std::time::Duration;

use thiserror::Error;

/// Result type alias for tutor operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in the voice tutor gateway
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// The tutor CLI could not be started
    #[error("failed to spawn agent: {0}")]
    AgentSpawn(String),

    /// The tutor CLI exceeded its time budget and was killed
    #[error("agent timed out after {0:?}")]
    AgentTimeout(Duration),

    /// The tutor CLI exited unsuccessfully
    #[error("{0}")]
    Agent(String),

    /// Text-to-speech error
    #[error("TTS error: {0}")]
    Tts(String),

    /// Notes file error
    #[error("notes error: {0}")]
    Notes(String),

    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP error
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
}
