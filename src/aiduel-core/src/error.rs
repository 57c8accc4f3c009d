//! Error types for the debate system.

use std::path::PathBuf;

use thiserror::Error;

use crate::participant::Participant;

#[derive(Error, Debug)]
pub enum DebateError {
    #[error("Invalid participant count: expected {expected}, got {actual}")]
    InvalidParticipantCount { expected: usize, actual: usize },

    #[error("Participant {0} has more than one reply provider")]
    DuplicateParticipant(Participant),

    #[error("No pricing entry for participant {0}")]
    UnknownParticipant(Participant),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

/// A failed reply from an external provider. Recovered by the debate loop.
#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("OpenAI API error: {0}")]
    OpenAI(#[from] async_openai::error::OpenAIError),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API returned status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    #[error("{0} is not set")]
    MissingApiKey(&'static str),
}

/// Failure while writing the transcript to disk. The in-memory transcript is untouched.
#[derive(Error, Debug)]
pub enum ExportError {
    #[error("Failed to write {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to serialize transcript: {0}")]
    Serialize(#[from] serde_json::Error),
}
