//! Error types for Lull.

use thiserror::Error;

/// Library-level error type for Lull operations.
#[derive(Error, Debug)]
pub enum LullError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Transient service failure: {0}")]
    TransientService(String),

    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    #[error("Cardinality mismatch in {what}: expected {expected}, got {actual}")]
    CardinalityMismatch {
        what: String,
        expected: usize,
        actual: usize,
    },

    #[error("Chapter {chapter} generation failed after {attempts} attempts")]
    ChapterGeneration { chapter: u32, attempts: u32 },

    #[error("Checkpoint I/O failure: {0}")]
    CheckpointIo(String),

    #[error("Progress ledger error: {0}")]
    Ledger(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("OpenAI API error: {0}")]
    OpenAI(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl LullError {
    /// Whether this failure class is worth retrying with backoff.
    ///
    /// Only transient service failures (timeouts, rate limits, 5xx-equivalents)
    /// qualify. Malformed responses are retried at the chapter level instead,
    /// and checkpoint failures are fatal.
    pub fn is_transient(&self) -> bool {
        matches!(self, LullError::TransientService(_))
    }

    /// Whether this failure means the response could not be coerced into a
    /// valid record. These are retried a bounded number of times per chapter.
    pub fn is_malformed(&self) -> bool {
        matches!(
            self,
            LullError::MalformedResponse(_) | LullError::CardinalityMismatch { .. }
        )
    }
}

/// Result type alias for Lull operations.
pub type Result<T> = std::result::Result<T, LullError>;
