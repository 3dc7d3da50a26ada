//! Error types for Podweave.

use thiserror::Error;

/// Library-level error type for Podweave operations.
#[derive(Error, Debug)]
pub enum PodweaveError {
    #[error("Content too short for long-form generation: {length} characters (minimum {min_chunk_size}). Use short-form generation instead.")]
    ContentTooShort { length: usize, min_chunk_size: usize },

    #[error("Transcript generation failed for chunk {chunk_index} after {attempts} attempt(s): {reason}")]
    TranscriptGeneration {
        chunk_index: usize,
        attempts: u32,
        reason: String,
    },

    #[error("Malformed transcript: {reason} (near: {excerpt:?})")]
    MalformedTranscript { reason: String, excerpt: String },

    #[error("Speech synthesis failed for utterances {first_utterance}..={last_utterance} after {attempts} attempt(s): {reason}")]
    Synthesis {
        first_utterance: usize,
        last_utterance: usize,
        attempts: u32,
        reason: String,
    },

    #[error("Audio format mismatch at segment {sequence_index}: expected {expected}, found {found}")]
    AudioFormatMismatch {
        sequence_index: usize,
        expected: String,
        found: String,
    },

    #[error("Generated dialogue rejected: {0}")]
    InvalidFragment(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Content extraction failed: {0}")]
    Extraction(String),

    #[error("Audio processing error: {0}")]
    Audio(String),

    /// Bytes from a speech backend that are neither MP3 nor WAV.
    #[error("Speech backend returned unusable audio: {0}")]
    UnusableAudio(String),

    #[error("Request timed out after {0:?}")]
    Timeout(std::time::Duration),

    #[error("Operation cancelled: {0}")]
    Cancelled(String),

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

    #[error("External tool not found: {0}. Please install it and ensure it's in your PATH.")]
    ToolNotFound(String),

    #[error("External tool failed: {0}")]
    ToolFailed(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl PodweaveError {
    /// Whether a failed external call may succeed if repeated with the same inputs.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            PodweaveError::InvalidFragment(_)
                | PodweaveError::Timeout(_)
                | PodweaveError::UnusableAudio(_)
                | PodweaveError::Http(_)
                | PodweaveError::OpenAI(_)
                | PodweaveError::ToolFailed(_)
        )
    }
}

impl From<hound::Error> for PodweaveError {
    fn from(err: hound::Error) -> Self {
        PodweaveError::Audio(format!("WAV error: {}", err))
    }
}

/// Result type alias for Podweave operations.
pub type Result<T> = std::result::Result<T, PodweaveError>;
