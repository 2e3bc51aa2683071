use thiserror::Error;

/// Failures surfaced by the summarization pipeline
#[derive(Debug, Error)]
pub enum Error {
    #[error("no YouTube video ID found in {0:?}")]
    NotFound(String),

    #[error("malformed video metadata: {0}")]
    MalformedMetadata(String),

    #[error("video {0} does not exist or is private")]
    VideoNotFound(String),

    #[error("metadata lookup timed out")]
    MetadataTimeout,

    #[error("metadata lookup failed: {0}")]
    MetadataLookup(String),

    #[error("transcript unavailable: {0}")]
    TranscriptUnavailable(String),

    #[error("could not generate summary: {0}")]
    SummaryGenerationFailed(#[from] GenerationError),
}

/// Failures reported by a text-generation provider
#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("request exceeds the provider's input limit")]
    RequestTooLarge,

    #[error("request timed out")]
    Timeout,

    #[error("transport error: {0}")]
    Transport(String),

    #[error("provider returned {status}: {message}")]
    Api { status: u16, message: String },

    #[error("unexpected response format: {0}")]
    MalformedResponse(String),
}

impl From<reqwest::Error> for GenerationError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            GenerationError::Timeout
        } else if err.is_decode() {
            GenerationError::MalformedResponse(err.to_string())
        } else {
            GenerationError::Transport(err.to_string())
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
