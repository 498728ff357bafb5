use thiserror::Error;

#[derive(Debug, Error)]
pub enum VisionError {
    #[error("no vision API key available")]
    NoApiKey,

    #[error("vision provider rejected the request: {0}")]
    RequestFailed(String),

    #[error("vision provider returned a rate-limit response")]
    RateLimited,

    #[error("failed to parse vision response: {0}")]
    ResponseParsingFailed(String),

    #[error("embedding vector length {actual} does not match dims*4={expected}")]
    EmbeddingLengthMismatch { expected: usize, actual: usize },

    #[error(transparent)]
    Http(#[from] reqwest::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type VisionResult<T> = Result<T, VisionError>;
