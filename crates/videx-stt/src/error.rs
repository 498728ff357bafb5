use thiserror::Error;

#[derive(Debug, Error)]
pub enum SttError {
    #[error("no STT engine available for the requested preference")]
    EngineUnavailable,

    #[error("model failed to load: {0}")]
    ModelLoadFailed(String),

    #[error("audio file not found: {0}")]
    AudioFileNotFound(String),

    #[error("transcription produced no text")]
    EmptyTranscription,

    #[error("failed to write subtitle file: {0}")]
    SubtitleWriteFailed(String),

    #[error("operation cancelled")]
    Cancelled,

    #[error(transparent)]
    Media(#[from] videx_media::MediaError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type SttResult<T> = Result<T, SttError>;
