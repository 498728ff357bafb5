use thiserror::Error;

#[derive(Debug, Error)]
pub enum IndexerError {
    #[error("operation cancelled")]
    Cancelled,

    #[error("layer failed: {0}")]
    LayerFailed(String),

    #[error(transparent)]
    Media(#[from] videx_media::MediaError),

    #[error(transparent)]
    Store(#[from] videx_store::StoreError),

    #[error(transparent)]
    Stt(#[from] videx_stt::SttError),

    #[error(transparent)]
    Vision(#[from] videx_vision::VisionError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type IndexerResult<T> = Result<T, IndexerError>;
