use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error(transparent)]
    Sqlite(#[from] rusqlite::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("row not found: {0}")]
    NotFound(String),

    #[error("operation cancelled")]
    Cancelled,
}

pub type StoreResult<T> = Result<T, StoreError>;
