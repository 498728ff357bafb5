use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum MediaError {
    #[error("executable not found: {0}")]
    ExecutableNotFound(String),

    #[error("input file not found: {0}")]
    InputFileNotFound(PathBuf),

    #[error("process exited with code {code}: {stderr_tail}")]
    ProcessExitedWithError { code: i32, stderr_tail: String },

    #[error("process timed out after {0}s")]
    Timeout(u64),

    #[error("failed to parse tool output: {0}")]
    OutputParsingFailed(String),

    #[error("expected output file was not created: {0}")]
    OutputFileNotCreated(PathBuf),

    #[error("operation cancelled")]
    Cancelled,

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type MediaResult<T> = Result<T, MediaError>;

impl MediaError {
    pub fn process_exited(code: i32, stderr: &str) -> Self {
        let tail: String = stderr.chars().rev().take(500).collect::<Vec<_>>().into_iter().rev().collect();
        Self::ProcessExitedWithError {
            code,
            stderr_tail: tail,
        }
    }

    pub fn output_parsing_failed(detail: impl Into<String>) -> Self {
        Self::OutputParsingFailed(detail.into())
    }
}
