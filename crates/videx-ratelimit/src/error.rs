use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum RateLimitError {
    #[error("daily limit reached: {used}/{limit}")]
    DailyLimitReached { used: u32, limit: u32 },

    #[error("rate limiter actor is no longer running")]
    ActorGone,
}

pub type RateLimitResult<T> = Result<T, RateLimitError>;
