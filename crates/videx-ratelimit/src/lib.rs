#![deny(unreachable_patterns)]

pub mod error;
pub mod limiter;

pub use error::{RateLimitError, RateLimitResult};
pub use limiter::{spawn, RateLimiterConfig, RateLimiterHandle};
