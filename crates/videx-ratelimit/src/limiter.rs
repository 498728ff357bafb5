//! Single-writer rate-limiter actor protecting the shared external vision/
//! embedding API quota (spec §4.7). Deliberately not a raw `Mutex` +
//! condvar: one task owns the window, cap, backoff, and daily counter;
//! everyone else talks to it over a channel (spec §9 Design Notes).

use std::collections::{HashMap, VecDeque};
use std::time::Duration;

use chrono::Utc;
use tokio::sync::{mpsc, oneshot};
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::error::RateLimitError;

#[derive(Debug, Clone)]
pub struct RateLimiterConfig {
    pub min_requests_per_window: u32,
    pub max_requests_per_window: u32,
    pub window_duration: Duration,
    pub daily_quota: Option<u32>,
}

impl Default for RateLimiterConfig {
    fn default() -> Self {
        Self {
            min_requests_per_window: 3,
            max_requests_per_window: 9,
            window_duration: Duration::from_secs(60),
            daily_quota: None,
        }
    }
}

enum Message {
    WaitForPermission(oneshot::Sender<Result<(), RateLimitError>>),
    ReportSuccess,
    ReportRateLimit,
    CurrentMax(oneshot::Sender<u32>),
}

#[derive(Clone)]
pub struct RateLimiterHandle {
    tx: mpsc::Sender<Message>,
}

impl RateLimiterHandle {
    pub async fn wait_for_permission(&self) -> Result<(), RateLimitError> {
        let (tx, rx) = oneshot::channel();
        self.tx
            .send(Message::WaitForPermission(tx))
            .await
            .map_err(|_| RateLimitError::ActorGone)?;
        rx.await.map_err(|_| RateLimitError::ActorGone)?
    }

    pub async fn report_success(&self) {
        let _ = self.tx.send(Message::ReportSuccess).await;
    }

    pub async fn report_rate_limit(&self) {
        let _ = self.tx.send(Message::ReportRateLimit).await;
    }

    /// Exposed for tests/observability; not part of the spec's public
    /// surface but useful to assert the `currentMax` invariant directly.
    pub async fn current_max(&self) -> Option<u32> {
        let (tx, rx) = oneshot::channel();
        self.tx.send(Message::CurrentMax(tx)).await.ok()?;
        rx.await.ok()
    }
}

struct ActorState {
    config: RateLimiterConfig,
    window: VecDeque<Instant>,
    current_max: u32,
    backoff_until: Option<Instant>,
    consecutive_429: u32,
    daily_counts: HashMap<String, u32>,
}

impl ActorState {
    fn new(config: RateLimiterConfig) -> Self {
        let current_max = config.max_requests_per_window;
        Self {
            config,
            window: VecDeque::new(),
            current_max,
            backoff_until: None,
            consecutive_429: 0,
            daily_counts: HashMap::new(),
        }
    }

    fn today_key(&self) -> String {
        Utc::now().date_naive().to_string()
    }

    async fn wait_for_permission(&mut self) -> Result<(), RateLimitError> {
        if let Some(quota) = self.config.daily_quota {
            let key = self.today_key();
            let used = *self.daily_counts.get(&key).unwrap_or(&0);
            if used >= quota {
                return Err(RateLimitError::DailyLimitReached { used, limit: quota });
            }
        }

        loop {
            let now = Instant::now();
            if let Some(deadline) = self.backoff_until {
                if now < deadline {
                    tokio::time::sleep(deadline - now).await;
                    continue;
                }
            }

            while let Some(&front) = self.window.front() {
                if now.duration_since(front) >= self.config.window_duration {
                    self.window.pop_front();
                } else {
                    break;
                }
            }

            if (self.window.len() as u32) < self.current_max {
                break;
            }

            let oldest = *self.window.front().expect("window full implies non-empty");
            let wake_at = oldest + self.config.window_duration + Duration::from_millis(500);
            if wake_at > now {
                tokio::time::sleep(wake_at - now).await;
            }
        }

        let now = Instant::now();
        self.window.push_back(now);
        let key = self.today_key();
        *self.daily_counts.entry(key).or_insert(0) += 1;
        Ok(())
    }

    fn report_success(&mut self) {
        self.consecutive_429 = 0;
        self.current_max = (self.current_max + 1).min(self.config.max_requests_per_window);
    }

    fn report_rate_limit(&mut self) {
        self.consecutive_429 += 1;
        self.current_max = self
            .current_max
            .saturating_sub(2)
            .max(self.config.min_requests_per_window);
        let backoff_secs = 2u64.saturating_pow(self.consecutive_429.min(6)).min(60);
        self.backoff_until = Some(Instant::now() + Duration::from_secs(backoff_secs));
        warn!(
            consecutive_429 = self.consecutive_429,
            current_max = self.current_max,
            backoff_secs,
            "rate limit reported"
        );
    }
}

pub fn spawn(config: RateLimiterConfig) -> RateLimiterHandle {
    let (tx, mut rx) = mpsc::channel::<Message>(256);
    let mut state = ActorState::new(config);

    tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            match msg {
                Message::WaitForPermission(reply) => {
                    let result = state.wait_for_permission().await;
                    debug!(?result, "permission decision");
                    let _ = reply.send(result);
                }
                Message::ReportSuccess => state.report_success(),
                Message::ReportRateLimit => state.report_rate_limit(),
                Message::CurrentMax(reply) => {
                    let _ = reply.send(state.current_max);
                }
            }
        }
    });

    RateLimiterHandle { tx }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn admits_up_to_max_without_waiting() {
        let handle = spawn(RateLimiterConfig {
            min_requests_per_window: 1,
            max_requests_per_window: 3,
            window_duration: Duration::from_secs(60),
            daily_quota: None,
        });
        for _ in 0..3 {
            handle.wait_for_permission().await.unwrap();
        }
        assert_eq!(handle.current_max().await, Some(3));
    }

    #[tokio::test]
    async fn daily_quota_exhaustion_returns_error() {
        let handle = spawn(RateLimiterConfig {
            min_requests_per_window: 1,
            max_requests_per_window: 5,
            window_duration: Duration::from_secs(60),
            daily_quota: Some(1),
        });
        handle.wait_for_permission().await.unwrap();
        let result = handle.wait_for_permission().await;
        assert!(matches!(result, Err(RateLimitError::DailyLimitReached { used: 1, limit: 1 })));
    }

    #[tokio::test]
    async fn report_rate_limit_decreases_current_max_by_two() {
        let handle = spawn(RateLimiterConfig {
            min_requests_per_window: 1,
            max_requests_per_window: 9,
            window_duration: Duration::from_secs(60),
            daily_quota: None,
        });
        handle.report_rate_limit().await;
        tokio::task::yield_now().await;
        assert_eq!(handle.current_max().await, Some(7));
    }

    #[tokio::test]
    async fn current_max_never_drops_below_minimum() {
        let handle = spawn(RateLimiterConfig {
            min_requests_per_window: 3,
            max_requests_per_window: 5,
            window_duration: Duration::from_secs(60),
            daily_quota: None,
        });
        for _ in 0..5 {
            handle.report_rate_limit().await;
        }
        tokio::task::yield_now().await;
        assert_eq!(handle.current_max().await, Some(3));
    }

    #[tokio::test]
    async fn report_success_increases_current_max_toward_hard_cap() {
        let handle = spawn(RateLimiterConfig {
            min_requests_per_window: 1,
            max_requests_per_window: 5,
            window_duration: Duration::from_secs(60),
            daily_quota: None,
        });
        handle.report_rate_limit().await;
        handle.report_success().await;
        tokio::task::yield_now().await;
        assert_eq!(handle.current_max().await, Some(4));
    }
}
