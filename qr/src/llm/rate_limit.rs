//! Token-bucket rate limiting for engine calls
//!
//! The bucket refills continuously at `requests_per_minute / 60` tokens per
//! second up to `burst`. A caller that finds the bucket empty sleeps for the
//! check interval and tries again, so only the calling task is suspended.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::debug;

use super::{CompletionRequest, CompletionResponse, LlmClient, LlmError};
use crate::config::RateLimitConfig;

struct Bucket {
    tokens: f64,
    last_refill: Instant,
}

/// Shared token bucket
pub struct RateLimiter {
    per_second: f64,
    capacity: f64,
    check_interval: Duration,
    bucket: Mutex<Bucket>,
}

impl RateLimiter {
    /// Create a limiter whose bucket starts full
    pub fn new(config: &RateLimitConfig) -> Self {
        debug!(?config, "RateLimiter::new: called");
        let capacity = f64::from(config.burst.max(1));
        Self {
            per_second: config.requests_per_minute / 60.0,
            capacity,
            check_interval: Duration::from_millis(config.check_interval_ms.max(1)),
            bucket: Mutex::new(Bucket {
                tokens: capacity,
                last_refill: Instant::now(),
            }),
        }
    }

    /// Take one token if available without waiting
    pub async fn try_acquire(&self) -> bool {
        let mut bucket = self.bucket.lock().await;
        let now = Instant::now();
        let elapsed = now.duration_since(bucket.last_refill).as_secs_f64();
        bucket.tokens = (bucket.tokens + elapsed * self.per_second).min(self.capacity);
        bucket.last_refill = now;

        if bucket.tokens >= 1.0 {
            bucket.tokens -= 1.0;
            true
        } else {
            false
        }
    }

    /// Wait until a token is available, then take it
    pub async fn acquire(&self) {
        let mut waited = Duration::ZERO;
        while !self.try_acquire().await {
            tokio::time::sleep(self.check_interval).await;
            waited += self.check_interval;
        }
        if !waited.is_zero() {
            debug!(?waited, "RateLimiter::acquire: admitted after waiting");
        }
    }
}

/// LlmClient wrapper that acquires a token before every call
pub struct RateLimitedClient {
    inner: Arc<dyn LlmClient>,
    limiter: Arc<RateLimiter>,
}

impl RateLimitedClient {
    pub fn new(inner: Arc<dyn LlmClient>, limiter: Arc<RateLimiter>) -> Self {
        Self { inner, limiter }
    }
}

#[async_trait]
impl LlmClient for RateLimitedClient {
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, LlmError> {
        self.limiter.acquire().await;
        self.inner.complete(request).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::mock::MockLlmClient;

    fn config(rpm: f64, burst: u32) -> RateLimitConfig {
        RateLimitConfig {
            requests_per_minute: rpm,
            burst,
            check_interval_ms: 1000,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_burst_is_admitted_immediately() {
        let limiter = RateLimiter::new(&config(4.0, 4));
        for _ in 0..4 {
            assert!(limiter.try_acquire().await);
        }
        assert!(!limiter.try_acquire().await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_refills_at_configured_rate() {
        let limiter = RateLimiter::new(&config(4.0, 1));
        assert!(limiter.try_acquire().await);
        assert!(!limiter.try_acquire().await);

        // 4 per minute means one token every 15 seconds
        tokio::time::advance(Duration::from_secs(14)).await;
        assert!(!limiter.try_acquire().await);
        tokio::time::advance(Duration::from_secs(1)).await;
        assert!(limiter.try_acquire().await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_acquire_suspends_until_token() {
        let limiter = RateLimiter::new(&config(4.0, 1));
        limiter.acquire().await;

        let start = Instant::now();
        limiter.acquire().await;
        assert!(start.elapsed() >= Duration::from_secs(15));
    }

    #[tokio::test(start_paused = true)]
    async fn test_rate_limited_client_delegates() {
        let inner = Arc::new(MockLlmClient::new(vec![CompletionResponse::text("ok")]));
        let limiter = Arc::new(RateLimiter::new(&config(4.0, 4)));
        let client = RateLimitedClient::new(inner.clone(), limiter);

        let request = CompletionRequest {
            system_prompt: String::new(),
            messages: vec![],
            tools: vec![],
            max_tokens: 10,
        };
        let response = client.complete(request).await.unwrap();
        assert_eq!(response.content.as_deref(), Some("ok"));
        assert_eq!(inner.call_count(), 1);
    }
}
