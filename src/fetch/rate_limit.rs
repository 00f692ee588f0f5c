// Politeness delays injected into the fetcher
use super::traits::RateLimiter;
use std::time::Duration;
use tokio::time::sleep;

/// Sleeps a constant amount before each request.
pub struct FixedDelay {
    delay: Duration,
}

impl FixedDelay {
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }
}

#[async_trait::async_trait]
impl RateLimiter for FixedDelay {
    async fn wait(&self) {
        if !self.delay.is_zero() {
            sleep(self.delay).await;
        }
    }
}

pub struct Unthrottled;

#[async_trait::async_trait]
impl RateLimiter for Unthrottled {
    async fn wait(&self) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::Instant;

    #[tokio::test(start_paused = true)]
    async fn fixed_delay_waits_the_configured_time() {
        let limiter = FixedDelay::new(Duration::from_secs(2));
        let start = Instant::now();

        limiter.wait().await;

        assert!(start.elapsed() >= Duration::from_secs(2));
    }

    #[tokio::test(start_paused = true)]
    async fn unthrottled_returns_immediately() {
        let start = Instant::now();
        Unthrottled.wait().await;
        assert_eq!(start.elapsed(), Duration::ZERO);
    }
}
