//! Request pacing for loop queries.

use tokio::time::{Duration, Instant};

/// Enforces a minimum interval between requests.
///
/// The first request goes out immediately; later ones wait until the
/// interval since the previous request has elapsed. Owned by a single loop,
/// so no locking is involved.
#[derive(Debug)]
pub struct RateLimiter {
    /// Minimum time between two requests.
    min_interval: Duration,
    /// Time of the last request.
    last_request: Option<Instant>,
}

impl RateLimiter {
    /// Create a limiter that spaces requests at least `min_interval` apart.
    pub fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            last_request: None,
        }
    }

    /// Wait until a request is allowed, then mark it as sent.
    pub async fn acquire(&mut self) {
        if let Some(last) = self.last_request {
            let elapsed = last.elapsed();
            if elapsed < self.min_interval {
                tokio::time::sleep(self.min_interval - elapsed).await;
            }
        }
        self.last_request = Some(Instant::now());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_rate_limiter_spaces_requests() {
        let mut limiter = RateLimiter::new(Duration::from_millis(10));
        let start = Instant::now();

        limiter.acquire().await;
        limiter.acquire().await;
        limiter.acquire().await;

        // 3 requests 10ms apart should take at least ~20ms
        assert!(start.elapsed() >= Duration::from_millis(15));
    }

    #[tokio::test]
    async fn test_rate_limiter_first_request_immediate() {
        let mut limiter = RateLimiter::new(Duration::from_secs(1));
        let start = Instant::now();
        limiter.acquire().await;
        assert!(start.elapsed() < Duration::from_millis(50));
    }

    #[tokio::test]
    async fn test_zero_interval_never_waits() {
        let mut limiter = RateLimiter::new(Duration::ZERO);
        let start = Instant::now();
        for _ in 0..10 {
            limiter.acquire().await;
        }
        assert!(start.elapsed() < Duration::from_millis(50));
    }
}
