//! Request pacing shared by every fetch attempt.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use irminsul_config::ScraperConfig;
use rand::Rng;
use tokio::sync::Mutex;
use tokio::time::Instant;

/// Paces requests to a steady-state rate plus a politeness delay.
///
/// Every call sleeps at least a uniform jitter in `[min_delay, max_delay]`.
/// If the previous permit was granted less than `1 / rate` ago, the remaining
/// gap is added on top. The gap computation, the sleep and the timestamp
/// update happen under one lock, so concurrent callers are serialised.
#[derive(Debug)]
pub struct RateLimiter {
    min_interval: Duration,
    min_delay: Duration,
    max_delay: Duration,
    last_permit: Mutex<Option<Instant>>,
    permits: AtomicU64,
}

impl RateLimiter {
    pub fn new(requests_per_second: f64, min_delay: Duration, max_delay: Duration) -> Self {
        let min_interval = if requests_per_second > 0.0 {
            Duration::try_from_secs_f64(1.0 / requests_per_second).unwrap_or(Duration::MAX)
        } else {
            Duration::ZERO
        };
        Self {
            min_interval,
            min_delay,
            max_delay: max_delay.max(min_delay),
            last_permit: Mutex::new(None),
            permits: AtomicU64::new(0),
        }
    }

    pub fn from_config(cfg: &ScraperConfig) -> Self {
        let (min_delay, max_delay) = cfg.jitter_window();
        Self::new(cfg.requests_per_second, min_delay, max_delay)
    }

    /// Blocks until the next request may be issued.
    pub async fn wait(&self) {
        let mut last = self.last_permit.lock().await;

        let mut delay = self.jitter();
        if let Some(prev) = *last {
            let elapsed = prev.elapsed();
            if elapsed < self.min_interval {
                delay = delay.saturating_add(self.min_interval - elapsed);
            }
        }

        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        *last = Some(Instant::now());
        self.permits.fetch_add(1, Ordering::Relaxed);
    }

    /// Number of permits granted so far.
    pub fn permits(&self) -> u64 {
        self.permits.load(Ordering::Relaxed)
    }

    fn jitter(&self) -> Duration {
        if self.max_delay <= self.min_delay {
            return self.min_delay;
        }
        let secs = rand::thread_rng()
            .gen_range(self.min_delay.as_secs_f64()..=self.max_delay.as_secs_f64());
        Duration::try_from_secs_f64(secs).unwrap_or(self.max_delay)
    }
}
