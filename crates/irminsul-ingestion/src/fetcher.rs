//! Paced, retrying document fetcher.
//!
//! One logical `fetch` = up to `max_retries` attempts. Each attempt waits on
//! the shared [`RateLimiter`], takes a global and a per-host connection slot,
//! rotates the User-Agent, and runs under its own timeout.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use irminsul_common::{HttpTransport, TransportError};
use irminsul_config::{ScraperConfig, SourceConfig};
use rand::seq::SliceRandom;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tracing::{debug, instrument, warn};

use crate::error::{FailureReason, FetchError};
use crate::models::{FetchCounters, RawDocument};
use crate::rate_limit::RateLimiter;

/// Ceiling on a single backoff sleep.
pub const MAX_BACKOFF: Duration = Duration::from_secs(300);

const DEFAULT_ACCEPT: &str = "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8";

/// Bounded exponential backoff: attempt `n` (0-based) is followed by
/// `retry_delay * backoff_factor^n` before attempt `n + 1`, capped at [`MAX_BACKOFF`].
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub retry_delay: Duration,
    pub backoff_factor: f64,
}

impl RetryPolicy {
    pub fn from_config(cfg: &ScraperConfig) -> Self {
        Self {
            max_retries: cfg.max_retries.max(1),
            retry_delay: cfg.retry_delay(),
            backoff_factor: cfg.backoff_factor,
        }
    }

    pub fn delay_after(&self, attempt: u32) -> Duration {
        let exponent = i32::try_from(attempt).unwrap_or(i32::MAX);
        let secs = self.retry_delay.as_secs_f64() * self.backoff_factor.powi(exponent);
        Duration::try_from_secs_f64(secs)
            .unwrap_or(MAX_BACKOFF)
            .min(MAX_BACKOFF)
    }
}

#[derive(Debug, Default)]
struct FetchStats {
    attempts: AtomicU64,
    successes: AtomicU64,
    failures: AtomicU64,
}

pub struct Fetcher {
    transport: Arc<dyn HttpTransport>,
    limiter: Arc<RateLimiter>,
    policy: RetryPolicy,
    timeout: Duration,
    user_agents: Vec<String>,
    accept_language: String,
    connections: Arc<Semaphore>,
    per_host_limit: usize,
    host_slots: Mutex<HashMap<String, Arc<Semaphore>>>,
    stats: FetchStats,
}

impl Fetcher {
    pub fn new(
        transport: Arc<dyn HttpTransport>,
        limiter: Arc<RateLimiter>,
        scraper: &ScraperConfig,
        source: &SourceConfig,
    ) -> Self {
        Self {
            transport,
            limiter,
            policy: RetryPolicy::from_config(scraper),
            timeout: scraper.timeout(),
            user_agents: scraper.user_agents.clone(),
            accept_language: source.accept_language.clone(),
            connections: Arc::new(Semaphore::new(scraper.max_connections.max(1))),
            per_host_limit: scraper.max_connections_per_host.max(1),
            host_slots: Mutex::new(HashMap::new()),
            stats: FetchStats::default(),
        }
    }

    pub fn limiter(&self) -> &Arc<RateLimiter> {
        &self.limiter
    }

    /// Cumulative attempt/success/failure counters for this fetcher.
    pub fn counters(&self) -> FetchCounters {
        FetchCounters::new(
            self.stats.attempts.load(Ordering::Relaxed),
            self.stats.successes.load(Ordering::Relaxed),
            self.stats.failures.load(Ordering::Relaxed),
        )
    }

    /// Fetch one document, retrying transient failures.
    ///
    /// Always returns `FetchError::Permanent` on failure.
    #[instrument(skip(self, headers))]
    pub async fn fetch(&self, locator: &str, headers: &[(String, String)]) -> Result<RawDocument, FetchError> {
        let max = self.policy.max_retries;
        let mut last = FailureReason::Network("no attempt made".to_string());

        for attempt in 0..max {
            match self.fetch_once(locator, headers, attempt + 1).await {
                Ok(doc) => return Ok(doc),
                Err(FetchError::Transient { reason, .. }) => {
                    warn!(locator, attempt = attempt + 1, max, %reason, "Fetch attempt failed");
                    last = reason;
                    if attempt + 1 < max {
                        tokio::time::sleep(self.policy.delay_after(attempt)).await;
                    }
                }
                Err(permanent) => return Err(permanent),
            }
        }

        Err(FetchError::Permanent { locator: locator.to_string(), attempts: max, last })
    }

    /// A single attempt. Retryable failures come back as `Transient`.
    pub async fn fetch_once(
        &self,
        locator: &str,
        headers: &[(String, String)],
        attempt: u32,
    ) -> Result<RawDocument, FetchError> {
        let host = match url::Url::parse(locator).ok().and_then(|u| u.host_str().map(str::to_ascii_lowercase)) {
            Some(host) => host,
            None => {
                return Err(FetchError::Permanent {
                    locator: locator.to_string(),
                    attempts: attempt.saturating_sub(1),
                    last: FailureReason::InvalidLocator(locator.to_string()),
                })
            }
        };

        self.limiter.wait().await;
        let _permits = self.acquire_slots(&host).await;

        self.stats.attempts.fetch_add(1, Ordering::Relaxed);
        let request_headers = self.request_headers(headers);

        let result = tokio::time::timeout(self.timeout, self.transport.get(locator, &request_headers)).await;
        let reason = match result {
            Ok(Ok(resp)) if resp.is_success() => {
                self.stats.successes.fetch_add(1, Ordering::Relaxed);
                debug!(locator, attempt, bytes = resp.body.len(), "Fetched document");
                return Ok(RawDocument {
                    locator: locator.to_string(),
                    body: resp.body,
                    fetched_at: chrono::Utc::now(),
                });
            }
            Ok(Ok(resp)) => FailureReason::Status(resp.status),
            Ok(Err(TransportError::Timeout)) | Err(_) => FailureReason::Timeout,
            Ok(Err(TransportError::Blocked(url))) => FailureReason::Blocked(url),
            Ok(Err(TransportError::Connect(msg))) | Ok(Err(TransportError::Other(msg))) => {
                FailureReason::Network(msg)
            }
        };
        self.stats.failures.fetch_add(1, Ordering::Relaxed);

        if reason.is_retryable() {
            Err(FetchError::Transient { locator: locator.to_string(), attempt, reason })
        } else {
            Err(FetchError::Permanent { locator: locator.to_string(), attempts: attempt, last: reason })
        }
    }

    async fn acquire_slots(&self, host: &str) -> Option<(OwnedSemaphorePermit, OwnedSemaphorePermit)> {
        let host_sem = {
            let mut slots = self.host_slots.lock().unwrap_or_else(|e| e.into_inner());
            slots
                .entry(host.to_string())
                .or_insert_with(|| Arc::new(Semaphore::new(self.per_host_limit)))
                .clone()
        };
        // Neither semaphore is ever closed.
        let global = self.connections.clone().acquire_owned().await.ok()?;
        let per_host = host_sem.acquire_owned().await.ok()?;
        Some((global, per_host))
    }

    /// Default headers with a rotated User-Agent; caller headers win on name clashes.
    fn request_headers(&self, overrides: &[(String, String)]) -> Vec<(String, String)> {
        let ua = self
            .user_agents
            .choose(&mut rand::thread_rng())
            .cloned()
            .unwrap_or_default();

        let mut headers = vec![
            ("User-Agent".to_string(), ua),
            ("Accept".to_string(), DEFAULT_ACCEPT.to_string()),
            ("Accept-Language".to_string(), self.accept_language.clone()),
        ];
        for (name, value) in overrides {
            headers.retain(|(existing, _)| !existing.eq_ignore_ascii_case(name));
            headers.push((name.clone(), value.clone()));
        }
        headers
    }
}
