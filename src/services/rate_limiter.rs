//! Rate limiting and retry logic for catalog API calls
//!
//! Keeps the TMDB client under its request quota and retries transient failures
//! with exponential backoff.

use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;

use backoff::ExponentialBackoff;
use backoff::backoff::Backoff;
use governor::{
    Quota, RateLimiter,
    clock::DefaultClock,
    state::{InMemoryState, NotKeyed},
};
use reqwest::{Client, Response};
use tracing::{debug, warn};

/// Configuration for rate limiting
#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    /// Maximum requests per second
    pub requests_per_second: u32,
    /// Burst capacity (allows short bursts above the rate)
    pub burst_size: u32,
}

/// TMDB allows ~40 requests per 10 seconds, so ~4/sec with a burst of 10
impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            requests_per_second: 4,
            burst_size: 10,
        }
    }
}

/// A rate-limited HTTP client wrapper
pub struct RateLimitedClient {
    client: Client,
    limiter: Arc<RateLimiter<NotKeyed, InMemoryState, DefaultClock>>,
    name: String,
}

impl RateLimitedClient {
    /// Create a new rate-limited client whose requests time out after `timeout`
    pub fn new(name: &str, config: RateLimitConfig, timeout: Duration) -> reqwest::Result<Self> {
        let quota = Quota::per_second(
            NonZeroU32::new(config.requests_per_second).unwrap_or(NonZeroU32::MIN),
        )
        .allow_burst(NonZeroU32::new(config.burst_size).unwrap_or(NonZeroU32::MIN));

        Ok(Self {
            client: Client::builder().timeout(timeout).build()?,
            limiter: Arc::new(RateLimiter::direct(quota)),
            name: name.to_string(),
        })
    }

    /// Create a client for TMDB API
    pub fn for_tmdb(timeout: Duration) -> reqwest::Result<Self> {
        Self::new("tmdb", RateLimitConfig::default(), timeout)
    }

    /// Wait for rate limit and make a GET request with query parameters
    pub async fn get_with_query<T: serde::Serialize + ?Sized>(
        &self,
        url: &str,
        query: &T,
    ) -> reqwest::Result<Response> {
        self.wait_for_permit().await;
        debug!(client = %self.name, url = %url, "Making rate-limited GET request with query");

        self.client.get(url).query(query).send().await
    }

    /// Wait for a rate limit permit
    pub async fn wait_for_permit(&self) {
        self.limiter.until_ready().await;
    }
}

/// Retry configuration
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum number of attempts
    pub max_retries: u32,
    /// Initial backoff duration
    pub initial_interval: Duration,
    /// Maximum backoff duration
    pub max_interval: Duration,
    /// Multiplier for exponential backoff
    pub multiplier: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 2,
            initial_interval: Duration::from_millis(500),
            max_interval: Duration::from_secs(5),
            multiplier: 2.0,
        }
    }
}

impl RetryConfig {
    /// Create an ExponentialBackoff from this config
    pub fn to_backoff(&self) -> ExponentialBackoff {
        ExponentialBackoff {
            initial_interval: self.initial_interval,
            max_interval: self.max_interval,
            multiplier: self.multiplier,
            max_elapsed_time: Some(Duration::from_secs(30)),
            ..Default::default()
        }
    }
}

/// Errors that know whether a retry can help
pub trait Transient {
    fn is_transient(&self) -> bool;
}

impl Transient for super::catalog::CatalogError {
    fn is_transient(&self) -> bool {
        super::catalog::CatalogError::is_transient(self)
    }
}

/// Execute an async operation, retrying transient failures
pub async fn retry_async<T, E, Fut, F>(
    operation: F,
    config: &RetryConfig,
    operation_name: &str,
) -> Result<T, E>
where
    F: Fn() -> Fut,
    Fut: std::future::Future<Output = Result<T, E>>,
    E: std::fmt::Display + Transient,
{
    let mut attempts = 0;
    let mut backoff = config.to_backoff();

    loop {
        attempts += 1;
        match operation().await {
            Ok(result) => return Ok(result),
            Err(e) if !e.is_transient() => return Err(e),
            Err(e) => {
                if attempts >= config.max_retries {
                    warn!(
                        operation = %operation_name,
                        attempts = attempts,
                        error = %e,
                        "Operation failed after max retries"
                    );
                    return Err(e);
                }

                if let Some(duration) = backoff.next_backoff() {
                    let retry_ms: u128 = duration.as_millis();
                    warn!(
                        operation = %operation_name,
                        attempt = attempts,
                        error = %e,
                        retry_in_ms = retry_ms,
                        "Operation failed, retrying"
                    );
                    tokio::time::sleep(duration).await;
                } else {
                    return Err(e);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};

    use super::*;
    use crate::services::catalog::CatalogError;

    fn fast_retries(max_retries: u32) -> RetryConfig {
        RetryConfig {
            max_retries,
            initial_interval: Duration::from_millis(1),
            max_interval: Duration::from_millis(2),
            multiplier: 1.0,
        }
    }

    #[test]
    fn test_rate_limit_default_matches_tmdb_quota() {
        let config = RateLimitConfig::default();
        assert_eq!(config.requests_per_second, 4);
        assert_eq!(config.burst_size, 10);
    }

    #[tokio::test]
    async fn test_tmdb_client_grants_burst_without_waiting() {
        let client = RateLimitedClient::for_tmdb(Duration::from_secs(1)).unwrap();
        let started = std::time::Instant::now();
        for _ in 0..RateLimitConfig::default().burst_size {
            client.wait_for_permit().await;
        }
        assert!(started.elapsed() < Duration::from_millis(500));
    }

    #[test]
    fn test_retry_config_default() {
        let config = RetryConfig::default();
        assert_eq!(config.max_retries, 2);
    }

    #[tokio::test]
    async fn test_transient_errors_are_retried() {
        let calls = AtomicU32::new(0);
        let result: Result<u32, CatalogError> = retry_async(
            || async {
                if calls.fetch_add(1, Ordering::SeqCst) == 0 {
                    Err(CatalogError::RateLimited)
                } else {
                    Ok(7)
                }
            },
            &fast_retries(3),
            "test",
        )
        .await;

        assert_eq!(result.ok(), Some(7));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_permanent_errors_are_not_retried() {
        let calls = AtomicU32::new(0);
        let result: Result<u32, CatalogError> = retry_async(
            || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(CatalogError::Unauthorized)
            },
            &fast_retries(3),
            "test",
        )
        .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
