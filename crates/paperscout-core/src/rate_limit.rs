//! Fixed-interval request pacing for remote repository APIs.
//!
//! Each outbound request waits for its governor permit via `until_ready()`,
//! which spaces requests at the configured period. A 429 response is
//! honored once using its `Retry-After` header before giving up.

use std::future::Future;
use std::time::Duration;

use governor::clock::DefaultClock;
use governor::state::{InMemoryState, NotKeyed};
use governor::{Quota, RateLimiter};

/// Type alias for governor's direct rate limiter.
type DirectLimiter = RateLimiter<NotKeyed, InMemoryState, DefaultClock>;

/// Fallback wait when a 429 carries no usable `Retry-After`.
const DEFAULT_RETRY_WAIT: Duration = Duration::from_secs(2);

/// Error type for paced requests, distinguishing rate limiting from other errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequestError {
    /// Server returned 429 Too Many Requests.
    RateLimited { retry_after: Option<Duration> },
    /// Any other error.
    Other(String),
}

impl std::fmt::Display for RequestError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RequestError::RateLimited {
                retry_after: Some(d),
            } => write!(f, "Rate limited (429), retry after {:.1}s", d.as_secs_f64()),
            RequestError::RateLimited { retry_after: None } => write!(f, "Rate limited (429)"),
            RequestError::Other(msg) => write!(f, "{}", msg),
        }
    }
}

impl std::error::Error for RequestError {}

impl From<String> for RequestError {
    fn from(s: String) -> Self {
        RequestError::Other(s)
    }
}

/// Enforces a fixed minimum delay between consecutive requests.
///
/// The first request is never delayed. A zero period disables pacing.
pub struct RequestPacer {
    limiter: Option<DirectLimiter>,
    period: Duration,
}

impl RequestPacer {
    pub fn new(period: Duration) -> Self {
        let limiter = Quota::with_period(period).map(DirectLimiter::direct);
        Self { limiter, period }
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    /// Wait until the next request may be sent.
    pub async fn acquire(&self) {
        if let Some(limiter) = &self.limiter {
            limiter.until_ready().await;
        }
    }

    /// Run `op` after acquiring a permit.
    ///
    /// On a 429, sleeps for the server's `Retry-After` (capped at `max_wait`),
    /// re-acquires a permit and retries once. Other errors return immediately.
    pub async fn run<T, F, Fut>(&self, max_wait: Duration, mut op: F) -> Result<T, RequestError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, RequestError>>,
    {
        self.acquire().await;
        match op().await {
            Err(RequestError::RateLimited { retry_after }) => {
                let wait = retry_after.unwrap_or(DEFAULT_RETRY_WAIT).min(max_wait);
                tracing::info!(
                    wait_secs = wait.as_secs_f64(),
                    "429 rate limited, waiting then retrying"
                );
                tokio::time::sleep(wait).await;
                self.acquire().await;
                op().await
            }
            other => other,
        }
    }
}

/// Check if an HTTP response is a 429 and extract Retry-After if present.
///
/// Returns `Err(RequestError::RateLimited { .. })` if 429, `Ok(())` otherwise.
pub fn check_rate_limit_response(resp: &reqwest::Response) -> Result<(), RequestError> {
    if resp.status().as_u16() == 429 {
        let retry_after = resp
            .headers()
            .get("retry-after")
            .and_then(|v| v.to_str().ok())
            .and_then(parse_retry_after);
        Err(RequestError::RateLimited { retry_after })
    } else {
        Ok(())
    }
}

/// Parse a Retry-After header value (seconds or HTTP-date).
pub fn parse_retry_after(value: &str) -> Option<Duration> {
    if let Ok(secs) = value.trim().parse::<u64>() {
        return Some(Duration::from_secs(secs));
    }
    // HTTP-date: use a conservative fixed wait rather than parsing the date
    if value.contains(',') || value.contains("GMT") {
        return Some(Duration::from_secs(5));
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Instant;

    // ── parse_retry_after ──────────────────────────────────────────────

    #[test]
    fn parse_integer_seconds() {
        assert_eq!(parse_retry_after("5"), Some(Duration::from_secs(5)));
    }

    #[test]
    fn parse_http_date_gmt() {
        let val = "Wed, 21 Oct 2015 07:28:00 GMT";
        assert_eq!(parse_retry_after(val), Some(Duration::from_secs(5)));
    }

    #[test]
    fn parse_garbage_none() {
        assert_eq!(parse_retry_after("xyz"), None);
    }

    // ── check_rate_limit_response ──────────────────────────────────────

    #[test]
    fn ok_on_200() {
        let http_resp = http::Response::builder().status(200).body("").unwrap();
        let resp = reqwest::Response::from(http_resp);
        assert!(check_rate_limit_response(&resp).is_ok());
    }

    #[test]
    fn rate_limited_429_with_retry_after() {
        let http_resp = http::Response::builder()
            .status(429)
            .header("retry-after", "10")
            .body("")
            .unwrap();
        let resp = reqwest::Response::from(http_resp);
        let err = check_rate_limit_response(&resp).unwrap_err();
        assert_eq!(
            err,
            RequestError::RateLimited {
                retry_after: Some(Duration::from_secs(10))
            }
        );
    }

    // ── RequestPacer ───────────────────────────────────────────────────

    #[tokio::test]
    async fn zero_period_disables_pacing() {
        let pacer = RequestPacer::new(Duration::ZERO);
        let start = Instant::now();
        for _ in 0..5 {
            pacer.acquire().await;
        }
        assert!(start.elapsed() < Duration::from_millis(500));
    }

    #[tokio::test]
    async fn first_request_is_not_delayed() {
        let pacer = RequestPacer::new(Duration::from_secs(3));
        let start = Instant::now();
        pacer.acquire().await;
        assert!(start.elapsed() < Duration::from_secs(1));
    }

    #[tokio::test]
    async fn second_request_waits_for_period() {
        let pacer = RequestPacer::new(Duration::from_millis(200));
        pacer.acquire().await;
        let start = Instant::now();
        pacer.acquire().await;
        assert!(start.elapsed() >= Duration::from_millis(150));
    }

    #[tokio::test]
    async fn run_retries_once_on_rate_limit() {
        let pacer = RequestPacer::new(Duration::ZERO);
        let calls = AtomicUsize::new(0);
        let result: Result<(), RequestError> = pacer
            .run(Duration::from_millis(10), || {
                calls.fetch_add(1, Ordering::SeqCst);
                async {
                    Err(RequestError::RateLimited {
                        retry_after: Some(Duration::from_secs(60)),
                    })
                }
            })
            .await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn run_does_not_retry_other_errors() {
        let pacer = RequestPacer::new(Duration::ZERO);
        let calls = AtomicUsize::new(0);
        let result: Result<(), RequestError> = pacer
            .run(Duration::from_secs(1), || {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(RequestError::Other("connection refused".into())) }
            })
            .await;
        assert_eq!(result, Err(RequestError::Other("connection refused".into())));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn run_passes_through_success() {
        let pacer = RequestPacer::new(Duration::ZERO);
        let result = pacer
            .run(Duration::from_secs(1), || async { Ok::<_, RequestError>(42) })
            .await;
        assert_eq!(result, Ok(42));
    }
}
