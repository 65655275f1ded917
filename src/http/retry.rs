use http::Extensions;
use rand::Rng;
use reqwest::header::RETRY_AFTER;
use reqwest::{Request, Response, StatusCode};
use reqwest_middleware::{Middleware, Next};
use reqwest_retry::{DefaultRetryableStrategy, Retryable, RetryableStrategy};
use std::time::Duration;
use tracing::{debug, warn};

/// How every outbound call is retried. Shared by all clients through [`RetryMiddleware`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total tries including the first one
    pub max_attempts: u32,
    pub base_delay: Duration,
    /// Base delay used instead of `base_delay` after an HTTP 429
    pub rate_limit_delay: Duration,
    pub max_delay: Duration,
    pub jitter: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(1),
            rate_limit_delay: Duration::from_secs(2),
            max_delay: Duration::from_secs(30),
            jitter: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryKind {
    Transient,
    RateLimited,
}

impl RetryPolicy {
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    /// `None` means the outcome is final: a success or an error retrying can't fix.
    pub fn classify(&self, result: &reqwest_middleware::Result<Response>) -> Option<RetryKind> {
        if let Ok(response) = result {
            if response.status() == StatusCode::TOO_MANY_REQUESTS {
                return Some(RetryKind::RateLimited);
            }
        }

        match DefaultRetryableStrategy.handle(result) {
            Some(Retryable::Transient) => Some(RetryKind::Transient),
            Some(Retryable::Fatal) | None => None,
        }
    }

    /// Delay before the attempt following `attempt` (1-based).
    pub fn delay_for(&self, attempt: u32, kind: RetryKind, retry_after: Option<Duration>) -> Duration {
        let base = match kind {
            RetryKind::Transient => self.base_delay,
            RetryKind::RateLimited => self.rate_limit_delay,
        };
        let exponential = base.saturating_mul(2u32.saturating_pow(attempt.saturating_sub(1)));
        let mut delay = retry_after.unwrap_or(exponential);

        if self.jitter && !delay.is_zero() {
            delay += delay.mul_f64(rand::thread_rng().gen_range(0.0..0.25));
        }

        delay.min(self.max_delay)
    }
}

fn retry_after(result: &reqwest_middleware::Result<Response>) -> Option<Duration> {
    result
        .as_ref()
        .ok()?
        .headers()
        .get(RETRY_AFTER)?
        .to_str()
        .ok()?
        .trim()
        .parse::<u64>()
        .ok()
        .map(Duration::from_secs)
}

pub struct RetryMiddleware {
    policy: RetryPolicy,
}

impl RetryMiddleware {
    pub fn new(policy: RetryPolicy) -> Self {
        Self { policy }
    }
}

#[async_trait::async_trait]
impl Middleware for RetryMiddleware {
    async fn handle(
        &self,
        req: Request,
        extensions: &mut Extensions,
        next: Next<'_>,
    ) -> reqwest_middleware::Result<Response> {
        let mut attempt = 1;

        loop {
            // Streaming bodies can't be replayed
            let Some(request) = req.try_clone() else {
                debug!("Request body can't be cloned, sending without retries");
                return next.run(req, extensions).await;
            };

            let result = next.clone().run(request, extensions).await;

            match self.policy.classify(&result) {
                Some(kind) if attempt < self.policy.max_attempts => {
                    let delay = self.policy.delay_for(attempt, kind, retry_after(&result));

                    warn!(
                        url = %req.url(),
                        "{:?} failure ({}), retrying in {:?} (attempt {}/{})",
                        kind,
                        describe(&result),
                        delay,
                        attempt,
                        self.policy.max_attempts
                    );

                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                _ => return result,
            }
        }
    }
}

fn describe(result: &reqwest_middleware::Result<Response>) -> String {
    match result {
        Ok(response) => format!("HTTP {}", response.status().as_u16()),
        Err(err) => err.to_string(),
    }
}
