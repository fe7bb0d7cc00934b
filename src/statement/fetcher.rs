//! Statement fetching capability and retry policy.

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::Instant;

use crate::error::FetchError;
use crate::problem::ProblemId;

/// Fetches the rendered statement for a problem from a remote source.
#[async_trait]
pub trait StatementFetcher: Send + Sync {
    async fn fetch(&self, problem: &ProblemId) -> Result<String, FetchError>;
}

/// Exponential backoff schedule for fetch attempts.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            base_delay: Duration::from_secs(1),
        }
    }
}

impl RetryPolicy {
    /// Delay issued after attempt `attempt`, doubling each time:
    /// 1s, 2s, 4s, 8s, 16s for the default policy.
    pub fn delay_after(&self, attempt: u32) -> Duration {
        self.base_delay * 2u32.saturating_pow(attempt.saturating_sub(1))
    }
}

/// Run `attempt` under `policy` until it succeeds, attempts run out, or the
/// deadline cuts a pending delay short.
///
/// A pending delay is aborted at the deadline with `FetchError::Cancelled`
/// rather than waited out. When every attempt fails, the last attempt's
/// error is returned.
pub(crate) async fn retry_with_backoff<F, Fut>(
    policy: &RetryPolicy,
    deadline: Instant,
    mut attempt: F,
) -> Result<String, FetchError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<String, FetchError>>,
{
    let mut last_err = None;
    for n in 1..=policy.max_attempts {
        match attempt().await {
            Ok(body) => return Ok(body),
            Err(err) => last_err = Some(err),
        }

        let wake = Instant::now() + policy.delay_after(n);
        if wake > deadline {
            tokio::time::sleep_until(deadline).await;
            return Err(FetchError::Cancelled);
        }
        tokio::time::sleep_until(wake).await;
    }
    Err(last_err.unwrap_or(FetchError::Cancelled))
}
