use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

/// Fixed-delay retry for calls that fail while commercetools is still
/// propagating freshly created credentials or queues.
///
/// No jitter and no backoff: `max_attempts` tries in total, `delay` apart.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            delay: Duration::from_secs(5),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            delay,
        }
    }

    /// Run `op` until it succeeds or the attempts are used up; the last error wins.
    ///
    /// The delay is a `tokio::time::sleep`, so sibling reconciliations keep
    /// running while this one waits.
    pub async fn run<T, E, F, Fut>(&self, what: &str, mut op: F) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Display,
    {
        let max_attempts = self.max_attempts.max(1);
        let mut attempt = 1;

        loop {
            match op().await {
                Ok(value) => return Ok(value),
                Err(e) if attempt < max_attempts => {
                    tracing::warn!(
                        attempt,
                        max_attempts,
                        error = %e,
                        "[Attempt {attempt}/{max_attempts}] Unable to {what}; waiting {:?} to try again",
                        self.delay
                    );
                    tokio::time::sleep(self.delay).await;
                    attempt += 1;
                }
                Err(e) => {
                    tracing::error!(
                        attempt,
                        max_attempts,
                        error = %e,
                        "Unable to {what}; giving up"
                    );
                    return Err(e);
                }
            }
        }
    }
}
