//! Bounded retry with exponential backoff for transient `BackendUnavailable`
//! failures, shared by the object-store, audit-store, and LLM-invoker
//! backends per SPEC_FULL.md §4.2 and §5.

use std::future::Future;
use std::time::Duration;

use crate::error::IdpError;

#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(100),
        }
    }
}

impl RetryPolicy {
    pub async fn run<T, F, Fut>(&self, mut f: F) -> Result<T, IdpError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, IdpError>>,
    {
        let mut attempt = 0;
        loop {
            match f().await {
                Ok(value) => return Ok(value),
                Err(err) if attempt + 1 < self.max_attempts && is_transient(&err) => {
                    let delay = self.base_delay * 2u32.pow(attempt);
                    tracing::warn!(attempt, ?delay, error = %err, "retrying after transient error");
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }
}

fn is_transient(err: &IdpError) -> bool {
    matches!(err, IdpError::BackendUnavailable(_))
}
