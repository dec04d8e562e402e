//! Bounded retry with exponential backoff and a per-attempt timeout.

use crate::KbResult;
use semtab_core::{KnowledgeBase, KnowledgeBaseError, RetryConfig};
use std::future::Future;
use std::time::Duration;

/// Run `call` until it succeeds, fails permanently, or the retry budget runs out.
///
/// Each attempt is bounded by `retry.request_timeout`; a timeout counts as a
/// transient failure. Between attempts the task sleeps for
/// `initial_backoff * multiplier^attempt` (capped at `max_backoff`), or longer
/// when the server asked for a longer wait. Non-transient errors are returned
/// immediately. Once `max_retries` retries have failed the last error is
/// wrapped in [`KnowledgeBaseError::RetriesExhausted`].
pub async fn with_retry<T, F, Fut>(
    retry: &RetryConfig,
    kb: KnowledgeBase,
    operation: &str,
    mut call: F,
) -> KbResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = KbResult<T>>,
{
    let max_attempts = retry.max_retries.saturating_add(1);
    let mut attempt: u32 = 0;

    loop {
        let outcome = match tokio::time::timeout(retry.request_timeout, call()).await {
            Ok(outcome) => outcome,
            Err(_) => Err(KnowledgeBaseError::Timeout {
                kb,
                operation: operation.to_string(),
                timeout_ms: retry.request_timeout.as_millis() as u64,
            }),
        };

        let error = match outcome {
            Ok(value) => return Ok(value),
            Err(e) if !e.is_transient() => return Err(e),
            Err(e) => e,
        };

        attempt += 1;
        if attempt >= max_attempts {
            return Err(KnowledgeBaseError::RetriesExhausted {
                kb,
                operation: operation.to_string(),
                attempts: attempt,
                last_error: error.to_string(),
            });
        }

        let server_wait = error
            .retry_after_ms()
            .map(Duration::from_millis)
            .unwrap_or_default();
        let delay = retry.backoff_for(attempt - 1).max(server_wait);
        tracing::warn!(
            kb = %kb,
            operation,
            attempt,
            delay_ms = delay.as_millis() as u64,
            error = %error,
            "Knowledge base call failed, retrying"
        );
        tokio::time::sleep(delay).await;
    }
}
