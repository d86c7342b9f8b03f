//! Retry backoff
//!
//! Delay computation and status classification for retryable HTTP calls.
//! The retry loop itself lives in the call executor.

use std::time::Duration;

use crate::config::{BackoffStrategy, RetryPolicy};

/// Delay to sleep before the given retry attempt
///
/// `attempt` is 1-based: the delay before the first retry is attempt 1.
/// The result is capped at the policy's `max_delay_ms`.
pub fn backoff_delay(policy: &RetryPolicy, attempt: u32) -> Duration {
    let attempt = attempt.max(1);
    let base = policy.initial_delay_ms;
    let delay_ms = match policy.backoff_strategy {
        BackoffStrategy::Fixed => base,
        BackoffStrategy::Linear => base.saturating_mul(attempt as u64),
        BackoffStrategy::Exponential => {
            base.saturating_mul(1u64.checked_shl(attempt - 1).unwrap_or(u64::MAX))
        }
    };
    Duration::from_millis(delay_ms.min(policy.max_delay_ms))
}

/// Whether an HTTP status code should trigger a retry under this policy
pub fn is_retryable_status(policy: &RetryPolicy, status: u16) -> bool {
    policy.retry_on.contains(&status)
}
