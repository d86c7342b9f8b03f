//! Fault-tolerance building blocks
//!
//! Per-source circuit breakers and retry backoff used by the call
//! executor. The breaker registry is shared across requests; everything
//! else is request-scoped.

mod breaker;
mod retry;

pub use breaker::{CircuitBreaker, CircuitBreakerConfig, CircuitBreakerRegistry, CircuitState};
pub use retry::{backoff_delay, is_retryable_status};
