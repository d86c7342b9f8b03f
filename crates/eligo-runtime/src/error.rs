//! Engine error types

use thiserror::Error;

/// Engine error
///
/// Most of these never cross the orchestrator boundary: call, extraction,
/// and rule failures are recovered into defaults or missing data. Only
/// configuration problems and an empty request surface to the caller.
#[derive(Error, Debug)]
pub enum EngineError {
    /// Missing field-source mapping, missing data source, or an
    /// unresolvable dependency
    #[error("Configuration gap: {0}")]
    ConfigurationGap(String),

    /// Network error, timeout, non-2xx status, or open circuit breaker
    #[error("Call failure for source '{source_id}': {reason}")]
    CallFailure { source_id: String, reason: String },

    /// Transport-level HTTP failure before any status was received
    #[error("External call failed: {0}")]
    ExternalCallFailed(String),

    /// Bad path expression, malformed response, or validation failure
    #[error("Extraction failure for field '{field}': {reason}")]
    ExtractionFailure { field: String, reason: String },

    /// Overall deadline exceeded
    #[error("Evaluation deadline of {deadline_ms}ms exceeded")]
    EvaluationTimeout { deadline_ms: u64 },

    /// Unrecognized operator in a rule condition
    #[error("Invalid rule operator on field '{0}'")]
    InvalidRuleOperator(String),

    /// Configuration could not be loaded or failed registry validation
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Request missing mandatory inputs (e.g. empty required-fields set)
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

/// Result type for engine operations
pub type Result<T> = std::result::Result<T, EngineError>;
