//! Eligo Runtime - Configuration-driven extraction and eligibility engine
//!
//! This crate wires the pieces of an extraction run together: plan
//! building over the field registry, resilient data-source calls,
//! field extraction, rule evaluation, and result assembly.

pub mod cache;
pub mod config;
pub mod context;
pub mod engine;
pub mod error;
pub mod executor;
pub mod extract;
pub mod plan;
pub mod resilience;
pub mod result;
pub mod rules;
pub mod service;
pub mod transform;

// Re-export main types
pub use eligo_core::{Combinator, InclusionRules, RuleCondition, RuleOperator, Value};

pub use cache::ResponseCache;
pub use config::{
    BackoffStrategy, CacheConfig, DataSourceConfig, EndpointConfig, ExecutionMode,
    ExecutionSettings, ExtractionConfig, FieldSourceConfig, FieldType, HttpMethod, NextCall,
    NextCallCheck, NextCallCondition, ResponseMapping, RetryPolicy, ValidationRule,
};
pub use context::{ExecutionContext, SourceStatus};
pub use engine::{ExtractionEngine, ExtractionRequest};
pub use error::{EngineError, Result};
pub use executor::CallExecutor;
pub use extract::FieldExtractor;
pub use plan::{ApiCall, ExtractionPlan, PlanBuilder};
pub use resilience::{
    CircuitBreaker, CircuitBreakerConfig, CircuitBreakerRegistry, CircuitState,
};
pub use result::{ExecutionMetrics, ExtractionResult, MatchingCriteria};
pub use rules::{ConditionCheck, RuleEvaluator, RuleOutcome};
pub use service::{ApiResponse, HttpClient, MockHttpClient, ReqwestHttpClient};
pub use transform::{TierMapping, TransformKind};
