//! Request results
//!
//! The engine answers every request with an [`ExtractionResult`], even
//! when sources failed or the deadline expired. Callers gate on
//! `should_include` and read the diagnostic trail and metrics for the
//! rest of the story.

use std::collections::HashMap;

use eligo_core::Value;
use serde::{Deserialize, Serialize};

use crate::rules::RuleOutcome;

/// Caller-supplied identity echo, returned so downstream consumers can
/// denormalize without re-deriving who the result is about
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchingCriteria {
    /// Which identity the caller matched on, e.g. `accountId`
    pub match_by: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference_key_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference_key_value: Option<String>,
    /// Selected extracted values attached for the caller's convenience
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub metadata: HashMap<String, Value>,
}

impl MatchingCriteria {
    pub fn new(match_by: impl Into<String>) -> Self {
        Self {
            match_by: match_by.into(),
            ..Self::default()
        }
    }

    pub fn with_reference_key(
        mut self,
        key_type: impl Into<String>,
        key_value: impl Into<String>,
    ) -> Self {
        self.reference_key_type = Some(key_type.into());
        self.reference_key_value = Some(key_value.into());
        self
    }
}

/// Counters accumulated over one request
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionMetrics {
    pub api_calls: u64,
    pub cache_hits: u64,
    pub cache_misses: u64,
    pub execution_time_ms: u64,
    pub sources_executed: usize,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub correlation_id: String,
}

/// The engine's answer for one request
///
/// Always well formed: failed sources show up in `failed_sources` with
/// their defaults merged into `extracted_variables`, and a blown
/// deadline yields `should_include = false` with a `failure_reason`
/// instead of an error.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractionResult {
    pub should_include: bool,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub extracted_variables: HashMap<String, Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub matching_criteria: Option<MatchingCriteria>,
    /// Verdict and per-condition trail; absent when no rules were
    /// configured or the deadline cut evaluation short
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rule_evaluation: Option<RuleOutcome>,
    #[serde(default)]
    pub metrics: ExecutionMetrics,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub failed_sources: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure_reason: Option<String>,
}

impl ExtractionResult {
    pub fn new(should_include: bool) -> Self {
        Self {
            should_include,
            ..Self::default()
        }
    }

    pub fn with_variables(mut self, variables: HashMap<String, Value>) -> Self {
        self.extracted_variables = variables;
        self
    }

    pub fn with_matching_criteria(mut self, criteria: MatchingCriteria) -> Self {
        self.matching_criteria = Some(criteria);
        self
    }

    pub fn with_rule_evaluation(mut self, outcome: RuleOutcome) -> Self {
        self.rule_evaluation = Some(outcome);
        self
    }

    pub fn with_metrics(mut self, metrics: ExecutionMetrics) -> Self {
        self.metrics = metrics;
        self
    }

    pub fn with_failed_sources(mut self, failed: Vec<String>) -> Self {
        self.failed_sources = failed;
        self
    }

    pub fn with_failure_reason(mut self, reason: impl Into<String>) -> Self {
        self.failure_reason = Some(reason.into());
        self
    }
}
