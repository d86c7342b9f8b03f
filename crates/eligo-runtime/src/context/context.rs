//! Execution context implementation
//!
//! Holds all mutable state for one request: resolved variables, per-source
//! call status, and counters. Owned by a single execution and never shared
//! across requests.

use eligo_core::Value;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Instant;
use uuid::Uuid;

/// Call status of one data source within a request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceStatus {
    Pending,
    Success,
    Failed,
}

/// Per-request execution state
///
/// `variables` holds resolved field values under their bare names plus one
/// object per executed source under the source id, so rules and
/// placeholders can use either `balanceTier` or `accountApi.balanceTier`.
#[derive(Debug, Clone)]
pub struct ExecutionContext {
    /// Resolved variable bindings
    pub variables: HashMap<String, Value>,

    /// Call status per data-source id
    pub source_status: HashMap<String, SourceStatus>,

    /// Number of network calls issued
    pub api_calls: u64,

    /// Cache hits observed
    pub cache_hits: u64,

    /// Cache misses observed
    pub cache_misses: u64,

    /// Correlation id for this request
    pub correlation_id: String,

    started_at: Instant,
}

impl ExecutionContext {
    /// Create a context seeded with the caller's initial variables
    ///
    /// A correlation id is generated and bound as the `correlationId`
    /// variable so endpoint templates can forward it.
    pub fn new(initial_variables: HashMap<String, Value>) -> Self {
        let correlation_id = Uuid::new_v4().to_string();
        let mut variables = initial_variables;
        variables.insert(
            "correlationId".to_string(),
            Value::String(correlation_id.clone()),
        );

        Self {
            variables,
            source_status: HashMap::new(),
            api_calls: 0,
            cache_hits: 0,
            cache_misses: 0,
            correlation_id,
            started_at: Instant::now(),
        }
    }

    /// Override the generated correlation id (e.g. propagated from an
    /// upstream request)
    pub fn with_correlation_id(mut self, correlation_id: impl Into<String>) -> Self {
        self.correlation_id = correlation_id.into();
        self.variables.insert(
            "correlationId".to_string(),
            Value::String(self.correlation_id.clone()),
        );
        self
    }

    /// Store one variable, overwriting any previous value
    pub fn store_variable(&mut self, name: impl Into<String>, value: Value) {
        self.variables.insert(name.into(), value);
    }

    /// Merge a batch of extracted fields into the variables
    pub fn merge_variables(&mut self, values: HashMap<String, Value>) {
        self.variables.extend(values);
    }

    /// Store a source's extracted fields as an object under the source id,
    /// making them addressable as `sourceId.field`
    pub fn store_source_result(&mut self, source_id: &str, values: HashMap<String, Value>) {
        self.variables
            .insert(source_id.to_string(), Value::Object(values));
    }

    /// Load a (possibly dotted) field reference
    ///
    /// Tries the whole reference as a flat variable name first, then
    /// navigates segment by segment. Returns None when the reference is
    /// missing or resolves to Null; existence checks rely on that
    /// distinction.
    pub fn load_field(&self, reference: &str) -> Option<Value> {
        if let Some(value) = self.variables.get(reference) {
            return if value.is_null() {
                None
            } else {
                Some(value.clone())
            };
        }

        if !reference.contains('.') {
            return None;
        }

        let path: Vec<&str> = reference.split('.').collect();
        let value = super::field_lookup::get_nested_value(&self.variables, &path);
        if value.is_null() {
            None
        } else {
            Some(value)
        }
    }

    /// Mark a source's call status
    pub fn mark_status(&mut self, source_id: &str, status: SourceStatus) {
        self.source_status.insert(source_id.to_string(), status);
    }

    /// Whether a source has already run (successfully or not)
    pub fn has_executed(&self, source_id: &str) -> bool {
        matches!(
            self.source_status.get(source_id),
            Some(SourceStatus::Success) | Some(SourceStatus::Failed)
        )
    }

    /// Ids of sources marked failed, sorted for stable output
    pub fn failed_sources(&self) -> Vec<String> {
        let mut failed: Vec<String> = self
            .source_status
            .iter()
            .filter(|(_, status)| **status == SourceStatus::Failed)
            .map(|(id, _)| id.clone())
            .collect();
        failed.sort();
        failed
    }

    /// Count of sources that reached a terminal status
    pub fn sources_executed(&self) -> usize {
        self.source_status
            .values()
            .filter(|s| **s != SourceStatus::Pending)
            .count()
    }

    pub fn record_api_call(&mut self) {
        self.api_calls += 1;
    }

    pub fn record_cache_hit(&mut self) {
        self.cache_hits += 1;
    }

    pub fn record_cache_miss(&mut self) {
        self.cache_misses += 1;
    }

    /// Milliseconds since this context was created
    pub fn elapsed_ms(&self) -> u64 {
        self.started_at.elapsed().as_millis() as u64
    }
}
