//! Data source configuration
//!
//! A data source is one external API endpoint plus its caching, retry, and
//! chaining policy. Endpoint templates carry `${...}` placeholders resolved
//! per request.

use crate::transform::TransformKind;
use eligo_core::Value;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// HTTP method
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum HttpMethod {
    #[default]
    GET,
    POST,
    PUT,
    DELETE,
    PATCH,
}

/// Endpoint definition for a data source
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EndpointConfig {
    /// URL template with `${var}` placeholders
    pub url: String,

    #[serde(default)]
    pub method: HttpMethod,

    /// Header templates, values may contain placeholders
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub headers: HashMap<String, String>,

    /// Request body template (for POST/PUT)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,

    /// Per-call timeout in milliseconds
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

/// Cache policy for a data source
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Time-to-live in seconds
    #[serde(default = "default_ttl")]
    pub ttl: u64,

    /// Cache key template with `${var}` placeholders; the resolved
    /// endpoint URL is used when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key_pattern: Option<String>,
}

/// Backoff strategy between retry attempts
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackoffStrategy {
    /// Same delay every attempt
    #[default]
    Fixed,
    /// Delay grows by the initial delay each attempt
    Linear,
    /// Delay doubles each attempt
    Exponential,
}

/// Retry policy for a data source
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RetryPolicy {
    /// Total attempts including the first call
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    #[serde(default = "default_initial_delay_ms")]
    pub initial_delay_ms: u64,

    /// Upper bound on any single backoff delay
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,

    #[serde(default)]
    pub backoff_strategy: BackoffStrategy,

    /// HTTP status codes that trigger a retry; connection errors and
    /// timeouts always do
    #[serde(default = "default_retry_on")]
    pub retry_on: Vec<u16>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            initial_delay_ms: default_initial_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
            backoff_strategy: BackoffStrategy::default(),
            retry_on: default_retry_on(),
        }
    }
}

/// Condition kind for a chained call edge
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum NextCallCheck {
    /// Field is present and non-null
    #[serde(alias = "exists")]
    NotNull,
    Equals,
    GreaterThan,
}

/// Condition gating a chained call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NextCallCondition {
    pub field: String,
    pub check: NextCallCheck,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
}

/// A conditional successor edge: when the condition holds against the
/// freshly merged context, the target source is executed next
///
/// A missing condition makes the edge unconditional.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NextCall {
    pub target_data_source: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<NextCallCondition>,
}

/// Field-level validation attached to a source's response mapping
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationRule {
    #[serde(default)]
    pub required: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,

    /// Allowed values; empty means unconstrained
    #[serde(default, rename = "enum", skip_serializing_if = "Vec::is_empty")]
    pub allowed_values: Vec<Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

/// Source-level extraction overrides: per-field paths, transforms, and
/// validation that supplement the field registry
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseMapping {
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub extract: HashMap<String, String>,

    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub transform: HashMap<String, TransformKind>,

    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub validate: HashMap<String, ValidationRule>,
}

/// Configuration for one external data source
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataSourceConfig {
    /// Unique source id, referenced by field configs and rule scopes
    pub id: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    pub endpoint: EndpointConfig,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cache: Option<CacheConfig>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retry_policy: Option<RetryPolicy>,

    /// Source ids that must run before this one
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub dependencies: Vec<String>,

    /// Field names this source populates
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub provides_fields: Vec<String>,

    /// Conditional successor edges
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub next_calls: Vec<NextCall>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_mapping: Option<ResponseMapping>,
}

impl DataSourceConfig {
    /// Minimal GET source
    pub fn new(id: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            description: None,
            endpoint: EndpointConfig {
                url: url.into(),
                method: HttpMethod::default(),
                headers: HashMap::new(),
                body: None,
                timeout_ms: default_timeout_ms(),
            },
            cache: None,
            retry_policy: None,
            dependencies: Vec::new(),
            provides_fields: Vec::new(),
            next_calls: Vec::new(),
            response_mapping: None,
        }
    }

    /// Builder method to set provided fields
    pub fn with_provides(mut self, fields: Vec<String>) -> Self {
        self.provides_fields = fields;
        self
    }

    /// Builder method to set dependencies
    pub fn with_dependencies(mut self, dependencies: Vec<String>) -> Self {
        self.dependencies = dependencies;
        self
    }

    /// Builder method to set the cache policy
    pub fn with_cache(mut self, cache: CacheConfig) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Builder method to set the retry policy
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry_policy = Some(retry);
        self
    }
}

fn default_true() -> bool {
    true
}

fn default_ttl() -> u64 {
    300 // 5 minutes
}

fn default_timeout_ms() -> u64 {
    5000
}

fn default_max_attempts() -> u32 {
    3
}

fn default_initial_delay_ms() -> u64 {
    100
}

fn default_max_delay_ms() -> u64 {
    5000
}

fn default_retry_on() -> Vec<u16> {
    vec![502, 503, 504]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_config_from_yaml() {
        let yaml = r#"
id: accountApi
description: Account balance lookup
endpoint:
  url: "https://accounts.internal/v1/accounts/${input.accountId}"
  method: GET
  headers:
    Authorization: "Bearer ${auth.token}"
  timeoutMs: 2000
cache:
  enabled: true
  ttl: 600
  keyPattern: "account:${input.accountId}"
retryPolicy:
  maxAttempts: 3
  backoffStrategy: exponential
  initialDelayMs: 50
  retryOn: [502, 503]
providesFields: [balanceTier, accountStatus]
"#;
        let config: DataSourceConfig = serde_yaml::from_str(yaml).unwrap();

        assert_eq!(config.id, "accountApi");
        assert_eq!(config.endpoint.method, HttpMethod::GET);
        assert_eq!(config.endpoint.timeout_ms, 2000);
        assert_eq!(
            config.endpoint.headers.get("Authorization").map(String::as_str),
            Some("Bearer ${auth.token}")
        );

        let cache = config.cache.unwrap();
        assert!(cache.enabled);
        assert_eq!(cache.ttl, 600);
        assert_eq!(cache.key_pattern.as_deref(), Some("account:${input.accountId}"));

        let retry = config.retry_policy.unwrap();
        assert_eq!(retry.max_attempts, 3);
        assert_eq!(retry.backoff_strategy, BackoffStrategy::Exponential);
        assert_eq!(retry.retry_on, vec![502, 503]);
        // Unset fields take defaults
        assert_eq!(retry.max_delay_ms, 5000);

        assert_eq!(config.provides_fields.len(), 2);
    }

    #[test]
    fn test_source_defaults() {
        let yaml = r#"
id: productApi
endpoint:
  url: "https://products.internal/v1/items"
"#;
        let config: DataSourceConfig = serde_yaml::from_str(yaml).unwrap();

        assert_eq!(config.endpoint.method, HttpMethod::GET);
        assert_eq!(config.endpoint.timeout_ms, 5000);
        assert!(config.cache.is_none());
        assert!(config.retry_policy.is_none());
        assert!(config.dependencies.is_empty());
        assert!(config.next_calls.is_empty());
    }

    #[test]
    fn test_next_call_condition_aliases() {
        let yaml = r#"
targetDataSource: productApi
condition:
  field: disclosureCode
  check: exists
"#;
        let next: NextCall = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(next.target_data_source, "productApi");
        assert_eq!(next.condition.unwrap().check, NextCallCheck::NotNull);

        let unconditional: NextCall =
            serde_yaml::from_str("targetDataSource: auditApi").unwrap();
        assert!(unconditional.condition.is_none());
    }

    #[test]
    fn test_validation_rule_enum_rename() {
        let yaml = r#"
required: true
pattern: "^[A-Z]+$"
enum: [GOLD, SILVER]
"#;
        let rule: ValidationRule = serde_yaml::from_str(yaml).unwrap();
        assert!(rule.required);
        assert_eq!(rule.allowed_values.len(), 2);
    }
}
