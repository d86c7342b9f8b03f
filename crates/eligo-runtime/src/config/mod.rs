//! Extraction configuration
//!
//! The full configuration bundle: the field registry, the data-source
//! registry, the inclusion rule tree, and execution settings. Loaded once
//! from YAML or JSON and treated as immutable by the engine.

pub mod field;
pub mod source;

pub use field::{FieldSourceConfig, FieldType};
pub use source::{
    BackoffStrategy, CacheConfig, DataSourceConfig, EndpointConfig, HttpMethod, NextCall,
    NextCallCheck, NextCallCondition, ResponseMapping, RetryPolicy, ValidationRule,
};

use crate::error::{EngineError, Result};
use eligo_core::InclusionRules;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::path::Path;

/// Execution mode for the call executor
///
/// `Auto` picks parallel when no planned source declares dependencies and
/// sequential otherwise.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionMode {
    #[default]
    Auto,
    Sequential,
    Parallel,
}

/// Engine-level execution settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionSettings {
    #[serde(default)]
    pub mode: ExecutionMode,

    /// Overall deadline for one request in milliseconds
    #[serde(default = "default_deadline_ms")]
    pub deadline_ms: u64,

    /// Concurrency bound for parallel execution
    #[serde(default = "default_parallelism")]
    pub parallelism: usize,
}

impl Default for ExecutionSettings {
    fn default() -> Self {
        Self {
            mode: ExecutionMode::default(),
            deadline_ms: default_deadline_ms(),
            parallelism: default_parallelism(),
        }
    }
}

/// Complete extraction configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractionConfig {
    /// Field registry: field name to its source mapping
    #[serde(default)]
    pub fields: HashMap<String, FieldSourceConfig>,

    /// Data-source registry
    #[serde(default)]
    pub data_sources: Vec<DataSourceConfig>,

    /// Inclusion rule tree evaluated after extraction
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rules: Option<InclusionRules>,

    #[serde(default)]
    pub execution: ExecutionSettings,
}

impl ExtractionConfig {
    /// Parse a configuration bundle from YAML
    pub fn from_yaml(content: &str) -> Result<Self> {
        let config: ExtractionConfig = serde_yaml::from_str(content)
            .map_err(|e| EngineError::ConfigError(format!("Failed to parse YAML config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Parse a configuration bundle from JSON
    pub fn from_json(content: &str) -> Result<Self> {
        let config: ExtractionConfig = serde_json::from_str(content)
            .map_err(|e| EngineError::ConfigError(format!("Failed to parse JSON config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Load a YAML configuration bundle from a file
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(|e| {
            EngineError::ConfigError(format!(
                "Failed to read config file {}: {}",
                path.as_ref().display(),
                e
            ))
        })?;
        Self::from_yaml(&content)
    }

    /// Look up a data source by id
    pub fn source(&self, id: &str) -> Option<&DataSourceConfig> {
        self.data_sources.iter().find(|s| s.id == id)
    }

    /// Structural validation of the registries
    ///
    /// Duplicate or empty ids are hard errors. Dangling references (a field
    /// naming a source that does not exist, a next-call edge to an unknown
    /// target) only reduce coverage at plan time, so they log a warning
    /// here instead of failing the load.
    pub fn validate(&self) -> Result<()> {
        let mut seen = HashSet::new();
        for source in &self.data_sources {
            if source.id.is_empty() {
                return Err(EngineError::ConfigError(
                    "Data source with empty id".to_string(),
                ));
            }
            if !seen.insert(source.id.as_str()) {
                return Err(EngineError::ConfigError(format!(
                    "Duplicate data source id '{}'",
                    source.id
                )));
            }
        }

        for (name, field) in &self.fields {
            if field.source_api.is_empty() {
                return Err(EngineError::ConfigError(format!(
                    "Field '{}' has an empty sourceApi",
                    name
                )));
            }
            if !seen.contains(field.source_api.as_str()) {
                tracing::warn!(
                    field = %name,
                    source = %field.source_api,
                    "Field references an unknown data source"
                );
            }
            if let Some(fallback) = &field.fallback_api {
                if !seen.contains(fallback.as_str()) {
                    tracing::warn!(
                        field = %name,
                        fallback = %fallback,
                        "Field references an unknown fallback source"
                    );
                }
            }
        }

        for source in &self.data_sources {
            for next in &source.next_calls {
                if !seen.contains(next.target_data_source.as_str()) {
                    tracing::warn!(
                        source = %source.id,
                        target = %next.target_data_source,
                        "Next-call edge targets an unknown data source"
                    );
                }
            }
        }

        Ok(())
    }
}

fn default_deadline_ms() -> u64 {
    10_000
}

fn default_parallelism() -> usize {
    4
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const SAMPLE: &str = r#"
fields:
  balanceTier:
    sourceApi: accountApi
    extractionPath: "$.balance"
    requiredInputs: [accountId]
    defaultValue: STANDARD
    transform:
      type: tierClassification
      mappings:
        - min: 10000
          max: 99999
          value: GOLD
dataSources:
  - id: accountApi
    endpoint:
      url: "https://accounts.internal/v1/accounts/${input.accountId}"
    providesFields: [balanceTier]
rules:
  combinator: AND
  conditions:
    - field: balanceTier
      operator: equals
      value: GOLD
execution:
  mode: sequential
  deadlineMs: 3000
"#;

    #[test]
    fn test_bundle_from_yaml() {
        let config = ExtractionConfig::from_yaml(SAMPLE).unwrap();

        assert_eq!(config.fields.len(), 1);
        assert_eq!(config.data_sources.len(), 1);
        assert!(config.rules.is_some());
        assert_eq!(config.execution.mode, ExecutionMode::Sequential);
        assert_eq!(config.execution.deadline_ms, 3000);
        assert_eq!(config.execution.parallelism, 4);

        let field = config.fields.get("balanceTier").unwrap();
        assert_eq!(field.source_api, "accountApi");
        assert!(config.source("accountApi").is_some());
        assert!(config.source("missing").is_none());
    }

    #[test]
    fn test_duplicate_source_id_rejected() {
        let yaml = r#"
dataSources:
  - id: a
    endpoint: { url: "http://x" }
  - id: a
    endpoint: { url: "http://y" }
"#;
        let err = ExtractionConfig::from_yaml(yaml).unwrap_err();
        assert!(err.to_string().contains("Duplicate data source id"));
    }

    #[test]
    fn test_dangling_field_source_is_not_fatal() {
        let yaml = r#"
fields:
  orphan:
    sourceApi: nowhere
"#;
        // Reduces coverage at plan time, does not fail the load
        assert!(ExtractionConfig::from_yaml(yaml).is_ok());
    }

    #[test]
    fn test_from_yaml_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(SAMPLE.as_bytes()).unwrap();

        let config = ExtractionConfig::from_yaml_file(file.path()).unwrap();
        assert_eq!(config.data_sources[0].id, "accountApi");
    }

    #[test]
    fn test_from_json() {
        let json = r#"{
            "fields": {"status": {"sourceApi": "statusApi", "extractionPath": "$.status"}},
            "dataSources": [{"id": "statusApi", "endpoint": {"url": "http://s"}}]
        }"#;
        let config = ExtractionConfig::from_json(json).unwrap();
        assert_eq!(config.fields.len(), 1);
        assert_eq!(config.execution.deadline_ms, 10_000);
    }
}
