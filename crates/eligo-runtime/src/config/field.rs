//! Field registry configuration

use crate::transform::TransformKind;
use eligo_core::Value;
use serde::{Deserialize, Serialize};

/// Declared type of a logical field
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    #[default]
    String,
    Number,
    Boolean,
    Array,
    Object,
}

/// Configuration for one logical field: which source provides it, how to
/// extract it, and what to fall back to
///
/// Immutable once loaded. `required_inputs` names the fields that must
/// already be resolved before this field's source can be called.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldSourceConfig {
    /// Id of the data source that provides this field
    pub source_api: String,

    /// Optional alternate source tried once when the primary fails
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fallback_api: Option<String>,

    /// Path expression into the source's JSON response; absent for fields
    /// sourced from defaults only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extraction_path: Option<String>,

    /// Fields that must be resolved before this field's source can run
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub required_inputs: Vec<String>,

    #[serde(default)]
    pub field_type: FieldType,

    /// Value merged into the context when extraction fails or the source
    /// is unavailable
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_value: Option<Value>,

    /// Regex the extracted value must match; failure marks the source failed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub validation_pattern: Option<String>,

    /// Transform applied after extraction
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transform: Option<TransformKind>,
}

impl FieldSourceConfig {
    /// Minimal config: a source id and an extraction path
    pub fn new(source_api: impl Into<String>, extraction_path: impl Into<String>) -> Self {
        Self {
            source_api: source_api.into(),
            fallback_api: None,
            extraction_path: Some(extraction_path.into()),
            required_inputs: Vec::new(),
            field_type: FieldType::default(),
            default_value: None,
            validation_pattern: None,
            transform: None,
        }
    }

    /// Builder method to add required inputs
    pub fn with_required_inputs(mut self, inputs: Vec<String>) -> Self {
        self.required_inputs = inputs;
        self
    }

    /// Builder method to set the default value
    pub fn with_default(mut self, value: Value) -> Self {
        self.default_value = Some(value);
        self
    }

    /// Builder method to set the transform
    pub fn with_transform(mut self, transform: TransformKind) -> Self {
        self.transform = Some(transform);
        self
    }
}
