//! Field extraction
//!
//! Turns a raw response body into context variables for one planned call:
//! path evaluation, single-element unwrap, transforms, type coercion, and
//! validation. Fields that cannot be extracted fall back to their
//! configured default or are omitted entirely; omission is what the rule
//! operators `exists`/`notExists` observe.

mod path;

pub use path::navigate;

use std::collections::HashMap;

use eligo_core::Value;
use regex::Regex;

use crate::config::{FieldType, ValidationRule};
use crate::error::{EngineError, Result};
use crate::plan::ApiCall;
use crate::transform::TransformKind;

pub struct FieldExtractor;

impl FieldExtractor {
    /// Extract every field the call provides from a parsed response body
    ///
    /// Returns the merged map of extracted values and applied defaults.
    /// `Err` means a validation rule rejected an extracted value; the
    /// caller treats that like a failed call and falls back to
    /// [`FieldExtractor::default_values`].
    pub fn extract(call: &ApiCall, response: &Value) -> Result<HashMap<String, Value>> {
        let mapping = call.source.response_mapping.as_ref();
        let mut extracted: HashMap<String, Value> = HashMap::new();
        let mut defaulted: HashMap<String, Value> = HashMap::new();
        let mut omitted = 0usize;

        for (field_name, field_cfg) in &call.field_sources {
            let effective_path = field_cfg
                .extraction_path
                .as_deref()
                .or_else(|| mapping.and_then(|m| m.extract.get(field_name)).map(String::as_str));

            let Some(path_expr) = effective_path else {
                // Field is sourced from its default only
                match &field_cfg.default_value {
                    Some(default) => {
                        defaulted.insert(field_name.clone(), default.clone());
                    }
                    None => omitted += 1,
                }
                continue;
            };

            let mut value = match path::navigate(response, path_expr) {
                Ok(value) => value,
                Err(err) => {
                    tracing::warn!(field = %field_name, error = %err, "path evaluation failed");
                    Value::Null
                }
            };

            // Wildcard paths return sequences even for a unique match
            if let Value::Array(items) = &value {
                if items.len() == 1 {
                    value = items[0].clone();
                }
            }

            if !value.is_null() {
                let transform = field_cfg
                    .transform
                    .as_ref()
                    .or_else(|| mapping.and_then(|m| m.transform.get(field_name)));
                if let Some(transform) = transform {
                    value = Self::apply_transform(field_name, transform, value);
                }
            }

            if value.is_null() {
                match &field_cfg.default_value {
                    Some(default) => {
                        defaulted.insert(field_name.clone(), default.clone());
                    }
                    None => omitted += 1,
                }
                continue;
            }

            value = Self::coerce(field_name, field_cfg.field_type, value);
            extracted.insert(field_name.clone(), value);
        }

        Self::validate(call, &extracted)?;

        tracing::debug!(
            source = %call.api_id,
            extracted = extracted.len(),
            defaulted = defaulted.len(),
            omitted,
            "field extraction complete"
        );

        let mut values = extracted;
        values.extend(defaulted);
        Ok(values)
    }

    /// Configured defaults for every field the call provides
    ///
    /// Fields without a default are absent from the result.
    pub fn default_values(call: &ApiCall) -> HashMap<String, Value> {
        call.field_sources
            .iter()
            .filter_map(|(name, field)| {
                field
                    .default_value
                    .as_ref()
                    .map(|default| (name.clone(), default.clone()))
            })
            .collect()
    }

    fn apply_transform(field_name: &str, transform: &TransformKind, value: Value) -> Value {
        let result = transform.apply(value);
        if result.is_null() {
            tracing::debug!(field = %field_name, "transform produced null");
        }
        result
    }

    /// Best-effort coercion to the declared field type
    ///
    /// Values that cannot be represented in the declared type are kept
    /// as-is with a warning; validation is the mechanism that rejects data.
    fn coerce(field_name: &str, field_type: FieldType, value: Value) -> Value {
        let coerced = match (field_type, &value) {
            (FieldType::String, Value::String(_)) => Some(value.clone()),
            (FieldType::String, Value::Number(_)) | (FieldType::String, Value::Bool(_)) => {
                Some(Value::String(value.to_display_string()))
            }
            (FieldType::Number, Value::Number(_)) => Some(value.clone()),
            (FieldType::Number, Value::String(_)) => value.as_f64().map(Value::Number),
            (FieldType::Boolean, Value::Bool(_)) => Some(value.clone()),
            (FieldType::Boolean, Value::String(s)) => match s.trim().to_lowercase().as_str() {
                "true" => Some(Value::Bool(true)),
                "false" => Some(Value::Bool(false)),
                _ => None,
            },
            (FieldType::Array, Value::Array(_)) => Some(value.clone()),
            (FieldType::Object, Value::Object(_)) => Some(value.clone()),
            _ => None,
        };

        match coerced {
            Some(coerced) => coerced,
            None => {
                tracing::warn!(
                    field = %field_name,
                    declared = ?field_type,
                    "extracted value does not match declared field type"
                );
                value
            }
        }
    }

    /// Run field-level patterns and source-level validation rules against
    /// freshly extracted values
    ///
    /// Defaults are the recovery path and are never validated. `required`
    /// means the response itself must have produced the value.
    fn validate(call: &ApiCall, extracted: &HashMap<String, Value>) -> Result<()> {
        for (field_name, field_cfg) in &call.field_sources {
            let Some(pattern) = &field_cfg.validation_pattern else {
                continue;
            };
            let Some(value) = extracted.get(field_name) else {
                continue;
            };
            Self::check_pattern(field_name, pattern, value, None)?;
        }

        let Some(mapping) = call.source.response_mapping.as_ref() else {
            return Ok(());
        };

        for (field_name, rule) in &mapping.validate {
            Self::check_rule(field_name, rule, extracted.get(field_name))?;
        }

        Ok(())
    }

    fn check_rule(field_name: &str, rule: &ValidationRule, value: Option<&Value>) -> Result<()> {
        let Some(value) = value else {
            if rule.required {
                return Err(Self::rejection(
                    field_name,
                    rule.error_message.as_deref(),
                    "required field missing from response",
                ));
            }
            return Ok(());
        };

        if let Some(pattern) = &rule.pattern {
            Self::check_pattern(field_name, pattern, value, rule.error_message.as_deref())?;
        }

        if rule.min.is_some() || rule.max.is_some() {
            let Some(number) = value.as_f64() else {
                return Err(Self::rejection(
                    field_name,
                    rule.error_message.as_deref(),
                    "value is not numeric",
                ));
            };
            if let Some(min) = rule.min {
                if number < min {
                    return Err(Self::rejection(
                        field_name,
                        rule.error_message.as_deref(),
                        &format!("value {} below minimum {}", number, min),
                    ));
                }
            }
            if let Some(max) = rule.max {
                if number > max {
                    return Err(Self::rejection(
                        field_name,
                        rule.error_message.as_deref(),
                        &format!("value {} above maximum {}", number, max),
                    ));
                }
            }
        }

        if !rule.allowed_values.is_empty() && !rule.allowed_values.contains(value) {
            return Err(Self::rejection(
                field_name,
                rule.error_message.as_deref(),
                &format!("value {} not in the allowed set", value.to_display_string()),
            ));
        }

        Ok(())
    }

    fn check_pattern(
        field_name: &str,
        pattern: &str,
        value: &Value,
        message: Option<&str>,
    ) -> Result<()> {
        let regex = match Regex::new(pattern) {
            Ok(regex) => regex,
            Err(err) => {
                // A broken pattern is a config bug, not bad data
                tracing::warn!(field = %field_name, pattern = %pattern, error = %err, "invalid validation pattern");
                return Ok(());
            }
        };

        let text = value.to_display_string();
        if regex.is_match(&text) {
            Ok(())
        } else {
            Err(Self::rejection(
                field_name,
                message,
                &format!("value '{}' does not match pattern '{}'", text, pattern),
            ))
        }
    }

    fn rejection(field_name: &str, message: Option<&str>, fallback: &str) -> EngineError {
        EngineError::ExtractionFailure {
            field: field_name.to_string(),
            reason: message.unwrap_or(fallback).to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{DataSourceConfig, FieldSourceConfig, ResponseMapping};
    use crate::transform::{TierMapping, TransformKind};

    fn parse(json: &str) -> Value {
        Value::from_json(serde_json::from_str(json).unwrap())
    }

    fn call_with(fields: Vec<(&str, FieldSourceConfig)>) -> ApiCall {
        ApiCall {
            api_id: "accountApi".to_string(),
            source: DataSourceConfig::new("accountApi", "https://x/accounts"),
            field_sources: fields
                .into_iter()
                .map(|(name, cfg)| (name.to_string(), cfg))
                .collect(),
        }
    }

    #[test]
    fn test_extracts_and_transforms() {
        let tier = TransformKind::TierClassification {
            mappings: vec![TierMapping {
                min: Some(10_000.0),
                max: Some(99_999.0),
                value: Value::String("GOLD".to_string()),
            }],
        };
        let call = call_with(vec![(
            "balanceTier",
            FieldSourceConfig::new("accountApi", "$.balance").with_transform(tier),
        )]);

        let values = FieldExtractor::extract(&call, &parse(r#"{"balance": 12000}"#)).unwrap();
        assert_eq!(values.get("balanceTier"), Some(&Value::String("GOLD".to_string())));
    }

    #[test]
    fn test_single_element_sequence_unwraps() {
        let call = call_with(vec![(
            "productId",
            FieldSourceConfig::new("accountApi", "$.items[*].id"),
        )]);

        let one = parse(r#"{"items": [{"id": "P1"}]}"#);
        let values = FieldExtractor::extract(&call, &one).unwrap();
        assert_eq!(values.get("productId"), Some(&Value::String("P1".to_string())));

        let two = parse(r#"{"items": [{"id": "P1"}, {"id": "P2"}]}"#);
        let values = FieldExtractor::extract(&call, &two).unwrap();
        assert_eq!(
            values.get("productId").and_then(|v| v.as_array()).map(|a| a.len()),
            Some(2)
        );
    }

    #[test]
    fn test_null_falls_back_to_default() {
        let call = call_with(vec![(
            "balanceTier",
            FieldSourceConfig::new("accountApi", "$.balance")
                .with_default(Value::String("STANDARD".to_string())),
        )]);

        let values = FieldExtractor::extract(&call, &parse(r#"{"other": 1}"#)).unwrap();
        assert_eq!(
            values.get("balanceTier"),
            Some(&Value::String("STANDARD".to_string()))
        );
    }

    #[test]
    fn test_null_without_default_is_omitted() {
        let call = call_with(vec![(
            "balanceTier",
            FieldSourceConfig::new("accountApi", "$.balance"),
        )]);

        let values = FieldExtractor::extract(&call, &parse(r#"{"other": 1}"#)).unwrap();
        assert!(!values.contains_key("balanceTier"));
    }

    #[test]
    fn test_pathless_field_uses_default_only() {
        let mut cfg = FieldSourceConfig::new("accountApi", "unused");
        cfg.extraction_path = None;
        let call = call_with(vec![(
            "region",
            cfg.with_default(Value::String("EU".to_string())),
        )]);

        let values = FieldExtractor::extract(&call, &parse(r#"{"region": "US"}"#)).unwrap();
        assert_eq!(values.get("region"), Some(&Value::String("EU".to_string())));
    }

    #[test]
    fn test_source_level_extract_mapping() {
        let mut cfg = FieldSourceConfig::new("accountApi", "unused");
        cfg.extraction_path = None;
        let mut call = call_with(vec![("status", cfg)]);

        let mut mapping = ResponseMapping::default();
        mapping
            .extract
            .insert("status".to_string(), "$.account.status".to_string());
        call.source.response_mapping = Some(mapping);

        let values =
            FieldExtractor::extract(&call, &parse(r#"{"account": {"status": "ACTIVE"}}"#)).unwrap();
        assert_eq!(values.get("status"), Some(&Value::String("ACTIVE".to_string())));
    }

    #[test]
    fn test_source_level_transform_applies() {
        let mut call = call_with(vec![("code", FieldSourceConfig::new("accountApi", "$.code"))]);
        let mut mapping = ResponseMapping::default();
        mapping
            .transform
            .insert("code".to_string(), TransformKind::Uppercase);
        call.source.response_mapping = Some(mapping);

        let values = FieldExtractor::extract(&call, &parse(r#"{"code": "abc"}"#)).unwrap();
        assert_eq!(values.get("code"), Some(&Value::String("ABC".to_string())));
    }

    #[test]
    fn test_numeric_string_coerces_to_number() {
        let mut cfg = FieldSourceConfig::new("accountApi", "$.balance");
        cfg.field_type = FieldType::Number;
        let call = call_with(vec![("balance", cfg)]);

        let values = FieldExtractor::extract(&call, &parse(r#"{"balance": "125.5"}"#)).unwrap();
        assert_eq!(values.get("balance"), Some(&Value::Number(125.5)));
    }

    #[test]
    fn test_validation_pattern_rejects() {
        let mut cfg = FieldSourceConfig::new("accountApi", "$.status");
        cfg.validation_pattern = Some("^[A-Z]+$".to_string());
        let call = call_with(vec![("status", cfg)]);

        let err = FieldExtractor::extract(&call, &parse(r#"{"status": "bad value"}"#)).unwrap_err();
        assert!(matches!(err, EngineError::ExtractionFailure { .. }));
    }

    #[test]
    fn test_validation_pattern_skips_defaulted_value() {
        let mut cfg = FieldSourceConfig::new("accountApi", "$.status");
        cfg.validation_pattern = Some("^[A-Z]+$".to_string());
        let call = call_with(vec![(
            "status",
            cfg.with_default(Value::String("n/a".to_string())),
        )]);

        // Nothing extracted, default applied, pattern not consulted
        let values = FieldExtractor::extract(&call, &parse("{}")).unwrap();
        assert_eq!(values.get("status"), Some(&Value::String("n/a".to_string())));
    }

    #[test]
    fn test_required_rule_rejects_missing_field() {
        let mut call = call_with(vec![(
            "status",
            FieldSourceConfig::new("accountApi", "$.status"),
        )]);
        let mut mapping = ResponseMapping::default();
        mapping.validate.insert(
            "status".to_string(),
            ValidationRule {
                required: true,
                ..Default::default()
            },
        );
        call.source.response_mapping = Some(mapping);

        let err = FieldExtractor::extract(&call, &parse("{}")).unwrap_err();
        assert!(err.to_string().contains("required"));
    }

    #[test]
    fn test_min_max_rule() {
        let mut call = call_with(vec![("age", FieldSourceConfig::new("accountApi", "$.age"))]);
        let mut mapping = ResponseMapping::default();
        mapping.validate.insert(
            "age".to_string(),
            ValidationRule {
                min: Some(18.0),
                max: Some(120.0),
                ..Default::default()
            },
        );
        call.source.response_mapping = Some(mapping.clone());

        assert!(FieldExtractor::extract(&call, &parse(r#"{"age": 42}"#)).is_ok());
        assert!(FieldExtractor::extract(&call, &parse(r#"{"age": 12}"#)).is_err());
        assert!(FieldExtractor::extract(&call, &parse(r#"{"age": 150}"#)).is_err());
    }

    #[test]
    fn test_allowed_values_rule() {
        let mut call = call_with(vec![("tier", FieldSourceConfig::new("accountApi", "$.tier"))]);
        let mut mapping = ResponseMapping::default();
        mapping.validate.insert(
            "tier".to_string(),
            ValidationRule {
                allowed_values: vec![
                    Value::String("GOLD".to_string()),
                    Value::String("SILVER".to_string()),
                ],
                error_message: Some("unknown tier".to_string()),
                ..Default::default()
            },
        );
        call.source.response_mapping = Some(mapping);

        assert!(FieldExtractor::extract(&call, &parse(r#"{"tier": "GOLD"}"#)).is_ok());
        let err = FieldExtractor::extract(&call, &parse(r#"{"tier": "BRONZE"}"#)).unwrap_err();
        assert!(err.to_string().contains("unknown tier"));
    }

    #[test]
    fn test_invalid_pattern_is_ignored() {
        let mut cfg = FieldSourceConfig::new("accountApi", "$.status");
        cfg.validation_pattern = Some("[unclosed".to_string());
        let call = call_with(vec![("status", cfg)]);

        assert!(FieldExtractor::extract(&call, &parse(r#"{"status": "ok"}"#)).is_ok());
    }

    #[test]
    fn test_default_values() {
        let call = call_with(vec![
            (
                "balanceTier",
                FieldSourceConfig::new("accountApi", "$.balance")
                    .with_default(Value::String("STANDARD".to_string())),
            ),
            ("status", FieldSourceConfig::new("accountApi", "$.status")),
        ]);

        let defaults = FieldExtractor::default_values(&call);
        assert_eq!(defaults.len(), 1);
        assert_eq!(
            defaults.get("balanceTier"),
            Some(&Value::String("STANDARD".to_string()))
        );
    }
}
