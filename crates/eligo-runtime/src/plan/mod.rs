//! Extraction planning
//!
//! Resolves a set of required fields into an ordered list of API calls.
//! Planning runs a fixed-point sweep: a source becomes callable once every
//! `required_inputs` of the field that leads to it is available, and
//! planning a source makes all of its `provides_fields` available for the
//! next sweep. Gaps (unknown fields, missing sources, unresolvable inputs)
//! become warnings on the plan, never errors.

use std::collections::HashSet;

use crate::config::{DataSourceConfig, ExtractionConfig, FieldSourceConfig};
use crate::error::EngineError;

/// Upper bound on fixed-point sweeps; chains deeper than this are dropped
const MAX_PLAN_ITERATIONS: usize = 10;

/// One planned API call and the fields it is expected to resolve
#[derive(Debug, Clone)]
pub struct ApiCall {
    pub api_id: String,
    pub source: DataSourceConfig,
    /// Field name plus its registry config, sorted by name
    pub field_sources: Vec<(String, FieldSourceConfig)>,
}

impl ApiCall {
    /// Assemble the call for a source: its config plus every registry
    /// field that names it as `source_api`
    pub fn for_source(config: &ExtractionConfig, source_id: &str) -> Option<ApiCall> {
        let source = config.source(source_id)?.clone();
        let mut field_sources: Vec<(String, FieldSourceConfig)> = config
            .fields
            .iter()
            .filter(|(_, field)| field.source_api == source_id)
            .map(|(name, field)| (name.clone(), field.clone()))
            .collect();
        field_sources.sort_by(|a, b| a.0.cmp(&b.0));

        Some(ApiCall {
            api_id: source_id.to_string(),
            source,
            field_sources,
        })
    }
}

/// Ordered call list plus non-fatal planning warnings
#[derive(Debug, Clone, Default)]
pub struct ExtractionPlan {
    pub calls: Vec<ApiCall>,
    pub warnings: Vec<String>,
}

impl ExtractionPlan {
    /// Planned source ids in execution order
    pub fn source_ids(&self) -> Vec<&str> {
        self.calls.iter().map(|call| call.api_id.as_str()).collect()
    }

    /// Whether any planned source declares source-level dependencies
    pub fn has_dependencies(&self) -> bool {
        self.calls.iter().any(|call| !call.source.dependencies.is_empty())
    }

    pub fn is_empty(&self) -> bool {
        self.calls.is_empty()
    }
}

/// Builds an [`ExtractionPlan`] from the field and source registries
pub struct PlanBuilder<'a> {
    config: &'a ExtractionConfig,
}

impl<'a> PlanBuilder<'a> {
    pub fn new(config: &'a ExtractionConfig) -> Self {
        Self { config }
    }

    /// Resolve the calls needed to produce `required_fields`
    ///
    /// `initial_inputs` are the variable names already bound on the
    /// context; fields listed there are satisfied without any call.
    pub fn build(&self, required_fields: &[String], initial_inputs: &[String]) -> ExtractionPlan {
        let mut plan = ExtractionPlan::default();
        let mut planned_ids: HashSet<String> = HashSet::new();
        let mut available: HashSet<String> = initial_inputs.iter().cloned().collect();

        let mut remaining: Vec<String> = Vec::new();
        for field in required_fields {
            if !available.contains(field) && !remaining.contains(field) {
                remaining.push(field.clone());
            }
        }

        let mut iterations = 0;
        while !remaining.is_empty() && iterations < MAX_PLAN_ITERATIONS {
            iterations += 1;
            let mut progressed = false;
            let mut deferred: Vec<String> = Vec::new();

            for field in remaining.drain(..) {
                if available.contains(&field) {
                    progressed = true;
                    continue;
                }

                let Some(field_cfg) = self.config.fields.get(&field) else {
                    plan.warnings.push(
                        EngineError::ConfigurationGap(format!(
                            "no field mapping configured for '{}'",
                            field
                        ))
                        .to_string(),
                    );
                    progressed = true;
                    continue;
                };

                if planned_ids.contains(&field_cfg.source_api) {
                    // Source already scheduled; the field resolves when it runs
                    available.insert(field);
                    progressed = true;
                    continue;
                }

                let inputs_ready = field_cfg
                    .required_inputs
                    .iter()
                    .all(|input| available.contains(input));
                if !inputs_ready {
                    deferred.push(field);
                    continue;
                }

                let mut visiting = HashSet::new();
                self.plan_source(
                    &field_cfg.source_api,
                    &mut plan,
                    &mut planned_ids,
                    &mut available,
                    &mut visiting,
                );
                available.insert(field);
                progressed = true;
            }

            remaining = deferred;
            if !progressed {
                break;
            }
        }

        for field in &remaining {
            tracing::warn!(field = %field, "field could not be planned");
            plan.warnings.push(
                EngineError::ConfigurationGap(format!(
                    "field '{}' could not be resolved: required inputs never became available",
                    field
                ))
                .to_string(),
            );
        }

        tracing::debug!(
            sources = ?plan.source_ids(),
            warnings = plan.warnings.len(),
            "extraction plan built"
        );
        plan
    }

    /// Schedule a source, placing its declared dependencies first
    fn plan_source(
        &self,
        source_id: &str,
        plan: &mut ExtractionPlan,
        planned_ids: &mut HashSet<String>,
        available: &mut HashSet<String>,
        visiting: &mut HashSet<String>,
    ) {
        if planned_ids.contains(source_id) {
            return;
        }
        if !visiting.insert(source_id.to_string()) {
            plan.warnings.push(
                EngineError::ConfigurationGap(format!(
                    "circular dependency detected involving source '{}'",
                    source_id
                ))
                .to_string(),
            );
            return;
        }

        let Some(call) = ApiCall::for_source(self.config, source_id) else {
            plan.warnings.push(
                EngineError::ConfigurationGap(format!(
                    "data source '{}' is not configured",
                    source_id
                ))
                .to_string(),
            );
            return;
        };

        for dependency in &call.source.dependencies {
            self.plan_source(dependency, plan, planned_ids, available, visiting);
        }

        for provided in &call.source.provides_fields {
            available.insert(provided.clone());
        }
        for (name, _) in &call.field_sources {
            available.insert(name.clone());
        }

        planned_ids.insert(source_id.to_string());
        plan.calls.push(call);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{DataSourceConfig, ExtractionConfig, FieldSourceConfig};

    fn config(
        fields: Vec<(&str, FieldSourceConfig)>,
        sources: Vec<DataSourceConfig>,
    ) -> ExtractionConfig {
        let mut cfg = ExtractionConfig::default();
        for (name, field) in fields {
            cfg.fields.insert(name.to_string(), field);
        }
        cfg.data_sources = sources;
        cfg
    }

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_single_source_plan() {
        let cfg = config(
            vec![(
                "balanceTier",
                FieldSourceConfig::new("accountApi", "$.balance")
                    .with_required_inputs(strings(&["accountId"])),
            )],
            vec![DataSourceConfig::new("accountApi", "https://x/accounts/${accountId}")
                .with_provides(strings(&["balanceTier"]))],
        );

        let plan = PlanBuilder::new(&cfg).build(&strings(&["balanceTier"]), &strings(&["accountId"]));

        assert_eq!(plan.source_ids(), vec!["accountApi"]);
        assert!(plan.warnings.is_empty());
        assert_eq!(plan.calls[0].field_sources.len(), 1);
        assert_eq!(plan.calls[0].field_sources[0].0, "balanceTier");
    }

    #[test]
    fn test_chained_dependencies_order() {
        // productName needs disclosureCode, which needs accountId
        let cfg = config(
            vec![
                (
                    "disclosureCode",
                    FieldSourceConfig::new("disclosureApi", "$.code")
                        .with_required_inputs(strings(&["accountId"])),
                ),
                (
                    "productName",
                    FieldSourceConfig::new("productApi", "$.name")
                        .with_required_inputs(strings(&["disclosureCode"])),
                ),
            ],
            vec![
                DataSourceConfig::new("disclosureApi", "https://x/disclosures/${accountId}")
                    .with_provides(strings(&["disclosureCode"])),
                DataSourceConfig::new("productApi", "https://x/products/${disclosureCode}")
                    .with_provides(strings(&["productName"])),
            ],
        );

        let plan = PlanBuilder::new(&cfg)
            .build(&strings(&["productName", "disclosureCode"]), &strings(&["accountId"]));

        assert_eq!(plan.source_ids(), vec!["disclosureApi", "productApi"]);
        assert!(plan.warnings.is_empty());
    }

    #[test]
    fn test_shared_source_planned_once() {
        let cfg = config(
            vec![
                ("balanceTier", FieldSourceConfig::new("accountApi", "$.balance")),
                ("accountStatus", FieldSourceConfig::new("accountApi", "$.status")),
            ],
            vec![DataSourceConfig::new("accountApi", "https://x/accounts")
                .with_provides(strings(&["balanceTier", "accountStatus"]))],
        );

        let plan =
            PlanBuilder::new(&cfg).build(&strings(&["balanceTier", "accountStatus"]), &[]);

        assert_eq!(plan.source_ids(), vec!["accountApi"]);
        assert_eq!(plan.calls[0].field_sources.len(), 2);
        // Sorted by field name
        assert_eq!(plan.calls[0].field_sources[0].0, "accountStatus");
    }

    #[test]
    fn test_already_available_field_needs_no_call() {
        let cfg = config(
            vec![("accountId", FieldSourceConfig::new("accountApi", "$.id"))],
            vec![DataSourceConfig::new("accountApi", "https://x/accounts")],
        );

        let plan = PlanBuilder::new(&cfg).build(&strings(&["accountId"]), &strings(&["accountId"]));

        assert!(plan.is_empty());
        assert!(plan.warnings.is_empty());
    }

    #[test]
    fn test_unknown_field_warns() {
        let cfg = config(vec![], vec![]);
        let plan = PlanBuilder::new(&cfg).build(&strings(&["mystery"]), &[]);

        assert!(plan.is_empty());
        assert_eq!(plan.warnings.len(), 1);
        assert!(plan.warnings[0].contains("mystery"));
    }

    #[test]
    fn test_missing_source_warns() {
        let cfg = config(
            vec![("balanceTier", FieldSourceConfig::new("ghostApi", "$.balance"))],
            vec![],
        );
        let plan = PlanBuilder::new(&cfg).build(&strings(&["balanceTier"]), &[]);

        assert!(plan.is_empty());
        assert!(plan.warnings.iter().any(|w| w.contains("ghostApi")));
    }

    #[test]
    fn test_source_level_dependencies_run_first() {
        let cfg = config(
            vec![("profile", FieldSourceConfig::new("profileApi", "$.profile"))],
            vec![
                DataSourceConfig::new("authApi", "https://x/token")
                    .with_provides(strings(&["authToken"])),
                DataSourceConfig::new("profileApi", "https://x/profile")
                    .with_provides(strings(&["profile"]))
                    .with_dependencies(strings(&["authApi"])),
            ],
        );

        let plan = PlanBuilder::new(&cfg).build(&strings(&["profile"]), &[]);

        assert_eq!(plan.source_ids(), vec!["authApi", "profileApi"]);
        assert!(plan.has_dependencies());
    }

    #[test]
    fn test_mutually_blocked_fields_become_warnings() {
        // a needs b's output and b needs a's output
        let cfg = config(
            vec![
                (
                    "a",
                    FieldSourceConfig::new("apiA", "$.a").with_required_inputs(strings(&["b"])),
                ),
                (
                    "b",
                    FieldSourceConfig::new("apiB", "$.b").with_required_inputs(strings(&["a"])),
                ),
            ],
            vec![
                DataSourceConfig::new("apiA", "https://x/a").with_provides(strings(&["a"])),
                DataSourceConfig::new("apiB", "https://x/b").with_provides(strings(&["b"])),
            ],
        );

        let plan = PlanBuilder::new(&cfg).build(&strings(&["a", "b"]), &[]);

        assert!(plan.is_empty());
        assert_eq!(plan.warnings.len(), 2);
    }

    #[test]
    fn test_replanning_is_idempotent() {
        let cfg = config(
            vec![
                (
                    "disclosureCode",
                    FieldSourceConfig::new("disclosureApi", "$.code")
                        .with_required_inputs(strings(&["accountId"])),
                ),
                (
                    "productName",
                    FieldSourceConfig::new("productApi", "$.name")
                        .with_required_inputs(strings(&["disclosureCode"])),
                ),
                ("accountStatus", FieldSourceConfig::new("accountApi", "$.status")),
            ],
            vec![
                DataSourceConfig::new("accountApi", "https://x/accounts")
                    .with_provides(strings(&["accountStatus"])),
                DataSourceConfig::new("disclosureApi", "https://x/disclosures")
                    .with_provides(strings(&["disclosureCode"])),
                DataSourceConfig::new("productApi", "https://x/products")
                    .with_provides(strings(&["productName"])),
            ],
        );

        let required = strings(&["productName", "accountStatus", "disclosureCode"]);
        let inputs = strings(&["accountId"]);

        let first = PlanBuilder::new(&cfg).build(&required, &inputs);
        let second = PlanBuilder::new(&cfg).build(&required, &inputs);

        assert_eq!(first.source_ids(), second.source_ids());
        assert_eq!(first.warnings, second.warnings);
    }
}
