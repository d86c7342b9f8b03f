//! Extraction engine
//!
//! The orchestrator behind `run`: builds the call plan for the requested
//! fields, drives the executor under the overall deadline, evaluates the
//! inclusion rules, and assembles the result. A blown deadline or failed
//! source degrades the result instead of erroring; the only error
//! surfaced to the caller is an empty required-fields request.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use eligo_core::{InclusionRules, Value};
use serde::{Deserialize, Serialize};

use crate::cache::ResponseCache;
use crate::config::{ExecutionMode, ExtractionConfig};
use crate::context::ExecutionContext;
use crate::error::{EngineError, Result};
use crate::executor::CallExecutor;
use crate::plan::PlanBuilder;
use crate::resilience::CircuitBreakerRegistry;
use crate::result::{ExecutionMetrics, ExtractionResult, MatchingCriteria};
use crate::rules::{RuleEvaluator, RuleOutcome};
use crate::service::{HttpClient, ReqwestHttpClient};

/// One extraction request
///
/// `rules`, `mode`, and `deadline_ms` override the configured values when
/// present. `variables` seeds the execution context and doubles as the
/// initial available-fields set for planning.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractionRequest {
    pub required_fields: Vec<String>,

    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub variables: HashMap<String, Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rules: Option<InclusionRules>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mode: Option<ExecutionMode>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deadline_ms: Option<u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub matching_criteria: Option<MatchingCriteria>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub correlation_id: Option<String>,
}

impl ExtractionRequest {
    pub fn new(required_fields: Vec<String>) -> Self {
        Self {
            required_fields,
            ..Self::default()
        }
    }

    pub fn with_variable(mut self, name: impl Into<String>, value: Value) -> Self {
        self.variables.insert(name.into(), value);
        self
    }

    pub fn with_rules(mut self, rules: InclusionRules) -> Self {
        self.rules = Some(rules);
        self
    }

    pub fn with_mode(mut self, mode: ExecutionMode) -> Self {
        self.mode = Some(mode);
        self
    }

    pub fn with_deadline_ms(mut self, deadline_ms: u64) -> Self {
        self.deadline_ms = Some(deadline_ms);
        self
    }

    pub fn with_matching_criteria(mut self, criteria: MatchingCriteria) -> Self {
        self.matching_criteria = Some(criteria);
        self
    }

    pub fn with_correlation_id(mut self, correlation_id: impl Into<String>) -> Self {
        self.correlation_id = Some(correlation_id.into());
        self
    }
}

/// Configuration-driven extraction and eligibility engine
///
/// Holds the loaded configuration plus the shared services every request
/// uses: the HTTP client, the per-source circuit breakers, and the
/// response cache. Requests run independently; these services are the
/// only cross-request state.
pub struct ExtractionEngine {
    config: Arc<ExtractionConfig>,

    /// Transport used for all data-source calls
    client: Arc<dyn HttpClient>,

    /// Per-source breakers, shared across requests
    breakers: Arc<CircuitBreakerRegistry>,

    /// Raw response cache, shared across requests
    cache: Arc<Mutex<ResponseCache>>,
}

impl ExtractionEngine {
    pub fn new(config: ExtractionConfig) -> Self {
        Self {
            config: Arc::new(config),
            client: Arc::new(ReqwestHttpClient::new()),
            breakers: Arc::new(CircuitBreakerRegistry::default()),
            cache: Arc::new(Mutex::new(ResponseCache::new())),
        }
    }

    /// Swap the transport, mainly for tests and embedding
    pub fn with_client(mut self, client: Arc<dyn HttpClient>) -> Self {
        self.client = client;
        self
    }

    pub fn with_breakers(mut self, breakers: Arc<CircuitBreakerRegistry>) -> Self {
        self.breakers = breakers;
        self
    }

    pub fn with_cache(mut self, cache: Arc<Mutex<ResponseCache>>) -> Self {
        self.cache = cache;
        self
    }

    pub fn config(&self) -> &ExtractionConfig {
        &self.config
    }

    /// Run one extraction request end to end
    ///
    /// Plan, execute, evaluate, assemble. The whole run sits under the
    /// request deadline; when it expires the partially merged context is
    /// still returned, annotated with a timeout failure reason.
    pub async fn run(&self, request: ExtractionRequest) -> Result<ExtractionResult> {
        if request.required_fields.is_empty() {
            return Err(EngineError::InvalidRequest(
                "requiredFields must not be empty".to_string(),
            ));
        }

        let mut ctx = ExecutionContext::new(request.variables.clone());
        if let Some(correlation_id) = &request.correlation_id {
            ctx = ctx.with_correlation_id(correlation_id.clone());
        }
        let correlation_id = ctx.correlation_id.clone();

        tracing::info!(
            correlation_id = %correlation_id,
            fields = request.required_fields.len(),
            "starting extraction run"
        );

        let initial_inputs: Vec<String> = ctx.variables.keys().cloned().collect();
        let plan = PlanBuilder::new(&self.config).build(&request.required_fields, &initial_inputs);
        for warning in &plan.warnings {
            tracing::warn!(correlation_id = %correlation_id, %warning, "plan warning");
        }

        let executor = CallExecutor::new(
            self.client.clone(),
            self.breakers.clone(),
            self.cache.clone(),
            self.config.clone(),
        );
        let mode = request.mode.unwrap_or(self.config.execution.mode);
        let deadline_ms = request.deadline_ms.unwrap_or(self.config.execution.deadline_ms);
        let rules = request.rules.as_ref().or(self.config.rules.as_ref());

        let run = async {
            executor.execute(&plan, &mut ctx, mode).await;
            rules.map(|rules| RuleEvaluator::evaluate(rules, &ctx))
        };
        let outcome = tokio::time::timeout(Duration::from_millis(deadline_ms), run).await;

        match outcome {
            Ok(evaluation) => {
                // With no rules configured every request is included; the
                // caller is using the engine for extraction alone
                let should_include = evaluation.as_ref().map_or(true, |outcome| outcome.result);
                tracing::info!(
                    correlation_id = %correlation_id,
                    should_include,
                    api_calls = ctx.api_calls,
                    elapsed_ms = ctx.elapsed_ms(),
                    "extraction run complete"
                );
                Ok(self.assemble(&request, &ctx, evaluation, should_include, None))
            }
            Err(_) => {
                let reason = EngineError::EvaluationTimeout { deadline_ms }.to_string();
                tracing::warn!(
                    correlation_id = %correlation_id,
                    deadline_ms,
                    "extraction run exceeded deadline, returning degraded result"
                );
                Ok(self.assemble(&request, &ctx, None, false, Some(reason)))
            }
        }
    }

    /// Put the final result together from whatever the context holds
    fn assemble(
        &self,
        request: &ExtractionRequest,
        ctx: &ExecutionContext,
        evaluation: Option<RuleOutcome>,
        should_include: bool,
        failure_reason: Option<String>,
    ) -> ExtractionResult {
        // Source-scoped objects stay internal; the flat merged variables
        // are the caller-facing view
        let extracted_variables: HashMap<String, Value> = ctx
            .variables
            .iter()
            .filter(|(name, _)| {
                !ctx.source_status.contains_key(name.as_str()) && name.as_str() != "correlationId"
            })
            .map(|(name, value)| (name.clone(), value.clone()))
            .collect();

        let matching_criteria = request.matching_criteria.clone().map(|mut criteria| {
            for field in &request.required_fields {
                if let Some(value) = ctx.load_field(field) {
                    criteria.metadata.insert(field.clone(), value);
                }
            }
            criteria
        });

        let mut result = ExtractionResult::new(should_include)
            .with_variables(extracted_variables)
            .with_metrics(ExecutionMetrics {
                api_calls: ctx.api_calls,
                cache_hits: ctx.cache_hits,
                cache_misses: ctx.cache_misses,
                execution_time_ms: ctx.elapsed_ms(),
                sources_executed: ctx.sources_executed(),
                correlation_id: ctx.correlation_id.clone(),
            })
            .with_failed_sources(ctx.failed_sources());

        if let Some(evaluation) = evaluation {
            result = result.with_rule_evaluation(evaluation);
        }
        if let Some(criteria) = matching_criteria {
            result = result.with_matching_criteria(criteria);
        }
        if let Some(reason) = failure_reason {
            result = result.with_failure_reason(reason);
        }
        result
    }
}
