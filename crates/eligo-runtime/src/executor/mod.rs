//! Call execution
//!
//! Runs a built extraction plan against live data sources: placeholder
//! resolution, cache-aside reads, circuit-breaker gating, bounded retries
//! with backoff, per-call timeouts, conditional next-call chaining, and
//! field-level fallback sources. A failing source never aborts the run;
//! it degrades into configured defaults and a Failed status on the
//! context.

mod placeholder;

pub use placeholder::{has_unresolved, resolve_template, resolve_url};

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use eligo_core::Value;
use futures::future::BoxFuture;
use futures::stream::{self, StreamExt};

use crate::cache::ResponseCache;
use crate::config::{ExecutionMode, ExtractionConfig, FieldSourceConfig, NextCall, NextCallCheck};
use crate::context::{ExecutionContext, SourceStatus};
use crate::error::EngineError;
use crate::extract::FieldExtractor;
use crate::plan::{ApiCall, ExtractionPlan};
use crate::resilience::{backoff_delay, is_retryable_status, CircuitBreakerRegistry};
use crate::rules::values_equal;
use crate::service::HttpClient;

/// Everything one source attempt produced; merged into the context by a
/// single writer so parallel tasks never touch shared state directly
#[derive(Debug)]
struct CallOutcome {
    api_id: String,
    status: SourceStatus,
    values: HashMap<String, Value>,
    api_calls: u64,
    cache_hit: bool,
    cache_miss: bool,
}

impl CallOutcome {
    fn new(api_id: &str) -> Self {
        Self {
            api_id: api_id.to_string(),
            status: SourceStatus::Pending,
            values: HashMap::new(),
            api_calls: 0,
            cache_hit: false,
            cache_miss: false,
        }
    }

    fn success(mut self, values: HashMap<String, Value>) -> Self {
        self.status = SourceStatus::Success;
        self.values = values;
        self
    }

    fn failed(mut self, defaults: HashMap<String, Value>) -> Self {
        self.status = SourceStatus::Failed;
        self.values = defaults;
        self
    }
}

/// Executes planned calls against the configured data sources
pub struct CallExecutor {
    client: Arc<dyn HttpClient>,
    breakers: Arc<CircuitBreakerRegistry>,
    cache: Arc<Mutex<ResponseCache>>,
    config: Arc<ExtractionConfig>,
}

impl CallExecutor {
    pub fn new(
        client: Arc<dyn HttpClient>,
        breakers: Arc<CircuitBreakerRegistry>,
        cache: Arc<Mutex<ResponseCache>>,
        config: Arc<ExtractionConfig>,
    ) -> Self {
        Self {
            client,
            breakers,
            cache,
            config,
        }
    }

    /// Run the plan in the requested mode
    ///
    /// A parallel request is downgraded to sequential when any planned
    /// source declares dependencies, since parallel merging cannot see
    /// another call's output.
    pub async fn execute(
        &self,
        plan: &ExtractionPlan,
        ctx: &mut ExecutionContext,
        mode: ExecutionMode,
    ) {
        let sequential = match mode {
            ExecutionMode::Sequential => true,
            ExecutionMode::Auto => plan.has_dependencies(),
            ExecutionMode::Parallel => {
                if plan.has_dependencies() {
                    tracing::warn!(
                        "parallel mode requested but plan carries source dependencies, running sequentially"
                    );
                    true
                } else {
                    false
                }
            }
        };

        if sequential {
            self.execute_sequential(plan, ctx).await
        } else {
            self.execute_parallel(plan, ctx).await
        }
    }

    /// Process calls one at a time in plan order, merging after each call
    /// so later placeholder resolution sees earlier outputs
    pub async fn execute_sequential(&self, plan: &ExtractionPlan, ctx: &mut ExecutionContext) {
        for call in &plan.calls {
            if ctx.has_executed(&call.api_id) {
                continue;
            }

            let outcomes = self.run_call(call, ctx).await;
            let succeeded = outcomes
                .iter()
                .any(|o| o.api_id == call.api_id && o.status == SourceStatus::Success);
            for outcome in outcomes {
                Self::apply_outcome(outcome, ctx);
            }

            if succeeded && !call.source.next_calls.is_empty() {
                self.chain_next_calls(call.source.next_calls.clone(), ctx).await;
            }
        }
    }

    /// Launch all calls concurrently against a context snapshot and merge
    /// the outcomes afterwards in one place
    pub async fn execute_parallel(&self, plan: &ExtractionPlan, ctx: &mut ExecutionContext) {
        let snapshot = ctx.clone();
        let parallelism = self.config.execution.parallelism.max(1);

        let batches: Vec<Vec<CallOutcome>> = stream::iter(
            plan.calls
                .iter()
                .filter(|call| !snapshot.has_executed(&call.api_id))
                .map(|call| self.run_call(call, &snapshot)),
        )
        .buffer_unordered(parallelism)
        .collect()
        .await;

        for batch in batches {
            for outcome in batch {
                Self::apply_outcome(outcome, ctx);
            }
        }

        // Chained edges need the merged context, so they run after the
        // batch, in plan order
        for call in &plan.calls {
            let succeeded =
                matches!(ctx.source_status.get(&call.api_id), Some(SourceStatus::Success));
            if succeeded && !call.source.next_calls.is_empty() {
                self.chain_next_calls(call.source.next_calls.clone(), ctx).await;
            }
        }
    }

    /// Follow `nextCalls` edges whose condition holds against the freshly
    /// merged context
    ///
    /// Each target executes at most once per request, so chains always
    /// terminate even when edges form a loop.
    fn chain_next_calls<'a>(
        &'a self,
        edges: Vec<NextCall>,
        ctx: &'a mut ExecutionContext,
    ) -> BoxFuture<'a, ()> {
        Box::pin(async move {
            for edge in edges {
                if ctx.has_executed(&edge.target_data_source) {
                    continue;
                }
                if !Self::edge_applies(&edge, ctx) {
                    tracing::debug!(
                        target = %edge.target_data_source,
                        "next-call condition not met"
                    );
                    continue;
                }
                let Some(target) = ApiCall::for_source(&self.config, &edge.target_data_source)
                else {
                    tracing::warn!(
                        target = %edge.target_data_source,
                        "next-call target is not configured"
                    );
                    continue;
                };

                tracing::debug!(target = %target.api_id, "following next-call edge");
                let outcomes = self.run_call(&target, ctx).await;
                let succeeded = outcomes
                    .iter()
                    .any(|o| o.api_id == target.api_id && o.status == SourceStatus::Success);
                for outcome in outcomes {
                    Self::apply_outcome(outcome, ctx);
                }

                if succeeded && !target.source.next_calls.is_empty() {
                    self.chain_next_calls(target.source.next_calls.clone(), ctx).await;
                }
            }
        })
    }

    fn edge_applies(edge: &NextCall, ctx: &ExecutionContext) -> bool {
        let Some(condition) = &edge.condition else {
            return true;
        };

        let actual = ctx.load_field(&condition.field);
        match condition.check {
            NextCallCheck::NotNull => actual.is_some(),
            NextCallCheck::Equals => match (&actual, &condition.value) {
                (Some(actual), Some(expected)) => values_equal(actual, expected),
                _ => false,
            },
            NextCallCheck::GreaterThan => match (&actual, &condition.value) {
                (Some(actual), Some(expected)) => {
                    matches!((actual.as_f64(), expected.as_f64()), (Some(a), Some(e)) if a > e)
                }
                _ => false,
            },
        }
    }

    /// Attempt the source, then any field-level fallback sources when the
    /// primary fails
    async fn run_call(&self, call: &ApiCall, ctx: &ExecutionContext) -> Vec<CallOutcome> {
        let primary = self.attempt_source(call, ctx).await;
        if primary.status != SourceStatus::Failed {
            return vec![primary];
        }

        let mut outcomes = vec![primary];
        for fallback in self.fallback_calls(call) {
            if ctx.has_executed(&fallback.api_id) {
                continue;
            }
            tracing::info!(
                source = %call.api_id,
                fallback = %fallback.api_id,
                "primary source failed, trying fallback"
            );
            outcomes.push(self.attempt_source(&fallback, ctx).await);
        }
        outcomes
    }

    /// Group the call's fields by their declared `fallbackApi`
    fn fallback_calls(&self, call: &ApiCall) -> Vec<ApiCall> {
        let mut groups: BTreeMap<String, Vec<(String, FieldSourceConfig)>> = BTreeMap::new();
        for (name, field) in &call.field_sources {
            if let Some(fallback) = &field.fallback_api {
                groups
                    .entry(fallback.clone())
                    .or_default()
                    .push((name.clone(), field.clone()));
            }
        }

        let mut calls = Vec::new();
        for (fallback_id, field_sources) in groups {
            let Some(source) = self.config.source(&fallback_id) else {
                tracing::warn!(fallback = %fallback_id, "fallback source is not configured");
                continue;
            };
            calls.push(ApiCall {
                api_id: fallback_id,
                source: source.clone(),
                field_sources,
            });
        }
        calls
    }

    /// One full source attempt: placeholders, cache, breaker, retries,
    /// extraction
    async fn attempt_source(&self, call: &ApiCall, ctx: &ExecutionContext) -> CallOutcome {
        let mut outcome = CallOutcome::new(&call.api_id);
        let endpoint = &call.source.endpoint;

        let url = placeholder::resolve_url(&endpoint.url, ctx);
        let body = endpoint
            .body
            .as_ref()
            .map(|template| placeholder::resolve_template(template, ctx));
        if placeholder::has_unresolved(&url)
            || body.as_deref().is_some_and(placeholder::has_unresolved)
        {
            tracing::warn!(
                source = %call.api_id,
                url = %url,
                "unresolved placeholders remain, skipping call"
            );
            return outcome.failed(FieldExtractor::default_values(call));
        }

        let headers: HashMap<String, String> = endpoint
            .headers
            .iter()
            .map(|(name, template)| (name.clone(), placeholder::resolve_template(template, ctx)))
            .collect();
        for (name, value) in &headers {
            if placeholder::has_unresolved(value) {
                tracing::warn!(source = %call.api_id, header = %name, "header placeholder did not resolve");
            }
        }

        let cache_cfg = call.source.cache.as_ref().filter(|cache| cache.enabled);
        let cache_key = cache_cfg.map(|cache| match &cache.key_pattern {
            Some(pattern) => placeholder::resolve_template(pattern, ctx),
            None => url.clone(),
        });

        if let Some(key) = &cache_key {
            let cached = self.cache.lock().unwrap().get(key);
            match cached {
                Some(raw) => {
                    tracing::debug!(source = %call.api_id, "cache hit, skipping network call");
                    outcome.cache_hit = true;
                    return match FieldExtractor::extract(call, &raw) {
                        Ok(values) => outcome.success(values),
                        Err(err) => {
                            tracing::warn!(source = %call.api_id, error = %err, "cached response failed validation");
                            outcome.failed(FieldExtractor::default_values(call))
                        }
                    };
                }
                None => outcome.cache_miss = true,
            }
        }

        let breaker = self.breakers.breaker(&call.api_id);
        if !breaker.allow_request() {
            tracing::warn!(source = %call.api_id, "circuit open, skipping call");
            return outcome.failed(FieldExtractor::default_values(call));
        }

        let policy = call.source.retry_policy.clone().unwrap_or_default();
        let timeout = Duration::from_millis(endpoint.timeout_ms);
        let max_attempts = policy.max_attempts.max(1);
        let mut response = None;
        let mut failure_reason = String::new();

        for attempt in 1..=max_attempts {
            let request = self.client.request(
                endpoint.method,
                url.clone(),
                headers.clone(),
                body.clone(),
                timeout,
            );

            let (retryable, reason) = match tokio::time::timeout(timeout, request).await {
                Ok(Ok(resp)) if resp.is_success() => {
                    response = Some(resp);
                    break;
                }
                Ok(Ok(resp)) => (
                    is_retryable_status(&policy, resp.status),
                    format!("status {}", resp.status),
                ),
                // Connection errors and client-side timeouts always retry
                Ok(Err(err)) => (true, err.to_string()),
                Err(_) => (true, format!("timed out after {}ms", timeout.as_millis())),
            };

            failure_reason = reason;
            if retryable && attempt < max_attempts {
                let delay = backoff_delay(&policy, attempt);
                tracing::debug!(
                    source = %call.api_id,
                    attempt,
                    delay_ms = delay.as_millis() as u64,
                    reason = %failure_reason,
                    "retrying call"
                );
                tokio::time::sleep(delay).await;
            } else {
                break;
            }
        }

        let Some(response) = response else {
            breaker.record_failure();
            let failure = EngineError::CallFailure {
                source_id: call.api_id.clone(),
                reason: failure_reason,
            };
            tracing::warn!(error = %failure, "call failed, merging defaults");
            return outcome.failed(FieldExtractor::default_values(call));
        };

        let raw = match response.json() {
            Ok(raw) => raw,
            Err(err) => {
                breaker.record_failure();
                tracing::warn!(source = %call.api_id, error = %err, "unparseable response body");
                return outcome.failed(FieldExtractor::default_values(call));
            }
        };

        breaker.record_success();
        outcome.api_calls += 1;

        if let (Some(cache), Some(key)) = (cache_cfg, cache_key) {
            self.cache
                .lock()
                .unwrap()
                .set(key, raw.clone(), Duration::from_secs(cache.ttl));
        }

        match FieldExtractor::extract(call, &raw) {
            Ok(values) => outcome.success(values),
            Err(err) => {
                tracing::warn!(source = %call.api_id, error = %err, "extracted data failed validation");
                outcome.failed(FieldExtractor::default_values(call))
            }
        }
    }

    /// Merge one outcome into the context; the single mutation point for
    /// both execution modes
    fn apply_outcome(outcome: CallOutcome, ctx: &mut ExecutionContext) {
        ctx.api_calls += outcome.api_calls;
        if outcome.cache_hit {
            ctx.record_cache_hit();
        }
        if outcome.cache_miss {
            ctx.record_cache_miss();
        }

        ctx.store_source_result(&outcome.api_id, outcome.values.clone());
        ctx.merge_variables(outcome.values);
        ctx.mark_status(&outcome.api_id, outcome.status);
    }
}
