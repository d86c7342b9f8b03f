//! Eligibility rules example
//!
//! This example demonstrates:
//! - Driving the same configuration with different accounts
//! - How failed sources degrade into defaults instead of errors
//! - Reading the per-condition diagnostic trail

use std::sync::Arc;

use eligo_runtime::{
    ExtractionConfig, ExtractionEngine, ExtractionRequest, MockHttpClient, Value,
};

const CONFIG: &str = r#"
fields:
  accountStatus:
    sourceApi: accountApi
    extractionPath: "$.status"
    requiredInputs: [accountId]
    defaultValue: UNKNOWN
  balanceTier:
    sourceApi: accountApi
    extractionPath: "$.balance"
    requiredInputs: [accountId]
    defaultValue: STANDARD
    transform:
      type: tierClassification
      mappings:
        - min: 10000
          value: GOLD
        - min: 5000
          max: 9999.99
          value: SILVER
        - max: 4999.99
          value: STANDARD
dataSources:
  - id: accountApi
    endpoint:
      url: "https://accounts.internal/v2/accounts/${accountId}"
      timeoutMs: 1000
    retryPolicy:
      maxAttempts: 2
      initialDelayMs: 50
    providesFields: [accountStatus, balanceTier]
rules:
  combinator: AND
  conditions:
    - field: accountStatus
      operator: equals
      value: ACTIVE
    - field: balanceTier
      operator: in
      value: [GOLD, SILVER]
execution:
  deadlineMs: 5000
"#;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing_subscriber::filter::LevelFilter::INFO.into()),
        )
        .init();

    println!("=== Eligibility Rules Example ===\n");

    // ACC-GOLD resolves normally; ACC-DOWN hits a failing upstream and
    // falls back to the configured defaults
    let client = MockHttpClient::new()
        .with_json(
            "/accounts/ACC-GOLD",
            r#"{"status": "ACTIVE", "balance": 15000}"#,
        )
        .with_status("/accounts/ACC-DOWN", 500, "upstream unavailable");

    let config = ExtractionConfig::from_yaml(CONFIG)?;
    let engine = ExtractionEngine::new(config).with_client(Arc::new(client));

    for account_id in ["ACC-GOLD", "ACC-DOWN"] {
        let request = ExtractionRequest::new(vec![
            "accountStatus".to_string(),
            "balanceTier".to_string(),
        ])
        .with_variable("accountId", Value::String(account_id.to_string()));

        let result = engine.run(request).await?;

        println!("Account {}:", account_id);
        println!("  Should include: {}", result.should_include);
        println!(
            "  Status: {}, Tier: {}",
            result
                .extracted_variables
                .get("accountStatus")
                .map(Value::to_display_string)
                .unwrap_or_default(),
            result
                .extracted_variables
                .get("balanceTier")
                .map(Value::to_display_string)
                .unwrap_or_default(),
        );
        if !result.failed_sources.is_empty() {
            println!("  Failed sources: {:?}", result.failed_sources);
        }
        if let Some(evaluation) = &result.rule_evaluation {
            for check in &evaluation.matched_conditions {
                println!("    {} {} -> {}", check.field, check.operator, check.result);
            }
        }
        println!();
    }

    Ok(())
}
