//! Simple extraction example
//!
//! This example demonstrates:
//! - Loading an extraction configuration from YAML
//! - Running one request through the ExtractionEngine
//! - Reading extracted variables, rule evaluation, and metrics

use std::sync::Arc;

use eligo_runtime::{
    ExtractionConfig, ExtractionEngine, ExtractionRequest, MockHttpClient, Value,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("=== Simple Extraction Example ===\n");

    let config = ExtractionConfig::from_yaml_file("demos/configs/account_extraction.yaml")?;
    println!(
        "Loaded configuration: {} fields, {} data sources\n",
        config.fields.len(),
        config.data_sources.len()
    );

    // A mock transport stands in for the account services so the example
    // runs offline
    let client = MockHttpClient::new()
        .with_json(
            "accounts.internal",
            r#"{"account": {"balance": 12400, "status": "ACTIVE"}}"#,
        )
        .with_json(
            "disclosures.internal",
            r#"{"disclosures": [{"code": "D42"}]}"#,
        )
        .with_json("products.internal", r#"{"name": "Premium Checking"}"#);

    let engine = ExtractionEngine::new(config).with_client(Arc::new(client));

    let request = ExtractionRequest::new(vec![
        "balanceTier".to_string(),
        "accountStatus".to_string(),
        "productName".to_string(),
    ])
    .with_variable("accountId", Value::String("ACC-1001".to_string()))
    .with_correlation_id("demo-001");

    let result = engine.run(request).await?;

    println!("Extraction Results:");
    println!("  Should include: {}", result.should_include);
    for (name, value) in &result.extracted_variables {
        println!("  {}: {}", name, value.to_display_string());
    }

    if let Some(evaluation) = &result.rule_evaluation {
        println!("\nRule Trail:");
        for check in &evaluation.matched_conditions {
            println!(
                "  {} {} -> {}",
                check.field, check.operator, check.result
            );
        }
    }

    println!("\nMetrics:");
    println!("  API calls: {}", result.metrics.api_calls);
    println!("  Cache hits: {}", result.metrics.cache_hits);
    println!("  Sources executed: {}", result.metrics.sources_executed);
    println!("  Execution time: {}ms", result.metrics.execution_time_ms);

    Ok(())
}
