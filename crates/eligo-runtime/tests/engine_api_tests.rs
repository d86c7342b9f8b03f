//! End-to-end engine tests over real HTTP
//!
//! These tests use mockito to mock data-source API responses and drive
//! the engine through the reqwest-backed client.

use eligo_core::Value;
use eligo_runtime::{ExtractionConfig, ExtractionEngine, ExtractionRequest};
use mockito::{Mock, Server};

fn tier_config(base_url: &str) -> ExtractionConfig {
    let yaml = format!(
        r#"
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
          value: GOLD
        - min: 5000
          max: 9999.99
          value: SILVER
        - max: 4999.99
          value: STANDARD
dataSources:
  - id: accountApi
    endpoint:
      url: "{base_url}/accounts/${{accountId}}"
      timeoutMs: 1000
      headers:
        X-Channel: web
    retryPolicy:
      maxAttempts: 1
    providesFields: [balanceTier]
rules:
  combinator: AND
  conditions:
    - field: balanceTier
      operator: equals
      value: GOLD
execution:
  mode: sequential
  deadlineMs: 5000
"#
    );
    ExtractionConfig::from_yaml(&yaml).expect("config should parse")
}

fn mock_account(server: &mut Server, account_id: &str, body: &str) -> Mock {
    server
        .mock("GET", format!("/accounts/{account_id}").as_str())
        .match_header("X-Channel", "web")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(body)
        .create()
}

fn account_request(account_id: &str) -> ExtractionRequest {
    ExtractionRequest::new(vec!["balanceTier".to_string()])
        .with_variable("accountId", Value::String(account_id.to_string()))
}

#[tokio::test]
async fn test_engine_includes_gold_account_over_http() {
    let mut server = Server::new_async().await;
    let mock = mock_account(&mut server, "A1", r#"{"balance": 12000}"#);

    let engine = ExtractionEngine::new(tier_config(&server.url()));
    let result = engine
        .run(account_request("A1"))
        .await
        .expect("run should succeed");

    mock.assert();
    assert!(result.should_include);
    assert_eq!(
        result.extracted_variables.get("balanceTier"),
        Some(&Value::String("GOLD".to_string()))
    );
    assert_eq!(result.metrics.api_calls, 1);
    assert!(result.failed_sources.is_empty());
}

#[tokio::test]
async fn test_engine_falls_back_to_default_on_server_error() {
    let mut server = Server::new_async().await;
    let _m = server
        .mock("GET", "/accounts/A2")
        .with_status(500)
        .with_body("internal error")
        .create();

    let engine = ExtractionEngine::new(tier_config(&server.url()));
    let result = engine
        .run(account_request("A2"))
        .await
        .expect("run should succeed");

    // The default tier never matches the GOLD rule
    assert!(!result.should_include);
    assert_eq!(
        result.extracted_variables.get("balanceTier"),
        Some(&Value::String("STANDARD".to_string()))
    );
    assert_eq!(result.failed_sources, vec!["accountApi".to_string()]);
    assert_eq!(result.metrics.api_calls, 0);
}

#[tokio::test]
async fn test_engine_follows_next_call_chain_over_http() {
    let mut server = Server::new_async().await;
    let base_url = server.url();

    let disclosure_mock = server
        .mock("GET", "/disclosures/A3")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"code": "D42"}"#)
        .create();
    let product_mock = server
        .mock("GET", "/products/D42")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"name": "Premium"}"#)
        .create();

    let yaml = format!(
        r#"
fields:
  disclosureCode:
    sourceApi: disclosureApi
    extractionPath: "$.code"
    requiredInputs: [accountId]
  productName:
    sourceApi: productApi
    extractionPath: "$.name"
dataSources:
  - id: disclosureApi
    endpoint:
      url: "{base_url}/disclosures/${{accountId}}"
    providesFields: [disclosureCode]
    nextCalls:
      - targetDataSource: productApi
        condition:
          field: disclosureCode
          check: notNull
  - id: productApi
    endpoint:
      url: "{base_url}/products/${{disclosureCode}}"
    providesFields: [productName]
"#
    );
    let engine = ExtractionEngine::new(ExtractionConfig::from_yaml(&yaml).expect("config"));

    let request = ExtractionRequest::new(vec!["disclosureCode".to_string()])
        .with_variable("accountId", Value::String("A3".to_string()));
    let result = engine.run(request).await.expect("run should succeed");

    disclosure_mock.assert();
    product_mock.assert();
    assert_eq!(
        result.extracted_variables.get("productName"),
        Some(&Value::String("Premium".to_string()))
    );
    assert_eq!(result.metrics.api_calls, 2);
    assert_eq!(result.metrics.sources_executed, 2);
}

#[tokio::test]
async fn test_engine_reads_second_request_from_cache() {
    let mut server = Server::new_async().await;
    let base_url = server.url();

    // Expect exactly one upstream hit across two runs
    let mock = server
        .mock("GET", "/profiles/A4")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"segment": "retail"}"#)
        .expect(1)
        .create();

    let yaml = format!(
        r#"
fields:
  customerSegment:
    sourceApi: profileApi
    extractionPath: "$.segment"
    requiredInputs: [accountId]
dataSources:
  - id: profileApi
    endpoint:
      url: "{base_url}/profiles/${{accountId}}"
    cache:
      enabled: true
      ttl: 120
      keyPattern: "profile:${{accountId}}"
    providesFields: [customerSegment]
"#
    );
    let engine = ExtractionEngine::new(ExtractionConfig::from_yaml(&yaml).expect("config"));

    let request = ExtractionRequest::new(vec!["customerSegment".to_string()])
        .with_variable("accountId", Value::String("A4".to_string()));

    let first = engine.run(request.clone()).await.expect("first run");
    let second = engine.run(request).await.expect("second run");

    mock.assert();
    assert_eq!(first.metrics.cache_misses, 1);
    assert_eq!(second.metrics.cache_hits, 1);
    assert_eq!(
        second.extracted_variables.get("customerSegment"),
        Some(&Value::String("retail".to_string()))
    );
}
