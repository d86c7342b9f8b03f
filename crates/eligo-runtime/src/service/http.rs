//! HTTP client trait and implementations

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use eligo_core::Value;

use crate::config::HttpMethod;
use crate::error::{EngineError, Result};

/// Raw response from a data-source endpoint
///
/// The executor needs the status code to classify retryable failures, so
/// non-2xx responses come back as `Ok` here and are handled upstream.
#[derive(Debug, Clone)]
pub struct ApiResponse {
    pub status: u16,
    pub body: String,
}

impl ApiResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    /// Whether the status is in the 2xx range
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Parse the body as JSON
    pub fn json(&self) -> Result<Value> {
        let json: serde_json::Value = serde_json::from_str(&self.body)
            .map_err(|e| EngineError::ExternalCallFailed(format!("invalid JSON body: {}", e)))?;
        Ok(Value::from_json(json))
    }
}

/// HTTP client trait
#[async_trait]
pub trait HttpClient: Send + Sync {
    /// Make an HTTP request
    ///
    /// `Err` means the call never produced a status line (connection
    /// refused, DNS failure, client-side timeout).
    async fn request(
        &self,
        method: HttpMethod,
        url: String,
        headers: HashMap<String, String>,
        body: Option<String>,
        timeout: Duration,
    ) -> Result<ApiResponse>;
}

/// Production client backed by reqwest
pub struct ReqwestHttpClient {
    client: reqwest::Client,
}

impl ReqwestHttpClient {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }
}

impl Default for ReqwestHttpClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl HttpClient for ReqwestHttpClient {
    async fn request(
        &self,
        method: HttpMethod,
        url: String,
        headers: HashMap<String, String>,
        body: Option<String>,
        timeout: Duration,
    ) -> Result<ApiResponse> {
        let mut request = match method {
            HttpMethod::GET => self.client.get(&url),
            HttpMethod::POST => self.client.post(&url),
            HttpMethod::PUT => self.client.put(&url),
            HttpMethod::DELETE => self.client.delete(&url),
            HttpMethod::PATCH => self.client.patch(&url),
        };

        request = request.timeout(timeout);
        for (name, value) in &headers {
            request = request.header(name, value);
        }
        if let Some(body) = body {
            request = request.body(body);
        }

        let response = request
            .send()
            .await
            .map_err(|e| EngineError::ExternalCallFailed(format!("HTTP request failed: {}", e)))?;

        let status = response.status().as_u16();
        let body = response.text().await.map_err(|e| {
            EngineError::ExternalCallFailed(format!("failed to read response body: {}", e))
        })?;

        Ok(ApiResponse::new(status, body))
    }
}

enum MockOutcome {
    Respond(ApiResponse),
    Fail(String),
    Delay(Duration, ApiResponse),
}

/// Programmable mock client for tests
///
/// Outcomes are keyed by a URL fragment and consumed in order; the last
/// queued outcome for a fragment repeats once the queue drains.
pub struct MockHttpClient {
    outcomes: Mutex<Vec<(String, Vec<MockOutcome>)>>,
    calls: Mutex<Vec<String>>,
}

impl MockHttpClient {
    pub fn new() -> Self {
        Self {
            outcomes: Mutex::new(Vec::new()),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Queue a 200 response with a JSON body
    pub fn with_json(self, url_part: &str, body: &str) -> Self {
        self.push(url_part, MockOutcome::Respond(ApiResponse::new(200, body)));
        self
    }

    /// Queue an arbitrary status response
    pub fn with_status(self, url_part: &str, status: u16, body: &str) -> Self {
        self.push(url_part, MockOutcome::Respond(ApiResponse::new(status, body)));
        self
    }

    /// Queue a transport-level failure
    pub fn with_transport_error(self, url_part: &str, message: &str) -> Self {
        self.push(url_part, MockOutcome::Fail(message.to_string()));
        self
    }

    /// Queue a response that arrives only after a delay
    pub fn with_delayed_json(self, url_part: &str, delay: Duration, body: &str) -> Self {
        self.push(
            url_part,
            MockOutcome::Delay(delay, ApiResponse::new(200, body)),
        );
        self
    }

    fn push(&self, url_part: &str, outcome: MockOutcome) {
        let mut outcomes = self.outcomes.lock().unwrap();
        if let Some((_, queue)) = outcomes.iter_mut().find(|(part, _)| part == url_part) {
            queue.push(outcome);
        } else {
            outcomes.push((url_part.to_string(), vec![outcome]));
        }
    }

    /// URLs requested, in order
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    /// How many requests matched a URL fragment
    pub fn call_count(&self, url_part: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|url| url.contains(url_part))
            .count()
    }

    fn next_outcome(&self, url: &str) -> Option<MockOutcome> {
        let mut outcomes = self.outcomes.lock().unwrap();
        let (_, queue) = outcomes.iter_mut().find(|(part, _)| url.contains(part.as_str()))?;
        if queue.len() > 1 {
            Some(queue.remove(0))
        } else {
            // Keep replaying the final outcome
            queue.first().map(|outcome| match outcome {
                MockOutcome::Respond(resp) => MockOutcome::Respond(resp.clone()),
                MockOutcome::Fail(msg) => MockOutcome::Fail(msg.clone()),
                MockOutcome::Delay(d, resp) => MockOutcome::Delay(*d, resp.clone()),
            })
        }
    }
}

impl Default for MockHttpClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl HttpClient for MockHttpClient {
    async fn request(
        &self,
        _method: HttpMethod,
        url: String,
        _headers: HashMap<String, String>,
        _body: Option<String>,
        _timeout: Duration,
    ) -> Result<ApiResponse> {
        self.calls.lock().unwrap().push(url.clone());

        match self.next_outcome(&url) {
            Some(MockOutcome::Respond(response)) => Ok(response),
            Some(MockOutcome::Fail(message)) => Err(EngineError::ExternalCallFailed(message)),
            Some(MockOutcome::Delay(delay, response)) => {
                tokio::time::sleep(delay).await;
                Ok(response)
            }
            None => Err(EngineError::ExternalCallFailed(format!(
                "no mock response registered for {}",
                url
            ))),
        }
    }
}
