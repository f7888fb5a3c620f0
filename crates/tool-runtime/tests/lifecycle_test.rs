//! Integration tests for the full tool execution lifecycle.

use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tool_runtime::{
    HttpTransport, RateLimit, RateLimiter, RequestOptions, Tool, ToolDescriptor, ToolError,
    ToolExecutor, MOCK_MODE_VAR,
};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Minimal tool that fetches one JSON document over the transport.
struct FetchWidget {
    base_url: String,
    mock: Option<bool>,
    process_calls: Arc<AtomicUsize>,
}

impl FetchWidget {
    fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            mock: Some(false),
            process_calls: Arc::new(AtomicUsize::new(0)),
        }
    }
}

#[async_trait]
impl Tool for FetchWidget {
    fn name(&self) -> &str {
        "t"
    }

    fn descriptor(&self) -> ToolDescriptor {
        ToolDescriptor {
            name: "t".into(),
            description: "fetch one widget".into(),
            parameters: json!({"type": "object", "properties": {}}),
            rate_limit_type: "x".into(),
            rate_limit_cost: 1,
        }
    }

    fn rate_limit_type(&self) -> &str {
        "x"
    }

    fn validate_parameters(&self) -> Result<(), ToolError> {
        Ok(())
    }

    fn should_use_mock(&self) -> bool {
        match self.mock {
            Some(mock) => mock,
            None => tool_runtime::mock_mode_enabled(),
        }
    }

    fn mock_output(&self) -> Value {
        json!({"a": 1})
    }

    async fn process(&self) -> Result<Value, ToolError> {
        self.process_calls.fetch_add(1, Ordering::SeqCst);
        let url = format!("{}/widget", self.base_url);
        let response = HttpTransport::shared().get(&url, RequestOptions::new()).await?;
        let body: Value = response.json().await?;
        Ok(body)
    }
}

fn executor(threshold: u32) -> ToolExecutor {
    ToolExecutor::new(Arc::new(
        RateLimiter::new(RateLimit::default())
            .with_limit("x", RateLimit::new(threshold, Duration::from_secs(60))),
    ))
}

#[tokio::test]
async fn test_success_then_rate_limited() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/widget"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"a": 1})))
        .expect(1)
        .mount(&server)
        .await;

    let executor = executor(1);
    let tool = FetchWidget::new(server.uri());

    let response = executor.execute(&tool).await;
    assert_eq!(
        serde_json::to_value(&response).unwrap(),
        json!({
            "success": true,
            "result": {"a": 1},
            "metadata": {"tool_name": "t"}
        })
    );

    let response = executor.execute(&tool).await;
    let error = response.error().unwrap();
    assert_eq!(error.error_code, "RATE_LIMIT");
    assert_eq!(error.retry_after, Some(60));
    assert_eq!(tool.process_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_mock_mode_makes_no_network_calls() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/widget"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let mut tool = FetchWidget::new(server.uri());
    tool.mock = Some(true);

    let response = executor(10).execute(&tool).await;
    assert!(response.is_success());
    assert_eq!(response.result().unwrap(), &json!({"a": 1}));
    assert_eq!(tool.process_calls.load(Ordering::SeqCst), 0);
    assert!(server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_env_toggle_enables_mock_mode() {
    let mut tool = FetchWidget::new("http://127.0.0.1:9");
    tool.mock = None;

    std::env::set_var(MOCK_MODE_VAR, "true");
    let response = executor(10).execute(&tool).await;
    std::env::remove_var(MOCK_MODE_VAR);

    assert!(response.is_success());
    assert_eq!(tool.process_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_transport_failures_arrive_enveloped() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/widget"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;

    let tool = FetchWidget::new(server.uri());
    let response = executor(10).execute(&tool).await;

    let error = response.error().unwrap();
    assert_eq!(error.error_code, "API_ERROR");
    assert_eq!(error.tool_name.as_deref(), Some("t"));
    assert_eq!(error.details["attempts"], 1);
}
