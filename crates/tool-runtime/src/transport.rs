//! Process-wide HTTP transport: pooled connections, bounded retry, typed
//! failure mapping. The only place in the system that talks to the network.

use crate::error::ToolError;
use reqwest::{Client, Method, StatusCode};
use serde_json::Value;
use std::sync::OnceLock;
use std::time::{Duration, Instant};
use tokio::time::sleep;
use tracing::{debug, warn};

const POOL_MAX_IDLE: usize = 10;
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
const MAX_ATTEMPTS: u32 = 3;
const INITIAL_BACKOFF: Duration = Duration::from_millis(500);
const RETRYABLE_STATUSES: [u16; 4] = [500, 502, 503, 504];
const RETRYABLE_METHODS: [Method; 7] = [
    Method::HEAD,
    Method::GET,
    Method::PUT,
    Method::DELETE,
    Method::OPTIONS,
    Method::TRACE,
    Method::POST,
];

static SHARED: OnceLock<HttpTransport> = OnceLock::new();

/// Per-call request options.
#[derive(Debug, Clone, Default)]
pub struct RequestOptions {
    query: Vec<(String, String)>,
    headers: Vec<(String, String)>,
    body: Option<Value>,
    timeout: Option<Duration>,
}

impl RequestOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn with_json(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    /// Override the transport's default per-call timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

/// Pooled HTTP client with a fixed retry policy.
///
/// One instance serves the whole process; it is safe for concurrent use and
/// never torn down during normal operation.
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    /// The shared process-wide transport. The first caller constructs it;
    /// every later call returns the same instance.
    pub fn shared() -> &'static HttpTransport {
        SHARED.get_or_init(HttpTransport::new)
    }

    /// Build a standalone transport with the standard policy.
    pub fn new() -> Self {
        let client = Client::builder()
            .pool_max_idle_per_host(POOL_MAX_IDLE)
            .timeout(DEFAULT_TIMEOUT)
            .build()
            .expect("failed to initialize HTTP client");
        Self { client }
    }

    pub async fn get(&self, url: &str, options: RequestOptions) -> Result<reqwest::Response, ToolError> {
        self.request(Method::GET, url, options).await
    }

    pub async fn post(&self, url: &str, options: RequestOptions) -> Result<reqwest::Response, ToolError> {
        self.request(Method::POST, url, options).await
    }

    pub async fn put(&self, url: &str, options: RequestOptions) -> Result<reqwest::Response, ToolError> {
        self.request(Method::PUT, url, options).await
    }

    pub async fn delete(&self, url: &str, options: RequestOptions) -> Result<reqwest::Response, ToolError> {
        self.request(Method::DELETE, url, options).await
    }

    /// Send one logical request, retrying transient failures per the fixed
    /// policy. Callers only ever see the final outcome.
    async fn request(
        &self,
        method: Method,
        url: &str,
        options: RequestOptions,
    ) -> Result<reqwest::Response, ToolError> {
        let retryable_method = RETRYABLE_METHODS.contains(&method);
        let started = Instant::now();
        let mut backoff = INITIAL_BACKOFF;
        let mut attempt = 0u32;

        debug!(method = %method, url = %url, query = ?options.query, "sending request");

        loop {
            attempt += 1;
            if attempt > 1 {
                debug!(method = %method, url = %url, attempt, backoff_ms = backoff.as_millis() as u64, "retrying");
                sleep(backoff).await;
                backoff *= 2;
            }

            let response = match self.build(method.clone(), url, &options).send().await {
                Ok(response) => response,
                Err(err) => {
                    let transient = err.is_timeout() || err.is_connect();
                    if transient && retryable_method && attempt < MAX_ATTEMPTS {
                        warn!(method = %method, url = %url, attempt, error = %err, "request failed, will retry");
                        continue;
                    }
                    return Err(transport_error(&method, url, attempt, &err.to_string(), None));
                }
            };

            let status = response.status();
            if status.is_success() {
                debug!(
                    method = %method,
                    url = %url,
                    status = status.as_u16(),
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "request completed"
                );
                return Ok(response);
            }

            if RETRYABLE_STATUSES.contains(&status.as_u16()) && retryable_method && attempt < MAX_ATTEMPTS {
                warn!(method = %method, url = %url, status = status.as_u16(), attempt, "retryable status, will retry");
                continue;
            }

            let body = response.text().await.unwrap_or_default();
            let cause = if body.is_empty() {
                format!("HTTP {}", status.as_u16())
            } else {
                let snippet: String = body.chars().take(200).collect();
                format!("HTTP {}: {}", status.as_u16(), snippet)
            };
            return Err(transport_error(&method, url, attempt, &cause, Some(status)));
        }
    }

    fn build(&self, method: Method, url: &str, options: &RequestOptions) -> reqwest::RequestBuilder {
        let mut builder = self.client.request(method, url);
        if !options.query.is_empty() {
            builder = builder.query(&options.query);
        }
        for (name, value) in &options.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = &options.body {
            builder = builder.json(body);
        }
        if let Some(timeout) = options.timeout {
            builder = builder.timeout(timeout);
        }
        builder
    }
}

impl Default for HttpTransport {
    fn default() -> Self {
        Self::new()
    }
}

fn transport_error(
    method: &Method,
    url: &str,
    attempts: u32,
    cause: &str,
    status: Option<StatusCode>,
) -> ToolError {
    let mut err = ToolError::api(format!("{} {} failed: {}", method, url, cause))
        .with_detail("attempts", attempts);
    if let Some(status) = status {
        err = err.with_detail("status", status.as_u16());
    }
    err
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use serde_json::json;
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_retries_transient_server_errors() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/flaky"))
            .respond_with(ResponseTemplate::new(503))
            .up_to_n_times(2)
            .expect(2)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/flaky"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true})))
            .expect(1)
            .mount(&server)
            .await;

        let transport = HttpTransport::new();
        let response = transport
            .get(&format!("{}/flaky", server.uri()), RequestOptions::new())
            .await
            .unwrap();

        assert_eq!(response.status(), 200);
        assert_eq!(server.received_requests().await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_retries_exhausted_surface_api_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/down"))
            .respond_with(ResponseTemplate::new(503))
            .expect(3)
            .mount(&server)
            .await;

        let transport = HttpTransport::new();
        let url = format!("{}/down", server.uri());
        let err = transport.get(&url, RequestOptions::new()).await.unwrap_err();

        assert_eq!(err.code, ErrorCode::ApiError);
        assert_eq!(err.details["attempts"], 3);
        assert_eq!(err.details["status"], 503);
        assert!(err.message.contains("GET"));
        assert!(err.message.contains(&url));
        assert_eq!(server.received_requests().await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_non_retryable_status_fails_on_first_attempt() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/missing"))
            .respond_with(ResponseTemplate::new(404))
            .expect(1)
            .mount(&server)
            .await;

        let transport = HttpTransport::new();
        let err = transport
            .get(&format!("{}/missing", server.uri()), RequestOptions::new())
            .await
            .unwrap_err();

        assert_eq!(err.code, ErrorCode::ApiError);
        assert_eq!(err.details["attempts"], 1);
        assert_eq!(server.received_requests().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_post_is_retried() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/submit"))
            .and(body_json(json!({"k": "v"})))
            .respond_with(ResponseTemplate::new(502))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/submit"))
            .respond_with(ResponseTemplate::new(201))
            .expect(1)
            .mount(&server)
            .await;

        let transport = HttpTransport::new();
        let response = transport
            .post(
                &format!("{}/submit", server.uri()),
                RequestOptions::new().with_json(json!({"k": "v"})),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), 201);
        assert_eq!(server.received_requests().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_timeout_is_retried_then_surfaced() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/slow"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_millis(300)))
            .expect(3)
            .mount(&server)
            .await;

        let transport = HttpTransport::new();
        let err = transport
            .get(
                &format!("{}/slow", server.uri()),
                RequestOptions::new().with_timeout(Duration::from_millis(50)),
            )
            .await
            .unwrap_err();

        assert_eq!(err.code, ErrorCode::ApiError);
        assert_eq!(err.details["attempts"], 3);
        assert_eq!(server.received_requests().await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_query_and_headers_are_applied() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/search"))
            .and(wiremock::matchers::query_param("q", "rust"))
            .and(wiremock::matchers::header("X-Api-Key", "k1"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let transport = HttpTransport::new();
        let response = transport
            .get(
                &format!("{}/search", server.uri()),
                RequestOptions::new()
                    .with_query("q", "rust")
                    .with_header("X-Api-Key", "k1"),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), 200);
    }

    #[test]
    fn test_shared_returns_same_instance() {
        let a = HttpTransport::shared() as *const HttpTransport;
        let b = HttpTransport::shared() as *const HttpTransport;
        assert_eq!(a, b);
    }
}
