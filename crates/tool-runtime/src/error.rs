//! Typed failure taxonomy shared by every tool invocation.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

/// Closed set of machine-readable failure kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// Bad input, never retry.
    ValidationError,
    /// Generic upstream failure.
    ApiError,
    /// Admission rejected; `retry_after` is always set.
    RateLimit,
    /// Credential or permission failure, never retry.
    AuthError,
    /// Operation exceeded its budget, retryable.
    Timeout,
    /// Resource absent, never retry.
    NotFound,
    /// Missing or invalid environment configuration, never retry.
    ConfigError,
    /// Usage ceiling reached, retryable after reset.
    QuotaExceeded,
    /// Policy or safety violation, never retry.
    SecurityError,
    /// Content-processing failure, retryable.
    MediaError,
    /// Default, unclassified.
    ToolError,
    /// Failure outside the tool's own logic.
    UnexpectedError,
}

impl ErrorCode {
    /// Canonical wire string for this code.
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::ValidationError => "VALIDATION_ERROR",
            ErrorCode::ApiError => "API_ERROR",
            ErrorCode::RateLimit => "RATE_LIMIT",
            ErrorCode::AuthError => "AUTH_ERROR",
            ErrorCode::Timeout => "TIMEOUT",
            ErrorCode::NotFound => "NOT_FOUND",
            ErrorCode::ConfigError => "CONFIG_ERROR",
            ErrorCode::QuotaExceeded => "QUOTA_EXCEEDED",
            ErrorCode::SecurityError => "SECURITY_ERROR",
            ErrorCode::MediaError => "MEDIA_ERROR",
            ErrorCode::ToolError => "TOOL_ERROR",
            ErrorCode::UnexpectedError => "UNEXPECTED_ERROR",
        }
    }

    /// Whether a caller may retry after seeing this code.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ErrorCode::RateLimit
                | ErrorCode::Timeout
                | ErrorCode::QuotaExceeded
                | ErrorCode::MediaError
        )
    }
}

impl Default for ErrorCode {
    fn default() -> Self {
        ErrorCode::ToolError
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single classified failure.
///
/// Created at the point a failure is detected and immediately converted to
/// an [`ErrorEnvelope`]; never persisted. The timestamp is fixed at
/// construction so serialization is idempotent.
#[derive(Debug, Clone, Error)]
#[error("{}", self.describe())]
pub struct ToolError {
    pub message: String,
    pub tool_name: Option<String>,
    pub code: ErrorCode,
    pub details: Map<String, Value>,
    pub retry_after: Option<u64>,
    pub timestamp: DateTime<Utc>,
}

impl ToolError {
    /// Create an unclassified error (`TOOL_ERROR`).
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            tool_name: None,
            code: ErrorCode::default(),
            details: Map::new(),
            retry_after: None,
            timestamp: Utc::now(),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(message).with_code(ErrorCode::ValidationError)
    }

    pub fn api(message: impl Into<String>) -> Self {
        Self::new(message).with_code(ErrorCode::ApiError)
    }

    /// Rate-limit rejection. `retry_after` defaults to 60 seconds.
    pub fn rate_limited(message: impl Into<String>) -> Self {
        let mut err = Self::new(message).with_code(ErrorCode::RateLimit);
        err.retry_after = Some(60);
        err
    }

    pub fn auth(message: impl Into<String>) -> Self {
        Self::new(message).with_code(ErrorCode::AuthError)
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(message).with_code(ErrorCode::Timeout)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(message).with_code(ErrorCode::NotFound)
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::new(message).with_code(ErrorCode::ConfigError)
    }

    pub fn quota(message: impl Into<String>) -> Self {
        Self::new(message).with_code(ErrorCode::QuotaExceeded)
    }

    pub fn security(message: impl Into<String>) -> Self {
        Self::new(message).with_code(ErrorCode::SecurityError)
    }

    pub fn media(message: impl Into<String>) -> Self {
        Self::new(message).with_code(ErrorCode::MediaError)
    }

    pub fn unexpected(message: impl Into<String>) -> Self {
        Self::new(message).with_code(ErrorCode::UnexpectedError)
    }

    /// Set the error code.
    pub fn with_code(mut self, code: ErrorCode) -> Self {
        self.code = code;
        self
    }

    /// Attribute the error to a tool.
    pub fn for_tool(mut self, name: impl Into<String>) -> Self {
        self.tool_name = Some(name.into());
        self
    }

    /// Attach one contextual key/value pair.
    pub fn with_detail(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.details.insert(key.into(), value.into());
        self
    }

    /// Set the retry hint in seconds.
    pub fn with_retry_after(mut self, seconds: u64) -> Self {
        self.retry_after = Some(seconds);
        self
    }

    /// Human-readable one-line summary: `"[CODE] message"`, prefixed with
    /// the tool name and suffixed with the retry hint when present.
    pub fn describe(&self) -> String {
        let mut out = String::new();
        if let Some(name) = &self.tool_name {
            out.push_str(name);
            out.push_str(": ");
        }
        out.push('[');
        out.push_str(self.code.as_str());
        out.push_str("] ");
        out.push_str(&self.message);
        if let Some(seconds) = self.retry_after {
            out.push_str(&format!(" (retry after {}s)", seconds));
        }
        out
    }

    /// Convert to the stable wire shape. Idempotent: the timestamp was
    /// fixed at construction.
    pub fn to_envelope(&self) -> ErrorEnvelope {
        ErrorEnvelope {
            error_type: "ToolError".to_string(),
            error_code: self.code.as_str().to_string(),
            message: self.message.clone(),
            tool_name: self.tool_name.clone(),
            details: self.details.clone(),
            retry_after: self.retry_after,
            timestamp: self.timestamp.to_rfc3339_opts(SecondsFormat::Micros, true),
        }
    }
}

/// Serialized error shape carried in the failure branch of the response
/// envelope. All seven fields are always present; absent values are null.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorEnvelope {
    pub error_type: String,
    pub error_code: String,
    pub message: String,
    pub tool_name: Option<String>,
    pub details: Map<String, Value>,
    pub retry_after: Option<u64>,
    pub timestamp: String,
}

impl From<reqwest::Error> for ToolError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ToolError::timeout(format!("request timed out: {}", err))
        } else {
            ToolError::api(format!("http error: {}", err))
        }
    }
}

/// Map an HTTP status to a classified error. Pure and total over all
/// status values; `retry_after` is the parsed `Retry-After` header, if any.
pub fn classify_http_status(status: u16, api_name: &str, retry_after: Option<u64>) -> ToolError {
    let err = match status {
        401 | 403 => ToolError::auth(format!(
            "{} authentication failed (HTTP {})",
            api_name, status
        )),
        404 => ToolError::not_found(format!("{} resource not found", api_name)),
        429 => ToolError::rate_limited(format!("{} rate limit exceeded", api_name))
            .with_retry_after(retry_after.unwrap_or(60)),
        s if s >= 500 => ToolError::api(format!("{} server error (HTTP {})", api_name, s)),
        s if s >= 400 => ToolError::api(format!("{} client error (HTTP {})", api_name, s)),
        s => ToolError::api(format!("{} unexpected status (HTTP {})", api_name, s)),
    };
    err.with_detail("status", status)
}
