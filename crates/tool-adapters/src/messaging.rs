//! Channel message posting against the Slack Web API.

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde_json::{json, Map, Value};
use tool_runtime::{
    HttpTransport, RequestOptions, Tool, ToolDescriptor, ToolError,
};
use tracing::debug;

const DEFAULT_BASE_URL: &str = "https://slack.com";
const MAX_TEXT_LEN: usize = 40_000;

/// Post a message to a channel.
pub struct PostMessage {
    params: PostMessageParams,
    token: SecretString,
    base_url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PostMessageParams {
    /// Channel ID or name (e.g., "C024BE91L", "#general").
    pub channel: String,
    /// Message text.
    pub text: String,
}

#[derive(Deserialize)]
struct PostMessageResponse {
    ok: bool,
    error: Option<String>,
    channel: Option<String>,
    ts: Option<String>,
}

pub(crate) fn descriptor() -> ToolDescriptor {
    ToolDescriptor {
        name: "messaging.post_message".into(),
        description: "Post a message to a messaging channel.".into(),
        parameters: json!({
            "type": "object",
            "properties": {
                "channel": {
                    "type": "string",
                    "description": "Channel ID or name (e.g., 'C024BE91L', '#general')"
                },
                "text": {
                    "type": "string",
                    "description": "Message text"
                }
            },
            "required": ["channel", "text"]
        }),
        rate_limit_type: "slack".into(),
        rate_limit_cost: 1,
    }
}

impl PostMessage {
    /// Create a new message post with an explicit bot token.
    pub fn new(params: PostMessageParams, token: impl Into<String>) -> Self {
        Self {
            params,
            token: SecretString::new(token.into()),
            base_url: DEFAULT_BASE_URL.into(),
        }
    }

    /// Create from the `SLACK_BOT_TOKEN` environment variable.
    pub fn from_env(params: PostMessageParams) -> Result<Self, ToolError> {
        let token = std::env::var("SLACK_BOT_TOKEN")
            .map_err(|_| ToolError::config("SLACK_BOT_TOKEN is not set"))?;
        Ok(Self::new(params, token))
    }

    /// Override the API base URL.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    fn provider_error(&self, error: &str) -> ToolError {
        match error {
            "channel_not_found" | "user_not_found" => {
                ToolError::not_found(format!("channel '{}' not found", self.params.channel))
            }
            "not_authed" | "invalid_auth" | "token_revoked" | "account_inactive" => {
                ToolError::auth(format!("messaging authentication failed: {}", error))
            }
            "rate_limited" | "ratelimited" => {
                ToolError::rate_limited("messaging API rate limit exceeded")
            }
            "msg_too_long" => ToolError::validation("message text is too long"),
            other => ToolError::api(format!("message post rejected: {}", other)),
        }
    }
}

#[async_trait]
impl Tool for PostMessage {
    fn name(&self) -> &str {
        "messaging.post_message"
    }

    fn descriptor(&self) -> ToolDescriptor {
        descriptor()
    }

    fn rate_limit_type(&self) -> &str {
        "slack"
    }

    fn validate_parameters(&self) -> Result<(), ToolError> {
        if self.params.channel.trim().is_empty() {
            return Err(ToolError::validation("channel must not be empty"));
        }
        if self.params.text.trim().is_empty() {
            return Err(ToolError::validation("text must not be empty"));
        }
        if self.params.text.len() > MAX_TEXT_LEN {
            return Err(ToolError::validation(format!(
                "text exceeds {} characters",
                MAX_TEXT_LEN
            )));
        }
        Ok(())
    }

    fn mock_output(&self) -> Value {
        json!({
            "channel": "C024BE91L",
            "ts": "1700000000.000100"
        })
    }

    fn metadata(&self) -> Map<String, Value> {
        let mut metadata = Map::new();
        metadata.insert("provider".into(), json!("slack"));
        metadata
    }

    async fn process(&self) -> Result<Value, ToolError> {
        debug!(channel = %self.params.channel, len = self.params.text.len(), "posting message");

        let url = format!("{}/api/chat.postMessage", self.base_url);
        let options = RequestOptions::new()
            .with_header(
                "Authorization",
                format!("Bearer {}", self.token.expose_secret()),
            )
            .with_json(json!({
                "channel": self.params.channel,
                "text": self.params.text
            }));

        let response = HttpTransport::shared().post(&url, options).await?;
        let body: PostMessageResponse = response.json().await?;

        if !body.ok {
            let error = body.error.as_deref().unwrap_or("unknown_error");
            return Err(self.provider_error(error));
        }

        Ok(json!({
            "channel": body.channel,
            "ts": body.ts
        }))
    }
}
