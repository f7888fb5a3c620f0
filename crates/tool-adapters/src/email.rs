//! Bulk email sending against the SendGrid v3 API.
//!
//! Outbound sends are expensive upstream, so this adapter declares an
//! admission cost of 2.

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde_json::{json, Map, Value};
use tool_runtime::{
    HttpTransport, RequestOptions, Tool, ToolDescriptor, ToolError,
};
use tracing::debug;

const DEFAULT_BASE_URL: &str = "https://api.sendgrid.com";
const MAX_RECIPIENTS: usize = 1000;

/// Send one email to a batch of recipients.
pub struct SendBulkEmail {
    params: SendBulkEmailParams,
    api_key: SecretString,
    base_url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SendBulkEmailParams {
    /// Sender address.
    pub from: String,
    /// Recipient addresses.
    pub recipients: Vec<String>,
    /// Subject line.
    pub subject: String,
    /// Plain-text body.
    pub body: String,
}

pub(crate) fn descriptor() -> ToolDescriptor {
    ToolDescriptor {
        name: "email.send_bulk".into(),
        description: "Send one email to a batch of recipients.".into(),
        parameters: json!({
            "type": "object",
            "properties": {
                "from": {
                    "type": "string",
                    "description": "Sender address"
                },
                "recipients": {
                    "type": "array",
                    "items": {"type": "string"},
                    "description": "Recipient addresses (max 1000)"
                },
                "subject": {
                    "type": "string",
                    "description": "Subject line"
                },
                "body": {
                    "type": "string",
                    "description": "Plain-text body"
                }
            },
            "required": ["from", "recipients", "subject", "body"]
        }),
        rate_limit_type: "sendgrid".into(),
        rate_limit_cost: 2,
    }
}

impl SendBulkEmail {
    /// Create a new bulk send with an explicit API key.
    pub fn new(params: SendBulkEmailParams, api_key: impl Into<String>) -> Self {
        Self {
            params,
            api_key: SecretString::new(api_key.into()),
            base_url: DEFAULT_BASE_URL.into(),
        }
    }

    /// Create from the `SENDGRID_API_KEY` environment variable.
    pub fn from_env(params: SendBulkEmailParams) -> Result<Self, ToolError> {
        let api_key = std::env::var("SENDGRID_API_KEY")
            .map_err(|_| ToolError::config("SENDGRID_API_KEY is not set"))?;
        Ok(Self::new(params, api_key))
    }

    /// Override the API base URL.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

#[async_trait]
impl Tool for SendBulkEmail {
    fn name(&self) -> &str {
        "email.send_bulk"
    }

    fn descriptor(&self) -> ToolDescriptor {
        descriptor()
    }

    fn rate_limit_type(&self) -> &str {
        "sendgrid"
    }

    fn rate_limit_cost(&self) -> u32 {
        2
    }

    fn validate_parameters(&self) -> Result<(), ToolError> {
        if !self.params.from.contains('@') {
            return Err(ToolError::validation("from must be an email address"));
        }
        if self.params.recipients.is_empty() {
            return Err(ToolError::validation("recipients must not be empty"));
        }
        if self.params.recipients.len() > MAX_RECIPIENTS {
            return Err(ToolError::validation(format!(
                "at most {} recipients per send",
                MAX_RECIPIENTS
            )));
        }
        if let Some(bad) = self.params.recipients.iter().find(|r| !r.contains('@')) {
            return Err(
                ToolError::validation(format!("invalid recipient address: {}", bad))
                    .with_detail("recipient", bad.as_str()),
            );
        }
        if self.params.subject.trim().is_empty() {
            return Err(ToolError::validation("subject must not be empty"));
        }
        Ok(())
    }

    fn mock_output(&self) -> Value {
        json!({ "accepted_recipients": self.params.recipients.len() })
    }

    fn metadata(&self) -> Map<String, Value> {
        let mut metadata = Map::new();
        metadata.insert("provider".into(), json!("sendgrid"));
        metadata.insert(
            "recipient_count".into(),
            json!(self.params.recipients.len()),
        );
        metadata
    }

    async fn process(&self) -> Result<Value, ToolError> {
        debug!(
            recipients = self.params.recipients.len(),
            subject = %self.params.subject,
            "sending bulk email"
        );

        let personalizations: Vec<Value> = self
            .params
            .recipients
            .iter()
            .map(|email| json!({"to": [{"email": email}]}))
            .collect();

        let url = format!("{}/v3/mail/send", self.base_url);
        let options = RequestOptions::new()
            .with_header(
                "Authorization",
                format!("Bearer {}", self.api_key.expose_secret()),
            )
            .with_json(json!({
                "personalizations": personalizations,
                "from": {"email": self.params.from},
                "subject": self.params.subject,
                "content": [{"type": "text/plain", "value": self.params.body}]
            }));

        HttpTransport::shared().post(&url, options).await?;

        Ok(json!({ "accepted_recipients": self.params.recipients.len() }))
    }
}
