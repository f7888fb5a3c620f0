//! CRM contact search against the HubSpot REST API.

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde_json::{json, Map, Value};
use tool_runtime::{
    HttpTransport, RequestOptions, Tool, ToolDescriptor, ToolError,
};
use tracing::debug;

const DEFAULT_BASE_URL: &str = "https://api.hubapi.com";
const MAX_LIMIT: u32 = 100;

/// Search CRM contacts by free-text query.
#[derive(Debug)]
pub struct SearchContacts {
    params: SearchContactsParams,
    api_key: SecretString,
    base_url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SearchContactsParams {
    /// Free-text query matched against contact properties.
    pub query: String,
    /// Maximum number of contacts to return.
    #[serde(default = "default_limit")]
    pub limit: u32,
}

fn default_limit() -> u32 {
    10
}

#[derive(Deserialize)]
struct SearchResponse {
    total: u64,
    results: Vec<ContactResult>,
}

#[derive(Deserialize)]
struct ContactResult {
    id: String,
    properties: Map<String, Value>,
}

pub(crate) fn descriptor() -> ToolDescriptor {
    ToolDescriptor {
        name: "crm.search_contacts".into(),
        description: "Search CRM contacts by name, email, or company.".into(),
        parameters: json!({
            "type": "object",
            "properties": {
                "query": {
                    "type": "string",
                    "description": "Free-text search (e.g., 'ada@example.com', 'Lovelace')"
                },
                "limit": {
                    "type": "integer",
                    "description": "Maximum contacts to return (1-100, default 10)"
                }
            },
            "required": ["query"]
        }),
        rate_limit_type: "hubspot".into(),
        rate_limit_cost: 1,
    }
}

impl SearchContacts {
    /// Create a new contact search with an explicit API key.
    pub fn new(params: SearchContactsParams, api_key: impl Into<String>) -> Self {
        Self {
            params,
            api_key: SecretString::new(api_key.into()),
            base_url: DEFAULT_BASE_URL.into(),
        }
    }

    /// Create from the `HUBSPOT_API_KEY` environment variable.
    pub fn from_env(params: SearchContactsParams) -> Result<Self, ToolError> {
        let api_key = std::env::var("HUBSPOT_API_KEY")
            .map_err(|_| ToolError::config("HUBSPOT_API_KEY is not set"))?;
        Ok(Self::new(params, api_key))
    }

    /// Override the API base URL.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

#[async_trait]
impl Tool for SearchContacts {
    fn name(&self) -> &str {
        "crm.search_contacts"
    }

    fn descriptor(&self) -> ToolDescriptor {
        descriptor()
    }

    fn rate_limit_type(&self) -> &str {
        "hubspot"
    }

    fn validate_parameters(&self) -> Result<(), ToolError> {
        if self.params.query.trim().is_empty() {
            return Err(ToolError::validation("query must not be empty"));
        }
        if self.params.limit == 0 || self.params.limit > MAX_LIMIT {
            return Err(ToolError::validation(format!(
                "limit must be between 1 and {}",
                MAX_LIMIT
            )));
        }
        Ok(())
    }

    fn mock_output(&self) -> Value {
        json!({
            "total": 1,
            "contacts": [{
                "id": "1",
                "properties": {
                    "email": "ada@example.com",
                    "firstname": "Ada",
                    "lastname": "Lovelace"
                }
            }]
        })
    }

    fn metadata(&self) -> Map<String, Value> {
        let mut metadata = Map::new();
        metadata.insert("provider".into(), json!("hubspot"));
        metadata.insert("object_type".into(), json!("contacts"));
        metadata
    }

    async fn process(&self) -> Result<Value, ToolError> {
        let query = self.params.query.trim();
        debug!(query = %query, limit = self.params.limit, "searching contacts");

        let url = format!("{}/crm/v3/objects/contacts/search", self.base_url);
        let options = RequestOptions::new()
            .with_header(
                "Authorization",
                format!("Bearer {}", self.api_key.expose_secret()),
            )
            .with_json(json!({
                "query": query,
                "limit": self.params.limit
            }));

        let response = HttpTransport::shared().post(&url, options).await?;
        let body: SearchResponse = response.json().await?;

        let contacts: Vec<Value> = body
            .results
            .into_iter()
            .map(|contact| {
                json!({
                    "id": contact.id,
                    "properties": contact.properties
                })
            })
            .collect();

        Ok(json!({
            "total": body.total,
            "contacts": contacts
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn params(query: &str) -> SearchContactsParams {
        SearchContactsParams {
            query: query.into(),
            limit: 10,
        }
    }

    #[test]
    fn test_descriptor() {
        let descriptor = descriptor();
        assert_eq!(descriptor.name, "crm.search_contacts");
        assert_eq!(descriptor.rate_limit_type, "hubspot");
        assert_eq!(descriptor.parameters["required"][0], "query");
    }

    #[test]
    fn test_validation_rejects_empty_query() {
        let tool = SearchContacts::new(params("   "), "key");
        let err = tool.validate_parameters().unwrap_err();
        assert_eq!(err.code, tool_runtime::ErrorCode::ValidationError);
    }

    #[test]
    fn test_validation_rejects_bad_limit() {
        let tool = SearchContacts::new(
            SearchContactsParams {
                query: "ada".into(),
                limit: 500,
            },
            "key",
        );
        assert!(tool.validate_parameters().is_err());
    }

    #[test]
    fn test_from_env_missing_key_is_config_error() {
        std::env::remove_var("HUBSPOT_API_KEY");
        let err = SearchContacts::from_env(params("ada")).unwrap_err();
        assert_eq!(err.code, tool_runtime::ErrorCode::ConfigError);
    }

    #[tokio::test]
    async fn test_search_normalizes_results() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/crm/v3/objects/contacts/search"))
            .and(header("Authorization", "Bearer key"))
            .and(body_json(serde_json::json!({"query": "ada", "limit": 10})))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "total": 1,
                "results": [{
                    "id": "51",
                    "properties": {"email": "ada@example.com", "firstname": "Ada"}
                }]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let tool = SearchContacts::new(params("ada"), "key").with_base_url(server.uri());
        let result = tool.process().await.unwrap();

        assert_eq!(result["total"], 1);
        assert_eq!(result["contacts"][0]["id"], "51");
        assert_eq!(result["contacts"][0]["properties"]["firstname"], "Ada");
    }

    #[tokio::test]
    async fn test_upstream_failure_is_api_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/crm/v3/objects/contacts/search"))
            .respond_with(ResponseTemplate::new(400).set_body_string("bad request"))
            .expect(1)
            .mount(&server)
            .await;

        let tool = SearchContacts::new(params("ada"), "key").with_base_url(server.uri());
        let err = tool.process().await.unwrap_err();
        assert_eq!(err.code, tool_runtime::ErrorCode::ApiError);
    }
}
