//! The contract every tool adapter implements.

use crate::error::ToolError;
use async_trait::async_trait;
use serde::Serialize;
use serde_json::{json, Map, Value};

/// Admission namespace used by tools that do not declare their own.
pub const DEFAULT_RATE_LIMIT_TYPE: &str = "api_calls";

/// Environment toggle for mock mode. Read on every invocation, not cached.
pub const MOCK_MODE_VAR: &str = "USE_MOCK_DATA";

/// Whether the process-wide mock toggle is enabled.
pub fn mock_mode_enabled() -> bool {
    std::env::var(MOCK_MODE_VAR)
        .map(|v| matches!(v.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on"))
        .unwrap_or(false)
}

/// Catalog entry describing one invocable tool.
#[derive(Debug, Clone, Serialize)]
pub struct ToolDescriptor {
    /// Tool name, unique within the catalog.
    pub name: String,
    /// Human-readable description.
    pub description: String,
    /// JSON Schema for the tool's parameters.
    pub parameters: Value,
    /// Admission namespace.
    pub rate_limit_type: String,
    /// Admission cost per invocation.
    pub rate_limit_cost: u32,
}

/// A single callable unit implementing one external-API operation.
///
/// Implementations bind their typed parameters at construction; the
/// executor supplies the surrounding lifecycle (validate, admit, mock or
/// run, envelope).
#[async_trait]
pub trait Tool: Send + Sync {
    /// Tool name used in envelopes, logs, and the catalog.
    fn name(&self) -> &str;

    /// Catalog descriptor for this tool.
    fn descriptor(&self) -> ToolDescriptor;

    /// Admission namespace shared with related tools.
    fn rate_limit_type(&self) -> &str {
        DEFAULT_RATE_LIMIT_TYPE
    }

    /// Admission cost; expensive operations declare more than 1.
    fn rate_limit_cost(&self) -> u32 {
        1
    }

    /// Structural and business-rule checks on the bound parameters.
    fn validate_parameters(&self) -> Result<(), ToolError>;

    /// Whether this invocation should short-circuit with mock data.
    fn should_use_mock(&self) -> bool {
        mock_mode_enabled()
    }

    /// Deterministic, schema-shaped fake output for mock mode.
    fn mock_output(&self) -> Value {
        json!({ "mock": true, "tool": self.name() })
    }

    /// Tool-specific extras merged into success metadata.
    fn metadata(&self) -> Map<String, Value> {
        Map::new()
    }

    /// The tool's domain logic.
    async fn process(&self) -> Result<Value, ToolError>;
}
