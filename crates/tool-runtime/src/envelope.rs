//! Uniform response envelope returned by every tool invocation.

use crate::error::{ErrorEnvelope, ToolError};
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use serde_json::{Map, Value};

/// The single wire shape every tool call returns.
///
/// The success and failure branches are mutually exclusive by construction:
/// a caller never needs to check both.
#[derive(Debug, Clone, PartialEq)]
pub enum ToolResponse {
    Success {
        result: Value,
        metadata: Map<String, Value>,
    },
    Failure {
        error: ErrorEnvelope,
    },
}

impl ToolResponse {
    /// Wrap a domain result in the success envelope.
    pub fn success(result: impl Into<Value>, metadata: Map<String, Value>) -> Self {
        ToolResponse::Success {
            result: result.into(),
            metadata,
        }
    }

    /// Wrap a failure in the error envelope.
    pub fn failure(error: ToolError) -> Self {
        ToolResponse::Failure {
            error: error.to_envelope(),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, ToolResponse::Success { .. })
    }

    pub fn result(&self) -> Option<&Value> {
        match self {
            ToolResponse::Success { result, .. } => Some(result),
            ToolResponse::Failure { .. } => None,
        }
    }

    pub fn metadata(&self) -> Option<&Map<String, Value>> {
        match self {
            ToolResponse::Success { metadata, .. } => Some(metadata),
            ToolResponse::Failure { .. } => None,
        }
    }

    pub fn error(&self) -> Option<&ErrorEnvelope> {
        match self {
            ToolResponse::Success { .. } => None,
            ToolResponse::Failure { error } => Some(error),
        }
    }
}

impl Serialize for ToolResponse {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            ToolResponse::Success { result, metadata } => {
                let mut map = serializer.serialize_map(Some(3))?;
                map.serialize_entry("success", &true)?;
                map.serialize_entry("result", result)?;
                map.serialize_entry("metadata", metadata)?;
                map.end()
            }
            ToolResponse::Failure { error } => {
                let mut map = serializer.serialize_map(Some(2))?;
                map.serialize_entry("success", &false)?;
                map.serialize_entry("error", error)?;
                map.end()
            }
        }
    }
}
