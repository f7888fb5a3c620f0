//! Tool lifecycle execution: validate, admit, mock or run, envelope.
//!
//! Every invocation reaches exactly one terminal state. No error leaves
//! the executor un-enveloped, and no state is re-entered.

use crate::config::RuntimeConfig;
use crate::envelope::ToolResponse;
use crate::error::ToolError;
use crate::rate_limit::RateLimiter;
use crate::tool::Tool;
use futures::FutureExt;
use serde_json::Value;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, OnceLock};
use tracing::{debug, error, info, warn};

static DEFAULT_EXECUTOR: OnceLock<ToolExecutor> = OnceLock::new();

/// Runs tools through the standard lifecycle.
pub struct ToolExecutor {
    limiter: Arc<RateLimiter>,
}

impl ToolExecutor {
    pub fn new(limiter: Arc<RateLimiter>) -> Self {
        Self { limiter }
    }

    /// Execute one tool invocation and return its envelope.
    ///
    /// Errors raised by tool code keep their original code; only panics
    /// are wrapped, as `UNEXPECTED_ERROR`.
    pub async fn execute(&self, tool: &dyn Tool) -> ToolResponse {
        let name = tool.name().to_string();
        info!(tool = %name, "executing tool");

        if let Err(err) = tool.validate_parameters() {
            warn!(tool = %name, error = %err, "parameter validation failed");
            return ToolResponse::failure(attribute(err, &name));
        }

        if tool.should_use_mock() {
            debug!(tool = %name, "mock mode enabled, returning mock output");
            return self.succeed(tool, tool.mock_output());
        }

        if let Err(err) = self
            .limiter
            .check_rate_limit(tool.rate_limit_type(), tool.rate_limit_cost())
        {
            return ToolResponse::failure(attribute(err, &name));
        }

        match AssertUnwindSafe(tool.process()).catch_unwind().await {
            Ok(Ok(result)) => {
                info!(tool = %name, "tool executed successfully");
                self.succeed(tool, result)
            }
            Ok(Err(err)) => {
                error!(tool = %name, error = %err, "tool execution failed");
                ToolResponse::failure(attribute(err, &name))
            }
            Err(panic) => {
                let message = panic_message(panic);
                error!(tool = %name, panic = %message, "tool panicked");
                ToolResponse::failure(attribute(
                    ToolError::unexpected(format!("tool panicked: {}", message)),
                    &name,
                ))
            }
        }
    }

    fn succeed(&self, tool: &dyn Tool, result: Value) -> ToolResponse {
        let mut metadata = tool.metadata();
        metadata.insert("tool_name".into(), Value::String(tool.name().into()));
        ToolResponse::success(result, metadata)
    }
}

/// Execute a tool with the process-wide default executor, whose rate
/// limiter is built from the environment configuration at first use.
pub async fn run(tool: &dyn Tool) -> ToolResponse {
    DEFAULT_EXECUTOR
        .get_or_init(|| {
            let config = RuntimeConfig::load().unwrap_or_else(|err| {
                warn!(error = %err, "falling back to default runtime configuration");
                RuntimeConfig::default()
            });
            ToolExecutor::new(Arc::new(RateLimiter::from_config(&config)))
        })
        .execute(tool)
        .await
}

fn attribute(err: ToolError, tool_name: &str) -> ToolError {
    if err.tool_name.is_some() {
        err
    } else {
        err.for_tool(tool_name)
    }
}

fn panic_message(panic: Box<dyn Any + Send>) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
