//! Tool invocation and result shaping.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use serde_json::{json, Value};

use crate::error::VoxloopError;
use crate::protocol::ClientEvent;
use crate::tools::{Tool, ToolArguments, ToolExecutionContext};

/// Outcome of one function call, success or not.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolResult {
    pub call_id: String,
    pub tool_name: String,
    pub output: Value,
    pub is_error: bool,
}

impl ToolResult {
    pub fn success(call_id: impl Into<String>, tool_name: impl Into<String>, output: Value) -> Self {
        Self {
            call_id: call_id.into(),
            tool_name: tool_name.into(),
            output,
            is_error: false,
        }
    }

    /// A `{"error": ...}` result.
    pub fn error(
        call_id: impl Into<String>,
        tool_name: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            call_id: call_id.into(),
            tool_name: tool_name.into(),
            output: json!({ "error": message.into() }),
            is_error: true,
        }
    }

    pub fn not_found(call_id: impl Into<String>, tool_name: &str) -> Self {
        Self::error(call_id, tool_name, format!("Function '{tool_name}' not found."))
    }

    pub fn arguments_too_large(call_id: impl Into<String>, tool_name: &str, limit: usize) -> Self {
        Self::error(
            call_id,
            tool_name,
            format!("Function '{tool_name}' arguments exceeded {limit} bytes"),
        )
    }

    pub fn failed(call_id: impl Into<String>, tool_name: &str, reason: &str) -> Self {
        Self::error(call_id, tool_name, format!("Function '{tool_name}' failed: {reason}"))
    }

    /// The two events that hand this result back to the model: the
    /// `function_call_output` item, then the request to resume.
    pub fn into_events(self) -> [ClientEvent; 2] {
        [
            ClientEvent::function_call_output(self.call_id, &self.output),
            ClientEvent::ResponseCreate,
        ]
    }
}

/// Run `tool`, turning errors and panics into error results.
pub async fn invoke_tool(
    tool: Arc<dyn Tool>,
    call_id: String,
    requested_name: String,
    arguments: ToolArguments,
) -> ToolResult {
    let ctx = ToolExecutionContext {
        call_id: call_id.clone(),
        requested_name: requested_name.clone(),
    };
    let outcome = AssertUnwindSafe(tool.execute(&arguments, &ctx))
        .catch_unwind()
        .await;
    match outcome {
        Ok(Ok(output)) => ToolResult::success(call_id, requested_name, output),
        Ok(Err(error)) => {
            let reason = failure_reason(&error);
            tracing::warn!(%call_id, tool_name = %requested_name, %reason, "tool returned an error");
            ToolResult::failed(call_id, &requested_name, &reason)
        }
        Err(panic) => {
            let reason = panic_reason(&*panic);
            tracing::error!(%call_id, tool_name = %requested_name, %reason, "tool panicked");
            ToolResult::failed(call_id, &requested_name, &reason)
        }
    }
}

fn failure_reason(error: &VoxloopError) -> String {
    match error {
        VoxloopError::ToolExecution { message, .. } => message.clone(),
        other => other.to_string(),
    }
}

fn panic_reason(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        format!("panicked: {message}")
    } else if let Some(message) = panic.downcast_ref::<String>() {
        format!("panicked: {message}")
    } else {
        "panicked".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::ConversationItem;
    use crate::tools::{FnTool, ToolParameters};
    use pretty_assertions::assert_eq;

    fn tool<F, Fut>(name: &str, handler: F) -> Arc<dyn Tool>
    where
        F: Fn(ToolArguments, ToolExecutionContext) -> Fut + Send + Sync + 'static,
        Fut: std::future::Future<Output = Result<Value, VoxloopError>> + Send + 'static,
    {
        Arc::new(FnTool::new(name, "test tool", ToolParameters::empty(), handler))
    }

    #[tokio::test]
    async fn success_keeps_tool_output() {
        let echo = tool("Echo", |args, _| async move { Ok::<_, VoxloopError>(args.into_raw()) });
        let result = invoke_tool(
            echo,
            "c1".into(),
            "echo".into(),
            ToolArguments::new(json!({"x": 5})),
        )
        .await;
        assert_eq!(result, ToolResult::success("c1", "echo", json!({"x": 5})));
    }

    #[tokio::test]
    async fn tool_error_becomes_error_result() {
        let failing = tool("Broken", |_, _| async {
            Err::<Value, _>(VoxloopError::tool("Broken", "disk on fire"))
        });
        let result = invoke_tool(failing, "c2".into(), "Broken".into(), ToolArguments::empty()).await;
        assert!(result.is_error);
        assert_eq!(
            result.output,
            json!({"error": "Function 'Broken' failed: disk on fire"})
        );
    }

    #[tokio::test]
    async fn panicking_tool_is_contained() {
        let panicking = tool("Boom", |_, _| async {
            if true {
                panic!("kaboom");
            }
            Ok::<Value, VoxloopError>(Value::Null)
        });
        let result = invoke_tool(panicking, "c3".into(), "Boom".into(), ToolArguments::empty()).await;
        assert!(result.is_error);
        assert_eq!(
            result.output,
            json!({"error": "Function 'Boom' failed: panicked: kaboom"})
        );
    }

    #[test]
    fn result_maps_to_output_then_resume() {
        let [item, resume] = ToolResult::not_found("c4", "Missing").into_events();
        let ClientEvent::ConversationItemCreate {
            item: ConversationItem::FunctionCallOutput { call_id, output },
        } = item
        else {
            panic!("expected conversation.item.create");
        };
        assert_eq!(call_id, "c4");
        assert_eq!(output, r#"{"error":"Function 'Missing' not found."}"#);
        assert_eq!(resume, ClientEvent::ResponseCreate);
    }
}
