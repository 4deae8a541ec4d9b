//! Small built-in tools used by the CLI and for smoke-testing a session.
//!
//! Real capabilities (window automation, repository queries and so on) are
//! registered by the embedding application.

use std::sync::Arc;

use crate::tools::tool::{FnTool, Tool, ToolExecutionContext};
use crate::tools::types::ToolParameters;

/// `echo`: returns its arguments unchanged.
pub fn echo_tool() -> Arc<dyn Tool> {
    Arc::new(FnTool::new(
        "echo",
        "Return the supplied arguments unchanged",
        ToolParameters::object()
            .string("text", "Text to echo back", false)
            .build(),
        |args, _ctx: ToolExecutionContext| async move { Ok(args.into_raw()) },
    ))
}

/// `get_current_time`: local wall-clock time.
pub fn current_time_tool() -> Arc<dyn Tool> {
    Arc::new(FnTool::new(
        "get_current_time",
        "Get the current local date and time",
        ToolParameters::empty(),
        |_args, _ctx: ToolExecutionContext| async move {
            let now = chrono::Local::now();
            Ok(serde_json::json!({
                "current_time": now.to_rfc3339(),
                "timezone": now.format("%Z").to_string(),
            }))
        },
    ))
}

/// All built-in tools.
pub fn all_tools() -> Vec<Arc<dyn Tool>> {
    vec![echo_tool(), current_time_tool()]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::ToolArguments;

    #[tokio::test]
    async fn echo_returns_arguments() {
        let args = ToolArguments::new(serde_json::json!({"x": 5}));
        let out = echo_tool()
            .execute(&args, &ToolExecutionContext::default())
            .await
            .unwrap();
        assert_eq!(out, serde_json::json!({"x": 5}));
    }

    #[tokio::test]
    async fn current_time_reports_rfc3339() {
        let out = current_time_tool()
            .execute(&ToolArguments::empty(), &ToolExecutionContext::default())
            .await
            .unwrap();
        let stamp = out["current_time"].as_str().unwrap();
        assert!(chrono::DateTime::parse_from_rfc3339(stamp).is_ok());
    }

    #[test]
    fn builtin_names_are_unique() {
        let names: Vec<String> = all_tools().iter().map(|t| t.name().to_string()).collect();
        assert_eq!(names, vec!["echo", "get_current_time"]);
    }
}
