//! Name-to-handler tool registry.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use serde_json::{json, Value};

use super::tool::Tool;
use crate::error::VoxloopError;

/// Explicit registry of the tools a session may invoke.
///
/// Populated at startup and injected into the session processor. Names are
/// matched case-insensitively; a miss is `None`, never an error.
#[derive(Clone, Default)]
pub struct ToolRegistry {
    tools: BTreeMap<String, Arc<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tool, rejecting names that collide case-insensitively.
    pub fn register(&mut self, tool: Arc<dyn Tool>) -> Result<(), VoxloopError> {
        if tool.name().trim().is_empty() {
            return Err(VoxloopError::InvalidArgument(
                "Tool name cannot be empty".into(),
            ));
        }
        let key = normalize(tool.name());
        if let Some(existing) = self.tools.get(&key) {
            return Err(VoxloopError::InvalidArgument(format!(
                "Tool '{}' conflicts with registered tool '{}'",
                tool.name(),
                existing.name()
            )));
        }
        tracing::debug!(tool_name = tool.name(), "registered tool");
        self.tools.insert(key, tool);
        Ok(())
    }

    /// Builder-style registration.
    pub fn with_tool(mut self, tool: Arc<dyn Tool>) -> Result<Self, VoxloopError> {
        self.register(tool)?;
        Ok(self)
    }

    /// Resolve a tool by case-insensitive name.
    pub fn resolve(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.get(&normalize(name)).cloned()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Registered tool names, in their advertised spelling.
    pub fn names(&self) -> Vec<&str> {
        self.tools.values().map(|tool| tool.name()).collect()
    }

    /// Tool definitions in the shape the realtime `session.update` expects.
    pub fn session_schemas(&self) -> Vec<Value> {
        self.tools
            .values()
            .map(|tool| {
                json!({
                    "type": "function",
                    "name": tool.name(),
                    "description": tool.description(),
                    "parameters": tool.parameters().schema,
                })
            })
            .collect()
    }
}

impl fmt::Debug for ToolRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ToolRegistry")
            .field("tools", &self.names())
            .finish()
    }
}

fn normalize(name: &str) -> String {
    name.to_lowercase()
}
