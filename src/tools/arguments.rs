//! Typed access to tool call arguments.

use crate::error::VoxloopError;

/// Wrapper around reconstructed tool call arguments providing typed extraction.
#[derive(Debug, Clone)]
pub struct ToolArguments {
    value: serde_json::Value,
}

impl ToolArguments {
    pub fn new(value: serde_json::Value) -> Self {
        Self { value }
    }

    /// Arguments with no fields, used when the streamed buffer was empty or unparsable.
    pub fn empty() -> Self {
        Self::new(serde_json::Value::Object(serde_json::Map::new()))
    }

    /// Get the raw JSON value.
    pub fn raw(&self) -> &serde_json::Value {
        &self.value
    }

    /// Consume into the raw JSON value.
    pub fn into_raw(self) -> serde_json::Value {
        self.value
    }

    /// Whether no named arguments were supplied.
    pub fn is_empty(&self) -> bool {
        self.value.as_object().map_or(true, |obj| obj.is_empty())
    }

    /// Get a string argument by key.
    pub fn get_str(&self, key: &str) -> Result<&str, VoxloopError> {
        self.value
            .get(key)
            .and_then(|v| v.as_str())
            .ok_or_else(|| VoxloopError::InvalidArgument(format!("Missing string argument: {key}")))
    }

    /// Get an optional string argument.
    pub fn get_str_opt(&self, key: &str) -> Option<&str> {
        self.value.get(key).and_then(|v| v.as_str())
    }

    /// Get an integer argument.
    pub fn get_i64(&self, key: &str) -> Result<i64, VoxloopError> {
        self.value
            .get(key)
            .and_then(|v| v.as_i64())
            .ok_or_else(|| VoxloopError::InvalidArgument(format!("Missing integer argument: {key}")))
    }

    /// Get a boolean argument.
    pub fn get_bool(&self, key: &str) -> Result<bool, VoxloopError> {
        self.value
            .get(key)
            .and_then(|v| v.as_bool())
            .ok_or_else(|| VoxloopError::InvalidArgument(format!("Missing boolean argument: {key}")))
    }

    /// Deserialize the entire arguments into a typed struct.
    pub fn deserialize<T: serde::de::DeserializeOwned>(&self) -> Result<T, VoxloopError> {
        serde_json::from_value(self.value.clone()).map_err(|e| {
            VoxloopError::InvalidArgument(format!("Failed to deserialize arguments: {e}"))
        })
    }
}
