//! Reassembly of streamed function-call arguments.

use std::collections::{HashSet, VecDeque};

use serde_json::Value;
use thiserror::Error;

use crate::protocol::OutputItem;
use crate::tools::ToolArguments;

/// The single open call of a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingFunctionCall {
    pub call_id: String,
    pub name: String,
    pub argument_buffer: String,
    overflowed: bool,
}

impl PendingFunctionCall {
    pub fn new(call_id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            call_id: call_id.into(),
            name: name.into(),
            argument_buffer: String::new(),
            overflowed: false,
        }
    }

    pub fn is_overflowed(&self) -> bool {
        self.overflowed
    }
}

/// Protocol violations seen while accumulating.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AccumulatorError {
    #[error("function call '{pending}' is still open, rejected new call '{rejected}'")]
    AlreadyOpen { pending: String, rejected: String },

    #[error("call '{0}' was already dispatched")]
    AlreadyDispatched(String),

    #[error("function call item has no {0}")]
    MissingField(&'static str),

    #[error("no function call is open")]
    NoneOpen,

    #[error("fragment for call '{received}' does not belong to open call '{open}'")]
    CallIdMismatch { open: String, received: String },

    #[error("arguments for call '{call_id}' exceeded {limit} bytes")]
    ArgumentsTooLarge { call_id: String, limit: usize },
}

/// Arguments of a finished call.
#[derive(Debug, Clone)]
pub enum FinalizedArguments {
    /// Buffer parsed to a JSON object (an empty buffer counts as `{}`).
    Parsed(ToolArguments),
    /// Buffer was not a JSON object; dispatch proceeds with `{}`.
    Substituted { reason: String },
    /// Buffer exceeded the configured bound; the tool must not be invoked.
    Overflowed { limit: usize },
}

/// A completed call ready for dispatch.
#[derive(Debug, Clone)]
pub struct FinalizedCall {
    pub call_id: String,
    pub name: String,
    pub arguments: FinalizedArguments,
}

/// How many finalized call ids are remembered for duplicate detection.
pub const FINALIZED_HISTORY: usize = 1024;

/// Buffers argument fragments for at most one call at a time and
/// guarantees each of the last [`FINALIZED_HISTORY`] call ids is finalized at
/// most once.
#[derive(Debug, Default)]
pub struct FunctionCallAccumulator {
    pending: Option<PendingFunctionCall>,
    max_bytes: Option<usize>,
    finalized: HashSet<String>,
    finalized_order: VecDeque<String>,
}

impl FunctionCallAccumulator {
    /// `max_bytes` bounds a single argument buffer; `None` means unbounded.
    pub fn new(max_bytes: Option<usize>) -> Self {
        Self {
            max_bytes,
            ..Self::default()
        }
    }

    pub fn pending(&self) -> Option<&PendingFunctionCall> {
        self.pending.as_ref()
    }

    pub fn is_open(&self) -> bool {
        self.pending.is_some()
    }

    /// Open a call for a `function_call` output item.
    ///
    /// An item without a name still opens a call so its `done` can be answered;
    /// the empty name resolves to no tool.
    pub fn open(&mut self, item: &OutputItem) -> Result<&PendingFunctionCall, AccumulatorError> {
        let call_id = item
            .call_id
            .as_deref()
            .filter(|id| !id.is_empty())
            .ok_or(AccumulatorError::MissingField("call_id"))?;
        let name = item.name.as_deref().unwrap_or_default();
        if let Some(pending) = &self.pending {
            return Err(AccumulatorError::AlreadyOpen {
                pending: pending.call_id.clone(),
                rejected: call_id.to_string(),
            });
        }
        if self.finalized.contains(call_id) {
            return Err(AccumulatorError::AlreadyDispatched(call_id.to_string()));
        }
        let pending = self.pending.insert(PendingFunctionCall::new(call_id, name));
        Ok(&*pending)
    }

    /// Append one fragment verbatim. Fragments tagged with another call id are
    /// refused; untagged fragments go to the open call.
    pub fn accumulate(&mut self, call_id: Option<&str>, delta: &str) -> Result<(), AccumulatorError> {
        let pending = self.pending.as_mut().ok_or(AccumulatorError::NoneOpen)?;
        if let Some(received) = call_id {
            if received != pending.call_id {
                return Err(AccumulatorError::CallIdMismatch {
                    open: pending.call_id.clone(),
                    received: received.to_string(),
                });
            }
        }
        if pending.overflowed {
            return Ok(());
        }
        if let Some(limit) = self.max_bytes {
            if pending.argument_buffer.len() + delta.len() > limit {
                pending.overflowed = true;
                pending.argument_buffer = String::new();
                return Err(AccumulatorError::ArgumentsTooLarge {
                    call_id: pending.call_id.clone(),
                    limit,
                });
            }
        }
        pending.argument_buffer.push_str(delta);
        Ok(())
    }

    /// Close the open call and parse its buffer.
    pub fn finalize(&mut self) -> Result<FinalizedCall, AccumulatorError> {
        let pending = self.pending.take().ok_or(AccumulatorError::NoneOpen)?;
        self.remember(&pending.call_id);
        let arguments = match (pending.overflowed, self.max_bytes) {
            (true, Some(limit)) => FinalizedArguments::Overflowed { limit },
            _ => parse_arguments(&pending.argument_buffer),
        };
        Ok(FinalizedCall {
            call_id: pending.call_id,
            name: pending.name,
            arguments,
        })
    }

    /// Drop the open call without dispatching it.
    pub fn abandon(&mut self) -> Option<PendingFunctionCall> {
        self.pending.take()
    }

    fn remember(&mut self, call_id: &str) {
        if !self.finalized.insert(call_id.to_string()) {
            return;
        }
        self.finalized_order.push_back(call_id.to_string());
        if self.finalized_order.len() > FINALIZED_HISTORY {
            if let Some(oldest) = self.finalized_order.pop_front() {
                self.finalized.remove(&oldest);
            }
        }
    }
}

/// Parse a complete argument buffer.
pub fn parse_arguments(buffer: &str) -> FinalizedArguments {
    let trimmed = buffer.trim();
    if trimmed.is_empty() {
        return FinalizedArguments::Parsed(ToolArguments::empty());
    }
    match serde_json::from_str::<Value>(trimmed) {
        Ok(value @ Value::Object(_)) => FinalizedArguments::Parsed(ToolArguments::new(value)),
        Ok(other) => FinalizedArguments::Substituted {
            reason: format!("expected a JSON object, got {other}"),
        },
        Err(error) => FinalizedArguments::Substituted {
            reason: error.to_string(),
        },
    }
}
