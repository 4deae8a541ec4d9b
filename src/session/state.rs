//! Mutable per-session state.

use std::time::Instant;

use super::accumulator::{FunctionCallAccumulator, PendingFunctionCall};

/// State owned exclusively by the session loop.
#[derive(Debug, Default)]
pub struct SessionState {
    /// Server-assigned id from `session.created`.
    pub server_session_id: Option<String>,
    /// Between `response.created` and `response.done`.
    pub assistant_active: bool,
    /// Set on end of user speech, consumed by the next `response.done`.
    pub response_started_at: Option<Instant>,
    /// Text of the response in progress.
    pub transcript: String,
    pub calls: FunctionCallAccumulator,
}

impl SessionState {
    pub fn new(max_argument_bytes: Option<usize>) -> Self {
        Self {
            calls: FunctionCallAccumulator::new(max_argument_bytes),
            ..Self::default()
        }
    }

    pub fn pending_call(&self) -> Option<&PendingFunctionCall> {
        self.calls.pending()
    }

    /// Take the finished transcript, leaving it empty.
    pub fn take_transcript(&mut self) -> Option<String> {
        if self.transcript.is_empty() {
            None
        } else {
            Some(std::mem::take(&mut self.transcript))
        }
    }
}
