//! Binary "assistant is active" indicator.

/// Receives every active/inactive transition of the session.
///
/// Implementations should return quickly; they run on the session loop.
pub trait StatusIndicator: Send + Sync {
    fn set_active(&self, active: bool);
}

/// Ignores transitions.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopIndicator;

impl StatusIndicator for NoopIndicator {
    fn set_active(&self, _active: bool) {}
}

/// Reports transitions through `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingIndicator;

impl StatusIndicator for TracingIndicator {
    fn set_active(&self, active: bool) {
        tracing::info!(active, "assistant status");
    }
}
