//! Realtime session core: the event loop and the pieces it drives.

pub mod accumulator;
pub mod classifier;
pub mod dispatch;
pub mod latency;
pub mod processor;
pub mod state;
pub mod status;

pub use accumulator::{
    AccumulatorError, FinalizedArguments, FinalizedCall, FunctionCallAccumulator,
    PendingFunctionCall,
};
pub use classifier::{classify_error, ErrorPolicy};
pub use dispatch::ToolResult;
pub use latency::LatencyRecorder;
pub use processor::{SessionEventProcessor, SessionExit};
pub use state::SessionState;
pub use status::{NoopIndicator, StatusIndicator, TracingIndicator};
