//! Convenience re-exports for common use.

pub use crate::audio::{
    AudioSink, CaptureController, CaptureDevice, NullSink, PlaybackController, Voice, WriterSink,
};
pub use crate::config::VoxloopConfig;
pub use crate::error::{Result, VoxloopError};
pub use crate::protocol::{ClientEvent, ServerEvent};
pub use crate::session::{SessionEventProcessor, SessionExit, StatusIndicator};
pub use crate::tools::{FnTool, Tool, ToolArguments, ToolParameters, ToolRegistry};
pub use crate::transport::{ChannelPeer, ChannelTransport, Transport};
#[cfg(feature = "websocket")]
pub use crate::transport::WebSocketTransport;
