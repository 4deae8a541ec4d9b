//! voxloop: a realtime speech-to-speech session runtime.
//!
//! Connects to a realtime voice endpoint, keeps local audio capture and
//! playback in step with the conversation, and answers the model's streamed
//! function calls from an explicit tool registry.
//!
//! # Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use voxloop::prelude::*;
//!
//! # async fn example() -> voxloop::error::Result<()> {
//! let config = VoxloopConfig::load(None)?;
//! let mut registry = ToolRegistry::new();
//! for tool in voxloop::tools::builtin::all_tools() {
//!     registry.register(tool)?;
//! }
//! let transport = WebSocketTransport::connect(&config, &registry).await?;
//! let playback = PlaybackController::new(Arc::new(NullSink));
//! let exit = SessionEventProcessor::new(registry, playback)
//!     .with_config(&config)
//!     .run(transport)
//!     .await?;
//! println!("{exit:?}");
//! # Ok(())
//! # }
//! ```

pub mod audio;
pub mod config;
pub mod error;
pub mod prelude;
pub mod protocol;
pub mod session;
pub mod tools;
pub mod transport;

#[cfg(feature = "cli")]
pub mod cli;
