//! Ordered, bidirectional event channel to the realtime endpoint.

pub mod channel;
#[cfg(feature = "websocket")]
pub mod websocket;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::VoxloopError;
use crate::protocol::ClientEvent;

pub use channel::{ChannelPeer, ChannelTransport};
#[cfg(feature = "websocket")]
pub use websocket::WebSocketTransport;

/// A persistent connection carrying JSON events.
///
/// Implementations deliver inbound payloads in arrival order. `recv` must be
/// cancel-safe: the session loop polls it alongside tool completions and may
/// drop the future without losing a payload.
#[async_trait]
pub trait Transport: Send {
    /// Next inbound payload. `None` once the connection is closed; `Err` for a
    /// frame that could not be read (fatal errors end the session).
    async fn recv(&mut self) -> Option<Result<Value, VoxloopError>>;

    /// Send one outbound event. Each call writes a whole event.
    async fn send(&mut self, event: &ClientEvent) -> Result<(), VoxloopError>;

    /// Close the connection. Safe to call more than once.
    async fn close(&mut self) -> Result<(), VoxloopError>;
}
