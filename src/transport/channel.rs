//! In-process transport backed by tokio channels.
//!
//! The session side implements [`Transport`]; the [`ChannelPeer`] plays the
//! server: it injects inbound payloads and observes what the session sends.

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::mpsc;

use super::Transport;
use crate::error::VoxloopError;
use crate::protocol::ClientEvent;

/// Session half of an in-process connection.
#[derive(Debug)]
pub struct ChannelTransport {
    inbound: mpsc::UnboundedReceiver<Result<Value, VoxloopError>>,
    outbound: mpsc::UnboundedSender<ClientEvent>,
    closed: bool,
}

/// Server half of an in-process connection.
#[derive(Debug)]
pub struct ChannelPeer {
    inbound: Option<mpsc::UnboundedSender<Result<Value, VoxloopError>>>,
    outbound: mpsc::UnboundedReceiver<ClientEvent>,
}

/// Create a connected transport/peer pair.
pub fn channel() -> (ChannelTransport, ChannelPeer) {
    let (inbound_tx, inbound_rx) = mpsc::unbounded_channel();
    let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
    (
        ChannelTransport {
            inbound: inbound_rx,
            outbound: outbound_tx,
            closed: false,
        },
        ChannelPeer {
            inbound: Some(inbound_tx),
            outbound: outbound_rx,
        },
    )
}

impl ChannelTransport {
    pub fn pair() -> (Self, ChannelPeer) {
        channel()
    }
}

#[async_trait]
impl Transport for ChannelTransport {
    async fn recv(&mut self) -> Option<Result<Value, VoxloopError>> {
        if self.closed {
            return None;
        }
        let next = self.inbound.recv().await;
        if next.is_none() {
            self.closed = true;
        }
        next
    }

    async fn send(&mut self, event: &ClientEvent) -> Result<(), VoxloopError> {
        if self.closed {
            return Err(VoxloopError::TransportClosed);
        }
        self.outbound
            .send(event.clone())
            .map_err(|_| VoxloopError::TransportClosed)
    }

    async fn close(&mut self) -> Result<(), VoxloopError> {
        self.closed = true;
        self.inbound.close();
        Ok(())
    }
}

impl ChannelPeer {
    /// Deliver a server payload to the session.
    pub fn send_event(&self, payload: Value) -> Result<(), VoxloopError> {
        self.push(Ok(payload))
    }

    /// Deliver a read failure to the session.
    pub fn fail(&self, error: VoxloopError) -> Result<(), VoxloopError> {
        self.push(Err(error))
    }

    /// Close the server side; the session sees end-of-stream after draining.
    pub fn close(&mut self) {
        self.inbound.take();
    }

    /// Next event the session sent, waiting if necessary.
    pub async fn next_client_event(&mut self) -> Option<ClientEvent> {
        self.outbound.recv().await
    }

    /// Next event the session sent, if one is already buffered.
    pub fn try_next_client_event(&mut self) -> Option<ClientEvent> {
        self.outbound.try_recv().ok()
    }

    fn push(&self, item: Result<Value, VoxloopError>) -> Result<(), VoxloopError> {
        self.inbound
            .as_ref()
            .ok_or(VoxloopError::TransportClosed)?
            .send(item)
            .map_err(|_| VoxloopError::TransportClosed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn delivers_in_order_then_closes() {
        let (mut transport, mut peer) = channel();
        peer.send_event(json!({"type": "a"})).unwrap();
        peer.send_event(json!({"type": "b"})).unwrap();
        peer.close();

        assert_eq!(transport.recv().await.unwrap().unwrap()["type"], "a");
        assert_eq!(transport.recv().await.unwrap().unwrap()["type"], "b");
        assert!(transport.recv().await.is_none());
        assert!(transport.recv().await.is_none());
        assert!(peer.send_event(json!({"type": "c"})).is_err());
    }

    #[tokio::test]
    async fn outbound_events_reach_peer() {
        let (mut transport, mut peer) = channel();
        transport.send(&ClientEvent::ResponseCreate).await.unwrap();
        assert_eq!(peer.next_client_event().await, Some(ClientEvent::ResponseCreate));
        assert!(peer.try_next_client_event().is_none());
    }

    #[tokio::test]
    async fn send_after_close_fails() {
        let (mut transport, _peer) = channel();
        transport.close().await.unwrap();
        transport.close().await.unwrap();
        assert!(matches!(
            transport.send(&ClientEvent::ResponseCreate).await,
            Err(VoxloopError::TransportClosed)
        ));
        assert!(transport.recv().await.is_none());
    }
}
