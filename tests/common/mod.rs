//! Shared session harness: a channel transport plus recording audio hooks.

#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD as BASE64_STANDARD, Engine};
use serde_json::{json, Value};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use voxloop::audio::{AudioSink, CaptureController, CaptureDevice, PlaybackController};
use voxloop::error::VoxloopError;
use voxloop::protocol::ClientEvent;
use voxloop::session::{SessionEventProcessor, SessionExit, StatusIndicator};
use voxloop::tools::{FnTool, Tool, ToolArguments, ToolExecutionContext, ToolParameters, ToolRegistry};
use voxloop::transport::{ChannelPeer, ChannelTransport};

pub const WAIT: Duration = Duration::from_secs(2);

/// Records indicator transitions.
#[derive(Default)]
pub struct RecordingIndicator(Mutex<Vec<bool>>);

impl RecordingIndicator {
    pub fn transitions(&self) -> Vec<bool> {
        self.0.lock().unwrap().clone()
    }
}

impl StatusIndicator for RecordingIndicator {
    fn set_active(&self, active: bool) {
        self.0.lock().unwrap().push(active);
    }
}

/// Records capture device transitions as `"recording=true"` style strings.
#[derive(Default)]
pub struct RecordingDevice(Mutex<Vec<String>>);

impl RecordingDevice {
    pub fn transitions(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }
}

impl CaptureDevice for RecordingDevice {
    fn set_recording(&self, recording: bool) {
        self.0.lock().unwrap().push(format!("recording={recording}"));
    }

    fn set_receiving(&self, receiving: bool) {
        self.0.lock().unwrap().push(format!("receiving={receiving}"));
    }
}

/// Reports every chunk it starts playing. Chunks starting with `0xFF` play
/// until interrupted.
pub struct GatedSink {
    started: mpsc::UnboundedSender<Vec<u8>>,
}

#[async_trait]
impl AudioSink for GatedSink {
    async fn play(&self, chunk: &[u8]) -> Result<(), VoxloopError> {
        let _ = self.started.send(chunk.to_vec());
        if chunk.first() == Some(&0xFF) {
            std::future::pending::<()>().await;
        }
        Ok(())
    }
}

pub struct Harness {
    pub peer: ChannelPeer,
    pub session: JoinHandle<Result<SessionExit, VoxloopError>>,
    pub indicator: Arc<RecordingIndicator>,
    pub device: Arc<RecordingDevice>,
    pub played: mpsc::UnboundedReceiver<Vec<u8>>,
}

impl Harness {
    pub fn start(registry: ToolRegistry) -> Self {
        Self::start_with(registry, |processor| processor)
    }

    pub fn start_with(
        registry: ToolRegistry,
        configure: impl FnOnce(SessionEventProcessor) -> SessionEventProcessor,
    ) -> Self {
        let (transport, peer) = ChannelTransport::pair();
        let indicator = Arc::new(RecordingIndicator::default());
        let device = Arc::new(RecordingDevice::default());
        let (started, played) = mpsc::unbounded_channel();
        let playback = PlaybackController::new(Arc::new(GatedSink { started }));
        let processor = SessionEventProcessor::new(registry, playback)
            .with_capture(CaptureController::with_device(device.clone()))
            .with_indicator(indicator.clone());
        let session = tokio::spawn(configure(processor).run(transport));
        Self {
            peer,
            session,
            indicator,
            device,
            played,
        }
    }

    pub fn send(&self, payload: Value) {
        self.peer.send_event(payload).expect("session should be listening");
    }

    /// Stream a complete function call: added, one delta per fragment, done.
    pub fn call(&self, call_id: &str, name: &str, fragments: &[&str]) {
        self.send(json!({
            "type": "response.output_item.added",
            "item": {"type": "function_call", "call_id": call_id, "name": name}
        }));
        for fragment in fragments {
            self.send(json!({
                "type": "response.function_call_arguments.delta",
                "call_id": call_id,
                "delta": fragment
            }));
        }
        self.send(json!({"type": "response.function_call_arguments.done", "call_id": call_id}));
    }

    pub fn audio(&self, bytes: &[u8]) {
        self.send(json!({"type": "response.audio.delta", "delta": BASE64_STANDARD.encode(bytes)}));
    }

    pub async fn next_event(&mut self) -> ClientEvent {
        tokio::time::timeout(WAIT, self.peer.next_client_event())
            .await
            .expect("client event should arrive")
            .expect("session outbound channel open")
    }

    /// Next `function_call_output`, checked to be followed by `response.create`.
    pub async fn next_output(&mut self) -> (String, Value) {
        let item = self.next_event().await;
        let (call_id, output) = output_of(&item);
        assert_eq!(self.next_event().await, ClientEvent::ResponseCreate);
        (call_id, output)
    }

    pub async fn next_played(&mut self) -> Vec<u8> {
        tokio::time::timeout(WAIT, self.played.recv())
            .await
            .expect("chunk should start playing")
            .expect("sink channel open")
    }

    /// Close the server side and wait for the session to end.
    pub async fn close(mut self) -> (Result<SessionExit, VoxloopError>, ChannelPeer) {
        self.peer.close();
        let exit = self.finish().await;
        (exit, self.peer)
    }

    pub async fn finish(&mut self) -> Result<SessionExit, VoxloopError> {
        tokio::time::timeout(WAIT, &mut self.session)
            .await
            .expect("session should end")
            .expect("session task should not panic")
    }
}

pub fn output_of(event: &ClientEvent) -> (String, Value) {
    let wire: Value = serde_json::from_str(&event.to_json().unwrap()).unwrap();
    assert_eq!(wire["type"], "conversation.item.create", "unexpected event {wire}");
    assert_eq!(wire["item"]["type"], "function_call_output");
    let output = wire["item"]["output"].as_str().expect("output is a JSON string");
    (
        wire["item"]["call_id"].as_str().unwrap().to_string(),
        serde_json::from_str(output).expect("output decodes to JSON"),
    )
}

pub fn tool<F, Fut>(name: &str, handler: F) -> Arc<dyn Tool>
where
    F: Fn(ToolArguments, ToolExecutionContext) -> Fut + Send + Sync + 'static,
    Fut: std::future::Future<Output = Result<Value, VoxloopError>> + Send + 'static,
{
    Arc::new(FnTool::new(name, "test tool", ToolParameters::empty(), handler))
}

pub fn echo_registry() -> ToolRegistry {
    let mut registry = ToolRegistry::new();
    registry
        .register(tool("Echo", |args, _| async move { Ok::<_, VoxloopError>(args.into_raw()) }))
        .unwrap();
    registry
}
