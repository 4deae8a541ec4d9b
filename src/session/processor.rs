//! The session event loop.

use std::sync::Arc;
use std::time::Instant;

use base64::{engine::general_purpose::STANDARD as BASE64_STANDARD, Engine};
use serde_json::Value;
use tokio::task::JoinSet;
use tracing::Instrument;
use uuid::Uuid;

use super::accumulator::{FinalizedArguments, FinalizedCall};
use super::classifier::{classify_error, ErrorPolicy};
use super::dispatch::{invoke_tool, ToolResult};
use super::latency::{LatencyRecorder, RESPONSE_LATENCY};
use super::state::SessionState;
use super::status::{NoopIndicator, StatusIndicator};
use crate::audio::{CaptureController, PlaybackController};
use crate::config::VoxloopConfig;
use crate::error::VoxloopError;
use crate::protocol::{OutputItem, ServerEvent};
use crate::tools::{ToolArguments, ToolRegistry};
use crate::transport::Transport;

/// Why a session ended without a transport failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionExit {
    /// The transport reported closure.
    Closed,
    /// The server sent an error the session cannot survive.
    Fatal { message: String },
}

enum Flow {
    Continue,
    Stop(SessionExit),
}

/// Drives one realtime session: consumes inbound events in order, keeps audio
/// capture and playback consistent with the conversation, and reconstructs and
/// dispatches tool calls.
///
/// The processor owns its controllers. Tool calls run as spawned tasks whose
/// results come back through the loop, so every outbound send happens on the
/// loop and a result's `conversation.item.create` is always directly followed
/// by its `response.create`.
pub struct SessionEventProcessor {
    id: Uuid,
    registry: ToolRegistry,
    playback: PlaybackController,
    capture: CaptureController,
    indicator: Arc<dyn StatusIndicator>,
    latency: LatencyRecorder,
    state: SessionState,
    tool_tasks: JoinSet<ToolResult>,
}

impl SessionEventProcessor {
    pub fn new(registry: ToolRegistry, playback: PlaybackController) -> Self {
        Self {
            id: Uuid::new_v4(),
            registry,
            playback,
            capture: CaptureController::new(),
            indicator: Arc::new(NoopIndicator),
            latency: LatencyRecorder::default(),
            state: SessionState::new(Some(crate::config::DEFAULT_MAX_ARGUMENT_BYTES)),
            tool_tasks: JoinSet::new(),
        }
    }

    pub fn with_capture(mut self, capture: CaptureController) -> Self {
        self.capture = capture;
        self
    }

    pub fn with_indicator(mut self, indicator: Arc<dyn StatusIndicator>) -> Self {
        self.indicator = indicator;
        self
    }

    pub fn with_latency_recorder(mut self, latency: LatencyRecorder) -> Self {
        self.latency = latency;
        self
    }

    /// Bound a single call's argument buffer; `None` disables the bound.
    pub fn with_max_argument_bytes(mut self, max_bytes: Option<usize>) -> Self {
        self.state = SessionState::new(max_bytes);
        self
    }

    /// Apply the session-level settings of `config`.
    pub fn with_config(self, config: &VoxloopConfig) -> Self {
        self.with_max_argument_bytes(config.max_argument_bytes)
            .with_latency_recorder(LatencyRecorder::new(config.latency_log_path.clone()))
    }

    /// Local id used to correlate this session's logs.
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn capture(&self) -> &CaptureController {
        &self.capture
    }

    pub fn capture_mut(&mut self) -> &mut CaptureController {
        &mut self.capture
    }

    pub fn playback(&self) -> &PlaybackController {
        &self.playback
    }

    /// Process events until the transport closes, a fatal server error
    /// arrives, or the transport fails. Audio is torn down in every case.
    pub async fn run<T: Transport>(mut self, mut transport: T) -> Result<SessionExit, VoxloopError> {
        let span = tracing::info_span!("session", id = %self.id);
        async move {
            tracing::info!(tools = self.registry.len(), "session started");
            let outcome = self.event_loop(&mut transport).await;
            self.teardown(&mut transport).await;
            match &outcome {
                Ok(exit) => tracing::info!(?exit, "session ended"),
                Err(error) => tracing::error!(%error, "session failed"),
            }
            outcome
        }
        .instrument(span)
        .await
    }

    async fn event_loop<T: Transport>(&mut self, transport: &mut T) -> Result<SessionExit, VoxloopError> {
        loop {
            tokio::select! {
                biased;
                Some(joined) = self.tool_tasks.join_next(), if !self.tool_tasks.is_empty() => {
                    match joined {
                        Ok(result) => self.deliver(transport, result).await?,
                        Err(error) => tracing::error!(%error, "tool task ended without a result"),
                    }
                }
                next = transport.recv() => match next {
                    None => return Ok(SessionExit::Closed),
                    Some(Err(error)) if error.is_fatal() => return Err(error),
                    Some(Err(error)) => {
                        tracing::warn!(%error, "skipping unreadable inbound frame");
                    }
                    Some(Ok(payload)) => {
                        if let Flow::Stop(exit) = self.handle_payload(payload).await {
                            return Ok(exit);
                        }
                    }
                },
            }
        }
    }

    async fn handle_payload(&mut self, payload: Value) -> Flow {
        let Some(event) = ServerEvent::from_server_payload(&payload) else {
            tracing::warn!(%payload, "ignoring inbound payload without a type");
            return Flow::Continue;
        };
        tracing::debug!(direction = "incoming", event_type = event.event_type(), "event");
        self.handle_event(event).await
    }

    async fn handle_event(&mut self, event: ServerEvent) -> Flow {
        match event {
            ServerEvent::ResponseCreated { response_id } => {
                if self.playback.is_active() {
                    tracing::info!("new response while audio is playing, interrupting playback");
                    self.playback.stop();
                }
                tracing::debug!(?response_id, "response started");
                self.state.assistant_active = true;
                self.indicator.set_active(true);
                self.capture.start_receiving();
            }
            ServerEvent::OutputItemAdded { item } => self.open_call(&item),
            ServerEvent::FunctionCallArgumentsDelta { call_id, delta } => {
                if let Err(error) = self.state.calls.accumulate(call_id.as_deref(), &delta) {
                    tracing::warn!(%error, "dropping function call arguments fragment");
                }
            }
            ServerEvent::FunctionCallArgumentsDone { call_id } => self.finish_call(call_id),
            ServerEvent::TextDelta { delta } => self.state.transcript.push_str(&delta),
            ServerEvent::AudioDelta { delta } => match BASE64_STANDARD.decode(delta.as_bytes()) {
                Ok(bytes) => {
                    if let Err(error) = self.playback.enqueue_chunk(bytes) {
                        tracing::warn!(%error, "failed to queue audio chunk");
                    }
                }
                Err(error) => tracing::warn!(%error, "skipping undecodable audio delta"),
            },
            ServerEvent::ResponseDone { response_id } => self.finish_response(response_id).await,
            ServerEvent::RateLimitsUpdated => {
                self.capture.start_recording();
            }
            ServerEvent::Error { message, code } => {
                match classify_error(&message, code.as_deref()) {
                    ErrorPolicy::Ignore => {
                        tracing::info!(%message, ?code, "ignoring expected server error");
                    }
                    ErrorPolicy::LogAndContinue => {
                        tracing::error!(%message, ?code, "server error");
                    }
                    ErrorPolicy::Fatal => {
                        tracing::error!(%message, ?code, "fatal server error, ending session");
                        return Flow::Stop(SessionExit::Fatal { message });
                    }
                }
            }
            ServerEvent::SpeechStarted => {
                tracing::info!("speech started");
                self.indicator.set_active(true);
            }
            ServerEvent::SpeechStopped => {
                tracing::info!("speech stopped");
                self.capture.stop_recording();
                self.indicator.set_active(false);
                self.state.response_started_at = Some(Instant::now());
            }
            ServerEvent::SessionCreated { session_id } => {
                tracing::info!(%session_id, "server session created");
                self.state.server_session_id = Some(session_id);
            }
            ServerEvent::SessionUpdated { .. }
            | ServerEvent::ConversationItemCreated { .. }
            | ServerEvent::ConversationItemDeleted { .. }
            | ServerEvent::ConversationItemTruncated { .. } => {}
            ServerEvent::Unknown { event_type } => {
                tracing::debug!(%event_type, "unhandled event type");
            }
        }
        Flow::Continue
    }

    fn open_call(&mut self, item: &OutputItem) {
        if !item.is_function_call() {
            tracing::debug!(item_type = %item.item_type, "output item added");
            return;
        }
        match self.state.calls.open(item) {
            Ok(pending) if pending.name.is_empty() => {
                tracing::warn!(call_id = %pending.call_id, "function call item has no name");
            }
            Ok(pending) => {
                tracing::info!(
                    call_id = %pending.call_id,
                    tool_name = %pending.name,
                    "function call started"
                );
            }
            Err(error) => tracing::error!(%error, "rejected function call item"),
        }
    }

    fn finish_call(&mut self, call_id: Option<String>) {
        if let (Some(done_id), Some(pending)) = (call_id.as_deref(), self.state.pending_call()) {
            if done_id != pending.call_id {
                tracing::warn!(
                    %done_id,
                    pending_id = %pending.call_id,
                    "arguments done for a different call, finalizing the pending call"
                );
            }
        }
        match self.state.calls.finalize() {
            Ok(call) => self.dispatch(call),
            Err(error) => tracing::warn!(%error, "ignoring function call arguments done"),
        }
    }

    fn dispatch(&mut self, call: FinalizedCall) {
        let FinalizedCall {
            call_id,
            name,
            arguments,
        } = call;
        let arguments = match arguments {
            FinalizedArguments::Parsed(arguments) => arguments,
            FinalizedArguments::Substituted { reason } => {
                tracing::warn!(%call_id, tool_name = %name, %reason, "unparsable function arguments, using {{}}");
                ToolArguments::empty()
            }
            FinalizedArguments::Overflowed { limit } => {
                tracing::error!(%call_id, tool_name = %name, limit, "function arguments too large");
                let result = ToolResult::arguments_too_large(call_id, &name, limit);
                self.tool_tasks.spawn(async move { result });
                return;
            }
        };

        match self.registry.resolve(&name) {
            Some(tool) => {
                tracing::info!(%call_id, tool_name = %name, arguments = %arguments.raw(), "calling tool");
                self.tool_tasks
                    .spawn(invoke_tool(tool, call_id, name, arguments));
            }
            None => {
                tracing::warn!(%call_id, tool_name = %name, "function not found");
                let result = ToolResult::not_found(call_id, &name);
                self.tool_tasks.spawn(async move { result });
            }
        }
    }

    async fn finish_response(&mut self, response_id: Option<String>) {
        if let Err(error) = self.playback.finish() {
            tracing::warn!(%error, "failed to mark end of response audio");
        }
        if let Some(transcript) = self.state.take_transcript() {
            tracing::info!(%transcript, "assistant response");
        }
        tracing::debug!(?response_id, "response done");
        self.capture.stop_receiving();
        self.capture.start_recording();
        self.indicator.set_active(false);
        self.state.assistant_active = false;

        if let Some(started) = self.state.response_started_at.take() {
            if let Err(error) = self.latency.record(RESPONSE_LATENCY, started.elapsed()).await {
                tracing::warn!(%error, "failed to record response latency");
            }
        }
    }

    async fn deliver<T: Transport>(&mut self, transport: &mut T, result: ToolResult) -> Result<(), VoxloopError> {
        tracing::info!(
            call_id = %result.call_id,
            tool_name = %result.tool_name,
            is_error = result.is_error,
            output = %result.output,
            "function call finished"
        );
        for event in result.into_events() {
            tracing::debug!(direction = "outgoing", event_type = event.event_type(), "event");
            transport.send(&event).await?;
        }
        Ok(())
    }

    async fn teardown<T: Transport>(&mut self, transport: &mut T) {
        self.playback.stop();
        self.capture.shutdown();
        self.indicator.set_active(false);
        self.state.assistant_active = false;
        if let Some(abandoned) = self.state.calls.abandon() {
            tracing::debug!(call_id = %abandoned.call_id, "dropping unfinished function call");
        }
        if !self.tool_tasks.is_empty() {
            tracing::info!(count = self.tool_tasks.len(), "abandoning running tool calls");
        }
        self.tool_tasks.shutdown().await;
        self.playback.shutdown().await;
        if let Err(error) = transport.close().await {
            tracing::debug!(%error, "transport close failed");
        }
    }
}
