//! Realtime transport over WebSocket.

use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use serde_json::{json, Map, Value};
use tokio::{
    net::TcpStream,
    time::{self, Interval, MissedTickBehavior},
};
use tokio_tungstenite::{
    connect_async,
    tungstenite::{client::IntoClientRequest, http::HeaderValue, Error as WsError, Message},
    MaybeTlsStream, WebSocketStream,
};

use super::Transport;
use crate::config::VoxloopConfig;
use crate::error::VoxloopError;
use crate::protocol::ClientEvent;
use crate::tools::ToolRegistry;

type RealtimeWebSocket = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// A connected realtime WebSocket.
///
/// Sends a `session.update` bootstrap on connect, answers pings, and keeps the
/// connection alive with its own pings at `heartbeat_interval`.
pub struct WebSocketTransport {
    socket: RealtimeWebSocket,
    heartbeat: Interval,
    closed: bool,
}

impl WebSocketTransport {
    /// Connect and send the session bootstrap advertising `tools`.
    pub async fn connect(config: &VoxloopConfig, tools: &ToolRegistry) -> Result<Self, VoxloopError> {
        let api_key = config.resolve_api_key()?;
        let url = config.realtime_url()?;
        let bootstrap = session_update(config, tools);

        let mut socket = connect_realtime_socket(&url, &api_key).await?;
        let payload = bootstrap.to_json()?;
        socket
            .send(Message::Text(payload.into()))
            .await
            .map_err(|error| VoxloopError::Transport(format!("Realtime bootstrap send failed: {error}")))?;
        tracing::info!(model = %config.model, tools = tools.len(), "realtime session connected");

        let mut heartbeat = time::interval(config.heartbeat_interval);
        heartbeat.set_missed_tick_behavior(MissedTickBehavior::Delay);
        heartbeat.tick().await;

        Ok(Self {
            socket,
            heartbeat,
            closed: false,
        })
    }
}

#[async_trait]
impl Transport for WebSocketTransport {
    async fn recv(&mut self) -> Option<Result<Value, VoxloopError>> {
        if self.closed {
            return None;
        }
        loop {
            tokio::select! {
                _ = self.heartbeat.tick() => {
                    if let Err(error) = self.socket.send(Message::Ping(Default::default())).await {
                        self.closed = true;
                        return Some(Err(VoxloopError::Transport(format!(
                            "Realtime heartbeat failed: {error}"
                        ))));
                    }
                }
                frame = self.socket.next() => match frame {
                    Some(Ok(Message::Text(text))) => return Some(parse_payload(&text)),
                    Some(Ok(Message::Binary(bytes))) => match String::from_utf8(bytes.to_vec()) {
                        Ok(text) => return Some(parse_payload(&text)),
                        Err(_) => tracing::debug!(len = bytes.len(), "ignoring non-UTF-8 binary frame"),
                    },
                    Some(Ok(Message::Ping(payload))) => {
                        if let Err(error) = self.socket.send(Message::Pong(payload)).await {
                            self.closed = true;
                            return Some(Err(VoxloopError::Transport(format!(
                                "Realtime pong failed: {error}"
                            ))));
                        }
                    }
                    Some(Ok(Message::Pong(_))) | Some(Ok(Message::Frame(_))) => {}
                    Some(Ok(Message::Close(frame))) => {
                        tracing::info!(?frame, "realtime server closed the connection");
                        self.closed = true;
                        return None;
                    }
                    Some(Err(WsError::ConnectionClosed | WsError::AlreadyClosed)) | None => {
                        self.closed = true;
                        return None;
                    }
                    Some(Err(error)) => {
                        self.closed = true;
                        return Some(Err(VoxloopError::Transport(format!(
                            "Realtime websocket receive failed: {error}"
                        ))));
                    }
                },
            }
        }
    }

    async fn send(&mut self, event: &ClientEvent) -> Result<(), VoxloopError> {
        if self.closed {
            return Err(VoxloopError::TransportClosed);
        }
        let payload = event.to_json()?;
        self.socket
            .send(Message::Text(payload.into()))
            .await
            .map_err(|error| VoxloopError::Transport(format!("Realtime send failed: {error}")))
    }

    async fn close(&mut self) -> Result<(), VoxloopError> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        match self.socket.send(Message::Close(None)).await {
            Ok(()) | Err(WsError::ConnectionClosed | WsError::AlreadyClosed) => Ok(()),
            Err(error) => Err(VoxloopError::Transport(format!("Realtime close failed: {error}"))),
        }
    }
}

/// The `session.update` sent right after connecting.
pub fn session_update(config: &VoxloopConfig, tools: &ToolRegistry) -> ClientEvent {
    let mut session = Map::new();
    session.insert("model".into(), Value::String(config.model.clone()));
    session.insert("modalities".into(), json!(["text", "audio"]));
    session.insert("voice".into(), Value::String(config.voice.to_string()));
    session.insert(
        "input_audio_format".into(),
        Value::String(config.input_format.to_string()),
    );
    session.insert(
        "output_audio_format".into(),
        Value::String(config.output_format.to_string()),
    );
    if let Some(instructions) = &config.instructions {
        session.insert("instructions".into(), Value::String(instructions.clone()));
    }
    if config.turn_detection {
        session.insert("turn_detection".into(), json!({ "type": "server_vad" }));
    }
    if !tools.is_empty() {
        session.insert("tools".into(), Value::Array(tools.session_schemas()));
        session.insert("tool_choice".into(), Value::String("auto".into()));
    }
    ClientEvent::SessionUpdate {
        session: Value::Object(session),
    }
}

fn parse_payload(text: &str) -> Result<Value, VoxloopError> {
    serde_json::from_str::<Value>(text).map_err(|error| {
        VoxloopError::Protocol(format!("Failed to parse realtime event payload: {error}"))
    })
}

async fn connect_realtime_socket(url: &str, api_key: &str) -> Result<RealtimeWebSocket, VoxloopError> {
    let mut request = url.into_client_request().map_err(|error| {
        VoxloopError::Configuration(format!("Invalid realtime websocket URL: {error}"))
    })?;
    let auth_value = HeaderValue::from_str(&format!("Bearer {api_key}")).map_err(|error| {
        VoxloopError::Configuration(format!("Invalid realtime auth header: {error}"))
    })?;
    request.headers_mut().insert("Authorization", auth_value);
    request
        .headers_mut()
        .insert("OpenAI-Beta", HeaderValue::from_static("realtime=v1"));

    connect_async(request)
        .await
        .map(|(socket, _)| socket)
        .map_err(map_connect_error)
}

fn map_connect_error(error: WsError) -> VoxloopError {
    match error {
        WsError::Http(response) => {
            let status = response.status().as_u16();
            if matches!(status, 401 | 403) {
                VoxloopError::Authentication(format!(
                    "Realtime websocket authentication failed with status {status}"
                ))
            } else {
                VoxloopError::Transport(format!(
                    "Realtime websocket handshake failed with status {status}"
                ))
            }
        }
        WsError::Io(error) => VoxloopError::Io(error),
        WsError::Url(error) => {
            VoxloopError::Configuration(format!("Invalid realtime websocket URL: {error}"))
        }
        other => VoxloopError::Transport(format!("Realtime websocket connect failed: {other}")),
    }
}
