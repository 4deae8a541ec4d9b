//! `run` and `tools` command handlers.

use std::path::Path;
use std::sync::Arc;

use crate::audio::{AudioSink, NullSink, PlaybackController, WriterSink};
use crate::config::VoxloopConfig;
use crate::error::VoxloopError;
use crate::session::{SessionEventProcessor, SessionExit, TracingIndicator};
use crate::tools::{builtin, ToolRegistry};
use crate::transport::WebSocketTransport;

use super::RunArgs;

/// Registry holding the built-in tools.
pub fn builtin_registry() -> Result<ToolRegistry, VoxloopError> {
    let mut registry = ToolRegistry::new();
    for tool in builtin::all_tools() {
        registry.register(tool)?;
    }
    Ok(registry)
}

/// Connect, run one session to completion and report how it ended.
pub async fn handle_run(config_path: Option<&Path>, args: RunArgs) -> Result<SessionExit, VoxloopError> {
    let mut config = VoxloopConfig::load(config_path)?;
    if let Some(model) = args.model {
        config.model = model;
    }
    if let Some(voice) = args.voice {
        config.voice = voice;
    }
    if let Some(instructions) = args.instructions {
        config.instructions = Some(instructions);
    }
    if let Some(path) = args.latency_log {
        config.latency_log_path = Some(path);
    }

    let sink: Arc<dyn AudioSink> = match &args.audio_out {
        Some(path) => {
            let file = tokio::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .await?;
            tracing::info!(path = %path.display(), "writing assistant audio");
            Arc::new(WriterSink::new(file))
        }
        None => Arc::new(NullSink),
    };

    let registry = builtin_registry()?;
    let transport = WebSocketTransport::connect(&config, &registry).await?;
    let playback = PlaybackController::new(sink);
    let mut processor = SessionEventProcessor::new(registry, playback)
        .with_config(&config)
        .with_indicator(Arc::new(TracingIndicator));
    processor.capture_mut().start_recording();
    processor.run(transport).await
}

/// Print the `tools` array of the session bootstrap.
pub fn handle_tools() -> Result<(), VoxloopError> {
    let registry = builtin_registry()?;
    let schemas = serde_json::to_string_pretty(&registry.session_schemas())?;
    println!("{schemas}");
    Ok(())
}
