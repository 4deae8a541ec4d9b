//! Configuration system (layered: defaults < TOML file < environment).

use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use serde::Deserialize;

use crate::audio::types::{AudioFormat, Voice};
use crate::error::VoxloopError;

pub const DEFAULT_BASE_URL: &str = "wss://api.openai.com/v1/realtime";
pub const DEFAULT_MODEL: &str = "gpt-4o-realtime-preview-2024-10-01";
pub const DEFAULT_HEARTBEAT_INTERVAL: Duration = Duration::from_secs(20);
pub const DEFAULT_MAX_ARGUMENT_BYTES: usize = 1024 * 1024;

/// Settings for one realtime session.
///
/// Resolution order:
/// 1. Built-in defaults
/// 2. `~/.voxloop/config.toml` (or an explicit file)
/// 3. Environment (`OPENAI_API_KEY`, `VOXLOOP_*`, `.env` honored)
#[derive(Debug, Clone)]
pub struct VoxloopConfig {
    pub api_key: Option<String>,
    pub base_url: String,
    pub model: String,
    pub voice: Voice,
    pub instructions: Option<String>,
    pub input_format: AudioFormat,
    pub output_format: AudioFormat,
    pub turn_detection: bool,
    pub heartbeat_interval: Duration,
    /// Upper bound for one streamed argument buffer; `None` disables the bound.
    pub max_argument_bytes: Option<usize>,
    /// When set, response latencies are appended here as JSON lines.
    pub latency_log_path: Option<PathBuf>,
}

impl Default for VoxloopConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: DEFAULT_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            voice: Voice::default(),
            instructions: None,
            input_format: AudioFormat::Pcm16,
            output_format: AudioFormat::Pcm16,
            turn_detection: true,
            heartbeat_interval: DEFAULT_HEARTBEAT_INTERVAL,
            max_argument_bytes: Some(DEFAULT_MAX_ARGUMENT_BYTES),
            latency_log_path: None,
        }
    }
}

/// On-disk shape of `config.toml`. Every key is optional.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ConfigFile {
    base_url: Option<String>,
    model: Option<String>,
    voice: Option<Voice>,
    instructions: Option<String>,
    input_format: Option<AudioFormat>,
    output_format: Option<AudioFormat>,
    turn_detection: Option<bool>,
    heartbeat_interval_secs: Option<u64>,
    /// `0` disables the bound.
    max_argument_bytes: Option<usize>,
    latency_log_path: Option<PathBuf>,
}

impl VoxloopConfig {
    /// Full layered load. `path` overrides the default file location; a missing
    /// default file is not an error, a missing explicit file is.
    pub fn load(path: Option<&Path>) -> Result<Self, VoxloopError> {
        let _ = dotenvy::dotenv();
        let mut config = match path {
            Some(path) => Self::from_toml_file(path)?,
            None => {
                let default_path = default_config_path();
                if default_path.exists() {
                    Self::from_toml_file(&default_path)?
                } else {
                    Self::default()
                }
            }
        };
        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Parse a TOML document over the defaults.
    pub fn from_toml_str(raw: &str) -> Result<Self, VoxloopError> {
        let file: ConfigFile = toml::from_str(raw)
            .map_err(|e| VoxloopError::Configuration(format!("Invalid config file: {e}")))?;
        let mut config = Self::default();
        config.apply_file(file);
        Ok(config)
    }

    /// Read and parse a TOML file over the defaults.
    pub fn from_toml_file(path: &Path) -> Result<Self, VoxloopError> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            VoxloopError::Configuration(format!("Cannot read {}: {e}", path.display()))
        })?;
        Self::from_toml_str(&raw)
    }

    fn apply_file(&mut self, file: ConfigFile) {
        if let Some(base_url) = file.base_url {
            self.base_url = base_url;
        }
        if let Some(model) = file.model {
            self.model = model;
        }
        if let Some(voice) = file.voice {
            self.voice = voice;
        }
        if file.instructions.is_some() {
            self.instructions = file.instructions;
        }
        if let Some(format) = file.input_format {
            self.input_format = format;
        }
        if let Some(format) = file.output_format {
            self.output_format = format;
        }
        if let Some(turn_detection) = file.turn_detection {
            self.turn_detection = turn_detection;
        }
        if let Some(secs) = file.heartbeat_interval_secs {
            self.heartbeat_interval = Duration::from_secs(secs.max(1));
        }
        if let Some(limit) = file.max_argument_bytes {
            self.max_argument_bytes = (limit > 0).then_some(limit);
        }
        if file.latency_log_path.is_some() {
            self.latency_log_path = file.latency_log_path;
        }
    }

    /// Overlay environment values fetched through `lookup`.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let lookup = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        if let Some(key) = lookup("OPENAI_API_KEY") {
            self.api_key = Some(key);
        }
        if let Some(url) = lookup("VOXLOOP_BASE_URL") {
            self.base_url = url;
        }
        if let Some(model) = lookup("VOXLOOP_MODEL") {
            self.model = model;
        }
        if let Some(raw) = lookup("VOXLOOP_VOICE") {
            match Voice::from_str(raw.trim()) {
                Ok(voice) => self.voice = voice,
                Err(_) => tracing::warn!(voice = %raw, "ignoring unknown VOXLOOP_VOICE"),
            }
        }
        if let Some(instructions) = lookup("VOXLOOP_INSTRUCTIONS") {
            self.instructions = Some(instructions);
        }
        if let Some(path) = lookup("VOXLOOP_LATENCY_LOG") {
            self.latency_log_path = Some(PathBuf::from(path));
        }
    }

    /// API key, or an authentication error when none is configured.
    pub fn resolve_api_key(&self) -> Result<String, VoxloopError> {
        self.api_key
            .clone()
            .filter(|value| !value.trim().is_empty())
            .ok_or_else(|| VoxloopError::Authentication("Missing OPENAI_API_KEY".into()))
    }

    /// WebSocket URL with the model query parameter.
    pub fn realtime_url(&self) -> Result<String, VoxloopError> {
        let trimmed = self.base_url.trim();
        if trimmed.is_empty() {
            return Err(VoxloopError::Configuration(
                "Realtime base URL cannot be empty".into(),
            ));
        }
        let separator = if trimmed.contains('?') { "&" } else { "?" };
        let model: String = url::form_urlencoded::byte_serialize(self.model.as_bytes()).collect();
        Ok(format!("{trimmed}{separator}model={model}"))
    }
}

/// `~/.voxloop/config.toml`, falling back to a relative `.voxloop` directory.
pub fn default_config_path() -> PathBuf {
    directories::UserDirs::new()
        .map(|dirs| dirs.home_dir().join(".voxloop"))
        .unwrap_or_else(|| PathBuf::from(".voxloop"))
        .join("config.toml")
}
