//! Response latency reporting.

use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::Local;
use serde::Serialize;
use tokio::fs::OpenOptions;
use tokio::io::AsyncWriteExt;

use crate::error::VoxloopError;

/// Label used for end-of-speech to end-of-response timings.
pub const RESPONSE_LATENCY: &str = "realtime_api_response";

#[derive(Debug, Serialize)]
struct LatencyRecord<'a> {
    timestamp: String,
    function: &'a str,
    duration: String,
}

/// Logs timings and optionally appends them as JSON lines to a file.
#[derive(Debug, Clone, Default)]
pub struct LatencyRecorder {
    log_path: Option<PathBuf>,
}

impl LatencyRecorder {
    pub fn new(log_path: Option<PathBuf>) -> Self {
        Self { log_path }
    }

    pub fn log_path(&self) -> Option<&Path> {
        self.log_path.as_deref()
    }

    pub async fn record(&self, function: &str, elapsed: Duration) -> Result<(), VoxloopError> {
        let seconds = elapsed.as_secs_f64();
        tracing::info!(function, duration_secs = seconds, "{function} took {seconds:.4}s");

        let Some(path) = &self.log_path else {
            return Ok(());
        };
        let record = LatencyRecord {
            timestamp: Local::now().to_rfc3339(),
            function,
            duration: format!("{seconds:.4}"),
        };
        let mut line = serde_json::to_string(&record)?;
        line.push('\n');
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .await?;
        file.write_all(line.as_bytes()).await?;
        file.flush().await?;
        Ok(())
    }
}
