//! Local input (microphone) state.

use std::fmt;
use std::sync::Arc;

/// Hook for the device that actually captures audio.
///
/// Both callbacks fire only on real transitions; redundant start/stop calls on
/// the controller never reach the device.
pub trait CaptureDevice: Send + Sync {
    fn set_recording(&self, recording: bool);

    fn set_receiving(&self, _receiving: bool) {}
}

/// Owns the two independent capture modes.
///
/// `recording` is user-speech capture. `receiving` is the passive mode held
/// while the assistant replies so the microphone does not compete with
/// playback. Every start/stop is idempotent.
#[derive(Default)]
pub struct CaptureController {
    recording: bool,
    receiving: bool,
    device: Option<Arc<dyn CaptureDevice>>,
}

impl CaptureController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_device(device: Arc<dyn CaptureDevice>) -> Self {
        Self {
            device: Some(device),
            ..Self::default()
        }
    }

    pub fn is_recording(&self) -> bool {
        self.recording
    }

    pub fn is_receiving(&self) -> bool {
        self.receiving
    }

    /// Returns `true` when the call changed state.
    pub fn start_recording(&mut self) -> bool {
        self.set_recording(true)
    }

    pub fn stop_recording(&mut self) -> bool {
        self.set_recording(false)
    }

    pub fn start_receiving(&mut self) -> bool {
        self.set_receiving(true)
    }

    pub fn stop_receiving(&mut self) -> bool {
        self.set_receiving(false)
    }

    /// Leave both modes.
    pub fn shutdown(&mut self) {
        self.stop_recording();
        self.stop_receiving();
    }

    fn set_recording(&mut self, recording: bool) -> bool {
        if self.recording == recording {
            return false;
        }
        self.recording = recording;
        tracing::debug!(recording, "capture recording changed");
        if let Some(device) = &self.device {
            device.set_recording(recording);
        }
        true
    }

    fn set_receiving(&mut self, receiving: bool) -> bool {
        if self.receiving == receiving {
            return false;
        }
        self.receiving = receiving;
        tracing::debug!(receiving, "capture receiving changed");
        if let Some(device) = &self.device {
            device.set_receiving(receiving);
        }
        true
    }
}

impl fmt::Debug for CaptureController {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CaptureController")
            .field("recording", &self.recording)
            .field("receiving", &self.receiving)
            .field("device", &self.device.as_ref().map(|_| ".."))
            .finish()
    }
}
