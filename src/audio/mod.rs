//! Local audio state: microphone capture modes and assistant playback.

pub mod capture;
pub mod playback;
pub mod types;

pub use capture::{CaptureController, CaptureDevice};
pub use playback::{AudioSink, NullSink, PlaybackController, WriterSink};
pub use types::{AudioFormat, Voice};
