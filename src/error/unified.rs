//! Error classification and recovery hints.

/// Broad error category for routing recovery logic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Authentication,
    Transport,
    Protocol,
    Configuration,
    Serialization,
    ToolExecution,
    Audio,
}

/// Suggested recovery action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecoverySuggestion {
    Reconnect,
    CheckCredentials,
    CheckConfiguration,
    CheckToolImplementation,
    CheckAudioDevice,
    None,
}

impl RecoverySuggestion {
    /// One-line hint for a person reading the error, if there is one.
    pub fn hint(self) -> Option<&'static str> {
        match self {
            Self::Reconnect => Some("check your network connection and start a new session"),
            Self::CheckCredentials => Some("set OPENAI_API_KEY to a valid key"),
            Self::CheckConfiguration => Some("check ~/.voxloop/config.toml and VOXLOOP_* variables"),
            Self::CheckToolImplementation => Some("the tool itself failed; inspect its logs"),
            Self::CheckAudioDevice => Some("check the audio output device or file"),
            Self::None => None,
        }
    }
}
