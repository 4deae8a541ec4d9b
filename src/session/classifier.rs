//! Policy for server `error` events.

use strum::{Display, EnumString};

/// What the session does with a server error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString)]
#[strum(serialize_all = "snake_case")]
pub enum ErrorPolicy {
    /// Expected race; log quietly and carry on.
    Ignore,
    /// Surface at error level and carry on.
    LogAndContinue,
    /// The session cannot continue.
    Fatal,
}

const BENIGN_MESSAGES: &[&str] = &[
    "buffer is empty",
    "buffer too small",
    "already has an active response",
];

const BENIGN_CODES: &[&str] = &[
    "input_audio_buffer_commit_empty",
    "conversation_already_has_active_response",
    "response_cancel_not_active",
];

const FATAL_MESSAGES: &[&str] = &[
    "session has expired",
    "maximum duration",
    "incorrect api key",
    "connection closed",
];

const FATAL_CODES: &[&str] = &["session_expired", "invalid_api_key"];

/// Classify a server error by its message and optional code.
///
/// Matching is case-insensitive. Benign races win over fatal patterns.
pub fn classify_error(message: &str, code: Option<&str>) -> ErrorPolicy {
    let message = message.to_ascii_lowercase();
    let code = code.map(str::to_ascii_lowercase);
    let code = code.as_deref();

    let matches = |messages: &[&str], codes: &[&str]| {
        messages.iter().any(|needle| message.contains(needle))
            || code.is_some_and(|code| codes.contains(&code))
    };

    if matches(BENIGN_MESSAGES, BENIGN_CODES) {
        ErrorPolicy::Ignore
    } else if matches(FATAL_MESSAGES, FATAL_CODES) {
        ErrorPolicy::Fatal
    } else {
        ErrorPolicy::LogAndContinue
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn benign_races_are_ignored() {
        assert_eq!(
            classify_error("Error committing input audio buffer: buffer is empty.", None),
            ErrorPolicy::Ignore
        );
        assert_eq!(
            classify_error(
                "Conversation already has an active response",
                Some("conversation_already_has_active_response")
            ),
            ErrorPolicy::Ignore
        );
        assert_eq!(
            classify_error("Cancellation failed", Some("response_cancel_not_active")),
            ErrorPolicy::Ignore
        );
        assert_eq!(
            classify_error("BUFFER TOO SMALL. Expected at least 100ms", None),
            ErrorPolicy::Ignore
        );
    }

    #[test]
    fn session_ending_errors_are_fatal() {
        assert_eq!(
            classify_error("Your session has expired.", None),
            ErrorPolicy::Fatal
        );
        assert_eq!(
            classify_error("Session hit the maximum duration of 30 minutes.", None),
            ErrorPolicy::Fatal
        );
        assert_eq!(classify_error("nope", Some("invalid_api_key")), ErrorPolicy::Fatal);
        assert_eq!(classify_error("expired", Some("SESSION_EXPIRED")), ErrorPolicy::Fatal);
    }

    #[test]
    fn everything_else_is_logged() {
        assert_eq!(
            classify_error("Invalid value for 'voice'", Some("invalid_value")),
            ErrorPolicy::LogAndContinue
        );
        assert_eq!(classify_error("", None), ErrorPolicy::LogAndContinue);
    }

    #[test]
    fn policy_names_round_trip() {
        assert_eq!(ErrorPolicy::LogAndContinue.to_string(), "log_and_continue");
        assert_eq!(ErrorPolicy::from_str("fatal").unwrap(), ErrorPolicy::Fatal);
    }
}
