//! Error handling for libcourier
//!
//! Every failure the dispatch core can produce is a variant of [`Error`].
//! Variants name the identifiers involved (adapter, target kind, event type)
//! so a caller never has to guess which registration is missing.

use crate::types::Adapter;

/// Result type used throughout the library
pub type Result<T> = std::result::Result<T, Error>;

/// Coarse classification of errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    /// Invalid argument provided
    InvalidArgument,
    /// Resource not found
    NotFound,
    /// Invalid state for operation
    InvalidState,
    /// Feature not supported by this platform
    Unsupported,
    /// The remote platform refused the request
    Rejected,
    /// Control-flow signal, not a failure
    Signal,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::InvalidArgument => "Invalid argument",
            ErrorCode::NotFound => "Not found",
            ErrorCode::InvalidState => "Invalid state",
            ErrorCode::Unsupported => "Feature not supported",
            ErrorCode::Rejected => "Rejected by platform",
            ErrorCode::Signal => "Control-flow signal",
        }
    }
}

/// Signals handed to the dialogue layer by `finish`/`pause`/`reject`
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ControlFlow {
    /// End the current dialogue
    Finished,
    /// Wait for the next event from the same session
    Paused,
    /// Discard the last input and wait for a new one
    Rejected,
    /// Ask again for the named argument
    RejectArg(String),
    /// Ask again for the input received under the named key
    RejectReceive(String),
}

/// Typed errors of the dispatch core
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// No builder, native-message constructor or similar registration exists
    /// for the live client's platform.
    #[error("adapter \"{adapter}\" not installed, please install first")]
    AdapterNotInstalled { adapter: Adapter },

    /// A target kind has no argument conversion for a platform.
    #[error("target kind \"{kind}\" is not supported by adapter \"{adapter}\"")]
    TargetNotSupported { kind: &'static str, adapter: Adapter },

    /// No send function was registered for a platform.
    #[error("send method for \"{adapter}\" not registered")]
    SenderNotRegistered { adapter: Adapter },

    /// Neither the event type nor any of its ancestors has an extractor.
    #[error("event type \"{event_type}\" not supported")]
    NoExtractor { event_type: String },

    /// The extractor needs a client handle and none was supplied.
    #[error("event type \"{event_type}\" needs a client to extract its target")]
    ClientRequired { event_type: String },

    /// No connected client can reach the target.
    #[error("no connected client can reach target {target}")]
    NoBotFound { target: String },

    /// The auto-select resolver was used before being enabled.
    #[error(
        "automatic client selection is not enabled; call `Context::enable_auto_select()` \
         during start-up or set `auto_select_bot` in the config, or pass a client explicitly"
    )]
    AutoSelectDisabled,

    /// `send()` was called outside of an event scope.
    #[error("send() requires an active event context; use send_to for unsolicited sends")]
    NoEventContext,

    /// A message id minted by one platform was handed to another.
    #[error("unexpected message id type: expected \"{expected}\", found \"{found}\"")]
    UnexpectedMessageIdType { expected: Adapter, found: Adapter },

    /// A serialized value carries a discriminant no variant is registered for.
    #[error("unknown {index_key} discriminant \"{value}\"")]
    UnknownDiscriminant { index_key: &'static str, value: String },

    /// The operation exists in general but not for this platform/target.
    #[error("not supported: {message}")]
    Unsupported { message: String },

    /// The remote platform rejected the send (moderation, audit, ...).
    #[error("message rejected by \"{adapter}\": {reason}")]
    PlatformRejected { adapter: Adapter, reason: String },

    /// A platform override opted out; the default behavior should run.
    #[error("fallback to default behavior requested")]
    FallbackToDefault,

    /// Dialogue control flow raised after a convenience send.
    #[error("dialogue control flow: {0:?}")]
    Control(ControlFlow),

    /// Input payload or parameter is invalid.
    #[error("invalid argument: {message}")]
    InvalidArgument { message: String },

    /// The context was used in the wrong lifecycle state.
    #[error("invalid state: {message}")]
    InvalidState { message: String },

    /// JSON (de)serialization failed.
    #[error(transparent)]
    Serialization(#[from] serde_json::Error),
}

impl Error {
    pub fn invalid_argument(message: impl std::fmt::Display) -> Self {
        Error::InvalidArgument {
            message: message.to_string(),
        }
    }

    pub fn invalid_state(message: impl std::fmt::Display) -> Self {
        Error::InvalidState {
            message: message.to_string(),
        }
    }

    pub fn unsupported(message: impl std::fmt::Display) -> Self {
        Error::Unsupported {
            message: message.to_string(),
        }
    }

    /// Translate a platform-side refusal into a caller-visible error
    pub fn rejected(adapter: Adapter, reason: impl std::fmt::Display) -> Self {
        Error::PlatformRejected {
            adapter,
            reason: reason.to_string(),
        }
    }

    /// Classification used by callers that only care about the broad kind
    pub fn code(&self) -> ErrorCode {
        match self {
            Error::AdapterNotInstalled { .. }
            | Error::TargetNotSupported { .. }
            | Error::SenderNotRegistered { .. }
            | Error::Unsupported { .. } => ErrorCode::Unsupported,
            Error::NoExtractor { .. } | Error::NoBotFound { .. } => ErrorCode::NotFound,
            Error::AutoSelectDisabled | Error::NoEventContext | Error::InvalidState { .. } => {
                ErrorCode::InvalidState
            }
            Error::ClientRequired { .. }
            | Error::UnexpectedMessageIdType { .. }
            | Error::UnknownDiscriminant { .. }
            | Error::InvalidArgument { .. }
            | Error::Serialization(_) => ErrorCode::InvalidArgument,
            Error::PlatformRejected { .. } => ErrorCode::Rejected,
            Error::FallbackToDefault | Error::Control(_) => ErrorCode::Signal,
        }
    }

    /// True for the override opt-out signal
    pub fn is_fallback(&self) -> bool {
        matches!(self, Error::FallbackToDefault)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages_name_identifiers() {
        let err = Error::TargetNotSupported {
            kind: "QQ Group",
            adapter: Adapter::Telegram,
        };
        let text = err.to_string();
        assert!(text.contains("QQ Group"));
        assert!(text.contains("Telegram"));
        assert_eq!(err.code(), ErrorCode::Unsupported);
    }

    #[test]
    fn test_no_event_context_message() {
        let err = Error::NoEventContext;
        assert_eq!(
            err.to_string(),
            "send() requires an active event context; use send_to for unsolicited sends"
        );
        assert_eq!(err.code(), ErrorCode::InvalidState);
    }

    #[test]
    fn test_rejected_is_typed() {
        let err = Error::rejected(Adapter::QQ, "audit failed");
        assert_eq!(err.code(), ErrorCode::Rejected);
        assert!(matches!(err, Error::PlatformRejected { adapter: Adapter::QQ, .. }));
    }

    #[test]
    fn test_fallback_signal() {
        assert!(Error::FallbackToDefault.is_fallback());
        assert!(!Error::NoEventContext.is_fallback());
        assert_eq!(Error::Control(ControlFlow::Paused).code(), ErrorCode::Signal);
    }

    #[test]
    fn test_keyed_rejections_name_their_key() {
        let err = Error::Control(ControlFlow::RejectArg("city".into()));
        assert_eq!(err.code(), ErrorCode::Signal);
        assert!(err.to_string().contains("city"));
        assert_ne!(
            ControlFlow::RejectArg("k".into()),
            ControlFlow::RejectReceive("k".into())
        );
    }

    #[test]
    fn test_every_code_has_a_label() {
        for code in [
            ErrorCode::InvalidArgument,
            ErrorCode::NotFound,
            ErrorCode::InvalidState,
            ErrorCode::Unsupported,
            ErrorCode::Rejected,
            ErrorCode::Signal,
        ] {
            assert!(!code.as_str().is_empty());
        }
    }
}
