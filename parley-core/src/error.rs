use crate::model::MessageKind;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProtocolError {
    /// The frame is not a JSON signal message, or names an unknown `type`.
    #[error("malformed signal message: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("{kind} message has no target user")]
    MissingTarget { kind: MessageKind },

    /// `join` / `leave` notices may only originate from the relay.
    #[error("{kind} is reserved for the relay")]
    Reserved { kind: MessageKind },

    #[error("{kind} message has no sender")]
    MissingSender { kind: MessageKind },

    #[error("invalid {kind} payload: {source}")]
    Payload {
        kind: MessageKind,
        source: serde_json::Error,
    },
}
