use crate::engine::CallState;
use crate::media::MediaError;
use parley_core::UserId;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum NegotiationError {
    /// The requested action is not allowed in the current state.
    #[error("cannot {action} while {state:?}")]
    InvalidTransition {
        state: CallState,
        action: &'static str,
    },

    /// Another call is already live.
    #[error("busy with {peer}")]
    Busy { peer: UserId },

    #[error("already in a call with {peer}")]
    AlreadyInSession { peer: UserId },

    #[error("no active call")]
    NoSession,

    #[error("negotiation engine has stopped")]
    EngineStopped,

    #[error("media session could not be created: {0}")]
    Media(#[from] MediaError),

    #[error("signaling transport: {0}")]
    Transport(String),
}
