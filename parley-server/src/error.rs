use parley_core::{ConnectionId, ProtocolError, RoomId, UserId};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RelayError {
    /// Target user is not a member of the room.
    #[error("user {user_id} is not in room {room_id}")]
    NotFound { room_id: RoomId, user_id: UserId },

    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// The member's connection has already shut down its outbound queue.
    #[error("connection {0} is closed")]
    ConnectionClosed(ConnectionId),

    #[error("invalid handshake: {0}")]
    Handshake(String),
}
