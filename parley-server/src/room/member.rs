use crate::signaling::ConnectionHandle;
use parley_core::UserId;
use std::time::SystemTime;

/// A user in a room together with the connection that reaches it.
#[derive(Debug, Clone)]
pub struct Member {
    pub user_id: UserId,
    pub handle: ConnectionHandle,
    /// When the user first joined the room. A reconnect swaps the handle
    /// but keeps this value.
    pub joined_at: SystemTime,
}

impl Member {
    pub fn new(user_id: UserId, handle: ConnectionHandle) -> Self {
        Self {
            user_id,
            handle,
            joined_at: SystemTime::now(),
        }
    }
}
