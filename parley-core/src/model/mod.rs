mod connection;
mod message;
mod payload;
mod peer;
mod room;

pub use connection::ConnectionId;
pub use message::{MessageKind, SignalMessage};
pub use payload::{
    CallPayload, Candidate, CandidatePayload, DescriptionPayload, PresencePayload,
    SessionDescription,
};
pub use peer::UserId;
pub use room::RoomId;
