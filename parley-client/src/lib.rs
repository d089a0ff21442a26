//! Client side of parley: the per-call negotiation engine, the media seam it
//! drives and a WebSocket transport to the relay.

mod engine;
mod error;
pub mod media;
pub mod transport;

pub use engine::*;
pub use error::*;
pub use media::{MediaError, MediaEvents, MediaSession, MediaSessionFactory};
