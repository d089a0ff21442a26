//! Signaling relay: room membership, directed/broadcast routing and the
//! WebSocket gateway that ties client connections to both.

mod app;
mod config;
mod error;
mod room;
mod routing;
mod signaling;

pub use app::*;
pub use config::*;
pub use error::*;
pub use room::*;
pub use routing::*;
pub use signaling::*;
