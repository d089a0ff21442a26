//! Wire model shared by the parley relay and its clients.

mod error;
pub mod model;

pub use error::ProtocolError;
pub use model::*;
