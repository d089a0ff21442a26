pub use parley_core::model::{RoomId, SignalMessage, UserId};

pub mod model {
    pub use parley_core::model::*;
    pub use parley_core::ProtocolError;
}

#[cfg(feature = "server")]
pub mod server {
    pub use parley_server::*;
}

#[cfg(feature = "client")]
pub mod client {
    pub use parley_client::*;
}
