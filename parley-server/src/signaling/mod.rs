mod call_ledger;
mod connection_handle;
mod gateway;
mod ws_handler;

pub use call_ledger::*;
pub use connection_handle::*;
pub use gateway::*;
pub use ws_handler::*;
