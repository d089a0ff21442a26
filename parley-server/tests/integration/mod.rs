pub mod multi_peer_tests;

use parley_server::{RelayConfig, SignalingGateway};
use tracing::Level;

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(Level::DEBUG)
        .with_test_writer()
        .try_init();
}

pub fn create_gateway() -> SignalingGateway {
    SignalingGateway::new(RelayConfig::default())
}
