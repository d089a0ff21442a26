use parley_client::{CallState, NegotiationConfig};

use crate::integration::init_tracing;
use crate::utils::{MediaOp, RelayLoopback};

fn offer_on_call() -> NegotiationConfig {
    NegotiationConfig {
        offer_on_call: true,
        ..Default::default()
    }
}

#[tokio::test]
async fn test_caller_offers_with_call_when_configured() {
    init_tracing();

    let relay = RelayLoopback::new();
    let mut alice = relay.join("alice", offer_on_call());
    let mut bob = relay.join("bob", offer_on_call());
    alice.wait_for_member("bob").await.expect("bob listed");

    alice.handle.call("bob").await.expect("call");
    assert!(alice.media.wait_for_op(&MediaOp::CreateOffer).await);

    bob.wait_for_state(CallState::Answering).await.expect("ringing");
    // The offer is held until the callee accepts
    assert_eq!(bob.media.count(&MediaOp::CreateAnswer), 0);
    assert_eq!(alice.handle.state().await.expect("state"), CallState::Calling);

    bob.handle.answer().await.expect("answer");

    alice.wait_for_state(CallState::InCall).await.expect("alice in call");
    bob.wait_for_state(CallState::InCall).await.expect("bob in call");

    assert_eq!(alice.media.count(&MediaOp::CreateOffer), 1);
    assert_eq!(bob.media.count(&MediaOp::CreateAnswer), 1);
    assert_eq!(bob.media.count(&MediaOp::CreateOffer), 0);
}
