use parley_core::{MessageKind, UserId};
use parley_server::DisconnectReason;

use crate::integration::{create_gateway, init_tracing};
use crate::utils::{TestClient, assert_kind, presence_user};

#[tokio::test]
async fn test_disconnect_sends_hangup_then_leave() {
    init_tracing();

    let gateway = create_gateway();
    let mut alice = TestClient::connect(&gateway, "alice", "R1");
    let mut bob = TestClient::connect(&gateway, "bob", "R1");
    let mut carol = TestClient::connect(&gateway, "carol", "R1");
    alice.recv().await.expect("bob join");
    alice.recv().await.expect("carol join");
    bob.recv().await.expect("carol join");

    alice.call("bob");
    assert_kind(&bob.recv().await.expect("call"), MessageKind::Call);

    // Transport errors are treated like any other disconnect
    alice.disconnect(DisconnectReason::TransportError("reset by peer".into()));

    let hangup = bob.recv().await.expect("bob should get a hangup");
    assert_kind(&hangup, MessageKind::Hangup);
    assert_eq!(hangup.from_user_id, Some(UserId::from("alice")));
    assert_eq!(hangup.to_user_id, Some(UserId::from("bob")));

    let leave = bob.recv().await.expect("bob should get a leave");
    assert_eq!(
        presence_user(&leave, MessageKind::Leave).unwrap(),
        UserId::from("alice")
    );

    // Carol was not in the call: only the leave notice
    let leave = carol.recv().await.expect("carol should get a leave");
    assert_kind(&leave, MessageKind::Leave);
    carol.expect_silence().await;
}

#[tokio::test]
async fn test_disconnect_is_idempotent() {
    init_tracing();

    let gateway = create_gateway();
    let mut alice = TestClient::connect(&gateway, "alice", "R1");
    let mut bob = TestClient::connect(&gateway, "bob", "R1");
    alice.recv().await.expect("bob join");

    bob.disconnect(DisconnectReason::Closed);
    bob.disconnect(DisconnectReason::IdleTimeout);

    assert_kind(&alice.recv().await.expect("leave"), MessageKind::Leave);
    alice.expect_silence().await;
}

#[tokio::test]
async fn test_hangup_clears_call_before_disconnect() {
    init_tracing();

    let gateway = create_gateway();
    let mut alice = TestClient::connect(&gateway, "alice", "R1");
    let mut bob = TestClient::connect(&gateway, "bob", "R1");
    alice.recv().await.expect("bob join");

    alice.call("bob");
    bob.recv().await.expect("call");
    bob.send(parley_core::SignalMessage::hangup(
        &bob.user_id,
        &alice.user_id,
        &bob.room_id,
    ));
    assert_kind(&alice.recv().await.expect("hangup"), MessageKind::Hangup);

    // The call is over, so the disconnect only produces a leave notice
    bob.disconnect(DisconnectReason::Closed);
    assert_kind(&alice.recv().await.expect("leave"), MessageKind::Leave);
    alice.expect_silence().await;
}
