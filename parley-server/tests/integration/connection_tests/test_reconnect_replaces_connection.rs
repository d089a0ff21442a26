use parley_core::{MessageKind, RoomId, UserId};
use parley_server::DisconnectReason;

use crate::integration::{create_gateway, init_tracing};
use crate::utils::{TestClient, assert_kind};

#[tokio::test]
async fn test_reconnect_replaces_connection() {
    init_tracing();

    let gateway = create_gateway();
    let mut alice = TestClient::connect(&gateway, "alice", "R1");
    let mut bob_old = TestClient::connect(&gateway, "bob", "R1");
    assert_kind(&alice.recv().await.expect("bob join"), MessageKind::Join);

    let mut bob_new = TestClient::connect(&gateway, "bob", "R1");

    // The superseded connection is told to close
    bob_old.recv_close().await.expect("old connection should close");
    assert_kind(&alice.recv().await.expect("bob rejoin"), MessageKind::Join);

    let member = gateway
        .directory()
        .lookup(&RoomId::from("R1"), &UserId::from("bob"))
        .expect("bob is still a member");
    assert_eq!(member.handle.id(), bob_new.conn.id());

    // Its late disconnect must not evict the new connection
    bob_old.disconnect(DisconnectReason::Closed);
    alice.expect_silence().await;
    assert_eq!(
        gateway.directory().list_members(&RoomId::from("R1")),
        vec![UserId::from("alice"), UserId::from("bob")]
    );

    // Traffic reaches the new connection
    alice.call("bob");
    assert_kind(&bob_new.recv().await.expect("call"), MessageKind::Call);
}

#[tokio::test]
async fn test_reconnect_ends_previous_calls() {
    init_tracing();

    let gateway = create_gateway();
    let mut alice = TestClient::connect(&gateway, "alice", "R1");
    let mut bob_old = TestClient::connect(&gateway, "bob", "R1");
    alice.recv().await.expect("bob join");

    alice.call("bob");
    assert_kind(&bob_old.recv().await.expect("call"), MessageKind::Call);

    let _bob_new = TestClient::connect(&gateway, "bob", "R1");

    let hangup = alice.recv().await.expect("alice should be hung up on");
    assert_kind(&hangup, MessageKind::Hangup);
    assert_eq!(hangup.from_user_id, Some(UserId::from("bob")));
    assert_kind(&alice.recv().await.expect("bob rejoin"), MessageKind::Join);
}
