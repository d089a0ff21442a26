use parley_client::transport::{self, SignalingConnection};
use parley_client::{
    CallState, EngineHandle, EngineNotice, NegotiationConfig, NegotiationEngine,
};
use parley_core::{RoomId, UserId};
use parley_server::{RelayConfig, SignalingGateway, serve_with_listener};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::{mpsc, oneshot};

use crate::integration::init_tracing;
use crate::utils::{MockMediaFactory, signal_timeout};

struct Client {
    handle: EngineHandle,
    notices: mpsc::UnboundedReceiver<EngineNotice>,
}

impl Client {
    async fn connect(base: &str, user: &str, config: NegotiationConfig) -> Self {
        let SignalingConnection { outbound, inbound } =
            transport::connect(base, &UserId::from(user), &RoomId::from("R1"))
                .await
                .expect("connect");

        let mut engine = NegotiationEngine::new(
            UserId::from(user),
            RoomId::from("R1"),
            Arc::new(MockMediaFactory::new(user)),
            outbound,
            config,
        );
        let notices = engine.subscribe();
        let (handle, _task) = engine.spawn(inbound);
        Self { handle, notices }
    }

    async fn wait_for(&mut self, pred: impl Fn(&EngineNotice) -> bool) -> EngineNotice {
        tokio::time::timeout(signal_timeout(), async {
            loop {
                let notice = self.notices.recv().await.expect("engine running");
                if pred(&notice) {
                    return notice;
                }
            }
        })
        .await
        .expect("timed out waiting for notice")
    }

    async fn wait_for_state(&mut self, state: CallState) {
        self.wait_for(|n| matches!(n, EngineNotice::StateChanged { state: s, .. } if *s == state))
            .await;
    }
}

#[tokio::test]
async fn test_call_over_websocket_relay() {
    init_tracing();

    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    let gateway = SignalingGateway::new(RelayConfig::default());
    let (stop, stopped) = oneshot::channel::<()>();
    tokio::spawn(serve_with_listener(listener, gateway.clone(), async move {
        let _ = stopped.await;
    }));

    let base = format!("ws://{addr}/ws");
    let mut alice = Client::connect(&base, "alice", NegotiationConfig::default()).await;
    let mut bob = Client::connect(
        &base,
        "bob",
        NegotiationConfig {
            auto_answer: true,
            ..Default::default()
        },
    )
    .await;

    let bob_id = UserId::from("bob");
    alice
        .wait_for(|n| matches!(n, EngineNotice::RoomMembers(m) if m.contains(&bob_id)))
        .await;

    alice.handle.call("bob").await.expect("call");
    alice.wait_for_state(CallState::InCall).await;
    bob.wait_for_state(CallState::InCall).await;

    alice.handle.hangup().await.expect("hangup");
    bob.wait_for(|n| matches!(n, EngineNotice::CallEnded { .. })).await;
    assert_eq!(bob.handle.state().await.expect("state"), CallState::Ready);
    assert_eq!(alice.handle.state().await.expect("state"), CallState::Ready);

    // Dropping the last handle stops the engine and closes its socket
    drop(bob);
    let room = RoomId::from("R1");
    tokio::time::timeout(signal_timeout(), async {
        while gateway.directory().list_members(&room).len() > 1 {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("bob left the room");

    drop(stop);
}
