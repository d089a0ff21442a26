use anyhow::{Result, bail};
use parley_core::{RoomId, SignalMessage, UserId};
use parley_server::{
    ConnectionHandle, DisconnectReason, GatewayConnection, Outbound, SignalingGateway,
};
use std::time::Duration;
use tokio::sync::mpsc;

use super::signal_helpers::{SILENCE_MS, signal_timeout};

/// A gateway connection driven directly, without a socket.
pub struct TestClient {
    pub user_id: UserId,
    pub room_id: RoomId,
    pub conn: GatewayConnection,
    gateway: SignalingGateway,
    rx: mpsc::UnboundedReceiver<Outbound>,
}

impl TestClient {
    pub fn connect(gateway: &SignalingGateway, user_id: &str, room_id: &str) -> Self {
        let (handle, rx) = ConnectionHandle::channel();
        let conn = gateway.establish(UserId::from(user_id), RoomId::from(room_id), handle);
        Self {
            user_id: UserId::from(user_id),
            room_id: RoomId::from(room_id),
            conn,
            gateway: gateway.clone(),
            rx,
        }
    }

    pub fn send(&self, msg: SignalMessage) {
        let text = msg.encode().expect("encode");
        self.gateway.handle_text(&self.conn, &text);
    }

    pub fn send_text(&self, text: &str) {
        self.gateway.handle_text(&self.conn, text);
    }

    pub fn call(&self, target: &str) {
        self.send(SignalMessage::call(
            &self.user_id,
            &UserId::from(target),
            &self.room_id,
        ));
    }

    pub fn disconnect(&mut self, reason: DisconnectReason) {
        self.gateway.disconnect(&mut self.conn, reason);
    }

    pub async fn recv(&mut self) -> Result<SignalMessage> {
        match tokio::time::timeout(signal_timeout(), self.rx.recv()).await {
            Ok(Some(Outbound::Signal(msg))) => Ok(msg),
            Ok(Some(Outbound::Close)) => bail!("{} was told to close", self.user_id),
            Ok(None) => bail!("{} channel closed", self.user_id),
            Err(_) => bail!("{} timed out waiting for a message", self.user_id),
        }
    }

    /// Waits for the `Close` instruction sent to a superseded connection.
    pub async fn recv_close(&mut self) -> Result<()> {
        match tokio::time::timeout(signal_timeout(), self.rx.recv()).await {
            Ok(Some(Outbound::Close)) => Ok(()),
            Ok(other) => bail!("expected close, got {other:?}"),
            Err(_) => bail!("timed out waiting for close"),
        }
    }

    /// Asserts nothing is queued for this client within a short window.
    pub async fn expect_silence(&mut self) {
        let res = tokio::time::timeout(Duration::from_millis(SILENCE_MS), self.rx.recv()).await;
        if let Ok(Some(out)) = res {
            panic!("{} unexpectedly received {out:?}", self.user_id);
        }
    }
}
