use crate::config::RelayConfig;
use crate::error::RelayError;
use crate::room::RoomDirectory;
use crate::routing::MessageRouter;
use crate::signaling::{CallLedger, ConnectionHandle};
use parley_core::{ConnectionId, MessageKind, ProtocolError, RoomId, SignalMessage, UserId};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Connecting,
    Established,
    Closed,
}

/// Why a connection went away. Every reason is handled the same way.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DisconnectReason {
    Closed,
    TransportError(String),
    IdleTimeout,
}

/// Query parameters carried by the WebSocket upgrade request.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HandshakeParams {
    pub user_id: Option<String>,
    pub room_id: Option<String>,
}

impl HandshakeParams {
    pub fn into_identity(self) -> Result<(UserId, RoomId), RelayError> {
        let user_id = non_empty(self.user_id)
            .ok_or_else(|| RelayError::Handshake("missing userId".to_string()))?;
        let room_id = non_empty(self.room_id)
            .ok_or_else(|| RelayError::Handshake("missing roomId".to_string()))?;
        Ok((UserId::from(user_id), RoomId::from(room_id)))
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// One client connection as seen by the gateway.
#[derive(Debug, Clone)]
pub struct GatewayConnection {
    user_id: UserId,
    room_id: RoomId,
    handle: ConnectionHandle,
    state: ConnectionState,
}

impl GatewayConnection {
    pub fn user_id(&self) -> &UserId {
        &self.user_id
    }

    pub fn room_id(&self) -> &RoomId {
        &self.room_id
    }

    pub fn id(&self) -> ConnectionId {
        self.handle.id()
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }
}

struct GatewayInner {
    directory: RoomDirectory,
    router: MessageRouter,
    calls: CallLedger,
    config: RelayConfig,
}

/// Terminates client connections: registers them in the room directory,
/// relays their messages and cleans up after them.
#[derive(Clone)]
pub struct SignalingGateway {
    inner: Arc<GatewayInner>,
}

impl SignalingGateway {
    pub fn new(config: RelayConfig) -> Self {
        let directory = RoomDirectory::new();
        Self {
            inner: Arc::new(GatewayInner {
                router: MessageRouter::new(directory.clone()),
                directory,
                calls: CallLedger::new(),
                config,
            }),
        }
    }

    pub fn config(&self) -> &RelayConfig {
        &self.inner.config
    }

    pub fn directory(&self) -> &RoomDirectory {
        &self.inner.directory
    }

    pub fn router(&self) -> &MessageRouter {
        &self.inner.router
    }

    pub fn calls(&self) -> &CallLedger {
        &self.inner.calls
    }

    /// Registers the connection in its room and announces it to the other members.
    pub fn establish(
        &self,
        user_id: UserId,
        room_id: RoomId,
        handle: ConnectionHandle,
    ) -> GatewayConnection {
        let mut conn = GatewayConnection {
            user_id,
            room_id,
            handle,
            state: ConnectionState::Connecting,
        };

        let joined = self
            .inner
            .directory
            .join(&conn.room_id, &conn.user_id, conn.handle.clone());
        conn.state = ConnectionState::Established;

        // A reconnecting client starts without any negotiation state, so calls
        // bound to its previous connection are over.
        let reconnect = joined.is_reconnect();
        if reconnect {
            self.hang_up_peers(&conn.room_id, &conn.user_id);
        }

        info!(
            room = %conn.room_id,
            user = %conn.user_id,
            connection = %conn.id(),
            reconnect,
            "Connection established"
        );

        let notice = SignalMessage::join_notice(&conn.user_id, &conn.room_id);
        self.inner
            .router
            .broadcast(&conn.room_id, &notice, Some(&conn.user_id));

        conn
    }

    /// Entry point for a raw text frame. Undecodable or rejected messages are
    /// logged and dropped; the connection stays open.
    pub fn handle_text(&self, conn: &GatewayConnection, text: &str) {
        let result = SignalMessage::decode(text)
            .map_err(RelayError::from)
            .and_then(|msg| self.handle_message(conn, msg));

        if let Err(e) = result {
            match e {
                RelayError::NotFound { .. } => {
                    info!(room = %conn.room_id, user = %conn.user_id, "Dropping message: {}", e)
                }
                _ => warn!(room = %conn.room_id, user = %conn.user_id, "Dropping message: {}", e),
            }
        }
    }

    pub fn handle_message(
        &self,
        conn: &GatewayConnection,
        msg: SignalMessage,
    ) -> Result<(), RelayError> {
        if conn.state != ConnectionState::Established {
            return Err(RelayError::ConnectionClosed(conn.id()));
        }

        match msg.kind {
            kind if kind.is_presence() => Err(ProtocolError::Reserved { kind }.into()),
            kind if kind.requires_target() => self.relay_directed(conn, msg),
            MessageKind::Hangup => self.relay_hangup(conn, msg),
            // roomUserList
            _ => {
                let members = self.inner.directory.list_members(&conn.room_id);
                conn.handle
                    .deliver(SignalMessage::room_user_list(&conn.room_id, &members))
            }
        }
    }

    fn relay_directed(&self, conn: &GatewayConnection, msg: SignalMessage) -> Result<(), RelayError> {
        let kind = msg.kind;
        let target = msg
            .target()
            .ok_or(ProtocolError::MissingTarget { kind })?;
        let msg = msg.stamped(&conn.user_id, &conn.room_id, Some(target.clone()));

        self.deliver(conn, &target, msg)?;

        if matches!(
            kind,
            MessageKind::Call | MessageKind::Offer | MessageKind::Answer
        ) {
            self.inner
                .calls
                .open(&conn.room_id, &conn.user_id, &target);
        }
        Ok(())
    }

    fn relay_hangup(&self, conn: &GatewayConnection, msg: SignalMessage) -> Result<(), RelayError> {
        if let Some(target) = msg.target() {
            self.inner
                .calls
                .close(&conn.room_id, &conn.user_id, &target);
            let msg = msg.stamped(&conn.user_id, &conn.room_id, Some(target.clone()));
            return self.deliver(conn, &target, msg);
        }

        let peers = self.hang_up_peers(&conn.room_id, &conn.user_id);
        if peers == 0 {
            debug!(room = %conn.room_id, user = %conn.user_id, "Hangup with no active call");
        }
        Ok(())
    }

    fn deliver(
        &self,
        conn: &GatewayConnection,
        target: &UserId,
        msg: SignalMessage,
    ) -> Result<(), RelayError> {
        let delivery = self.inner.router.route_direct(&conn.room_id, target, msg);
        if delivery.is_delivered() {
            return Ok(());
        }

        debug!(room = %conn.room_id, peer = %target, ?delivery, "Target unreachable");
        if self.inner.config.notify_unreachable {
            let notice = SignalMessage::leave_notice(target, &conn.room_id);
            let _ = conn.handle.deliver(notice);
        }
        Err(RelayError::NotFound {
            room_id: conn.room_id.clone(),
            user_id: target.clone(),
        })
    }

    /// Sends a `hangup` from `user_id` to each of its active call peers.
    fn hang_up_peers(&self, room_id: &RoomId, user_id: &UserId) -> usize {
        let peers = self.inner.calls.take(room_id, user_id);
        for peer in &peers {
            let hangup = SignalMessage::hangup(user_id, peer, room_id);
            let delivered = self
                .inner
                .router
                .route_direct(room_id, peer, hangup)
                .is_delivered();
            debug!(room = %room_id, user = %user_id, peer = %peer, delivered, "Synthesized hangup");
        }
        peers.len()
    }

    /// Removes the connection from its room. Safe to call more than once.
    ///
    /// The remaining call peers receive a `hangup` and the room a `leave`,
    /// unless the connection was already replaced by a newer one for the same user.
    pub fn disconnect(&self, conn: &mut GatewayConnection, reason: DisconnectReason) {
        if conn.state == ConnectionState::Closed {
            return;
        }
        conn.state = ConnectionState::Closed;

        let removed =
            self.inner
                .directory
                .leave_connection(&conn.room_id, &conn.user_id, conn.id());

        if !removed {
            debug!(
                room = %conn.room_id,
                user = %conn.user_id,
                connection = %conn.id(),
                ?reason,
                "Superseded connection closed"
            );
            return;
        }

        info!(room = %conn.room_id, user = %conn.user_id, ?reason, "Connection closed");

        self.hang_up_peers(&conn.room_id, &conn.user_id);

        let notice = SignalMessage::leave_notice(&conn.user_id, &conn.room_id);
        self.inner
            .router
            .broadcast(&conn.room_id, &notice, Some(&conn.user_id));
    }
}
