use crate::signaling::{
    ConnectionHandle, DisconnectReason, HandshakeParams, Outbound, SignalingGateway,
};
use axum::extract::ws::{Message, WebSocket};
use axum::extract::{Query, State, WebSocketUpgrade};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use bytes::Bytes;
use futures::{SinkExt, StreamExt};
use parley_core::{RoomId, UserId};
use std::time::Duration;
use tokio::time::{Instant, MissedTickBehavior, interval_at};
use tracing::{error, info, warn};

pub async fn ws_handler(
    ws: WebSocketUpgrade,
    Query(params): Query<HandshakeParams>,
    State(gateway): State<SignalingGateway>,
) -> Response {
    match params.into_identity() {
        Ok((user_id, room_id)) => {
            ws.on_upgrade(move |socket| handle_socket(socket, user_id, room_id, gateway))
        }
        Err(e) => {
            warn!("Rejecting WebSocket upgrade: {}", e);
            (StatusCode::BAD_REQUEST, e.to_string()).into_response()
        }
    }
}

async fn handle_socket(
    socket: WebSocket,
    user_id: UserId,
    room_id: RoomId,
    gateway: SignalingGateway,
) {
    let (mut sender, mut receiver) = socket.split();
    let (handle, mut rx) = ConnectionHandle::channel();

    let mut conn = gateway.establish(user_id, room_id, handle);

    // Pings keep a healthy but quiet peer inside the idle window; its pongs
    // count as traffic on the read side.
    let ping_period = (gateway.config().idle_timeout / 2).max(Duration::from_millis(10));

    let mut send_task = tokio::spawn(async move {
        let mut keepalive = interval_at(Instant::now() + ping_period, ping_period);
        keepalive.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            let frame = tokio::select! {
                out = rx.recv() => match out {
                    Some(Outbound::Signal(msg)) => match msg.encode() {
                        Ok(json) => Message::Text(json.into()),
                        Err(e) => {
                            error!("Failed to serialize signal message: {}", e);
                            continue;
                        }
                    },
                    Some(Outbound::Close) => {
                        let _ = sender.send(Message::Close(None)).await;
                        break;
                    }
                    None => break,
                },
                _ = keepalive.tick() => Message::Ping(Bytes::new()),
            };
            if sender.send(frame).await.is_err() {
                break;
            }
        }
    });

    let mut recv_task = tokio::spawn({
        let gateway = gateway.clone();
        let conn = conn.clone();
        let idle_timeout = gateway.config().idle_timeout;

        async move {
            loop {
                match tokio::time::timeout(idle_timeout, receiver.next()).await {
                    Err(_) => return DisconnectReason::IdleTimeout,
                    Ok(None) | Ok(Some(Ok(Message::Close(_)))) => return DisconnectReason::Closed,
                    Ok(Some(Err(e))) => return DisconnectReason::TransportError(e.to_string()),
                    Ok(Some(Ok(Message::Text(text)))) => gateway.handle_text(&conn, text.as_str()),
                    Ok(Some(Ok(Message::Binary(_)))) => {
                        warn!(user = %conn.user_id(), "Dropping binary frame")
                    }
                    Ok(Some(Ok(_))) => {}
                }
            }
        }
    });

    let reason = tokio::select! {
        _ = (&mut send_task) => {
            recv_task.abort();
            DisconnectReason::Closed
        }
        res = (&mut recv_task) => {
            send_task.abort();
            res.unwrap_or_else(|e| DisconnectReason::TransportError(e.to_string()))
        }
    };

    gateway.disconnect(&mut conn, reason);
    info!(user = %conn.user_id(), room = %conn.room_id(), "WebSocket disconnected");
}
