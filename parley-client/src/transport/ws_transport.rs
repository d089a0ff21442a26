use crate::error::NegotiationError;
use futures::{SinkExt, StreamExt};
use parley_core::{RoomId, SignalMessage, UserId};
use tokio::sync::mpsc;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, warn};
use url::Url;

/// Both directions of a signaling connection to the relay.
///
/// Dropping `outbound` closes the socket; `inbound` ends when the relay
/// goes away.
#[derive(Debug)]
pub struct SignalingConnection {
    pub outbound: mpsc::UnboundedSender<SignalMessage>,
    pub inbound: mpsc::UnboundedReceiver<SignalMessage>,
}

/// `base` with the identity query the relay expects.
pub fn signaling_url(base: &str, user_id: &UserId, room_id: &RoomId) -> Result<Url, NegotiationError> {
    let mut url = Url::parse(base)
        .map_err(|e| NegotiationError::Transport(format!("invalid signaling url {base}: {e}")))?;
    url.query_pairs_mut()
        .append_pair("userId", user_id.as_str())
        .append_pair("roomId", room_id.as_str());
    Ok(url)
}

pub async fn connect(
    base: &str,
    user_id: &UserId,
    room_id: &RoomId,
) -> Result<SignalingConnection, NegotiationError> {
    let url = signaling_url(base, user_id, room_id)?;
    let (stream, _) = connect_async(url.as_str())
        .await
        .map_err(|e| NegotiationError::Transport(format!("websocket connect failed: {e}")))?;
    debug!(%url, "Signaling websocket connected");

    let (mut ws_write, mut ws_read) = stream.split();
    let (outbound_tx, mut outbound_rx) = mpsc::unbounded_channel::<SignalMessage>();
    let (inbound_tx, inbound_rx) = mpsc::unbounded_channel::<SignalMessage>();

    tokio::spawn(async move {
        while let Some(msg) = outbound_rx.recv().await {
            let text = match msg.encode() {
                Ok(text) => text,
                Err(e) => {
                    warn!("Failed to serialize signal message: {}", e);
                    continue;
                }
            };
            if ws_write.send(Message::Text(text.into())).await.is_err() {
                break;
            }
        }
        let _ = ws_write.send(Message::Close(None)).await;
    });

    tokio::spawn(async move {
        while let Some(frame) = ws_read.next().await {
            match frame {
                Ok(Message::Text(text)) => match SignalMessage::decode(text.as_str()) {
                    Ok(msg) => {
                        if inbound_tx.send(msg).is_err() {
                            break;
                        }
                    }
                    Err(e) => warn!("Invalid signal message from relay: {}", e),
                },
                Ok(Message::Close(_)) => break,
                Ok(_) => {}
                Err(e) => {
                    warn!("Signaling websocket error: {}", e);
                    break;
                }
            }
        }
        debug!("Signaling websocket closed");
    });

    Ok(SignalingConnection {
        outbound: outbound_tx,
        inbound: inbound_rx,
    })
}
