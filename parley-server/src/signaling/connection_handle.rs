use crate::error::RelayError;
use parley_core::{ConnectionId, SignalMessage};
use tokio::sync::mpsc;

/// What a gateway connection's writer task is asked to do next.
#[derive(Debug)]
pub enum Outbound {
    Signal(SignalMessage),
    /// The connection was superseded; flush a close frame and stop writing.
    Close,
}

/// Sender capability for one member. Cloning shares the same underlying connection.
#[derive(Debug, Clone)]
pub struct ConnectionHandle {
    id: ConnectionId,
    tx: mpsc::UnboundedSender<Outbound>,
}

impl ConnectionHandle {
    pub fn new(tx: mpsc::UnboundedSender<Outbound>) -> Self {
        Self {
            id: ConnectionId::new(),
            tx,
        }
    }

    /// Creates a handle together with the receiving end the connection drains.
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<Outbound>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self::new(tx), rx)
    }

    pub fn id(&self) -> ConnectionId {
        self.id
    }

    /// Queues a message for the connection. Never blocks.
    pub fn deliver(&self, msg: SignalMessage) -> Result<(), RelayError> {
        self.tx
            .send(Outbound::Signal(msg))
            .map_err(|_| RelayError::ConnectionClosed(self.id))
    }

    pub fn close(&self) {
        let _ = self.tx.send(Outbound::Close);
    }
}
