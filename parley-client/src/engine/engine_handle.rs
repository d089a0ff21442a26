use crate::engine::{CallState, NegotiationEngine};
use crate::error::NegotiationError;
use parley_core::{SignalMessage, UserId};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::info;

type Reply<T> = oneshot::Sender<T>;

/// Application requests served by [`NegotiationEngine::run`].
#[derive(Debug)]
pub enum EngineCommand {
    Call {
        target: UserId,
        reply: Reply<Result<(), NegotiationError>>,
    },
    Answer {
        reply: Reply<Result<(), NegotiationError>>,
    },
    Hangup {
        reply: Reply<Result<(), NegotiationError>>,
    },
    State {
        reply: Reply<CallState>,
    },
    RoomMembers {
        reply: Reply<Vec<UserId>>,
    },
    RequestRoomMembers,
}

/// Cloneable front end to a running engine. The engine stops once every
/// handle is dropped.
#[derive(Debug, Clone)]
pub struct EngineHandle {
    tx: mpsc::UnboundedSender<EngineCommand>,
}

impl EngineHandle {
    pub async fn call(&self, target: impl Into<UserId>) -> Result<(), NegotiationError> {
        let target = target.into();
        self.request(|reply| EngineCommand::Call { target, reply })
            .await?
    }

    pub async fn answer(&self) -> Result<(), NegotiationError> {
        self.request(|reply| EngineCommand::Answer { reply }).await?
    }

    pub async fn hangup(&self) -> Result<(), NegotiationError> {
        self.request(|reply| EngineCommand::Hangup { reply }).await?
    }

    pub async fn state(&self) -> Result<CallState, NegotiationError> {
        self.request(|reply| EngineCommand::State { reply }).await
    }

    pub async fn room_members(&self) -> Result<Vec<UserId>, NegotiationError> {
        self.request(|reply| EngineCommand::RoomMembers { reply })
            .await
    }

    pub fn request_room_members(&self) -> Result<(), NegotiationError> {
        self.tx
            .send(EngineCommand::RequestRoomMembers)
            .map_err(|_| NegotiationError::EngineStopped)
    }

    async fn request<T>(
        &self,
        make: impl FnOnce(Reply<T>) -> EngineCommand,
    ) -> Result<T, NegotiationError> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(make(reply))
            .map_err(|_| NegotiationError::EngineStopped)?;
        rx.await.map_err(|_| NegotiationError::EngineStopped)
    }
}

impl NegotiationEngine {
    /// Runs the engine on its own task. `inbound` carries messages from the relay.
    pub fn spawn(
        self,
        inbound: mpsc::UnboundedReceiver<SignalMessage>,
    ) -> (EngineHandle, JoinHandle<()>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let task = tokio::spawn(self.run(inbound, rx));
        (EngineHandle { tx }, task)
    }

    /// Actor loop: signaling input, commands and media results, one at a time.
    /// Returns when the signaling channel closes or every handle is dropped.
    pub async fn run(
        mut self,
        mut inbound: mpsc::UnboundedReceiver<SignalMessage>,
        mut commands: mpsc::UnboundedReceiver<EngineCommand>,
    ) {
        self.connected();
        self.request_room_members();

        loop {
            tokio::select! {
                msg = inbound.recv() => match msg {
                    Some(msg) => self.handle_signal(msg),
                    None => {
                        info!(user = %self.local_user, "Signaling channel closed");
                        break;
                    }
                },
                cmd = commands.recv() => match cmd {
                    Some(cmd) => self.handle_command(cmd),
                    None => break,
                },
                Some(event) = self.events_rx.recv() => self.handle_event(event),
            }
        }

        self.disconnected();
        info!(user = %self.local_user, "Negotiation engine stopped");
    }

    fn handle_command(&mut self, cmd: EngineCommand) {
        match cmd {
            EngineCommand::Call { target, reply } => {
                let _ = reply.send(self.call(&target));
            }
            EngineCommand::Answer { reply } => {
                let _ = reply.send(self.answer());
            }
            EngineCommand::Hangup { reply } => {
                let _ = reply.send(self.hangup());
            }
            EngineCommand::State { reply } => {
                let _ = reply.send(self.state());
            }
            EngineCommand::RoomMembers { reply } => {
                let _ = reply.send(self.room_members.clone());
            }
            EngineCommand::RequestRoomMembers => self.request_room_members(),
        }
    }
}
