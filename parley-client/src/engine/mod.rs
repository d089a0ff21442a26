//! Per-call negotiation state machine.
//!
//! The engine is single-owner and synchronous: signaling input, application
//! commands and media results are fed to it one at a time, either by hand
//! (`handle_signal` / `handle_event`) or by [`NegotiationEngine::run`]. Media
//! work happens on a per-call worker task, so a `candidate` or `hangup` can be
//! processed while an offer or answer is still being produced.

mod accept_call_impl;
mod call_session;
mod engine_handle;
mod handle_media_event_impl;
mod handle_remote_offer_impl;
mod handle_signal_impl;
mod hangup_impl;
mod place_call_impl;

pub use call_session::{CallSession, Negotiation, SessionId, SessionKey};
pub use engine_handle::{EngineCommand, EngineHandle};

use crate::media::{MediaEvent, MediaSessionFactory, StepOutcome};
use parley_core::{RoomId, SignalMessage, UserId};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, warn};

pub const DEFAULT_DATA_CHANNEL_LABEL: &str = "parley";

#[derive(Debug, Clone)]
pub struct NegotiationConfig {
    /// The caller sends its offer right after `call`. Otherwise the callee
    /// produces the offer when it answers. Both ends must agree.
    pub offer_on_call: bool,
    /// Answer incoming calls without waiting for [`NegotiationEngine::answer`].
    pub auto_answer: bool,
    pub data_channel_label: String,
}

impl Default for NegotiationConfig {
    fn default() -> Self {
        Self {
            offer_on_call: false,
            auto_answer: false,
            data_channel_label: DEFAULT_DATA_CHANNEL_LABEL.to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CallState {
    /// Not connected to the relay.
    Idle,
    Ready,
    Calling,
    Answering,
    InCall,
    /// Resources are being released; collapses back to `Ready`.
    Ended,
}

impl fmt::Display for CallState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            CallState::Idle => "IDLE",
            CallState::Ready => "READY",
            CallState::Calling => "CALLING",
            CallState::Answering => "ANSWERING",
            CallState::InCall => "INCALL",
            CallState::Ended => "ENDED",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallRole {
    Caller,
    Callee,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EndReason {
    LocalHangup,
    RemoteHangup,
    PeerLeft,
    NegotiationFailed(String),
    Disconnected,
}

/// What the engine tells the application.
#[derive(Debug, Clone, PartialEq)]
pub enum EngineNotice {
    StateChanged {
        peer: Option<UserId>,
        state: CallState,
    },
    IncomingCall {
        from: UserId,
    },
    /// A call from `peer` was turned away because another call is live.
    CallRejected {
        peer: UserId,
    },
    RoomMembers(Vec<UserId>),
    DataChannelOpen {
        peer: UserId,
    },
    CallEnded {
        peer: UserId,
        reason: EndReason,
    },
}

/// Work reported back to the engine by media workers and media sessions.
#[derive(Debug, Clone, PartialEq)]
pub enum EngineEvent {
    Step {
        session: SessionId,
        outcome: StepOutcome,
    },
    Media {
        session: SessionId,
        event: MediaEvent,
    },
}

impl EngineEvent {
    pub fn session(&self) -> SessionId {
        match self {
            EngineEvent::Step { session, .. } | EngineEvent::Media { session, .. } => *session,
        }
    }
}

pub struct NegotiationEngine {
    local_user: UserId,
    room_id: RoomId,
    connected: bool,
    sessions: HashMap<SessionKey, CallSession>,
    factory: Arc<dyn MediaSessionFactory>,
    signaling: mpsc::UnboundedSender<SignalMessage>,
    events_tx: mpsc::UnboundedSender<EngineEvent>,
    events_rx: mpsc::UnboundedReceiver<EngineEvent>,
    notices: Option<mpsc::UnboundedSender<EngineNotice>>,
    room_members: Vec<UserId>,
    config: NegotiationConfig,
}

impl NegotiationEngine {
    /// `signaling` carries every message the engine wants delivered to the relay.
    pub fn new(
        local_user: UserId,
        room_id: RoomId,
        factory: Arc<dyn MediaSessionFactory>,
        signaling: mpsc::UnboundedSender<SignalMessage>,
        config: NegotiationConfig,
    ) -> Self {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        Self {
            local_user,
            room_id,
            connected: false,
            sessions: HashMap::new(),
            factory,
            signaling,
            events_tx,
            events_rx,
            notices: None,
            room_members: Vec::new(),
            config,
        }
    }

    pub fn local_user(&self) -> &UserId {
        &self.local_user
    }

    pub fn room_id(&self) -> &RoomId {
        &self.room_id
    }

    pub fn config(&self) -> &NegotiationConfig {
        &self.config
    }

    /// Replaces any previous subscriber.
    pub fn subscribe(&mut self) -> mpsc::UnboundedReceiver<EngineNotice> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.notices = Some(tx);
        rx
    }

    /// The local user's state: `Idle` before connecting, otherwise the state of
    /// the live call, or `Ready` without one.
    pub fn state(&self) -> CallState {
        if !self.connected {
            return CallState::Idle;
        }
        self.current_session()
            .map(|s| s.state())
            .unwrap_or(CallState::Ready)
    }

    pub fn session(&self, remote: &UserId) -> Option<&CallSession> {
        self.sessions.get(&self.key_for(remote))
    }

    pub fn current_session(&self) -> Option<&CallSession> {
        self.sessions.values().next()
    }

    /// Other members of the room, as last reported by the relay.
    pub fn room_members(&self) -> &[UserId] {
        &self.room_members
    }

    /// The signaling transport is up.
    pub fn connected(&mut self) {
        if self.connected {
            return;
        }
        self.connected = true;
        debug!(user = %self.local_user, "IDLE -> READY");
        self.notify(EngineNotice::StateChanged {
            peer: None,
            state: CallState::Ready,
        });
    }

    pub fn request_room_members(&self) {
        self.send(SignalMessage::room_user_list_request(&self.room_id));
    }

    /// Waits for the next media result or media event.
    pub async fn next_event(&mut self) -> Option<EngineEvent> {
        self.events_rx.recv().await
    }

    fn key_for(&self, remote: &UserId) -> SessionKey {
        SessionKey::new(&self.local_user, remote)
    }

    fn session_mut(&mut self, remote: &UserId) -> Option<&mut CallSession> {
        let key = self.key_for(remote);
        self.sessions.get_mut(&key)
    }

    fn send(&self, msg: SignalMessage) {
        if self.signaling.send(msg).is_err() {
            warn!(user = %self.local_user, "Signaling channel closed; message dropped");
        }
    }

    fn notify(&self, notice: EngineNotice) {
        if let Some(tx) = &self.notices {
            let _ = tx.send(notice);
        }
    }

    fn set_state(&mut self, remote: &UserId, state: CallState) {
        let local = self.local_user.clone();
        let Some(session) = self.session_mut(remote) else {
            return;
        };
        let from = session.state();
        if from == state {
            return;
        }
        session.set_state(state);
        debug!(user = %local, peer = %remote, "{} -> {}", from, state);
        self.notify(EngineNotice::StateChanged {
            peer: Some(remote.clone()),
            state,
        });
    }
}
