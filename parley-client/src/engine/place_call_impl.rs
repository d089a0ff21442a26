use crate::engine::{
    CallRole, CallSession, CallState, EngineNotice, NegotiationEngine, Negotiation, SessionId,
};
use crate::error::NegotiationError;
use crate::media::{MediaError, MediaEvents, MediaWorker, Step};
use parley_core::{SignalMessage, UserId};
use tracing::{debug, info, warn};

impl NegotiationEngine {
    /// READY -> CALLING. Sends `call` to `target`.
    pub fn call(&mut self, target: &UserId) -> Result<(), NegotiationError> {
        if !self.connected {
            return Err(NegotiationError::InvalidTransition {
                state: CallState::Idle,
                action: "call",
            });
        }
        if target == &self.local_user {
            return Err(NegotiationError::InvalidTransition {
                state: self.state(),
                action: "call yourself",
            });
        }
        if let Some(existing) = self.current_session() {
            let peer = existing.remote_user().clone();
            return Err(if &peer == target {
                NegotiationError::AlreadyInSession { peer }
            } else {
                NegotiationError::Busy { peer }
            });
        }

        self.open_session(target, CallRole::Caller, CallState::Calling)?;
        self.send(SignalMessage::call(&self.local_user, target, &self.room_id));

        if self.config.offer_on_call {
            self.start_offer(target);
        }
        Ok(())
    }

    pub(super) fn handle_remote_call(&mut self, from: &UserId) {
        let Some(existing) = self.current_session() else {
            self.accept_incoming(from);
            return;
        };

        let peer = existing.remote_user().clone();
        if &peer != from {
            info!(user = %self.local_user, peer = %from, busy_with = %peer, "Busy; rejecting call");
            self.send(SignalMessage::hangup(&self.local_user, from, &self.room_id));
            self.notify(EngineNotice::CallRejected { peer: from.clone() });
            return;
        }

        let glare = existing.role() == CallRole::Caller && existing.state() == CallState::Calling;
        if !glare {
            debug!(user = %self.local_user, peer = %from, "Duplicate call ignored");
            return;
        }

        // Both sides called each other. The smaller id stays caller; the other
        // side drops its attempt and answers without prompting.
        if self.local_user < *from {
            info!(user = %self.local_user, peer = %from, "Glare: keeping caller role");
            return;
        }

        info!(user = %self.local_user, peer = %from, "Glare: yielding caller role");
        self.discard_session(from);
        match self.open_session(from, CallRole::Callee, CallState::Answering) {
            Ok(_) => self.begin_answer(from),
            Err(e) => self.refuse_call(from, e),
        }
    }

    fn accept_incoming(&mut self, from: &UserId) {
        if let Err(e) = self.open_session(from, CallRole::Callee, CallState::Answering) {
            self.refuse_call(from, e);
            return;
        }
        self.notify(EngineNotice::IncomingCall { from: from.clone() });

        if self.config.auto_answer {
            self.begin_answer(from);
        }
    }

    fn refuse_call(&mut self, from: &UserId, error: MediaError) {
        warn!(user = %self.local_user, peer = %from, "Cannot set up media for call: {}", error);
        self.send(SignalMessage::hangup(&self.local_user, from, &self.room_id));
    }

    fn open_session(
        &mut self,
        remote: &UserId,
        role: CallRole,
        state: CallState,
    ) -> Result<SessionId, MediaError> {
        let id = SessionId::new();
        let events = MediaEvents::new(id, self.events_tx.clone());
        let media = self.factory.create(remote, events)?;
        let worker = MediaWorker::spawn(id, media, self.events_tx.clone());

        let key = self.key_for(remote);
        self.sessions
            .insert(key.clone(), CallSession::new(id, key, role, state, worker));

        debug!(user = %self.local_user, peer = %remote, session = %id, "READY -> {}", state);
        self.notify(EngineNotice::StateChanged {
            peer: Some(remote.clone()),
            state,
        });
        Ok(id)
    }

    pub(super) fn start_offer(&mut self, remote: &UserId) {
        let label = self.config.data_channel_label.clone();
        if let Some(session) = self.session_mut(remote) {
            session.negotiation = Negotiation::CreatingOffer;
            session.submit(Step::StartOffer { label });
        }
    }
}
