use crate::engine::{CallState, EndReason, EngineNotice, NegotiationEngine};
use crate::error::NegotiationError;
use parley_core::{SignalMessage, UserId};
use tracing::debug;

impl NegotiationEngine {
    /// Ends the live call and tells the peer.
    pub fn hangup(&mut self) -> Result<(), NegotiationError> {
        let Some(remote) = self.current_session().map(|s| s.remote_user().clone()) else {
            return Err(NegotiationError::NoSession);
        };
        self.send(SignalMessage::hangup(&self.local_user, &remote, &self.room_id));
        self.end_session(&remote, EndReason::LocalHangup);
        Ok(())
    }

    pub(super) fn handle_remote_hangup(&mut self, from: &UserId) {
        if self.session(from).is_none() {
            debug!(user = %self.local_user, peer = %from, "Hangup without a call; ignoring");
            return;
        }
        self.end_session(from, EndReason::RemoteHangup);
    }

    /// CALLING/ANSWERING/INCALL -> ENDED -> READY. Preempts any media step in
    /// flight and drops buffered candidates. The signaling connection stays up.
    pub(super) fn end_session(&mut self, remote: &UserId, reason: EndReason) {
        let key = self.key_for(remote);
        let Some(mut session) = self.sessions.remove(&key) else {
            return;
        };

        debug!(user = %self.local_user, peer = %remote, ?reason, "{} -> ENDED", session.state());
        self.notify(EngineNotice::StateChanged {
            peer: Some(remote.clone()),
            state: CallState::Ended,
        });

        session.release();

        self.notify(EngineNotice::CallEnded {
            peer: remote.clone(),
            reason,
        });
        debug!(user = %self.local_user, peer = %remote, "ENDED -> READY");
        self.notify(EngineNotice::StateChanged {
            peer: Some(remote.clone()),
            state: CallState::Ready,
        });
    }

    /// Drops a session without any notices; used when glare replaces it.
    pub(super) fn discard_session(&mut self, remote: &UserId) {
        let key = self.key_for(remote);
        if let Some(mut session) = self.sessions.remove(&key) {
            session.release();
        }
    }

    /// The signaling transport is gone. Live calls end locally; the relay
    /// hangs up on our peers for us.
    pub fn disconnected(&mut self) {
        let remotes: Vec<UserId> = self
            .sessions
            .values()
            .map(|s| s.remote_user().clone())
            .collect();
        for remote in remotes {
            self.end_session(&remote, EndReason::Disconnected);
        }

        self.room_members.clear();
        if self.connected {
            self.connected = false;
            debug!(user = %self.local_user, "READY -> IDLE");
            self.notify(EngineNotice::StateChanged {
                peer: None,
                state: CallState::Idle,
            });
        }
    }
}
