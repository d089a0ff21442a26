use crate::engine::{CallState, EndReason, EngineEvent, EngineNotice, NegotiationEngine, Negotiation};
use crate::media::{MediaEvent, StepOutcome};
use parley_core::{SessionDescription, SignalMessage, UserId};
use tracing::{debug, warn};

impl NegotiationEngine {
    /// Applies a media result or media event. Anything from a session that has
    /// since ended or been replaced is discarded.
    pub fn handle_event(&mut self, event: EngineEvent) {
        let session_id = event.session();
        let Some(remote) = self
            .sessions
            .values()
            .find(|s| s.id() == session_id)
            .map(|s| s.remote_user().clone())
        else {
            debug!(user = %self.local_user, session = %session_id, "Discarding event from finished session");
            return;
        };

        match event {
            EngineEvent::Step { outcome, .. } => self.handle_step_outcome(&remote, outcome),
            EngineEvent::Media { event, .. } => self.handle_media_event(&remote, event),
        }
    }

    fn handle_step_outcome(&mut self, remote: &UserId, outcome: StepOutcome) {
        match outcome {
            StepOutcome::OfferReady(local) => {
                if let Some(session) = self.session_mut(remote) {
                    session.local_description = Some(local.clone());
                    session.negotiation = Negotiation::AwaitingAnswer;
                }
                self.send(SignalMessage::offer(
                    &self.local_user,
                    remote,
                    &self.room_id,
                    local,
                ));
            }
            StepOutcome::AnswerReady {
                remote: remote_description,
                local,
            } => {
                self.remote_applied(remote, remote_description, Some(local.clone()));
                self.send(SignalMessage::answer(
                    &self.local_user,
                    remote,
                    &self.room_id,
                    local,
                ));
            }
            StepOutcome::RemoteAnswerApplied(remote_description) => {
                self.remote_applied(remote, remote_description, None);
            }
            StepOutcome::CandidateAdded => {}
            StepOutcome::CandidateFailed(error) => {
                warn!(user = %self.local_user, peer = %remote, "Failed to add candidate; continuing: {}", error);
            }
            StepOutcome::Failed { step, error } => {
                self.abort_session(remote, format!("{step}: {error}"));
            }
        }
    }

    /// Remote description accepted: flush buffered candidates, then INCALL.
    fn remote_applied(
        &mut self,
        remote: &UserId,
        remote_description: SessionDescription,
        local_description: Option<SessionDescription>,
    ) {
        let local = self.local_user.clone();
        if let Some(session) = self.session_mut(remote) {
            session.remote_description = Some(remote_description);
            if local_description.is_some() {
                session.local_description = local_description;
            }
            session.negotiation = Negotiation::Complete;
            let flushed = session.flush_candidates();
            debug!(user = %local, peer = %remote, flushed, "Remote description applied");
        }
        self.set_state(remote, CallState::InCall);
    }

    fn handle_media_event(&mut self, remote: &UserId, event: MediaEvent) {
        match event {
            MediaEvent::LocalCandidate(candidate) => {
                self.send(SignalMessage::candidate(
                    &self.local_user,
                    remote,
                    &self.room_id,
                    candidate,
                ));
            }
            MediaEvent::DataChannelOpen => {
                if let Some(session) = self.session_mut(remote) {
                    session.data_channel_open = true;
                }
                self.notify(EngineNotice::DataChannelOpen {
                    peer: remote.clone(),
                });
            }
            MediaEvent::ConnectionFailed(reason) => self.abort_session(remote, reason),
        }
    }

    /// Negotiation failure: unwound exactly like a local hangup.
    fn abort_session(&mut self, remote: &UserId, reason: String) {
        warn!(user = %self.local_user, peer = %remote, "Negotiation failed: {}", reason);
        self.send(SignalMessage::hangup(&self.local_user, remote, &self.room_id));
        self.end_session(remote, EndReason::NegotiationFailed(reason));
    }
}
