use crate::engine::{CallRole, NegotiationEngine, Negotiation};
use crate::media::Step;
use parley_core::{Candidate, SessionDescription, UserId};
use tracing::{debug, warn};

impl NegotiationEngine {
    pub(super) fn handle_remote_offer(&mut self, from: &UserId, offer: SessionDescription) {
        let local = self.local_user.clone();
        let Some(session) = self.session_mut(from) else {
            warn!(user = %local, peer = %from, "Offer without a call; ignoring");
            return;
        };

        if session.negotiation != Negotiation::Idle {
            warn!(
                user = %local,
                peer = %from,
                negotiation = ?session.negotiation,
                "Offer collides with negotiation in progress; ignoring"
            );
            return;
        }

        if session.role() == CallRole::Callee && !session.accepted {
            debug!(user = %local, peer = %from, "Holding offer until the call is answered");
            session.pending_offer = Some(offer);
            return;
        }

        session.negotiation = Negotiation::AnsweringOffer;
        session.submit(Step::AnswerOffer(offer));
    }

    pub(super) fn handle_remote_answer(&mut self, from: &UserId, answer: SessionDescription) {
        let local = self.local_user.clone();
        let Some(session) = self.session_mut(from) else {
            warn!(user = %local, peer = %from, "Answer without a call; ignoring");
            return;
        };

        if session.negotiation != Negotiation::AwaitingAnswer {
            warn!(
                user = %local,
                peer = %from,
                negotiation = ?session.negotiation,
                "Unexpected answer; ignoring"
            );
            return;
        }

        session.negotiation = Negotiation::ApplyingAnswer;
        session.submit(Step::ApplyRemoteAnswer(answer));
    }

    pub(super) fn handle_remote_candidate(&mut self, from: &UserId, candidate: Candidate) {
        let local = self.local_user.clone();
        match self.session_mut(from) {
            Some(session) => session.accept_candidate(candidate),
            None => debug!(user = %local, peer = %from, "Candidate without a call; dropping"),
        }
    }
}
