use crate::engine::{CallRole, CallState, NegotiationEngine, Negotiation};
use crate::error::NegotiationError;
use crate::media::Step;
use parley_core::UserId;
use tracing::debug;

impl NegotiationEngine {
    /// The local answer action for an incoming call.
    ///
    /// Answers the caller's offer if one is already held, otherwise produces
    /// the offer (or, when the caller offers on call, waits for it).
    pub fn answer(&mut self) -> Result<(), NegotiationError> {
        let Some(session) = self.current_session() else {
            return Err(NegotiationError::NoSession);
        };
        if session.role() != CallRole::Callee
            || session.state() != CallState::Answering
            || session.is_accepted()
        {
            return Err(NegotiationError::InvalidTransition {
                state: session.state(),
                action: "answer",
            });
        }

        let remote = session.remote_user().clone();
        self.begin_answer(&remote);
        Ok(())
    }

    pub(super) fn begin_answer(&mut self, remote: &UserId) {
        let offer_on_call = self.config.offer_on_call;
        let Some(session) = self.session_mut(remote) else {
            return;
        };
        session.accepted = true;

        if let Some(offer) = session.pending_offer.take() {
            session.negotiation = Negotiation::AnsweringOffer;
            session.submit(Step::AnswerOffer(offer));
        } else if offer_on_call {
            debug!(peer = %remote, "Answered; waiting for the caller's offer");
        } else {
            self.start_offer(remote);
        }
    }
}
