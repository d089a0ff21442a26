use crate::engine::{EngineNotice, NegotiationEngine};
use parley_core::{
    CandidatePayload, DescriptionPayload, MessageKind, PresencePayload, SignalMessage, UserId,
};
use tracing::{debug, warn};

impl NegotiationEngine {
    /// Single entry point for messages arriving from the relay.
    pub fn handle_signal(&mut self, msg: SignalMessage) {
        match msg.kind {
            MessageKind::Join | MessageKind::Leave => self.handle_presence(&msg),
            MessageKind::RoomUserList => self.handle_room_user_list(&msg),
            MessageKind::Call
            | MessageKind::Offer
            | MessageKind::Answer
            | MessageKind::Candidate
            | MessageKind::Hangup => self.handle_peer_message(msg),
        }
    }

    fn handle_peer_message(&mut self, msg: SignalMessage) {
        let from = match msg.sender() {
            Ok(from) => from.clone(),
            Err(e) => {
                warn!(user = %self.local_user, "Dropping message: {}", e);
                return;
            }
        };
        if msg.to_user_id.as_ref().is_some_and(|to| to != &self.local_user) {
            warn!(user = %self.local_user, kind = %msg.kind, "Message addressed to someone else");
            return;
        }
        if from == self.local_user {
            warn!(user = %self.local_user, kind = %msg.kind, "Message from ourselves; ignoring");
            return;
        }

        match msg.kind {
            MessageKind::Call => self.handle_remote_call(&from),
            MessageKind::Hangup => self.handle_remote_hangup(&from),
            MessageKind::Offer => match msg.payload_as::<DescriptionPayload>() {
                Ok(payload) => self.handle_remote_offer(&from, payload.description),
                Err(e) => warn!(user = %self.local_user, peer = %from, "Dropping offer: {}", e),
            },
            MessageKind::Answer => match msg.payload_as::<DescriptionPayload>() {
                Ok(payload) => self.handle_remote_answer(&from, payload.description),
                Err(e) => warn!(user = %self.local_user, peer = %from, "Dropping answer: {}", e),
            },
            MessageKind::Candidate => match msg.payload_as::<CandidatePayload>() {
                Ok(payload) => self.handle_remote_candidate(&from, payload.candidate),
                Err(e) => warn!(user = %self.local_user, peer = %from, "Dropping candidate: {}", e),
            },
            _ => {}
        }
    }

    fn handle_presence(&mut self, msg: &SignalMessage) {
        let payload = match msg.payload_as::<PresencePayload>() {
            Ok(payload) => payload,
            Err(e) => {
                warn!(user = %self.local_user, "Dropping presence notice: {}", e);
                return;
            }
        };
        let user = payload.user_id;
        if user == self.local_user {
            return;
        }

        if msg.kind == MessageKind::Join {
            if !self.room_members.contains(&user) {
                self.room_members.push(user);
            }
        } else {
            self.room_members.retain(|m| m != &user);
            if self.session(&user).is_some() {
                debug!(user = %self.local_user, peer = %user, "Peer left during call");
                self.end_session(&user, crate::engine::EndReason::PeerLeft);
            }
        }

        self.notify(EngineNotice::RoomMembers(self.room_members.clone()));
    }

    fn handle_room_user_list(&mut self, msg: &SignalMessage) {
        let members = match msg.payload_as::<Vec<UserId>>() {
            Ok(members) => members,
            Err(e) => {
                warn!(user = %self.local_user, "Dropping room user list: {}", e);
                return;
            }
        };
        self.room_members = members
            .into_iter()
            .filter(|m| m != &self.local_user)
            .collect();
        self.notify(EngineNotice::RoomMembers(self.room_members.clone()));
    }
}
