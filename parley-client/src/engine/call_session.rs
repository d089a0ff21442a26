use crate::engine::{CallRole, CallState};
use crate::media::{MediaWorker, Step};
use parley_core::{Candidate, SessionDescription, UserId};
use std::collections::VecDeque;
use std::fmt;
use uuid::Uuid;

/// Identity of one call attempt. A replacement attempt with the same peer
/// gets a fresh id, which is how late media results are told apart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SessionId(pub Uuid);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SessionKey {
    pub local: UserId,
    pub remote: UserId,
}

impl SessionKey {
    pub fn new(local: &UserId, remote: &UserId) -> Self {
        Self {
            local: local.clone(),
            remote: remote.clone(),
        }
    }
}

/// Progress of the offer/answer exchange inside a call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Negotiation {
    /// No description produced or received yet.
    Idle,
    CreatingOffer,
    AwaitingAnswer,
    AnsweringOffer,
    ApplyingAnswer,
    Complete,
}

pub struct CallSession {
    id: SessionId,
    key: SessionKey,
    state: CallState,
    role: CallRole,
    pub(super) negotiation: Negotiation,
    /// Remote candidates received before the remote description was applied.
    pub(super) pending_candidates: VecDeque<Candidate>,
    /// Offer received while the callee has not answered yet.
    pub(super) pending_offer: Option<SessionDescription>,
    pub(super) local_description: Option<SessionDescription>,
    pub(super) remote_description: Option<SessionDescription>,
    pub(super) data_channel_open: bool,
    /// The callee has performed its answer action.
    pub(super) accepted: bool,
    worker: MediaWorker,
}

impl CallSession {
    pub(super) fn new(
        id: SessionId,
        key: SessionKey,
        role: CallRole,
        state: CallState,
        worker: MediaWorker,
    ) -> Self {
        Self {
            id,
            key,
            state,
            role,
            negotiation: Negotiation::Idle,
            pending_candidates: VecDeque::new(),
            pending_offer: None,
            local_description: None,
            remote_description: None,
            data_channel_open: false,
            accepted: false,
            worker,
        }
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn local_user(&self) -> &UserId {
        &self.key.local
    }

    pub fn remote_user(&self) -> &UserId {
        &self.key.remote
    }

    pub fn state(&self) -> CallState {
        self.state
    }

    pub fn role(&self) -> CallRole {
        self.role
    }

    pub fn negotiation(&self) -> Negotiation {
        self.negotiation
    }

    pub fn pending_candidates(&self) -> usize {
        self.pending_candidates.len()
    }

    pub fn has_pending_offer(&self) -> bool {
        self.pending_offer.is_some()
    }

    pub fn local_description(&self) -> Option<&SessionDescription> {
        self.local_description.as_ref()
    }

    pub fn remote_description(&self) -> Option<&SessionDescription> {
        self.remote_description.as_ref()
    }

    pub fn data_channel_open(&self) -> bool {
        self.data_channel_open
    }

    pub fn is_accepted(&self) -> bool {
        self.accepted
    }

    pub(super) fn set_state(&mut self, state: CallState) {
        self.state = state;
    }

    pub(super) fn submit(&self, step: Step) {
        self.worker.submit(step);
    }

    /// Queues a remote candidate, or hands it to the media worker once the
    /// remote description is in place.
    pub(super) fn accept_candidate(&mut self, candidate: Candidate) {
        if self.remote_description.is_some() {
            self.worker.submit(Step::AddCandidate(candidate));
        } else {
            self.pending_candidates.push_back(candidate);
        }
    }

    /// Sends every buffered candidate to the worker, oldest first. The buffer
    /// is left empty, so each one is applied exactly once.
    pub(super) fn flush_candidates(&mut self) -> usize {
        let count = self.pending_candidates.len();
        for candidate in self.pending_candidates.drain(..) {
            self.worker.submit(Step::AddCandidate(candidate));
        }
        count
    }

    /// Stops media work and drops everything buffered.
    pub(super) fn release(&mut self) {
        self.pending_candidates.clear();
        self.pending_offer = None;
        self.data_channel_open = false;
        self.worker.shutdown();
    }
}

impl fmt::Debug for CallSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CallSession")
            .field("id", &self.id)
            .field("key", &self.key)
            .field("state", &self.state)
            .field("role", &self.role)
            .field("negotiation", &self.negotiation)
            .field("pending_candidates", &self.pending_candidates.len())
            .field("accepted", &self.accepted)
            .finish()
    }
}
