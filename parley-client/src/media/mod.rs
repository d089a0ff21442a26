//! Seam between the negotiation engine and whatever produces and consumes
//! session descriptions and candidates.

mod worker;

#[cfg(feature = "webrtc")]
mod webrtc_session;

pub(crate) use worker::{MediaWorker, Step};
pub use worker::StepOutcome;
#[cfg(feature = "webrtc")]
pub use webrtc_session::WebRtcSessionFactory;

use crate::engine::{EngineEvent, SessionId};
use async_trait::async_trait;
use parley_core::{Candidate, SessionDescription, UserId};
use thiserror::Error;
use tokio::sync::mpsc;

#[derive(Debug, Error)]
pub enum MediaError {
    /// A description or candidate was refused by the media stack.
    #[error("rejected: {0}")]
    Rejected(String),

    #[error("media session is closed")]
    Closed,

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// One peer connection's worth of media. Every call is a suspension point;
/// the engine never runs two of them at the same time for one session.
#[async_trait]
pub trait MediaSession: Send {
    async fn acquire_local_media(&mut self) -> Result<(), MediaError>;

    async fn create_data_channel(&mut self, label: &str) -> Result<(), MediaError>;

    async fn create_offer(&mut self) -> Result<SessionDescription, MediaError>;

    async fn create_answer(&mut self) -> Result<SessionDescription, MediaError>;

    async fn set_local_description(&mut self, desc: SessionDescription) -> Result<(), MediaError>;

    async fn set_remote_description(&mut self, desc: SessionDescription)
    -> Result<(), MediaError>;

    async fn add_candidate(&mut self, candidate: Candidate) -> Result<(), MediaError>;

    /// Closes the data channel and the connection and stops local capture.
    async fn close(&mut self) -> Result<(), MediaError>;
}

pub trait MediaSessionFactory: Send + Sync {
    /// Creates the media side of a new call with `remote`. Anything the session
    /// reports on its own goes through `events`.
    fn create(
        &self,
        remote: &UserId,
        events: MediaEvents,
    ) -> Result<Box<dyn MediaSession>, MediaError>;
}

/// Things a media session reports without being asked.
#[derive(Debug, Clone, PartialEq)]
pub enum MediaEvent {
    LocalCandidate(Candidate),
    DataChannelOpen,
    ConnectionFailed(String),
}

/// Callback side handed to a [`MediaSession`]. Events are tagged with the
/// session they belong to, so reports from a finished call are ignored.
#[derive(Debug, Clone)]
pub struct MediaEvents {
    session: SessionId,
    tx: mpsc::UnboundedSender<EngineEvent>,
}

impl MediaEvents {
    pub(crate) fn new(session: SessionId, tx: mpsc::UnboundedSender<EngineEvent>) -> Self {
        Self { session, tx }
    }

    pub fn session(&self) -> SessionId {
        self.session
    }

    pub fn local_candidate(&self, candidate: Candidate) {
        self.emit(MediaEvent::LocalCandidate(candidate));
    }

    pub fn data_channel_open(&self) {
        self.emit(MediaEvent::DataChannelOpen);
    }

    pub fn connection_failed(&self, reason: impl Into<String>) {
        self.emit(MediaEvent::ConnectionFailed(reason.into()));
    }

    fn emit(&self, event: MediaEvent) {
        let _ = self.tx.send(EngineEvent::Media {
            session: self.session,
            event,
        });
    }
}
