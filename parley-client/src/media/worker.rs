use crate::engine::{EngineEvent, SessionId};
use crate::media::{MediaError, MediaSession};
use parley_core::{Candidate, SessionDescription};
use tokio::sync::{mpsc, oneshot};
use tracing::debug;

/// Media work queued for a session, executed strictly in order.
#[derive(Debug, Clone)]
pub(crate) enum Step {
    /// Acquire media, open the data channel, create an offer and set it locally.
    StartOffer { label: String },
    /// Acquire media, apply the remote offer, create an answer and set it locally.
    AnswerOffer(SessionDescription),
    ApplyRemoteAnswer(SessionDescription),
    AddCandidate(Candidate),
}

/// Result of one [`Step`].
#[derive(Debug, Clone, PartialEq)]
pub enum StepOutcome {
    OfferReady(SessionDescription),
    AnswerReady {
        remote: SessionDescription,
        local: SessionDescription,
    },
    RemoteAnswerApplied(SessionDescription),
    CandidateAdded,
    CandidateFailed(String),
    Failed {
        step: &'static str,
        error: String,
    },
}

/// Serial executor owning one [`MediaSession`].
///
/// Shutting the worker down (or dropping it) abandons the step in progress
/// and closes the media session.
pub(crate) struct MediaWorker {
    steps: mpsc::UnboundedSender<Step>,
    cancel: Option<oneshot::Sender<()>>,
}

impl MediaWorker {
    pub(crate) fn spawn(
        session: SessionId,
        media: Box<dyn MediaSession>,
        events: mpsc::UnboundedSender<EngineEvent>,
    ) -> Self {
        let (steps_tx, steps_rx) = mpsc::unbounded_channel();
        let (cancel_tx, cancel_rx) = oneshot::channel();

        tokio::spawn(run(session, media, steps_rx, cancel_rx, events));

        Self {
            steps: steps_tx,
            cancel: Some(cancel_tx),
        }
    }

    pub(crate) fn submit(&self, step: Step) {
        if self.steps.send(step).is_err() {
            debug!("Media worker already stopped; step dropped");
        }
    }

    pub(crate) fn shutdown(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            let _ = cancel.send(());
        }
    }
}

async fn run(
    session: SessionId,
    mut media: Box<dyn MediaSession>,
    mut steps: mpsc::UnboundedReceiver<Step>,
    mut cancel: oneshot::Receiver<()>,
    events: mpsc::UnboundedSender<EngineEvent>,
) {
    loop {
        let step = tokio::select! {
            biased;
            _ = &mut cancel => break,
            step = steps.recv() => match step {
                Some(step) => step,
                None => break,
            },
        };

        let outcome = tokio::select! {
            biased;
            _ = &mut cancel => {
                debug!(%session, "Media step preempted");
                break;
            }
            outcome = execute(media.as_mut(), step) => outcome,
        };

        if events.send(EngineEvent::Step { session, outcome }).is_err() {
            break;
        }
    }

    if let Err(e) = media.close().await {
        debug!(%session, "Error closing media session: {}", e);
    }
    debug!(%session, "Media worker stopped");
}

async fn execute(media: &mut dyn MediaSession, step: Step) -> StepOutcome {
    match step {
        Step::StartOffer { label } => match start_offer(media, &label).await {
            Ok(local) => StepOutcome::OfferReady(local),
            Err(e) => failed("create offer", e),
        },
        Step::AnswerOffer(remote) => match answer_offer(media, remote.clone()).await {
            Ok(local) => StepOutcome::AnswerReady { remote, local },
            Err(e) => failed("answer offer", e),
        },
        Step::ApplyRemoteAnswer(remote) => {
            match media.set_remote_description(remote.clone()).await {
                Ok(()) => StepOutcome::RemoteAnswerApplied(remote),
                Err(e) => failed("apply answer", e),
            }
        }
        Step::AddCandidate(candidate) => match media.add_candidate(candidate).await {
            Ok(()) => StepOutcome::CandidateAdded,
            Err(e) => StepOutcome::CandidateFailed(e.to_string()),
        },
    }
}

async fn start_offer(
    media: &mut dyn MediaSession,
    label: &str,
) -> Result<SessionDescription, MediaError> {
    media.acquire_local_media().await?;
    media.create_data_channel(label).await?;
    let offer = media.create_offer().await?;
    media.set_local_description(offer.clone()).await?;
    Ok(offer)
}

async fn answer_offer(
    media: &mut dyn MediaSession,
    remote: SessionDescription,
) -> Result<SessionDescription, MediaError> {
    media.acquire_local_media().await?;
    media.set_remote_description(remote).await?;
    let answer = media.create_answer().await?;
    media.set_local_description(answer.clone()).await?;
    Ok(answer)
}

fn failed(step: &'static str, error: MediaError) -> StepOutcome {
    StepOutcome::Failed {
        step,
        error: error.to_string(),
    }
}
