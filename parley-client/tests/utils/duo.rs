use parley_client::{EngineNotice, NegotiationConfig, NegotiationEngine};
use parley_core::{MessageKind, RoomId, SignalMessage, UserId};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

use super::{MockMediaFactory, SETTLE_MS};

pub const ROOM: &str = "R1";

/// One engine driven by hand: signaling goes in through `deliver`, media
/// results through `settle`, and everything it sends lands in `out`.
pub struct Side {
    pub engine: NegotiationEngine,
    pub media: MockMediaFactory,
    out: mpsc::UnboundedReceiver<SignalMessage>,
    notices: mpsc::UnboundedReceiver<EngineNotice>,
}

impl Side {
    pub fn new(user: &str, config: NegotiationConfig) -> Self {
        Self::with_media(user, MockMediaFactory::new(user), config)
    }

    pub fn with_media(user: &str, media: MockMediaFactory, config: NegotiationConfig) -> Self {
        let (tx, out) = mpsc::unbounded_channel();
        let mut engine = NegotiationEngine::new(
            UserId::from(user),
            RoomId::from(ROOM),
            Arc::new(media.clone()),
            tx,
            config,
        );
        let notices = engine.subscribe();
        engine.connected();
        Self {
            engine,
            media,
            out,
            notices,
        }
    }

    pub fn user(&self) -> UserId {
        self.engine.local_user().clone()
    }

    pub fn deliver(&mut self, msg: SignalMessage) {
        self.engine.handle_signal(msg);
    }

    /// Drains everything sent since the last call.
    pub fn sent(&mut self) -> Vec<SignalMessage> {
        let mut sent = Vec::new();
        while let Ok(msg) = self.out.try_recv() {
            sent.push(msg);
        }
        sent
    }

    pub fn sent_kinds(&mut self) -> Vec<MessageKind> {
        self.sent().into_iter().map(|m| m.kind).collect()
    }

    pub fn notices(&mut self) -> Vec<EngineNotice> {
        let mut notices = Vec::new();
        while let Ok(notice) = self.notices.try_recv() {
            notices.push(notice);
        }
        notices
    }

    /// Applies media results until none arrives for a short while.
    pub async fn settle(&mut self) -> usize {
        let mut handled = 0;
        while let Ok(Some(event)) = tokio::time::timeout(
            Duration::from_millis(SETTLE_MS),
            self.engine.next_event(),
        )
        .await
        {
            self.engine.handle_event(event);
            handled += 1;
        }
        handled
    }
}

/// Two engines wired back to back, without a relay in between.
pub struct Duo {
    pub a: Side,
    pub b: Side,
    /// Every message that crossed the wire, in delivery order.
    pub wire: Vec<SignalMessage>,
}

impl Duo {
    pub fn new(a: Side, b: Side) -> Self {
        Self {
            a,
            b,
            wire: Vec::new(),
        }
    }

    /// Carries messages and media results until both sides go quiet.
    pub async fn pump(&mut self) {
        for _ in 0..50 {
            let mut moved = 0;

            for msg in self.a.sent() {
                self.wire.push(msg.clone());
                self.b.deliver(msg);
                moved += 1;
            }
            for msg in self.b.sent() {
                self.wire.push(msg.clone());
                self.a.deliver(msg);
                moved += 1;
            }

            moved += self.a.settle().await;
            moved += self.b.settle().await;

            if moved == 0 {
                return;
            }
        }
        panic!("engines never went quiet");
    }

    /// Messages of `kind` sent by `from`.
    pub fn wire_count(&self, from: &UserId, kind: MessageKind) -> usize {
        self.wire
            .iter()
            .filter(|m| m.kind == kind && m.from_user_id.as_ref() == Some(from))
            .count()
    }
}
