use dashmap::DashMap;
use parley_core::{RoomId, UserId};
use std::collections::BTreeSet;
use std::sync::Arc;

/// Relay-side record of which member pairs have a call in progress, used to
/// unwind the remote side when one end hangs up without a target or disconnects.
///
/// Pairs are stored symmetrically: `open(r, a, b)` makes `b` a peer of `a`
/// and `a` a peer of `b`.
#[derive(Clone, Default)]
pub struct CallLedger {
    peers: Arc<DashMap<(RoomId, UserId), BTreeSet<UserId>>>,
}

impl CallLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn open(&self, room_id: &RoomId, a: &UserId, b: &UserId) {
        if a == b {
            return;
        }
        self.link(room_id, a, b);
        self.link(room_id, b, a);
    }

    pub fn close(&self, room_id: &RoomId, a: &UserId, b: &UserId) {
        self.unlink(room_id, a, b);
        self.unlink(room_id, b, a);
    }

    pub fn peers_of(&self, room_id: &RoomId, user_id: &UserId) -> Vec<UserId> {
        self.peers
            .get(&(room_id.clone(), user_id.clone()))
            .map(|set| set.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Removes every pair involving `user_id` and returns its former peers.
    pub fn take(&self, room_id: &RoomId, user_id: &UserId) -> Vec<UserId> {
        let Some((_, peers)) = self.peers.remove(&(room_id.clone(), user_id.clone())) else {
            return Vec::new();
        };
        for peer in &peers {
            self.unlink(room_id, peer, user_id);
        }
        peers.into_iter().collect()
    }

    fn link(&self, room_id: &RoomId, owner: &UserId, peer: &UserId) {
        self.peers
            .entry((room_id.clone(), owner.clone()))
            .or_default()
            .insert(peer.clone());
    }

    fn unlink(&self, room_id: &RoomId, owner: &UserId, peer: &UserId) {
        let key = (room_id.clone(), owner.clone());
        self.peers.remove_if_mut(&key, |_, set| {
            set.remove(peer);
            set.is_empty()
        });
    }
}
