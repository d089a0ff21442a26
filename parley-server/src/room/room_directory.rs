use crate::error::RelayError;
use crate::room::{Member, Room};
use crate::signaling::ConnectionHandle;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use parley_core::{ConnectionId, RoomId, UserId};
use std::sync::Arc;
use tracing::{debug, info};

/// Result of [`RoomDirectory::join`].
#[derive(Debug, Clone)]
pub struct JoinOutcome {
    pub member: Member,
    /// The member bound to the user's previous connection, if this join
    /// replaced one.
    pub replaced: Option<Member>,
}

impl JoinOutcome {
    pub fn is_reconnect(&self) -> bool {
        self.replaced.is_some()
    }
}

/// In-memory registry of rooms and their members.
///
/// Every operation mutates a room under that room's map entry lock, so calls
/// on the same room are serialized while different rooms proceed independently.
/// A room exists exactly while it has at least one member.
#[derive(Clone, Default)]
pub struct RoomDirectory {
    rooms: Arc<DashMap<RoomId, Room>>,
}

impl RoomDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `user_id` to the room, creating the room if needed.
    ///
    /// A previous handle for the same user is replaced in place and told to
    /// close; the user keeps its join position and `joined_at`. The replaced
    /// member is reported so the caller can treat the join as a reconnect.
    /// The check and the replacement happen under one room lock.
    pub fn join(
        &self,
        room_id: &RoomId,
        user_id: &UserId,
        handle: ConnectionHandle,
    ) -> JoinOutcome {
        let mut member = Member::new(user_id.clone(), handle);

        let previous = {
            let mut room = self.rooms.entry(room_id.clone()).or_insert_with(|| {
                info!(room = %room_id, "Creating new room");
                Room::new(room_id.clone())
            });
            if let Some(existing) = room.get(user_id) {
                member.joined_at = existing.joined_at;
            }
            room.upsert(member.clone())
        };

        let replaced = match previous {
            Some(old) if old.handle.id() != member.handle.id() => {
                info!(
                    room = %room_id,
                    user = %user_id,
                    old_connection = %old.handle.id(),
                    "Member reconnected; closing previous connection"
                );
                old.handle.close();
                Some(old)
            }
            Some(_) => None,
            None => {
                debug!(room = %room_id, user = %user_id, "Member joined");
                None
            }
        };

        JoinOutcome { member, replaced }
    }

    /// Removes `user_id` regardless of which connection it is bound to.
    /// Returns `false` if the user was not a member.
    pub fn leave(&self, room_id: &RoomId, user_id: &UserId) -> bool {
        self.remove_with(room_id, |room| room.remove(user_id))
            .is_some()
    }

    /// Removes `user_id` only while it is still bound to `connection`, so a
    /// superseded connection cannot evict the user's newer one.
    pub fn leave_connection(
        &self,
        room_id: &RoomId,
        user_id: &UserId,
        connection: ConnectionId,
    ) -> bool {
        self.remove_with(room_id, |room| room.remove_connection(user_id, connection))
            .is_some()
    }

    fn remove_with<F>(&self, room_id: &RoomId, remove: F) -> Option<Member>
    where
        F: FnOnce(&mut Room) -> Option<Member>,
    {
        let Entry::Occupied(mut entry) = self.rooms.entry(room_id.clone()) else {
            return None;
        };

        let removed = remove(entry.get_mut());
        if let Some(member) = &removed {
            debug!(
                room = %room_id,
                user = %member.user_id,
                member_for = ?member.joined_at.elapsed().unwrap_or_default(),
                "Member left"
            );
        }

        if entry.get().is_empty() {
            entry.remove();
            info!(room = %room_id, "Room is empty; removing");
        }

        removed
    }

    pub fn lookup(&self, room_id: &RoomId, user_id: &UserId) -> Result<Member, RelayError> {
        self.rooms
            .get(room_id)
            .and_then(|room| room.get(user_id).cloned())
            .ok_or_else(|| RelayError::NotFound {
                room_id: room_id.clone(),
                user_id: user_id.clone(),
            })
    }

    /// Member ids in join order; empty for an unknown room.
    pub fn list_members(&self, room_id: &RoomId) -> Vec<UserId> {
        self.rooms
            .get(room_id)
            .map(|room| room.user_ids())
            .unwrap_or_default()
    }

    /// Copy of the room's members, taken under the room lock and released
    /// before the caller does anything with it.
    pub fn snapshot(&self, room_id: &RoomId) -> Vec<Member> {
        self.rooms
            .get(room_id)
            .map(|room| room.members().to_vec())
            .unwrap_or_default()
    }

    pub fn contains_room(&self, room_id: &RoomId) -> bool {
        self.rooms.contains_key(room_id)
    }

    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }
}
