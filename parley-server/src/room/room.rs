use crate::room::member::Member;
use parley_core::{ConnectionId, RoomId, UserId};

/// Members of one room, kept in join order.
#[derive(Debug)]
pub struct Room {
    id: RoomId,
    members: Vec<Member>,
}

impl Room {
    pub(crate) fn new(id: RoomId) -> Self {
        Self {
            id,
            members: Vec::new(),
        }
    }

    pub fn id(&self) -> &RoomId {
        &self.id
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn get(&self, user_id: &UserId) -> Option<&Member> {
        self.members.iter().find(|m| &m.user_id == user_id)
    }

    /// Inserts the member, or replaces an existing one in place so the
    /// original join position is kept. Returns the replaced member.
    pub(crate) fn upsert(&mut self, member: Member) -> Option<Member> {
        match self.members.iter_mut().find(|m| m.user_id == member.user_id) {
            Some(slot) => Some(std::mem::replace(slot, member)),
            None => {
                self.members.push(member);
                None
            }
        }
    }

    pub(crate) fn remove(&mut self, user_id: &UserId) -> Option<Member> {
        let idx = self.members.iter().position(|m| &m.user_id == user_id)?;
        Some(self.members.remove(idx))
    }

    /// Removes the member only if it is still bound to `connection`.
    pub(crate) fn remove_connection(
        &mut self,
        user_id: &UserId,
        connection: ConnectionId,
    ) -> Option<Member> {
        let idx = self
            .members
            .iter()
            .position(|m| &m.user_id == user_id && m.handle.id() == connection)?;
        Some(self.members.remove(idx))
    }

    pub fn user_ids(&self) -> Vec<UserId> {
        self.members.iter().map(|m| m.user_id.clone()).collect()
    }

    pub fn members(&self) -> &[Member] {
        &self.members
    }
}
