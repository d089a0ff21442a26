use crate::room::{Member, RoomDirectory};
use parley_core::{RoomId, SignalMessage, UserId};
use tracing::{debug, warn};

/// Outcome of a directed delivery.
#[must_use]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    Delivered,
    /// The target is not a member of the room.
    NotFound,
    /// The target is a member but its connection is already gone.
    Closed,
}

impl Delivery {
    pub fn is_delivered(self) -> bool {
        self == Delivery::Delivered
    }
}

/// Delivers signal messages to one member or to a whole room.
#[derive(Clone)]
pub struct MessageRouter {
    directory: RoomDirectory,
}

impl MessageRouter {
    pub fn new(directory: RoomDirectory) -> Self {
        Self { directory }
    }

    pub fn directory(&self) -> &RoomDirectory {
        &self.directory
    }

    pub fn route_direct(&self, room_id: &RoomId, target: &UserId, msg: SignalMessage) -> Delivery {
        let member = match self.directory.lookup(room_id, target) {
            Ok(member) => member,
            Err(_) => {
                debug!(room = %room_id, target = %target, kind = %msg.kind, "Target not in room");
                return Delivery::NotFound;
            }
        };

        match member.handle.deliver(msg) {
            Ok(()) => Delivery::Delivered,
            Err(e) => {
                warn!(room = %room_id, target = %target, error = %e, "Failed to deliver message");
                Delivery::Closed
            }
        }
    }

    /// Sends `msg` to every current member except `exclude`. Returns how many
    /// members it was queued for.
    pub fn broadcast(&self, room_id: &RoomId, msg: &SignalMessage, exclude: Option<&UserId>) -> usize {
        let recipients = self.snapshot_recipients(room_id, exclude);
        Self::deliver_to(&recipients, msg)
    }

    /// Membership as of now, minus `exclude`. Later joins and leaves do not
    /// affect the returned set.
    pub fn snapshot_recipients(&self, room_id: &RoomId, exclude: Option<&UserId>) -> Vec<Member> {
        self.directory
            .snapshot(room_id)
            .into_iter()
            .filter(|m| Some(&m.user_id) != exclude)
            .collect()
    }

    pub fn deliver_to(recipients: &[Member], msg: &SignalMessage) -> usize {
        recipients
            .iter()
            .filter(|member| match member.handle.deliver(msg.clone()) {
                Ok(()) => true,
                Err(e) => {
                    debug!(user = %member.user_id, error = %e, "Skipping closed member in broadcast");
                    false
                }
            })
            .count()
    }
}
