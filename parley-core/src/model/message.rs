use crate::error::ProtocolError;
use crate::model::payload::{
    CallPayload, Candidate, CandidatePayload, DescriptionPayload, PresencePayload,
    SessionDescription,
};
use crate::model::peer::UserId;
use crate::model::room::RoomId;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MessageKind {
    Join,
    Leave,
    RoomUserList,
    Call,
    Offer,
    Answer,
    Candidate,
    Hangup,
}

impl MessageKind {
    /// Kinds the relay delivers to exactly one member.
    pub fn requires_target(self) -> bool {
        matches!(
            self,
            MessageKind::Call | MessageKind::Offer | MessageKind::Answer | MessageKind::Candidate
        )
    }

    /// Kinds only the relay may originate.
    pub fn is_presence(self) -> bool {
        matches!(self, MessageKind::Join | MessageKind::Leave)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            MessageKind::Join => "join",
            MessageKind::Leave => "leave",
            MessageKind::RoomUserList => "roomUserList",
            MessageKind::Call => "call",
            MessageKind::Offer => "offer",
            MessageKind::Answer => "answer",
            MessageKind::Candidate => "candidate",
            MessageKind::Hangup => "hangup",
        }
    }
}

impl fmt::Display for MessageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One logical signaling event, serialized as a single JSON object.
///
/// ```json
/// { "type": "offer", "fromUserId": "a", "toUserId": "b", "roomId": "r1",
///   "payload": { "targetUserId": "b", "roomId": "r1", "userId": "a", "description": {..} } }
/// ```
///
/// A message without `toUserId` (and without a `targetUserId` in its payload)
/// is addressed to the whole room except its sender.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignalMessage {
    #[serde(rename = "type")]
    pub kind: MessageKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from_user_id: Option<UserId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to_user_id: Option<UserId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub room_id: Option<RoomId>,
    #[serde(default)]
    pub payload: Value,
}

impl SignalMessage {
    pub fn new(kind: MessageKind, payload: Value) -> Self {
        Self {
            kind,
            from_user_id: None,
            to_user_id: None,
            room_id: None,
            payload,
        }
    }

    pub fn join_notice(user_id: &UserId, room_id: &RoomId) -> Self {
        Self::presence(MessageKind::Join, user_id, room_id)
    }

    pub fn leave_notice(user_id: &UserId, room_id: &RoomId) -> Self {
        Self::presence(MessageKind::Leave, user_id, room_id)
    }

    fn presence(kind: MessageKind, user_id: &UserId, room_id: &RoomId) -> Self {
        let payload = PresencePayload {
            user_id: user_id.clone(),
            room_id: room_id.clone(),
        };
        Self {
            kind,
            from_user_id: Some(user_id.clone()),
            to_user_id: None,
            room_id: Some(room_id.clone()),
            payload: to_value(&payload),
        }
    }

    /// A `roomUserList` request; the relay answers on the same connection.
    pub fn room_user_list_request(room_id: &RoomId) -> Self {
        Self {
            room_id: Some(room_id.clone()),
            ..Self::new(MessageKind::RoomUserList, Value::Null)
        }
    }

    pub fn room_user_list(room_id: &RoomId, members: &[UserId]) -> Self {
        Self {
            room_id: Some(room_id.clone()),
            ..Self::new(MessageKind::RoomUserList, to_value(&members))
        }
    }

    pub fn call(from: &UserId, to: &UserId, room_id: &RoomId) -> Self {
        let payload = CallPayload {
            target_user_id: to.clone(),
            room_id: room_id.clone(),
            user_id: from.clone(),
        };
        Self::directed(MessageKind::Call, from, to, room_id, to_value(&payload))
    }

    pub fn offer(
        from: &UserId,
        to: &UserId,
        room_id: &RoomId,
        description: SessionDescription,
    ) -> Self {
        Self::description(MessageKind::Offer, from, to, room_id, description)
    }

    pub fn answer(
        from: &UserId,
        to: &UserId,
        room_id: &RoomId,
        description: SessionDescription,
    ) -> Self {
        Self::description(MessageKind::Answer, from, to, room_id, description)
    }

    fn description(
        kind: MessageKind,
        from: &UserId,
        to: &UserId,
        room_id: &RoomId,
        description: SessionDescription,
    ) -> Self {
        let payload = DescriptionPayload {
            target_user_id: to.clone(),
            room_id: room_id.clone(),
            user_id: from.clone(),
            description,
        };
        Self::directed(kind, from, to, room_id, to_value(&payload))
    }

    pub fn candidate(from: &UserId, to: &UserId, room_id: &RoomId, candidate: Candidate) -> Self {
        let payload = CandidatePayload {
            target_user_id: to.clone(),
            room_id: room_id.clone(),
            user_id: from.clone(),
            candidate,
        };
        Self::directed(MessageKind::Candidate, from, to, room_id, to_value(&payload))
    }

    pub fn hangup(from: &UserId, to: &UserId, room_id: &RoomId) -> Self {
        Self::directed(
            MessageKind::Hangup,
            from,
            to,
            room_id,
            Value::Object(Map::new()),
        )
    }

    fn directed(
        kind: MessageKind,
        from: &UserId,
        to: &UserId,
        room_id: &RoomId,
        payload: Value,
    ) -> Self {
        Self {
            kind,
            from_user_id: Some(from.clone()),
            to_user_id: Some(to.clone()),
            room_id: Some(room_id.clone()),
            payload,
        }
    }

    pub fn decode(text: &str) -> Result<Self, ProtocolError> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn encode(&self) -> Result<String, ProtocolError> {
        Ok(serde_json::to_string(self)?)
    }

    /// Addressee of the message: `toUserId`, falling back to the payload's `targetUserId`.
    /// Empty ids count as absent.
    pub fn target(&self) -> Option<UserId> {
        if let Some(to) = self.to_user_id.as_ref().filter(|to| !to.as_str().is_empty()) {
            return Some(to.clone());
        }
        self.payload
            .get("targetUserId")
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
            .map(UserId::from)
    }

    pub fn sender(&self) -> Result<&UserId, ProtocolError> {
        self.from_user_id
            .as_ref()
            .ok_or(ProtocolError::MissingSender { kind: self.kind })
    }

    pub fn payload_as<T: DeserializeOwned>(&self) -> Result<T, ProtocolError> {
        T::deserialize(&self.payload).map_err(|source| ProtocolError::Payload {
            kind: self.kind,
            source,
        })
    }

    /// Overwrites the routing envelope with the identity the relay knows for the sender.
    pub fn stamped(mut self, from: &UserId, room_id: &RoomId, to: Option<UserId>) -> Self {
        self.from_user_id = Some(from.clone());
        self.room_id = Some(room_id.clone());
        self.to_user_id = to;
        self
    }
}

fn to_value<T: Serialize>(value: &T) -> Value {
    serde_json::to_value(value).unwrap_or(Value::Null)
}
