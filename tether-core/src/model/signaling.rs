use crate::model::connection::ConnectionId;
use crate::model::identity::UserId;
use crate::model::request::RequestId;
use crate::model::room::RoomSnapshot;
use serde::{Deserialize, Serialize};

/// Opaque signaling data (SDP offer/answer, ICE candidate).
///
/// The relay forwards it verbatim and never inspects its shape.
pub type Payload = serde_json::Value;

/// Frames sent by a client over its signaling connection.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "op", content = "d")]
pub enum ClientMessage {
    JoinRoom {
        request_id: Option<RequestId>,
        room: String,
        #[serde(default)]
        password: Option<String>,
    },
    LeaveRoom {
        request_id: Option<RequestId>,
        room: String,
    },
    /// Offer addressed to another identity; answered with [`ServerMessage::Answer`].
    Connect {
        request_id: Option<RequestId>,
        target: UserId,
        offer: Payload,
    },
    IceCandidate {
        request_id: Option<RequestId>,
        target: UserId,
        candidate: Payload,
    },
    AddPassword {
        request_id: Option<RequestId>,
        room: String,
        password: String,
    },
    /// Reply to a [`ServerMessage::Connect`] invocation.
    ConnectReply {
        invocation_id: RequestId,
        answer: Payload,
    },
}

impl ClientMessage {
    pub fn request_id(&self) -> Option<RequestId> {
        match self {
            ClientMessage::JoinRoom { request_id, .. }
            | ClientMessage::LeaveRoom { request_id, .. }
            | ClientMessage::Connect { request_id, .. }
            | ClientMessage::IceCandidate { request_id, .. }
            | ClientMessage::AddPassword { request_id, .. } => *request_id,
            ClientMessage::ConnectReply { .. } => None,
        }
    }
}

/// Frames sent by the relay to a client.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "op", content = "d")]
pub enum ServerMessage {
    Welcome {
        user_id: UserId,
        connection_id: ConnectionId,
    },
    /// Current membership of a room the client belongs to.
    Room(RoomSnapshot),
    /// Offer from another identity; the client must reply with
    /// [`ClientMessage::ConnectReply`] carrying the same `invocation_id`.
    Connect {
        invocation_id: RequestId,
        from: UserId,
        offer: Payload,
    },
    IceCandidate {
        from: UserId,
        candidate: Payload,
    },
    Answer {
        request_id: Option<RequestId>,
        answer: Payload,
    },
    Ack {
        request_id: Option<RequestId>,
    },
    Rejected {
        request_id: Option<RequestId>,
        reason: RejectReason,
        message: String,
    },
}

/// Machine-readable cause of a rejected client operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RejectReason {
    IdentityMissing,
    UserNotFound,
    RoomNotFound,
    PasswordRequired,
    PasswordIncorrect,
    PeerUnreachable,
    InvalidMessage,
}
