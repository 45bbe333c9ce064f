use crate::model::identity::UserId;
use serde::{Deserialize, Serialize};

/// Membership view of a room as broadcast to its members.
///
/// Carries no access-control data: a room password never leaves the server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomSnapshot {
    pub name: String,
    pub members: Vec<MemberInfo>,
}

impl RoomSnapshot {
    pub fn identities(&self) -> impl Iterator<Item = &UserId> {
        self.members.iter().map(|m| &m.identity)
    }

    pub fn contains(&self, identity: &UserId) -> bool {
        self.identities().any(|id| id == identity)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberInfo {
    pub identity: UserId,
}
