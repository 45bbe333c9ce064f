use std::collections::HashSet;
use std::net::SocketAddr;
use tether_core::{ConnectionId, UserId};

/// Registry record of one signaling participant.
#[derive(Debug, Clone)]
pub struct User {
    pub identity: UserId,
    /// Most recently established connection; older ones are superseded.
    pub connection: ConnectionId,
    pub remote_addr: Option<SocketAddr>,
    pub rooms: HashSet<String>,
}

impl User {
    pub(crate) fn new(
        identity: UserId,
        connection: ConnectionId,
        remote_addr: Option<SocketAddr>,
    ) -> Self {
        Self {
            identity,
            connection,
            remote_addr,
            rooms: HashSet::new(),
        }
    }

    pub fn is_in(&self, room: &str) -> bool {
        self.rooms.contains(room)
    }
}
