use crate::registry::RegistryError;
use tether_core::{RejectReason, UserId};
use thiserror::Error;

/// Why a client operation was refused. The connection always stays open.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RelayError {
    #[error("connection has no resolved identity")]
    IdentityMissing,

    #[error("user not found: {0}")]
    UserNotFound(UserId),

    #[error("room not found: {0}")]
    RoomNotFound(String),

    #[error("room {0} requires a password")]
    PasswordRequired(String),

    #[error("incorrect password for room {0}")]
    PasswordIncorrect(String),

    #[error("peer {0} is unreachable")]
    PeerUnreachable(UserId),
}

impl RelayError {
    pub fn reason(&self) -> RejectReason {
        match self {
            RelayError::IdentityMissing => RejectReason::IdentityMissing,
            RelayError::UserNotFound(_) => RejectReason::UserNotFound,
            RelayError::RoomNotFound(_) => RejectReason::RoomNotFound,
            RelayError::PasswordRequired(_) => RejectReason::PasswordRequired,
            RelayError::PasswordIncorrect(_) => RejectReason::PasswordIncorrect,
            RelayError::PeerUnreachable(_) => RejectReason::PeerUnreachable,
        }
    }
}

impl From<RegistryError> for RelayError {
    fn from(err: RegistryError) -> Self {
        match err {
            RegistryError::UserNotFound(id) => RelayError::UserNotFound(id),
            RegistryError::RoomNotFound(name) => RelayError::RoomNotFound(name),
            RegistryError::PasswordIncorrect(name) => RelayError::PasswordIncorrect(name),
        }
    }
}
