use tether_core::UserId;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("user not found: {0}")]
    UserNotFound(UserId),

    #[error("room not found: {0}")]
    RoomNotFound(String),

    #[error("incorrect password for room {0}")]
    PasswordIncorrect(String),
}
