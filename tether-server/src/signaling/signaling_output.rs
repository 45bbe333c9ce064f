use async_trait::async_trait;
use std::time::Duration;
use tether_core::{ConnectionId, Payload, RoomSnapshot, UserId};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DeliveryError {
    #[error("connection {0} is closed")]
    Disconnected(ConnectionId),

    #[error("connection {0} did not reply within {1:?}")]
    Timeout(ConnectionId, Duration),

    #[error("failed to serialize message: {0}")]
    Serialization(String),
}

/// Trait, который реализует транспортный шлюз (WebSocket сервер),
/// чтобы реле могло доставлять сообщения по хэндлу соединения.
#[async_trait]
pub trait SignalingOutput: Send + Sync {
    /// Отправить снимок состояния комнаты.
    async fn send_room(
        &self,
        connection: ConnectionId,
        snapshot: RoomSnapshot,
    ) -> Result<(), DeliveryError>;

    /// Переслать ICE кандидата от `from`.
    async fn send_ice(
        &self,
        connection: ConnectionId,
        from: UserId,
        candidate: Payload,
    ) -> Result<(), DeliveryError>;

    /// Переслать offer от `from` и дождаться answer не дольше `timeout`.
    async fn request_answer(
        &self,
        connection: ConnectionId,
        from: UserId,
        offer: Payload,
        timeout: Duration,
    ) -> Result<Payload, DeliveryError>;
}
