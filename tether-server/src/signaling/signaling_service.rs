use crate::signaling::signaling_output::{DeliveryError, SignalingOutput};
use async_trait::async_trait;
use axum::extract::ws::Message;
use dashmap::DashMap;
use std::sync::Arc;
use std::time::Duration;
use tether_core::{ConnectionId, Payload, RequestId, RoomSnapshot, ServerMessage, UserId};
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, error, info, warn};

struct ConnectionEntry {
    identity: UserId,
    tx: mpsc::UnboundedSender<Message>,
}

/// `Connect` invocation waiting for the addressed connection's reply.
struct PendingAnswer {
    connection: ConnectionId,
    reply: oneshot::Sender<Payload>,
}

struct SignalingInner {
    connections: DashMap<ConnectionId, ConnectionEntry>,
    /// Live connection per identity; a newer one closes the previous.
    current: DashMap<UserId, ConnectionId>,
    pending: DashMap<RequestId, PendingAnswer>,
}

/// Removes its pending entry however the wait ends.
struct PendingSlot<'a> {
    pending: &'a DashMap<RequestId, PendingAnswer>,
    id: RequestId,
}

impl Drop for PendingSlot<'_> {
    fn drop(&mut self) {
        self.pending.remove(&self.id);
    }
}

/// Registry of open WebSocket connections; the delivery side of the relay.
#[derive(Clone)]
pub struct SignalingService {
    inner: Arc<SignalingInner>,
}

impl Default for SignalingService {
    fn default() -> Self {
        Self::new()
    }
}

impl SignalingService {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(SignalingInner {
                connections: DashMap::new(),
                current: DashMap::new(),
                pending: DashMap::new(),
            }),
        }
    }

    /// Registers `connection` as the live one of `identity` and returns the
    /// connection it supersedes, if any. The superseded one stays open until
    /// [`close_connection`](Self::close_connection) is called on it.
    pub fn add_connection(
        &self,
        connection: ConnectionId,
        identity: UserId,
        tx: mpsc::UnboundedSender<Message>,
    ) -> Option<ConnectionId> {
        let superseded = self.inner.current.insert(identity.clone(), connection);
        self.inner
            .connections
            .insert(connection, ConnectionEntry { identity, tx });

        superseded.filter(|old| *old != connection)
    }

    /// Asks the send loop of `connection` to close the socket.
    pub fn close_connection(&self, connection: ConnectionId) {
        if let Some(entry) = self.inner.connections.get(&connection) {
            info!(user = %entry.identity, connection = %connection, "Closing superseded connection");
            let _ = entry.tx.send(Message::Close(None));
        }
    }

    pub fn remove_connection(&self, connection: &ConnectionId) {
        if let Some((_, entry)) = self.inner.connections.remove(connection) {
            self.inner
                .current
                .remove_if(&entry.identity, |_, current| current == connection);
        }

        // Dropping the reply senders fails any waiter on this connection.
        self.inner
            .pending
            .retain(|_, pending| pending.connection != *connection);
    }

    pub fn connection_count(&self) -> usize {
        self.inner.connections.len()
    }

    pub fn pending_count(&self) -> usize {
        self.inner.pending.len()
    }

    pub fn send_message(
        &self,
        connection: ConnectionId,
        msg: &ServerMessage,
    ) -> Result<(), DeliveryError> {
        let json = serde_json::to_string(msg).map_err(|e| {
            error!("Failed to serialize server message: {}", e);
            DeliveryError::Serialization(e.to_string())
        })?;

        let Some(entry) = self.inner.connections.get(&connection) else {
            warn!(connection = %connection, "Attempted to send to closed connection");
            return Err(DeliveryError::Disconnected(connection));
        };

        entry
            .tx
            .send(Message::Text(json.into()))
            .map_err(|_| DeliveryError::Disconnected(connection))
    }

    /// Hands a client's `ConnectReply` to the waiting requester. Replies from
    /// any other connection than the invoked one are discarded.
    pub fn complete_answer(
        &self,
        connection: ConnectionId,
        invocation_id: RequestId,
        answer: Payload,
    ) -> bool {
        let Some((_, pending)) = self
            .inner
            .pending
            .remove_if(&invocation_id, |_, pending| pending.connection == connection)
        else {
            warn!(
                connection = %connection,
                invocation = %invocation_id,
                "Unexpected connect reply dropped"
            );
            return false;
        };

        pending.reply.send(answer).is_ok()
    }
}

#[async_trait]
impl SignalingOutput for SignalingService {
    async fn send_room(
        &self,
        connection: ConnectionId,
        snapshot: RoomSnapshot,
    ) -> Result<(), DeliveryError> {
        self.send_message(connection, &ServerMessage::Room(snapshot))
    }

    async fn send_ice(
        &self,
        connection: ConnectionId,
        from: UserId,
        candidate: Payload,
    ) -> Result<(), DeliveryError> {
        self.send_message(connection, &ServerMessage::IceCandidate { from, candidate })
    }

    async fn request_answer(
        &self,
        connection: ConnectionId,
        from: UserId,
        offer: Payload,
        timeout: Duration,
    ) -> Result<Payload, DeliveryError> {
        let invocation_id = RequestId::new();
        let (reply, rx) = oneshot::channel();

        self.inner
            .pending
            .insert(invocation_id, PendingAnswer { connection, reply });
        let _slot = PendingSlot {
            pending: &self.inner.pending,
            id: invocation_id,
        };

        let msg = ServerMessage::Connect {
            invocation_id,
            from,
            offer,
        };
        self.send_message(connection, &msg)?;
        debug!(connection = %connection, invocation = %invocation_id, "Awaiting answer");

        match tokio::time::timeout(timeout, rx).await {
            Ok(Ok(answer)) => Ok(answer),
            Ok(Err(_)) => Err(DeliveryError::Disconnected(connection)),
            Err(_) => Err(DeliveryError::Timeout(connection, timeout)),
        }
    }
}
