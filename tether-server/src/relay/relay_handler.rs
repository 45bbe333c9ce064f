use crate::registry::{Departure, Registry, User};
use crate::relay::relay_config::RelayConfig;
use crate::relay::relay_error::RelayError;
use crate::relay::session_gate::SessionGates;
use crate::signaling::SignalingOutput;
use futures::future::join_all;
use std::net::SocketAddr;
use std::sync::Arc;
use tether_core::{ConnectionId, MemberInfo, Payload, RoomSnapshot, UserId};
use tracing::{debug, info, warn};

/// Snapshot of a room plus the connections it must reach.
struct Fanout {
    snapshot: RoomSnapshot,
    targets: Vec<(UserId, ConnectionId)>,
}

/// Drives registry mutations from connection lifecycle events and client
/// requests, and publishes the resulting membership changes.
///
/// Registry work for an identity runs under that identity's gate; deliveries
/// are dispatched only after the gate is released.
pub struct RelayHandler {
    registry: Arc<Registry>,
    signaling: Arc<dyn SignalingOutput>,
    gates: SessionGates,
    config: RelayConfig,
}

impl RelayHandler {
    pub fn new(signaling: Arc<dyn SignalingOutput>, config: RelayConfig) -> Self {
        Self::with_registry(Arc::new(Registry::new()), signaling, config)
    }

    pub fn with_registry(
        registry: Arc<Registry>,
        signaling: Arc<dyn SignalingOutput>,
        config: RelayConfig,
    ) -> Self {
        Self {
            registry,
            signaling,
            gates: SessionGates::new(),
            config,
        }
    }

    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    pub fn config(&self) -> &RelayConfig {
        &self.config
    }

    /// Records `connection` as the live handle of `identity`. No broadcast.
    pub async fn on_connect(
        &self,
        identity: UserId,
        connection: ConnectionId,
        remote_addr: Option<SocketAddr>,
    ) -> User {
        let _gate = self.gates.enter(&identity).await;
        let user = self.registry.upsert_user(identity, connection, remote_addr);

        info!(
            user = %user.identity,
            connection = %connection,
            remote = ?remote_addr,
            rooms = user.rooms.len(),
            "User connected"
        );
        user
    }

    /// Leaves every room of `identity` and drops its record, unless
    /// `connection` has already been superseded by a newer one.
    pub async fn on_disconnect(&self, identity: &UserId, connection: ConnectionId) {
        let fanouts = {
            let _gate = self.gates.enter(identity).await;

            let Some(user) = self.registry.user(identity) else {
                debug!(user = %identity, "Disconnect of unknown user ignored");
                return;
            };

            if user.connection != connection {
                info!(
                    user = %identity,
                    stale = %connection,
                    current = %user.connection,
                    "Disconnect of superseded connection ignored"
                );
                return;
            }

            let mut rooms: Vec<String> = user.rooms.into_iter().collect();
            rooms.sort();

            let mut fanouts = Vec::with_capacity(rooms.len());
            for room in rooms {
                match self.registry.leave_room(identity, &room, false) {
                    Ok(departure) => fanouts.extend(self.fanout_after(&departure)),
                    Err(e) => warn!(user = %identity, room = %room, "Cleanup leave failed: {}", e),
                }
            }

            self.registry.remove_user(identity);
            fanouts
        };

        for fanout in fanouts {
            self.deliver(fanout).await;
        }

        info!(user = %identity, connection = %connection, "User disconnected");
    }

    /// Admits `identity` to `room` and broadcasts the new membership to every
    /// member, the joiner included. Re-joining re-sends the same snapshot.
    pub async fn join_room(
        &self,
        identity: &UserId,
        room: &str,
        password: Option<&str>,
    ) -> Result<RoomSnapshot, RelayError> {
        let password = password.unwrap_or_default();

        let fanout = {
            let _gate = self.gates.enter(identity).await;

            if self.registry.connection_handle_of(identity).is_none() {
                return Err(RelayError::UserNotFound(identity.clone()));
            }

            if self.config.require_password && password.is_empty() {
                return Err(RelayError::PasswordRequired(room.to_owned()));
            }

            let admission = self.registry.join_room(identity, room, password)?;
            debug!(
                user = %identity,
                room = %room,
                created = admission.created,
                "Joined room"
            );

            self.fanout(room)
                .ok_or_else(|| RelayError::RoomNotFound(room.to_owned()))?
        };

        let snapshot = fanout.snapshot.clone();
        self.deliver(fanout).await;
        Ok(snapshot)
    }

    /// Removes `identity` from `room`; remaining members get the new snapshot.
    pub async fn leave_room(&self, identity: &UserId, room: &str) -> Result<(), RelayError> {
        let fanout = {
            let _gate = self.gates.enter(identity).await;

            let departure = self.registry.leave_room(
                identity,
                room,
                self.config.membership.releases_homeless(),
            )?;
            debug!(
                user = %identity,
                room = %room,
                room_deleted = departure.room_deleted,
                user_released = departure.user_released,
                "Left room"
            );

            self.fanout_after(&departure)
        };

        if let Some(fanout) = fanout {
            self.deliver(fanout).await;
        }
        Ok(())
    }

    /// Forwards an offer to `to` and waits for its answer.
    pub async fn relay_connect(
        &self,
        from: &UserId,
        to: &UserId,
        offer: Payload,
    ) -> Result<Payload, RelayError> {
        let connection = self
            .registry
            .connection_handle_of(to)
            .ok_or_else(|| RelayError::UserNotFound(to.clone()))?;

        debug!(from = %from, to = %to, "Relaying connect offer");

        self.signaling
            .request_answer(connection, from.clone(), offer, self.config.answer_timeout)
            .await
            .map_err(|e| {
                warn!(from = %from, to = %to, "Connect relay failed: {}", e);
                RelayError::PeerUnreachable(to.clone())
            })
    }

    /// Forwards a candidate to `to` without waiting for any reply.
    pub async fn relay_ice_candidate(
        &self,
        from: &UserId,
        to: &UserId,
        candidate: Payload,
    ) -> Result<(), RelayError> {
        let connection = self
            .registry
            .connection_handle_of(to)
            .ok_or_else(|| RelayError::UserNotFound(to.clone()))?;

        self.signaling
            .send_ice(connection, from.clone(), candidate)
            .await
            .map_err(|e| {
                warn!(from = %from, to = %to, "ICE candidate relay failed: {}", e);
                RelayError::PeerUnreachable(to.clone())
            })
    }

    /// Overwrites the password of an existing room. Members are unaffected.
    pub async fn set_room_password(&self, room: &str, password: &str) -> Result<(), RelayError> {
        if password.is_empty() {
            return Err(RelayError::PasswordRequired(room.to_owned()));
        }

        self.registry.set_room_password(room, password)?;
        info!(room = %room, "Room password updated");
        Ok(())
    }

    fn fanout_after(&self, departure: &Departure) -> Option<Fanout> {
        if departure.room_deleted {
            return None;
        }
        self.fanout(&departure.room.name)
    }

    fn fanout(&self, room: &str) -> Option<Fanout> {
        let members = self.registry.members_of(room)?;

        let snapshot = RoomSnapshot {
            name: room.to_owned(),
            members: members
                .iter()
                .map(|user| MemberInfo {
                    identity: user.identity.clone(),
                })
                .collect(),
        };
        let targets = members
            .into_iter()
            .map(|user| (user.identity, user.connection))
            .collect();

        Some(Fanout { snapshot, targets })
    }

    /// Best effort: a failed recipient is logged and skipped.
    async fn deliver(&self, fanout: Fanout) {
        let Fanout { snapshot, targets } = fanout;
        let room = &snapshot.name;

        let sends = targets.into_iter().map(|(identity, connection)| {
            let snapshot = snapshot.clone();
            async move {
                if let Err(e) = self.signaling.send_room(connection, snapshot).await {
                    warn!(user = %identity, room = %room, "Membership update not delivered: {}", e);
                }
            }
        });

        join_all(sends).await;
    }
}
