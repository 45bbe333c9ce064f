use crate::registry::registry_error::RegistryError;
use crate::registry::room::Room;
use crate::registry::user::User;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use dashmap::mapref::one::RefMut;
use std::collections::{BTreeMap, BTreeSet};
use std::net::SocketAddr;
use tether_core::{ConnectionId, UserId};
use tracing::{debug, info};

/// Outcome of a successful [`Registry::join_room`].
#[derive(Debug, Clone)]
pub struct Admission {
    pub room: Room,
    pub created: bool,
}

/// Outcome of a successful [`Registry::leave_room`].
#[derive(Debug, Clone)]
pub struct Departure {
    /// Residual room state after the member was removed.
    pub room: Room,
    pub room_deleted: bool,
    pub user_released: bool,
}

/// In-memory index of users and rooms.
///
/// `user.rooms` and `room.members` always mirror each other: every mutation
/// touching both holds the user entry first and the room entry second, and
/// updates both sides before releasing either. No guard outlives a call.
#[derive(Default)]
pub struct Registry {
    users: DashMap<UserId, User>,
    rooms: DashMap<String, Room>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates the user, or points an existing one at its new connection.
    pub fn upsert_user(
        &self,
        identity: UserId,
        connection: ConnectionId,
        remote_addr: Option<SocketAddr>,
    ) -> User {
        let mut user = self
            .users
            .entry(identity.clone())
            .or_insert_with(|| User::new(identity, connection, remote_addr));

        user.connection = connection;
        user.remote_addr = remote_addr;
        user.value().clone()
    }

    /// Detaches the user and severs whatever memberships it still holds.
    pub fn remove_user(&self, identity: &UserId) -> Option<User> {
        let Entry::Occupied(entry) = self.users.entry(identity.clone()) else {
            return None;
        };

        for name in &entry.get().rooms {
            if let Some((_, true)) = self.detach_member(name, identity) {
                info!(room = %name, "Room deleted (last member removed)");
            }
        }

        let mut user = entry.remove();
        user.rooms.clear();
        Some(user)
    }

    /// Admits `identity` to `name`, creating the room with `password` when
    /// absent. An existing room requires the password it was created with.
    pub fn join_room(
        &self,
        identity: &UserId,
        name: &str,
        password: &str,
    ) -> Result<Admission, RegistryError> {
        let mut user = self
            .users
            .get_mut(identity)
            .ok_or_else(|| RegistryError::UserNotFound(identity.clone()))?;

        let (mut room, created) = self.create_or_get_room(name, password);
        if !created && !room.admits(password) {
            return Err(RegistryError::PasswordIncorrect(name.to_owned()));
        }

        room.members.insert(identity.clone());
        user.rooms.insert(name.to_owned());

        if created {
            info!(room = %name, protected = room.is_protected(), "Room created");
        }

        Ok(Admission {
            room: room.value().clone(),
            created,
        })
    }

    /// Atomic get-or-insert. Only called with the joining user's entry held,
    /// so a freshly inserted room gains its first member before anyone can
    /// observe it empty.
    fn create_or_get_room(&self, name: &str, password: &str) -> (RefMut<'_, String, Room>, bool) {
        match self.rooms.entry(name.to_owned()) {
            Entry::Occupied(entry) => (entry.into_ref(), false),
            Entry::Vacant(entry) => (entry.insert(Room::new(name, password)), true),
        }
    }

    /// Removes `identity` from `name`, deleting the room once empty. With
    /// `release_when_homeless`, a user left without rooms is removed as well.
    pub fn leave_room(
        &self,
        identity: &UserId,
        name: &str,
        release_when_homeless: bool,
    ) -> Result<Departure, RegistryError> {
        let Entry::Occupied(mut user) = self.users.entry(identity.clone()) else {
            return Err(RegistryError::UserNotFound(identity.clone()));
        };

        if !user.get().is_in(name) {
            return Err(RegistryError::RoomNotFound(name.to_owned()));
        }

        let detached = self.detach_member(name, identity);
        user.get_mut().rooms.remove(name);

        let (room, room_deleted) =
            detached.ok_or_else(|| RegistryError::RoomNotFound(name.to_owned()))?;

        let user_released = release_when_homeless && user.get().rooms.is_empty();
        if user_released {
            user.remove();
            debug!(user = %identity, "User released (no rooms left)");
        }

        if room_deleted {
            info!(room = %name, "Room deleted (last member left)");
        }

        Ok(Departure {
            room,
            room_deleted,
            user_released,
        })
    }

    fn detach_member(&self, name: &str, identity: &UserId) -> Option<(Room, bool)> {
        match self.rooms.entry(name.to_owned()) {
            Entry::Occupied(mut room) => {
                room.get_mut().members.remove(identity);
                if room.get().members.is_empty() {
                    Some((room.remove(), true))
                } else {
                    Some((room.get().clone(), false))
                }
            }
            Entry::Vacant(_) => None,
        }
    }

    /// Members of `name` resolved to their current records, ordered by
    /// identity. Members whose record vanished meanwhile are skipped.
    pub fn members_of(&self, name: &str) -> Option<Vec<User>> {
        let identities: Vec<UserId> = self.rooms.get(name)?.members.iter().cloned().collect();

        let mut members: Vec<User> = identities
            .iter()
            .filter_map(|id| self.users.get(id).map(|user| user.value().clone()))
            .filter(|user| user.is_in(name))
            .collect();

        members.sort_by(|a, b| a.identity.cmp(&b.identity));
        Some(members)
    }

    pub fn connection_handle_of(&self, identity: &UserId) -> Option<ConnectionId> {
        self.users.get(identity).map(|user| user.connection)
    }

    pub fn set_room_password(&self, name: &str, password: &str) -> Result<(), RegistryError> {
        let mut room = self
            .rooms
            .get_mut(name)
            .ok_or_else(|| RegistryError::RoomNotFound(name.to_owned()))?;

        room.password = password.to_owned();
        Ok(())
    }

    pub fn user(&self, identity: &UserId) -> Option<User> {
        self.users.get(identity).map(|user| user.value().clone())
    }

    pub fn room(&self, name: &str) -> Option<Room> {
        self.rooms.get(name).map(|room| room.value().clone())
    }

    pub fn user_count(&self) -> usize {
        self.users.len()
    }

    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }

    /// Copies both indices. Not atomic across the two maps, so only
    /// meaningful while no mutation is in flight.
    pub fn snapshot(&self) -> RegistrySnapshot {
        let users = self
            .users
            .iter()
            .map(|entry| (entry.key().clone(), entry.rooms.iter().cloned().collect()))
            .collect();

        let rooms = self
            .rooms
            .iter()
            .map(|entry| (entry.key().clone(), entry.members.iter().cloned().collect()))
            .collect();

        RegistrySnapshot { users, rooms }
    }
}

/// Point-in-time copy of the registry indices.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RegistrySnapshot {
    pub users: BTreeMap<UserId, BTreeSet<String>>,
    pub rooms: BTreeMap<String, BTreeSet<UserId>>,
}

impl RegistrySnapshot {
    /// Lists every broken invariant; empty when the indices agree.
    pub fn violations(&self) -> Vec<String> {
        let mut violations = Vec::new();

        for (name, members) in &self.rooms {
            if members.is_empty() {
                violations.push(format!("room {name} exists with no members"));
            }
            for id in members {
                match self.users.get(id) {
                    Some(rooms) if rooms.contains(name) => {}
                    Some(_) => violations.push(format!("{id} in {name}.members but not in user.rooms")),
                    None => violations.push(format!("{id} in {name}.members has no user record")),
                }
            }
        }

        for (id, rooms) in &self.users {
            for name in rooms {
                match self.rooms.get(name) {
                    Some(members) if members.contains(id) => {}
                    Some(_) => violations.push(format!("{name} in {id}.rooms but not in room.members")),
                    None => violations.push(format!("{id}.rooms references missing room {name}")),
                }
            }
        }

        violations
    }

    pub fn is_consistent(&self) -> bool {
        self.violations().is_empty()
    }
}
