//! Connection registry.
//!
//! Maps live connection ids to their handle and the set of rooms they
//! joined. The registry is the authority on membership intent: the room
//! directory mirrors it, and a room member whose registry entry is gone is
//! about to be removed.

use std::collections::HashSet;

use dashmap::DashMap;

use crate::domain::foundation::ConnectionId;
use crate::domain::room::RoomId;

use super::connection::ConnectionHandle;

struct ConnectionEntry {
    handle: ConnectionHandle,
    rooms: HashSet<RoomId>,
}

/// Result of recording a room for a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoomAdded {
    Added,
    AlreadyJoined,
    UnknownConnection,
}

/// Live connections keyed by id.
#[derive(Default)]
pub struct ConnectionRegistry {
    connections: DashMap<ConnectionId, ConnectionEntry>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, handle: ConnectionHandle) {
        self.connections.insert(
            handle.id(),
            ConnectionEntry {
                handle,
                rooms: HashSet::new(),
            },
        );
    }

    pub fn handle(&self, id: &ConnectionId) -> Option<ConnectionHandle> {
        self.connections.get(id).map(|entry| entry.handle.clone())
    }

    pub fn contains(&self, id: &ConnectionId) -> bool {
        self.connections.contains_key(id)
    }

    pub fn add_room(&self, id: &ConnectionId, room_id: &RoomId) -> RoomAdded {
        match self.connections.get_mut(id) {
            Some(mut entry) => {
                if entry.rooms.insert(room_id.clone()) {
                    RoomAdded::Added
                } else {
                    RoomAdded::AlreadyJoined
                }
            }
            None => RoomAdded::UnknownConnection,
        }
    }

    /// Returns `true` if the connection had joined the room.
    pub fn remove_room(&self, id: &ConnectionId, room_id: &RoomId) -> bool {
        self.connections
            .get_mut(id)
            .map_or(false, |mut entry| entry.rooms.remove(room_id))
    }

    pub fn is_member(&self, id: &ConnectionId, room_id: &RoomId) -> bool {
        self.connections
            .get(id)
            .map_or(false, |entry| entry.rooms.contains(room_id))
    }

    pub fn rooms_of(&self, id: &ConnectionId) -> Vec<RoomId> {
        self.connections
            .get(id)
            .map(|entry| entry.rooms.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Removes the connection, returning the rooms it had joined.
    pub fn remove(&self, id: &ConnectionId) -> Option<(ConnectionHandle, Vec<RoomId>)> {
        self.connections
            .remove(id)
            .map(|(_, entry)| (entry.handle, entry.rooms.into_iter().collect()))
    }

    pub fn len(&self) -> usize {
        self.connections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }
}
