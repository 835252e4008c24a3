//! Room directory.
//!
//! Rooms are created lazily on first reference and never deleted. Each
//! room carries its own lock, so publishing into one room never waits on
//! another.

use std::collections::HashMap;
use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{Mutex, MutexGuard};

use crate::domain::foundation::{ConnectionId, CorrelationId, Timestamp};
use crate::domain::message::{HubEvent, SenderRole};
use crate::domain::room::{RoomId, RoomMeta};

use super::connection::ConnectionHandle;
use super::dedup::{PublishedIds, DEFAULT_DEDUP_CAPACITY};

/// Delivery phase of one room member.
#[derive(Debug)]
pub(crate) enum MemberPhase {
    /// Waiting for history backfill; live events are queued here.
    Buffering(Vec<HubEvent>),
    Live,
}

#[derive(Debug)]
pub(crate) struct Member {
    pub(crate) handle: ConnectionHandle,
    pub(crate) phase: MemberPhase,
}

/// Mutable state of one room, guarded by the room lock.
#[derive(Debug)]
pub struct RoomState {
    pub meta: RoomMeta,
    members: HashMap<ConnectionId, Member>,
    published: PublishedIds,
}

impl RoomState {
    fn new(room_id: RoomId, id_capacity: usize) -> Self {
        Self {
            meta: RoomMeta::new(room_id),
            members: HashMap::new(),
            published: PublishedIds::new(id_capacity),
        }
    }

    /// Records a correlation id; `false` if the room already carried it.
    pub fn record_correlation(&mut self, id: &CorrelationId) -> bool {
        self.published.first_publication(id)
    }

    /// Adds a member in the buffering phase. Returns `false` if present.
    pub(crate) fn insert_buffering(&mut self, handle: ConnectionHandle) -> bool {
        let id = handle.id();
        if self.members.contains_key(&id) {
            return false;
        }
        self.members.insert(
            id,
            Member {
                handle,
                phase: MemberPhase::Buffering(Vec::new()),
            },
        );
        true
    }

    /// Drains the live events buffered for a member.
    ///
    /// `None` when the connection is no longer a member.
    pub(crate) fn take_buffer(&mut self, id: &ConnectionId) -> Option<Vec<HubEvent>> {
        let member = self.members.get_mut(id)?;
        match &mut member.phase {
            MemberPhase::Buffering(buffer) => Some(std::mem::take(buffer)),
            MemberPhase::Live => Some(Vec::new()),
        }
    }

    pub(crate) fn set_live(&mut self, id: &ConnectionId) {
        if let Some(member) = self.members.get_mut(id) {
            member.phase = MemberPhase::Live;
        }
    }

    pub(crate) fn members_mut(&mut self) -> impl Iterator<Item = &mut Member> {
        self.members.values_mut()
    }

    pub fn remove_member(&mut self, id: &ConnectionId) -> bool {
        self.members.remove(id).is_some()
    }

    pub fn is_member(&self, id: &ConnectionId) -> bool {
        self.members.contains_key(id)
    }

    pub fn member_count(&self) -> usize {
        self.members.len()
    }

    pub fn member_handles(&self) -> Vec<ConnectionHandle> {
        self.members.values().map(|m| m.handle.clone()).collect()
    }

    /// Whether any connection of `role` is joined to the room.
    pub fn has_member_with_role(&self, role: SenderRole) -> bool {
        self.members.values().any(|m| m.handle.role() == role)
    }
}

/// One room behind its own lock.
#[derive(Debug)]
pub struct Room {
    state: Mutex<RoomState>,
}

impl Room {
    fn new(room_id: RoomId, id_capacity: usize) -> Self {
        Self {
            state: Mutex::new(RoomState::new(room_id, id_capacity)),
        }
    }

    pub async fn lock(&self) -> MutexGuard<'_, RoomState> {
        self.state.lock().await
    }
}

/// Every room the hub has seen.
pub struct RoomDirectory {
    rooms: DashMap<RoomId, Arc<Room>>,
    id_capacity: usize,
}

impl Default for RoomDirectory {
    fn default() -> Self {
        Self::with_id_capacity(DEFAULT_DEDUP_CAPACITY)
    }
}

impl RoomDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// `id_capacity` bounds the correlation ids each room remembers.
    pub fn with_id_capacity(id_capacity: usize) -> Self {
        Self {
            rooms: DashMap::new(),
            id_capacity,
        }
    }

    /// Returns the room, creating it on first reference.
    pub fn room(&self, room_id: &RoomId) -> Arc<Room> {
        if let Some(room) = self.rooms.get(room_id) {
            return Arc::clone(&room);
        }
        self.rooms
            .entry(room_id.clone())
            .or_insert_with(|| Arc::new(Room::new(room_id.clone(), self.id_capacity)))
            .clone()
    }

    /// Existing room, without creating it.
    pub fn get(&self, room_id: &RoomId) -> Option<Arc<Room>> {
        self.rooms.get(room_id).map(|room| Arc::clone(&room))
    }

    /// Idempotently creates the room and returns a snapshot of its metadata.
    pub async fn ensure_room(&self, room_id: &RoomId) -> RoomMeta {
        self.room(room_id).lock().await.meta.clone()
    }

    pub async fn members_of(&self, room_id: &RoomId) -> Vec<ConnectionHandle> {
        match self.get(room_id) {
            Some(room) => room.lock().await.member_handles(),
            None => Vec::new(),
        }
    }

    pub async fn touch(&self, room_id: &RoomId, at: Timestamp) {
        self.room(room_id).lock().await.meta.touch(at);
    }

    pub async fn increment_unread(&self, room_id: &RoomId, role: SenderRole) -> u32 {
        self.room(room_id).lock().await.meta.increment_unread(role)
    }

    /// Clears the counter. A room that does not exist yet has nothing to
    /// clear and is not created.
    pub async fn reset_unread(&self, room_id: &RoomId, role: SenderRole) {
        if let Some(room) = self.get(room_id) {
            room.lock().await.meta.reset_unread(role);
        }
    }

    pub async fn unread_for(&self, room_id: &RoomId, role: SenderRole) -> u32 {
        match self.get(room_id) {
            Some(room) => room.lock().await.meta.unread_for(role),
            None => 0,
        }
    }

    pub async fn set_display_name(&self, room_id: &RoomId, name: &str) {
        self.room(room_id).lock().await.meta.set_display_name(name);
    }

    /// Metadata of every room that has carried an event or has unread
    /// counts pending.
    pub async fn rooms_with_activity(&self) -> Vec<RoomMeta> {
        let rooms: Vec<Arc<Room>> = self
            .rooms
            .iter()
            .map(|entry| Arc::clone(entry.value()))
            .collect();

        let mut active = Vec::new();
        for room in rooms {
            let state = room.lock().await;
            if state.meta.has_activity() {
                active.push(state.meta.clone());
            }
        }
        active
    }

    pub fn len(&self) -> usize {
        self.rooms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rooms.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn room(raw: &str) -> RoomId {
        raw.parse().unwrap()
    }

    #[tokio::test]
    async fn ensure_room_is_idempotent() {
        let directory = RoomDirectory::new();
        directory.ensure_room(&room("guest:u1")).await;
        directory.ensure_room(&room("guest:u1")).await;
        assert_eq!(directory.len(), 1);
    }

    #[tokio::test]
    async fn rooms_without_activity_are_not_listed() {
        let directory = RoomDirectory::new();
        directory.ensure_room(&room("guest:u1")).await;
        directory
            .touch(&room("order:42"), Timestamp::from_unix_millis(1_000))
            .await;

        let active = directory.rooms_with_activity().await;
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].room_id, room("order:42"));
    }

    #[tokio::test]
    async fn members_of_unknown_room_is_empty() {
        let directory = RoomDirectory::new();
        assert!(directory.members_of(&room("support")).await.is_empty());
        assert!(directory.is_empty());
    }

    #[tokio::test]
    async fn reset_on_unseen_room_creates_nothing() {
        let directory = RoomDirectory::new();
        directory.reset_unread(&room("order:7"), SenderRole::Operator).await;
        assert!(directory.is_empty());
    }

    #[tokio::test]
    async fn rooms_remember_correlation_ids_independently() {
        let directory = RoomDirectory::with_id_capacity(8);
        let id = CorrelationId::new("c-1");

        assert!(directory.room(&room("guest:u1")).lock().await.record_correlation(&id));
        assert!(!directory.room(&room("guest:u1")).lock().await.record_correlation(&id));
        assert!(directory.room(&room("guest:u2")).lock().await.record_correlation(&id));
    }

    proptest! {
        #[test]
        fn reset_clears_counter_regardless_of_other_rooms(
            increments in 0u32..50,
            noise in prop::collection::vec(0usize..3, 0..50),
        ) {
            let runtime = tokio::runtime::Builder::new_current_thread()
                .build()
                .unwrap();
            runtime.block_on(async {
                let directory = RoomDirectory::new();
                let target = room("guest:u1");
                let others = [room("guest:u2"), room("order:42"), room("support")];

                for i in 0..increments {
                    directory.increment_unread(&target, SenderRole::Operator).await;
                    if let Some(other) = noise.get(i as usize) {
                        directory.increment_unread(&others[*other], SenderRole::Operator).await;
                    }
                }
                directory.reset_unread(&target, SenderRole::Operator).await;
                for other in &noise {
                    directory.increment_unread(&others[*other], SenderRole::Operator).await;
                }

                assert_eq!(directory.unread_for(&target, SenderRole::Operator).await, 0);
            });
        }
    }
}
