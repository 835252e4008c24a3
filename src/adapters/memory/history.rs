//! In-memory append-only history.

use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use dashmap::DashMap;

use crate::domain::foundation::DomainError;
use crate::domain::message::HubEvent;
use crate::domain::room::RoomId;
use crate::ports::HistoryStore;

/// Events kept per room before the oldest are dropped.
pub const DEFAULT_ROOM_RETENTION: usize = 10_000;

/// History store backed by a per-room vector.
///
/// Retention is bounded per room. The failure switches exist so tests can
/// exercise the degraded paths of the hub.
pub struct InMemoryHistoryStore {
    rooms: DashMap<RoomId, Vec<HubEvent>>,
    retention: usize,
    fail_appends: AtomicBool,
    fail_queries: AtomicBool,
}

impl InMemoryHistoryStore {
    pub fn new() -> Self {
        Self::with_retention(DEFAULT_ROOM_RETENTION)
    }

    pub fn with_retention(retention: usize) -> Self {
        Self {
            rooms: DashMap::new(),
            retention: retention.max(1),
            fail_appends: AtomicBool::new(false),
            fail_queries: AtomicBool::new(false),
        }
    }

    /// Makes every subsequent `append` fail.
    pub fn fail_appends(&self, fail: bool) {
        self.fail_appends.store(fail, Ordering::SeqCst);
    }

    /// Makes every subsequent `query_last` fail.
    pub fn fail_queries(&self, fail: bool) {
        self.fail_queries.store(fail, Ordering::SeqCst);
    }

    pub fn len(&self, room_id: &RoomId) -> usize {
        self.rooms.get(room_id).map_or(0, |events| events.len())
    }

    /// Full stored history of a room, oldest first.
    pub fn events(&self, room_id: &RoomId) -> Vec<HubEvent> {
        self.rooms
            .get(room_id)
            .map(|events| events.clone())
            .unwrap_or_default()
    }
}

impl Default for InMemoryHistoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl HistoryStore for InMemoryHistoryStore {
    async fn append(&self, event: &HubEvent) -> Result<(), DomainError> {
        if self.fail_appends.load(Ordering::SeqCst) {
            return Err(DomainError::storage("history append unavailable")
                .with_detail("room", event.room_id.to_string()));
        }
        let mut events = self.rooms.entry(event.room_id.clone()).or_default();
        events.push(event.clone());
        if events.len() > self.retention {
            let excess = events.len() - self.retention;
            events.drain(..excess);
        }
        Ok(())
    }

    async fn query_last(&self, room_id: &RoomId, limit: usize) -> Result<Vec<HubEvent>, DomainError> {
        if self.fail_queries.load(Ordering::SeqCst) {
            return Err(DomainError::storage("history query unavailable")
                .with_detail("room", room_id.to_string()));
        }
        Ok(self
            .rooms
            .get(room_id)
            .map(|events| {
                let start = events.len().saturating_sub(limit);
                events[start..].to_vec()
            })
            .unwrap_or_default())
    }
}
