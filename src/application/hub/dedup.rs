//! Per-connection duplicate suppression.
//!
//! Two tiers, checked in order for every outbound delivery attempt:
//!
//! 1. **Identity tier** - events with a client-supplied correlation id (or,
//!    for order status events, their server-assigned event id) are
//!    suppressed when the id was already seen by this connection.
//! 2. **Content tier** - events without an identity are keyed by
//!    `(room, sender role, text)` and suppressed when an event with the
//!    same key was created within the content window.
//!
//! Both tiers are size-bounded LRUs so long-lived connections never grow
//! without limit.

use std::collections::{HashMap, VecDeque};
use std::hash::Hash;
use std::time::Duration;

use crate::domain::foundation::{CorrelationId, Timestamp};
use crate::domain::message::{HubEvent, HubPayload, SenderRole};
use crate::domain::room::RoomId;

/// Default number of remembered ids per tier.
pub const DEFAULT_DEDUP_CAPACITY: usize = 500;

/// Default content window.
pub const DEFAULT_DEDUP_WINDOW: Duration = Duration::from_secs(3);

/// Tunables for [`DedupFilter`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DedupConfig {
    pub capacity: usize,
    pub window: Duration,
}

impl Default for DedupConfig {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_DEDUP_CAPACITY,
            window: DEFAULT_DEDUP_WINDOW,
        }
    }
}

/// Size-bounded map that evicts the least recently used entry.
///
/// Recency is tracked with a queue of `(key, tick)` pairs. Refreshing a key
/// pushes a new pair and leaves the old one behind as a stale marker, which
/// eviction skips. The queue is compacted once stale markers outnumber live
/// entries.
#[derive(Debug)]
struct BoundedLru<K, V> {
    capacity: usize,
    tick: u64,
    entries: HashMap<K, (V, u64)>,
    order: VecDeque<(K, u64)>,
}

impl<K: Eq + Hash + Clone, V> BoundedLru<K, V> {
    fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            tick: 0,
            entries: HashMap::new(),
            order: VecDeque::new(),
        }
    }

    fn len(&self) -> usize {
        self.entries.len()
    }

    /// Looks up `key` and marks it most recently used.
    fn touch(&mut self, key: &K) -> Option<&V> {
        self.tick += 1;
        let tick = self.tick;
        match self.entries.get_mut(key) {
            Some(entry) => entry.1 = tick,
            None => return None,
        }
        self.order.push_back((key.clone(), tick));
        self.compact();
        self.entries.get(key).map(|(value, _)| value)
    }

    fn insert(&mut self, key: K, value: V) {
        self.tick += 1;
        let tick = self.tick;
        self.entries.insert(key.clone(), (value, tick));
        self.order.push_back((key, tick));
        self.evict_overflow();
        self.compact();
    }

    fn retain(&mut self, mut keep: impl FnMut(&K) -> bool) {
        self.entries.retain(|key, _| keep(key));
        self.compact_now();
    }

    fn evict_overflow(&mut self) {
        while self.entries.len() > self.capacity {
            let Some((key, tick)) = self.order.pop_front() else {
                break;
            };
            let is_current = self
                .entries
                .get(&key)
                .map_or(false, |(_, current)| *current == tick);
            if is_current {
                self.entries.remove(&key);
            }
        }
    }

    fn compact(&mut self) {
        if self.order.len() > self.capacity.saturating_mul(2) {
            self.compact_now();
        }
    }

    fn compact_now(&mut self) {
        let entries = &self.entries;
        self.order.retain(|(key, tick)| {
            entries
                .get(key)
                .map_or(false, |(_, current)| current == tick)
        });
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct IdentityKey {
    room_id: RoomId,
    id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct ContentKey {
    room_id: RoomId,
    role: SenderRole,
    text: String,
}

/// Duplicate suppression state for one connection.
#[derive(Debug)]
pub struct DedupFilter {
    window: Duration,
    seen_ids: BoundedLru<IdentityKey, ()>,
    recent_content: BoundedLru<ContentKey, Timestamp>,
}

impl DedupFilter {
    pub fn new(config: DedupConfig) -> Self {
        Self {
            window: config.window,
            seen_ids: BoundedLru::new(config.capacity),
            recent_content: BoundedLru::new(config.capacity),
        }
    }

    /// Returns `true` when `event` should be delivered, recording it.
    pub fn admit(&mut self, event: &HubEvent) -> bool {
        if let Some(id) = identity_of(event) {
            let key = IdentityKey {
                room_id: event.room_id.clone(),
                id,
            };
            if self.seen_ids.touch(&key).is_some() {
                return false;
            }
            self.seen_ids.insert(key, ());
            return true;
        }

        let HubPayload::Message(message) = &event.payload else {
            return true;
        };
        let key = ContentKey {
            room_id: event.room_id.clone(),
            role: message.sender_role,
            text: message.text.clone(),
        };
        let created_at = message.created_at;
        if let Some(previous) = self.recent_content.touch(&key) {
            if previous.distance(&created_at) <= self.window {
                return false;
            }
        }
        self.recent_content.insert(key, created_at);
        true
    }

    /// Drops everything remembered for `room_id`, so a later re-join
    /// replays that room's history in full.
    pub fn forget_room(&mut self, room_id: &RoomId) {
        self.seen_ids.retain(|key| &key.room_id != room_id);
        self.recent_content.retain(|key| &key.room_id != room_id);
    }

    /// Number of remembered identities.
    pub fn remembered_ids(&self) -> usize {
        self.seen_ids.len()
    }

    /// Number of remembered content keys.
    pub fn remembered_content(&self) -> usize {
        self.recent_content.len()
    }
}

impl Default for DedupFilter {
    fn default() -> Self {
        Self::new(DedupConfig::default())
    }
}

fn identity_of(event: &HubEvent) -> Option<String> {
    match &event.payload {
        HubPayload::Message(message) => message
            .correlation_id
            .as_ref()
            .map(|id| id.as_str().to_string()),
        HubPayload::OrderStatus(_) => Some(event.event_id.as_str().to_string()),
    }
}

/// Correlation ids already published into one room.
///
/// A resend of a known id is dropped before it reaches history, unread
/// counters or any member.
#[derive(Debug)]
pub(crate) struct PublishedIds {
    seen: BoundedLru<CorrelationId, ()>,
}

impl PublishedIds {
    pub(crate) fn new(capacity: usize) -> Self {
        Self {
            seen: BoundedLru::new(capacity),
        }
    }

    /// `true` the first time `id` is offered.
    pub(crate) fn first_publication(&mut self, id: &CorrelationId) -> bool {
        if self.seen.touch(id).is_some() {
            return false;
        }
        self.seen.insert(id.clone(), ());
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::foundation::OrderId;
    use crate::domain::message::{Actor, ChatMessage, OrderStatusEvent};
    use crate::domain::order::OrderStatus;
    use proptest::prelude::*;

    fn room(raw: &str) -> RoomId {
        raw.parse().unwrap()
    }

    fn message(room_id: &str, text: &str, correlation: Option<&str>, at_ms: i64) -> HubEvent {
        let mut message = ChatMessage::new(
            SenderRole::Guest,
            "Ana",
            text,
            correlation.map(CorrelationId::new),
        )
        .unwrap();
        message.created_at = Timestamp::from_unix_millis(at_ms);
        HubEvent::new(room(room_id), HubPayload::Message(message))
    }

    fn status_event() -> HubEvent {
        HubEvent::new(
            room("order:42"),
            HubPayload::OrderStatus(OrderStatusEvent {
                order_id: OrderId::new("42").unwrap(),
                prior_status: OrderStatus::Accepted,
                new_status: OrderStatus::OnTheWay,
                actor: Actor::new(SenderRole::Operator, "Dispatch"),
                note: None,
                occurred_at: Timestamp::from_unix_millis(1_000),
            }),
        )
    }

    #[test]
    fn suppresses_repeated_correlation_id() {
        let mut filter = DedupFilter::default();
        assert!(filter.admit(&message("guest:u1", "hi", Some("c-1"), 0)));
        assert!(!filter.admit(&message("guest:u1", "hi again", Some("c-1"), 60_000)));
    }

    #[test]
    fn correlation_ids_are_scoped_per_room() {
        let mut filter = DedupFilter::default();
        assert!(filter.admit(&message("guest:u1", "hi", Some("c-1"), 0)));
        assert!(filter.admit(&message("guest:u2", "hi", Some("c-1"), 0)));
    }

    #[test]
    fn suppresses_same_content_within_window() {
        let mut filter = DedupFilter::default();
        assert!(filter.admit(&message("guest:u1", "where is my order?", None, 0)));
        assert!(!filter.admit(&message("guest:u1", "where is my order?", None, 2_500)));
    }

    #[test]
    fn admits_same_content_after_window() {
        let mut filter = DedupFilter::default();
        assert!(filter.admit(&message("guest:u1", "ok", None, 0)));
        assert!(filter.admit(&message("guest:u1", "ok", None, 3_001)));
    }

    #[test]
    fn content_key_includes_room() {
        let mut filter = DedupFilter::default();
        assert!(filter.admit(&message("guest:u1", "ok", None, 0)));
        assert!(filter.admit(&message("guest:u2", "ok", None, 0)));
    }

    #[test]
    fn order_status_events_dedup_by_event_id() {
        let mut filter = DedupFilter::default();
        let event = status_event();
        assert!(filter.admit(&event));
        assert!(!filter.admit(&event));
        assert!(filter.admit(&status_event()));
    }

    #[test]
    fn forget_room_allows_replay() {
        let mut filter = DedupFilter::default();
        let event = message("guest:u1", "hi", Some("c-1"), 0);
        assert!(filter.admit(&event));
        filter.forget_room(&room("guest:u1"));
        assert!(filter.admit(&event));
    }

    #[test]
    fn evicts_oldest_past_capacity() {
        let mut filter = DedupFilter::new(DedupConfig {
            capacity: 2,
            window: DEFAULT_DEDUP_WINDOW,
        });
        assert!(filter.admit(&message("guest:u1", "a", Some("c-1"), 0)));
        assert!(filter.admit(&message("guest:u1", "b", Some("c-2"), 0)));
        assert!(filter.admit(&message("guest:u1", "c", Some("c-3"), 0)));

        assert_eq!(filter.remembered_ids(), 2);
        // c-1 was evicted, c-3 is still remembered
        assert!(!filter.admit(&message("guest:u1", "c", Some("c-3"), 0)));
        assert!(filter.admit(&message("guest:u1", "a", Some("c-1"), 0)));
    }

    #[test]
    fn touching_refreshes_recency() {
        let mut filter = DedupFilter::new(DedupConfig {
            capacity: 2,
            window: DEFAULT_DEDUP_WINDOW,
        });
        assert!(filter.admit(&message("guest:u1", "a", Some("c-1"), 0)));
        assert!(filter.admit(&message("guest:u1", "b", Some("c-2"), 0)));
        // seeing c-1 again makes c-2 the oldest
        assert!(!filter.admit(&message("guest:u1", "a", Some("c-1"), 0)));
        assert!(filter.admit(&message("guest:u1", "c", Some("c-3"), 0)));

        assert!(!filter.admit(&message("guest:u1", "a", Some("c-1"), 0)));
        assert!(filter.admit(&message("guest:u1", "b", Some("c-2"), 0)));
    }

    proptest! {
        #[test]
        fn tiers_stay_bounded(ids in prop::collection::vec(0u32..2_000, 0..3_000)) {
            let capacity = 50;
            let mut filter = DedupFilter::new(DedupConfig {
                capacity,
                window: DEFAULT_DEDUP_WINDOW,
            });
            for (i, id) in ids.iter().enumerate() {
                let correlation = format!("c-{}", id);
                filter.admit(&message("guest:u1", "x", Some(&correlation), 0));
                filter.admit(&message("guest:u1", &format!("t-{}", id), None, i as i64));
            }
            prop_assert!(filter.remembered_ids() <= capacity);
            prop_assert!(filter.remembered_content() <= capacity);
        }

        #[test]
        fn same_correlation_id_is_admitted_once(repeats in 1usize..20) {
            let mut filter = DedupFilter::default();
            let admitted = (0..repeats)
                .filter(|_| filter.admit(&message("guest:u1", "hi", Some("c-1"), 0)))
                .count();
            prop_assert_eq!(admitted, 1);
        }
    }

    #[test]
    fn published_ids_accept_each_id_once() {
        let mut published = PublishedIds::new(2);
        assert!(published.first_publication(&CorrelationId::new("c-1")));
        assert!(!published.first_publication(&CorrelationId::new("c-1")));
        assert!(published.first_publication(&CorrelationId::new("c-2")));
    }

    #[test]
    fn published_ids_forget_least_recent_beyond_capacity() {
        let mut published = PublishedIds::new(2);
        for id in ["a", "b", "c"] {
            assert!(published.first_publication(&CorrelationId::new(id)));
        }
        assert_eq!(published.seen.len(), 2);
        assert!(published.first_publication(&CorrelationId::new("a")));
    }
}
