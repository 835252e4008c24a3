//! Lightweight per-room metadata kept by the room directory.

use std::collections::HashMap;

use crate::domain::foundation::Timestamp;
use crate::domain::message::SenderRole;

use super::RoomId;

/// Name shown for a guest room until the customer's real name is known.
pub const PLACEHOLDER_NAME: &str = "Guest";

/// Metadata for one room.
///
/// Unread counters are keyed by the role-in-room ("the operator side"),
/// never by connection, so every operator tab shares one counter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoomMeta {
    pub room_id: RoomId,
    pub display_name: String,
    pub last_activity: Option<Timestamp>,
    unread: HashMap<SenderRole, u32>,
}

impl RoomMeta {
    /// Fresh metadata with a default name derived from the room id.
    pub fn new(room_id: RoomId) -> Self {
        let display_name = match &room_id {
            RoomId::Order(id) => format!("Order #{}", id),
            RoomId::Guest(_) => PLACEHOLDER_NAME.to_string(),
            RoomId::Support => "Support".to_string(),
        };
        Self {
            room_id,
            display_name,
            last_activity: None,
            unread: HashMap::new(),
        }
    }

    /// Records activity at `at`. Never moves the clock backwards.
    pub fn touch(&mut self, at: Timestamp) {
        match self.last_activity {
            Some(previous) if previous >= at => {}
            _ => self.last_activity = Some(at),
        }
    }

    pub fn increment_unread(&mut self, role: SenderRole) -> u32 {
        let counter = self.unread.entry(role).or_insert(0);
        *counter = counter.saturating_add(1);
        *counter
    }

    pub fn reset_unread(&mut self, role: SenderRole) {
        self.unread.remove(&role);
    }

    pub fn unread_for(&self, role: SenderRole) -> u32 {
        self.unread.get(&role).copied().unwrap_or(0)
    }

    /// True while the cached name is still the generic placeholder.
    pub fn has_placeholder_name(&self) -> bool {
        self.display_name == PLACEHOLDER_NAME
    }

    /// Replaces the cached name, ignoring blank values.
    pub fn set_display_name(&mut self, name: &str) {
        let name = name.trim();
        if !name.is_empty() {
            self.display_name = name.to_string();
        }
    }

    /// Whether the room ever carried an event or has pending unread counts.
    pub fn has_activity(&self) -> bool {
        self.last_activity.is_some() || self.unread.values().any(|count| *count > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn guest_room() -> RoomMeta {
        RoomMeta::new("guest:u1".parse().unwrap())
    }

    #[test]
    fn guest_room_starts_with_placeholder_name() {
        let meta = guest_room();
        assert!(meta.has_placeholder_name());
        assert!(!meta.has_activity());
    }

    #[test]
    fn order_room_gets_order_name() {
        let meta = RoomMeta::new("order:42".parse().unwrap());
        assert_eq!(meta.display_name, "Order #42");
    }

    #[test]
    fn unread_counts_per_role() {
        let mut meta = guest_room();
        meta.increment_unread(SenderRole::Operator);
        meta.increment_unread(SenderRole::Operator);
        meta.increment_unread(SenderRole::Guest);

        assert_eq!(meta.unread_for(SenderRole::Operator), 2);
        assert_eq!(meta.unread_for(SenderRole::Guest), 1);
    }

    #[test]
    fn reset_clears_only_that_role() {
        let mut meta = guest_room();
        meta.increment_unread(SenderRole::Operator);
        meta.increment_unread(SenderRole::Guest);
        meta.reset_unread(SenderRole::Operator);

        assert_eq!(meta.unread_for(SenderRole::Operator), 0);
        assert_eq!(meta.unread_for(SenderRole::Guest), 1);
    }

    #[test]
    fn touch_keeps_latest_timestamp() {
        let mut meta = guest_room();
        let later = Timestamp::from_unix_millis(2_000);
        meta.touch(later);
        meta.touch(Timestamp::from_unix_millis(1_000));

        assert_eq!(meta.last_activity, Some(later));
        assert!(meta.has_activity());
    }

    #[test]
    fn blank_display_name_is_ignored() {
        let mut meta = guest_room();
        meta.set_display_name("   ");
        assert!(meta.has_placeholder_name());

        meta.set_display_name("Ana");
        assert_eq!(meta.display_name, "Ana");
    }
}
