//! Seller-side inbox read model.
//!
//! Merges the customer roster with rooms that have seen activity into one
//! triage list. Pure functions only; the refresh loop lives in
//! `application::handlers::inbox`.

use std::cmp::Ordering;
use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{CustomerId, Timestamp};
use crate::domain::message::SenderRole;
use crate::domain::room::{RoomId, RoomMeta};

/// A customer known to the user directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KnownCustomer {
    pub id: CustomerId,
    pub display_name: String,
}

impl KnownCustomer {
    pub fn new(id: CustomerId, display_name: impl Into<String>) -> Self {
        Self {
            id,
            display_name: display_name.into(),
        }
    }
}

/// One row of the operator triage list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomSummary {
    pub room_id: RoomId,
    pub display_name: String,
    pub last_activity: Option<Timestamp>,
    pub unread_count: u32,
}

/// Builds the sorted, de-duplicated inbox.
///
/// Roster entries and active rooms are coalesced by room id. The roster's
/// name wins only while the room still carries the placeholder name.
/// Unread counts are the ones owned by `reader`.
pub fn merge_inbox(
    roster: &[KnownCustomer],
    active_rooms: &[RoomMeta],
    reader: SenderRole,
) -> Vec<RoomSummary> {
    let mut by_room: HashMap<RoomId, RoomSummary> = HashMap::new();

    for customer in roster {
        let room_id = RoomId::for_guest(customer.id.clone());
        by_room.insert(
            room_id.clone(),
            RoomSummary {
                room_id,
                display_name: customer.display_name.clone(),
                last_activity: None,
                unread_count: 0,
            },
        );
    }

    for meta in active_rooms.iter().filter(|meta| meta.room_id.feeds_inbox()) {
        let unread_count = meta.unread_for(reader);
        match by_room.get_mut(&meta.room_id) {
            Some(summary) => {
                if !meta.has_placeholder_name() {
                    summary.display_name = meta.display_name.clone();
                }
                summary.last_activity = meta.last_activity;
                summary.unread_count = unread_count;
            }
            None => {
                by_room.insert(
                    meta.room_id.clone(),
                    RoomSummary {
                        room_id: meta.room_id.clone(),
                        display_name: meta.display_name.clone(),
                        last_activity: meta.last_activity,
                        unread_count,
                    },
                );
            }
        }
    }

    let mut summaries: Vec<RoomSummary> = by_room.into_values().collect();
    summaries.sort_by(compare_for_inbox);
    summaries
}

/// Most recent activity first; rooms without activity last, by name.
fn compare_for_inbox(a: &RoomSummary, b: &RoomSummary) -> Ordering {
    match (a.last_activity, b.last_activity) {
        (Some(x), Some(y)) => y.cmp(&x),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
    .then_with(|| a.display_name.cmp(&b.display_name))
    .then_with(|| a.room_id.cmp(&b.room_id))
}
