//! HistoryStore port - Append-only log of room events.
//!
//! The hub never designs the persistence engine. It only needs to append
//! what it fans out and read back the tail of a room when a connection
//! joins.

use async_trait::async_trait;

use crate::domain::foundation::DomainError;
use crate::domain::message::HubEvent;
use crate::domain::room::RoomId;

/// Port for the external append-only history log.
///
/// Implementations must return `query_last` results in ascending
/// publication order.
///
/// # Example
///
/// ```ignore
/// store.append(&event).await?;
/// let tail = store.query_last(&event.room_id, 200).await?;
/// ```
#[async_trait]
pub trait HistoryStore: Send + Sync {
    /// Append one event to its room's log.
    async fn append(&self, event: &HubEvent) -> Result<(), DomainError>;

    /// The last `limit` events of a room, oldest first.
    async fn query_last(&self, room_id: &RoomId, limit: usize) -> Result<Vec<HubEvent>, DomainError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[allow(dead_code)]
    fn assert_object_safe(_: &dyn HistoryStore) {}
}
