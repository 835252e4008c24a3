//! History backfill adapter.

use std::sync::Arc;

use crate::domain::foundation::DomainError;
use crate::domain::message::HubEvent;
use crate::domain::room::RoomId;
use crate::ports::HistoryStore;

/// Default number of events replayed on join.
pub const DEFAULT_BACKFILL_LIMIT: usize = 200;

/// Reads and writes room history through the [`HistoryStore`] port.
#[derive(Clone)]
pub struct BackfillAdapter {
    history: Arc<dyn HistoryStore>,
}

impl BackfillAdapter {
    pub fn new(history: Arc<dyn HistoryStore>) -> Self {
        Self { history }
    }

    /// The last `limit` events of the room, oldest first.
    ///
    /// Events come back in the order they were appended, which within one
    /// room is publication order.
    pub async fn backfill(&self, room_id: &RoomId, limit: usize) -> Result<Vec<HubEvent>, DomainError> {
        if limit == 0 {
            return Ok(Vec::new());
        }
        let mut events = self.history.query_last(room_id, limit).await?;
        if events.len() > limit {
            let excess = events.len() - limit;
            events.drain(..excess);
        }
        Ok(events)
    }

    pub async fn record(&self, event: &HubEvent) -> Result<(), DomainError> {
        self.history.append(event).await
    }
}
