//! InboxAggregator - Background service keeping the operator inbox fresh.
//!
//! The inbox is recomputed reactively on every order-room or guest-room
//! activity notification. A periodic resync runs as a fallback for
//! notifications lost to lag; it is never the primary update path.
//!
//! ## Configuration
//!
//! | Setting | Default | Description |
//! |---------|---------|-------------|
//! | `resync_interval` | 60s | Fallback recompute period |
//! | `reader` | operator | Role whose unread counts the inbox shows |

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast::{
    self,
    error::{RecvError, TryRecvError},
};
use tokio::sync::watch;
use tokio::time::{self, MissedTickBehavior};
use tracing::{debug, warn};

use crate::application::hub::{Hub, Outbound, RoomActivity};
use crate::domain::foundation::DomainError;
use crate::domain::inbox::{merge_inbox, RoomSummary};
use crate::domain::message::SenderRole;
use crate::domain::room::RoomId;
use crate::ports::CustomerRoster;

/// Configuration for the InboxAggregator service.
#[derive(Debug, Clone)]
pub struct InboxAggregatorConfig {
    pub resync_interval: Duration,
    pub reader: SenderRole,
}

impl Default for InboxAggregatorConfig {
    fn default() -> Self {
        Self {
            resync_interval: Duration::from_secs(60),
            reader: SenderRole::Operator,
        }
    }
}

impl InboxAggregatorConfig {
    pub fn with_resync_interval(mut self, interval: Duration) -> Self {
        self.resync_interval = interval;
        self
    }
}

/// Maintains the merged roster/active-room list for operators.
pub struct InboxAggregator {
    hub: Arc<Hub>,
    roster: Arc<dyn CustomerRoster>,
    config: InboxAggregatorConfig,
    snapshot: watch::Sender<Vec<RoomSummary>>,
}

impl InboxAggregator {
    pub fn new(hub: Arc<Hub>, roster: Arc<dyn CustomerRoster>) -> Self {
        Self::with_config(hub, roster, InboxAggregatorConfig::default())
    }

    pub fn with_config(
        hub: Arc<Hub>,
        roster: Arc<dyn CustomerRoster>,
        config: InboxAggregatorConfig,
    ) -> Self {
        let (snapshot, _) = watch::channel(Vec::new());
        Self {
            hub,
            roster,
            config,
            snapshot,
        }
    }

    /// Computes the inbox from the roster and the rooms with activity.
    pub async fn list_rooms(&self) -> Result<Vec<RoomSummary>, DomainError> {
        let roster = self.roster.list_known_customers().await?;
        let active = self.hub.rooms_with_activity().await;
        Ok(merge_inbox(&roster, &active, self.config.reader))
    }

    /// Last published inbox.
    pub fn snapshot(&self) -> Vec<RoomSummary> {
        self.snapshot.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<Vec<RoomSummary>> {
        self.snapshot.subscribe()
    }

    /// Recomputes the inbox, publishes it and pushes it to the support room.
    ///
    /// Returns the number of entries.
    pub async fn refresh(&self) -> Result<usize, DomainError> {
        let rooms = self.list_rooms().await?;
        let count = rooms.len();
        self.snapshot.send_replace(rooms.clone());
        let reached = self
            .hub
            .push_to_room(&RoomId::Support, Outbound::Inbox(rooms))
            .await;
        debug!(entries = count, operators = reached, "Inbox refreshed");
        Ok(count)
    }

    /// Run the refresh loop until the shutdown signal is received.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        let mut activity = self.hub.subscribe_activity();
        let mut resync = time::interval(self.config.resync_interval);
        resync.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        return;
                    }
                }

                received = activity.recv() => match received {
                    Ok(notification) => {
                        if notification.room_id.feeds_inbox() {
                            Self::drain_pending(&mut activity);
                            self.refresh_logged("activity").await;
                        }
                    }
                    Err(RecvError::Lagged(skipped)) => {
                        warn!(skipped, "Inbox aggregator lagged behind room activity");
                        self.refresh_logged("lagged").await;
                    }
                    Err(RecvError::Closed) => return,
                },

                _ = resync.tick() => {
                    self.refresh_logged("resync").await;
                }
            }
        }
    }

    /// Coalesces a burst of notifications into one refresh.
    fn drain_pending(activity: &mut broadcast::Receiver<RoomActivity>) {
        loop {
            match activity.try_recv() {
                Ok(_) | Err(TryRecvError::Lagged(_)) => continue,
                Err(TryRecvError::Empty) | Err(TryRecvError::Closed) => break,
            }
        }
    }

    async fn refresh_logged(&self, trigger: &'static str) {
        if let Err(err) = self.refresh().await {
            warn!(trigger, error = %err, "Inbox refresh failed, keeping previous snapshot");
        }
    }
}
