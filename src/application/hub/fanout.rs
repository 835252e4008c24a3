//! Fan-out engine.
//!
//! The [`Hub`] owns the connection registry and the room directory and is
//! the only component that mutates membership or unread counters.
//!
//! # Delivery model
//!
//! ```text
//! publish(event)
//!   └─ lock room
//!        ├─ append to history (failure logged)
//!        ├─ buffering members: queue event
//!        ├─ live members: dedup → bounded send with timeout
//!        └─ touch room, bump unread for absent reader roles
//!   └─ unlock, disconnect failed members, emit RoomActivity
//! ```
//!
//! Holding the room lock across delivery gives single-writer ordering per
//! room. Unrelated rooms never contend.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use thiserror::Error;
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, info, warn};

use crate::domain::foundation::{
    ConnectionId, CorrelationId, DomainError, ErrorCode, Timestamp, ValidationError,
};
use crate::domain::message::{ChatMessage, HubEvent, HubPayload, OrderStatusEvent, SenderRole};
use crate::domain::room::{RoomId, RoomMeta};
use crate::ports::{HistoryStore, OrderRepository};

use super::backfill::{BackfillAdapter, DEFAULT_BACKFILL_LIMIT};
use super::connection::{ConnectionHandle, ConnectionSpec, Outbound};
use super::dedup::DedupConfig;
use super::directory::{MemberPhase, RoomDirectory};
use super::registry::{ConnectionRegistry, RoomAdded};

/// Runtime tunables of the hub.
#[derive(Debug, Clone)]
pub struct HubOptions {
    pub dedup: DedupConfig,
    pub backfill_limit: usize,
    pub delivery_timeout: Duration,
    pub outbound_capacity: usize,
    pub activity_capacity: usize,
}

impl Default for HubOptions {
    fn default() -> Self {
        Self {
            dedup: DedupConfig::default(),
            backfill_limit: DEFAULT_BACKFILL_LIMIT,
            delivery_timeout: Duration::from_secs(2),
            outbound_capacity: 256,
            activity_capacity: 1024,
        }
    }
}

/// Notification that a room changed (event published or unread reset).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoomActivity {
    pub room_id: RoomId,
    pub at: Timestamp,
}

/// What happened during a join.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct JoinOutcome {
    pub already_joined: bool,
    /// History events delivered.
    pub replayed: usize,
    /// Live events buffered during backfill and delivered afterwards.
    pub flushed: usize,
    pub history_available: bool,
}

/// A freshly registered connection.
pub struct Registration {
    pub handle: ConnectionHandle,
    pub outbound: mpsc::Receiver<Outbound>,
}

/// Hub operation failures.
#[derive(Debug, Error)]
pub enum HubError {
    #[error("Room {0} has no backing order")]
    UnknownRoom(RoomId),

    #[error("Connection {0} is not registered")]
    UnknownConnection(ConnectionId),

    #[error("Connection {connection_id} has not joined {room_id}")]
    NotJoined {
        connection_id: ConnectionId,
        room_id: RoomId,
    },

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("Storage failure: {0}")]
    Storage(#[from] DomainError),
}

impl HubError {
    pub fn code(&self) -> ErrorCode {
        match self {
            HubError::UnknownRoom(_) => ErrorCode::UnknownRoom,
            HubError::UnknownConnection(_) => ErrorCode::UnknownConnection,
            HubError::NotJoined { .. } => ErrorCode::NotJoined,
            HubError::Validation(_) => ErrorCode::ValidationFailed,
            HubError::Storage(err) => err.code,
        }
    }
}

/// Realtime room hub.
pub struct Hub {
    options: HubOptions,
    registry: ConnectionRegistry,
    directory: RoomDirectory,
    backfill: BackfillAdapter,
    orders: Arc<dyn OrderRepository>,
    activity: broadcast::Sender<RoomActivity>,
}

impl Hub {
    pub fn new(
        options: HubOptions,
        history: Arc<dyn HistoryStore>,
        orders: Arc<dyn OrderRepository>,
    ) -> Self {
        let (activity, _) = broadcast::channel(options.activity_capacity.max(1));
        let directory = RoomDirectory::with_id_capacity(options.dedup.capacity);
        Self {
            options,
            registry: ConnectionRegistry::new(),
            directory,
            backfill: BackfillAdapter::new(history),
            orders,
            activity,
        }
    }

    pub fn options(&self) -> &HubOptions {
        &self.options
    }

    pub fn registry(&self) -> &ConnectionRegistry {
        &self.registry
    }

    pub fn directory(&self) -> &RoomDirectory {
        &self.directory
    }

    /// Subscribes to room activity notifications.
    pub fn subscribe_activity(&self) -> broadcast::Receiver<RoomActivity> {
        self.activity.subscribe()
    }

    /// Registers a new connection and returns its outbound queue.
    pub fn register(&self, spec: ConnectionSpec) -> Registration {
        let (handle, outbound) =
            ConnectionHandle::open(spec, self.options.outbound_capacity, self.options.dedup);
        self.registry.insert(handle.clone());
        info!(
            connection_id = %handle.id(),
            role = %handle.role(),
            "Connection registered"
        );
        Registration { handle, outbound }
    }

    /// Joins a connection to a room and replays its history.
    ///
    /// The connection is added as a buffering member before history is
    /// read, so nothing published during the query is lost. Buffered events
    /// already present in the replayed history are skipped.
    pub async fn join(
        &self,
        connection_id: &ConnectionId,
        room_id: RoomId,
    ) -> Result<JoinOutcome, HubError> {
        let handle = self
            .registry
            .handle(connection_id)
            .ok_or(HubError::UnknownConnection(*connection_id))?;
        self.require_backing(&room_id).await?;

        match self.registry.add_room(connection_id, &room_id) {
            RoomAdded::Added => {}
            RoomAdded::AlreadyJoined => {
                return Ok(JoinOutcome {
                    already_joined: true,
                    history_available: true,
                    ..JoinOutcome::default()
                })
            }
            RoomAdded::UnknownConnection => {
                return Err(HubError::UnknownConnection(*connection_id))
            }
        }

        let room = self.directory.room(&room_id);
        {
            let mut state = room.lock().await;
            if !self.registry.is_member(connection_id, &room_id) {
                debug!(connection_id = %connection_id, room = %room_id, "Join abandoned before membership");
                return if self.registry.contains(connection_id) {
                    Ok(JoinOutcome::default())
                } else {
                    Err(HubError::UnknownConnection(*connection_id))
                };
            }
            state.insert_buffering(handle.clone());
        }

        let history = self
            .backfill
            .backfill(&room_id, self.options.backfill_limit)
            .await;

        let mut outcome = JoinOutcome {
            history_available: history.is_ok(),
            ..JoinOutcome::default()
        };
        let mut delivery_failed = false;
        {
            let mut state = room.lock().await;
            let Some(buffered) = state.take_buffer(connection_id) else {
                debug!(
                    connection_id = %connection_id,
                    room = %room_id,
                    "Connection left during backfill, discarding history"
                );
                return Ok(outcome);
            };

            let mut pending = Vec::new();
            let mut replayed_ids = HashSet::new();
            match history {
                Ok(events) => {
                    for event in events {
                        replayed_ids.insert(event.event_id.clone());
                        if handle.admit(&event).await {
                            outcome.replayed += 1;
                            pending.push(Outbound::Event(event));
                        }
                    }
                }
                Err(err) => {
                    warn!(
                        connection_id = %connection_id,
                        room = %room_id,
                        error = %err,
                        "History backfill failed, joining for live events only"
                    );
                    pending.push(Outbound::HistoryUnavailable(room_id.clone()));
                }
            }

            for event in buffered {
                if replayed_ids.contains(&event.event_id) {
                    continue;
                }
                if handle.admit(&event).await {
                    outcome.flushed += 1;
                    pending.push(Outbound::Event(event));
                }
            }

            for item in pending {
                if let Err(err) = handle.deliver(item, self.options.delivery_timeout).await {
                    warn!(
                        connection_id = %connection_id,
                        room = %room_id,
                        error = %err,
                        "Backfill delivery failed, scheduling disconnect"
                    );
                    delivery_failed = true;
                    break;
                }
            }
            state.set_live(connection_id);
        }

        if delivery_failed {
            self.unregister_all(connection_id).await;
        } else {
            info!(
                connection_id = %connection_id,
                room = %room_id,
                replayed = outcome.replayed,
                flushed = outcome.flushed,
                history_available = outcome.history_available,
                "Joined room"
            );
        }
        Ok(outcome)
    }

    /// Removes a connection from one room. Leaving a room that was never
    /// joined is a no-op.
    pub async fn leave(&self, connection_id: &ConnectionId, room_id: &RoomId) -> Result<(), HubError> {
        let handle = self
            .registry
            .handle(connection_id)
            .ok_or(HubError::UnknownConnection(*connection_id))?;
        if !self.registry.remove_room(connection_id, room_id) {
            return Ok(());
        }
        if let Some(room) = self.directory.get(room_id) {
            room.lock().await.remove_member(connection_id);
        }
        handle.forget_room(room_id).await;
        debug!(connection_id = %connection_id, room = %room_id, "Left room");
        Ok(())
    }

    /// Removes a connection from every room it joined.
    ///
    /// Returns once no room holds the handle any more.
    pub async fn unregister_all(&self, connection_id: &ConnectionId) {
        let Some((handle, rooms)) = self.registry.remove(connection_id) else {
            return;
        };
        for room_id in &rooms {
            if let Some(room) = self.directory.get(room_id) {
                room.lock().await.remove_member(connection_id);
            }
        }
        handle.close();
        info!(connection_id = %connection_id, rooms = rooms.len(), "Connection unregistered");
    }

    /// Publishes a chat message from a joined connection.
    pub async fn send_message(
        &self,
        connection_id: &ConnectionId,
        room_id: RoomId,
        text: impl Into<String>,
        correlation_id: Option<CorrelationId>,
    ) -> Result<HubEvent, HubError> {
        let handle = self
            .registry
            .handle(connection_id)
            .ok_or(HubError::UnknownConnection(*connection_id))?;
        if !self.registry.is_member(connection_id, &room_id) {
            return Err(HubError::NotJoined {
                connection_id: *connection_id,
                room_id,
            });
        }

        let message = ChatMessage::new(handle.role(), handle.display_name(), text, correlation_id)?;
        let event = HubEvent::new(room_id, HubPayload::Message(message));
        self.fan_out(&event).await;
        Ok(event)
    }

    /// Publishes an event produced outside a connection (e.g. the bot).
    ///
    /// Order rooms require the order to exist; other rooms are created on
    /// demand.
    pub async fn publish(&self, event: HubEvent) -> Result<HubEvent, HubError> {
        self.require_backing(&event.room_id).await?;
        self.fan_out(&event).await;
        Ok(event)
    }

    /// Publishes an accepted order transition to its order room.
    pub async fn publish_order_status(&self, status: OrderStatusEvent) -> HubEvent {
        let room_id = RoomId::for_order(status.order_id.clone());
        let event = HubEvent::new(room_id, HubPayload::OrderStatus(status));
        self.fan_out(&event).await;
        event
    }

    /// Clears the unread counter of the connection's role in a room.
    pub async fn mark_read(&self, connection_id: &ConnectionId, room_id: &RoomId) -> Result<(), HubError> {
        let handle = self
            .registry
            .handle(connection_id)
            .ok_or(HubError::UnknownConnection(*connection_id))?;
        self.require_backing(room_id).await?;
        self.directory.reset_unread(room_id, handle.role()).await;
        let _ = self.activity.send(RoomActivity {
            room_id: room_id.clone(),
            at: Timestamp::now(),
        });
        Ok(())
    }

    /// Sends a non-event item to every member of a room, bypassing dedup.
    ///
    /// Returns the number of members reached.
    pub async fn push_to_room(&self, room_id: &RoomId, item: Outbound) -> usize {
        let members = self.directory.members_of(room_id).await;
        let timeout = self.options.delivery_timeout;
        let results = join_all(members.iter().map(|h| h.deliver(item.clone(), timeout))).await;

        let mut reached = 0;
        for (handle, result) in members.iter().zip(results) {
            match result {
                Ok(()) => reached += 1,
                Err(err) => {
                    warn!(connection_id = %handle.id(), room = %room_id, error = %err, "Push failed, scheduling disconnect");
                    self.unregister_all(&handle.id()).await;
                }
            }
        }
        reached
    }

    /// Rooms that have carried events or hold unread counts.
    pub async fn rooms_with_activity(&self) -> Vec<RoomMeta> {
        self.directory.rooms_with_activity().await
    }

    pub fn connection_count(&self) -> usize {
        self.registry.len()
    }

    async fn require_backing(&self, room_id: &RoomId) -> Result<(), HubError> {
        if let Some(order_id) = room_id.order_id() {
            if self.orders.find(order_id).await?.is_none() {
                return Err(HubError::UnknownRoom(room_id.clone()));
            }
        }
        Ok(())
    }

    async fn fan_out(&self, event: &HubEvent) {
        let room = self.directory.room(&event.room_id);
        let mut failed = Vec::new();
        let mut delivered = 0;
        {
            let mut state = room.lock().await;
            if let Some(correlation_id) = event.correlation_id() {
                if !state.record_correlation(correlation_id) {
                    debug!(
                        room = %event.room_id,
                        correlation_id = %correlation_id.as_str(),
                        "Resent message dropped"
                    );
                    return;
                }
            }
            if let Err(err) = self.backfill.record(event).await {
                warn!(
                    room = %event.room_id,
                    event_id = %event.event_id,
                    error = %err,
                    "History append failed, delivering anyway"
                );
            }

            let mut live = Vec::new();
            for member in state.members_mut() {
                match &mut member.phase {
                    MemberPhase::Buffering(buffer) => buffer.push(event.clone()),
                    MemberPhase::Live => live.push(member.handle.clone()),
                }
            }

            let mut admitted = Vec::with_capacity(live.len());
            for handle in live {
                if handle.admit(event).await {
                    admitted.push(handle);
                }
            }

            let timeout = self.options.delivery_timeout;
            let results = join_all(
                admitted
                    .iter()
                    .map(|h| h.deliver(Outbound::Event(event.clone()), timeout)),
            )
            .await;
            for (handle, result) in admitted.iter().zip(results) {
                match result {
                    Ok(()) => delivered += 1,
                    Err(err) => {
                        warn!(
                            connection_id = %handle.id(),
                            room = %event.room_id,
                            error = %err,
                            "Delivery failed, scheduling disconnect"
                        );
                        failed.push(handle.id());
                    }
                }
            }

            let sender = event.sender_role();
            state.meta.touch(event.created_at());
            for reader in SenderRole::READERS {
                if reader != sender && !state.has_member_with_role(reader) {
                    state.meta.increment_unread(reader);
                }
            }
            if matches!(event.room_id, RoomId::Guest(_))
                && sender == SenderRole::Guest
                && state.meta.has_placeholder_name()
            {
                state.meta.set_display_name(event.sender_name());
            }
        }

        debug!(
            room = %event.room_id,
            event_id = %event.event_id,
            delivered,
            failed = failed.len(),
            "Event fanned out"
        );

        for connection_id in failed {
            self.unregister_all(&connection_id).await;
        }
        let _ = self.activity.send(RoomActivity {
            room_id: event.room_id.clone(),
            at: event.created_at(),
        });
    }
}
