//! Connection handles and the outbound queue behind them.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::sync::mpsc::{self, error::SendTimeoutError};
use tokio::sync::{watch, Mutex};

use crate::domain::foundation::{ConnectionId, PrincipalId};
use crate::domain::inbox::RoomSummary;
use crate::domain::message::{HubEvent, SenderRole};
use crate::domain::room::RoomId;

use super::dedup::{DedupConfig, DedupFilter};

/// What a transport supplies when a client connects.
#[derive(Debug, Clone)]
pub struct ConnectionSpec {
    pub role: SenderRole,
    pub display_name: Option<String>,
    pub principal: Option<PrincipalId>,
}

impl ConnectionSpec {
    pub fn new(role: SenderRole) -> Self {
        Self {
            role,
            display_name: None,
            principal: None,
        }
    }

    pub fn with_display_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = Some(name.into());
        self
    }

    pub fn with_principal(mut self, principal: PrincipalId) -> Self {
        self.principal = Some(principal);
        self
    }
}

/// Item pushed to a connection's writer task.
#[derive(Debug, Clone, PartialEq)]
pub enum Outbound {
    /// A fanned-out or replayed room event.
    Event(HubEvent),
    /// Fresh inbox snapshot (operators in the support room).
    Inbox(Vec<RoomSummary>),
    /// History could not be loaded for a room the connection joined.
    HistoryUnavailable(RoomId),
}

/// Why a single delivery failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum DeliveryError {
    #[error("outbound queue stayed full past the delivery timeout")]
    Timeout,

    #[error("outbound queue is closed")]
    Closed,
}

/// Cheap, cloneable reference to a live connection.
///
/// The hub holds one clone per joined room; the dedup state is shared
/// between them so suppression is decided per connection, not per room.
#[derive(Clone)]
pub struct ConnectionHandle {
    id: ConnectionId,
    role: SenderRole,
    display_name: String,
    principal: Option<PrincipalId>,
    outbound: mpsc::Sender<Outbound>,
    dedup: Arc<Mutex<DedupFilter>>,
    closing: Arc<watch::Sender<bool>>,
}

impl ConnectionHandle {
    /// Creates a handle and the receiving end of its bounded outbound queue.
    pub fn open(
        spec: ConnectionSpec,
        outbound_capacity: usize,
        dedup: DedupConfig,
    ) -> (Self, mpsc::Receiver<Outbound>) {
        let (tx, rx) = mpsc::channel(outbound_capacity.max(1));
        let display_name = spec
            .display_name
            .map(|name| name.trim().to_string())
            .filter(|name| !name.is_empty())
            .unwrap_or_else(|| spec.role.default_display_name().to_string());

        let handle = Self {
            id: ConnectionId::new(),
            role: spec.role,
            display_name,
            principal: spec.principal,
            outbound: tx,
            dedup: Arc::new(Mutex::new(DedupFilter::new(dedup))),
            closing: Arc::new(watch::channel(false).0),
        };
        (handle, rx)
    }

    pub fn id(&self) -> ConnectionId {
        self.id
    }

    pub fn role(&self) -> SenderRole {
        self.role
    }

    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    pub fn principal(&self) -> Option<&PrincipalId> {
        self.principal.as_ref()
    }

    /// Runs `event` through this connection's dedup filter.
    pub async fn admit(&self, event: &HubEvent) -> bool {
        self.dedup.lock().await.admit(event)
    }

    /// Forgets dedup state for a room the connection left.
    pub async fn forget_room(&self, room_id: &RoomId) {
        self.dedup.lock().await.forget_room(room_id);
    }

    /// Queues `item`, waiting at most `timeout` for queue space.
    pub async fn deliver(&self, item: Outbound, timeout: Duration) -> Result<(), DeliveryError> {
        self.outbound
            .send_timeout(item, timeout)
            .await
            .map_err(|err| match err {
                SendTimeoutError::Timeout(_) => DeliveryError::Timeout,
                SendTimeoutError::Closed(_) => DeliveryError::Closed,
            })
    }

    /// Asks the transport behind this handle to shut down.
    pub fn close(&self) {
        self.closing.send_replace(true);
    }

    /// Resolves once [`close`](Self::close) has been called on any clone.
    pub async fn closed(&self) {
        let mut rx = self.closing.subscribe();
        let _ = rx.wait_for(|closing| *closing).await;
    }

    pub fn is_closed(&self) -> bool {
        self.outbound.is_closed() || *self.closing.borrow()
    }
}

impl fmt::Debug for ConnectionHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionHandle")
            .field("id", &self.id)
            .field("role", &self.role)
            .field("display_name", &self.display_name)
            .finish()
    }
}

impl PartialEq for ConnectionHandle {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for ConnectionHandle {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::message::{ChatMessage, HubPayload};

    fn event() -> HubEvent {
        let message = ChatMessage::new(SenderRole::Guest, "Ana", "hi", None).unwrap();
        HubEvent::new("guest:u1".parse().unwrap(), HubPayload::Message(message))
    }

    #[test]
    fn blank_display_name_falls_back_to_role_default() {
        let spec = ConnectionSpec::new(SenderRole::Operator).with_display_name("  ");
        let (handle, _rx) = ConnectionHandle::open(spec, 4, DedupConfig::default());
        assert_eq!(handle.display_name(), "Support");
    }

    #[tokio::test]
    async fn deliver_queues_item() {
        let (handle, mut rx) =
            ConnectionHandle::open(ConnectionSpec::new(SenderRole::Guest), 4, DedupConfig::default());
        handle
            .deliver(Outbound::Event(event()), Duration::from_millis(50))
            .await
            .unwrap();
        assert!(matches!(rx.recv().await, Some(Outbound::Event(_))));
    }

    #[tokio::test]
    async fn deliver_times_out_when_queue_is_full() {
        let (handle, _rx) =
            ConnectionHandle::open(ConnectionSpec::new(SenderRole::Guest), 1, DedupConfig::default());
        handle
            .deliver(Outbound::Event(event()), Duration::from_millis(10))
            .await
            .unwrap();
        let result = handle
            .deliver(Outbound::Event(event()), Duration::from_millis(10))
            .await;
        assert_eq!(result, Err(DeliveryError::Timeout));
    }

    #[tokio::test]
    async fn deliver_reports_closed_queue() {
        let (handle, rx) =
            ConnectionHandle::open(ConnectionSpec::new(SenderRole::Guest), 1, DedupConfig::default());
        drop(rx);
        let result = handle
            .deliver(Outbound::Event(event()), Duration::from_millis(10))
            .await;
        assert_eq!(result, Err(DeliveryError::Closed));
        assert!(handle.is_closed());
    }

    #[tokio::test]
    async fn close_reaches_every_clone() {
        let (handle, _rx) =
            ConnectionHandle::open(ConnectionSpec::new(SenderRole::Guest), 1, DedupConfig::default());
        let writer_side = handle.clone();
        let waiter = tokio::spawn(async move { writer_side.closed().await });

        assert!(!handle.is_closed());
        handle.close();
        assert!(handle.is_closed());
        tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .expect("close observed")
            .unwrap();
    }
}
