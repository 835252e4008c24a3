//! TransitionOrderHandler - Command handler for order status transitions.

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::application::hub::Hub;
use crate::domain::foundation::{DomainError, ErrorCode, OrderId, Timestamp};
use crate::domain::message::{Actor, HubEvent, OrderStatusEvent};
use crate::domain::order::{OrderStatus, TransitionError, TransitionPolicy};
use crate::ports::OrderRepository;

/// Command to move an order to a new status.
#[derive(Debug, Clone)]
pub struct TransitionOrderCommand {
    pub order_id: OrderId,
    pub requested: OrderStatus,
    pub actor: Actor,
    pub note: Option<String>,
}

/// Result of an accepted transition.
#[derive(Debug, Clone)]
pub struct TransitionOrderResult {
    pub event: OrderStatusEvent,
    pub hub_event: HubEvent,
}

/// Handler for order status transitions.
///
/// Validation completes before anything is persisted or delivered, so a
/// rejected transition leaves no timeline entry and no room event. Once the
/// per-order lock is taken, the commit runs on its own task: a caller that
/// stops waiting cannot leave a recorded transition unpublished.
pub struct TransitionOrderHandler {
    orders: Arc<dyn OrderRepository>,
    hub: Arc<Hub>,
    policy: TransitionPolicy,
    order_locks: Arc<DashMap<OrderId, Arc<Mutex<()>>>>,
}

impl TransitionOrderHandler {
    pub fn new(orders: Arc<dyn OrderRepository>, hub: Arc<Hub>, policy: TransitionPolicy) -> Self {
        Self {
            orders,
            hub,
            policy,
            order_locks: Arc::new(DashMap::new()),
        }
    }

    pub fn policy(&self) -> TransitionPolicy {
        self.policy
    }

    pub async fn handle(
        &self,
        cmd: TransitionOrderCommand,
    ) -> Result<TransitionOrderResult, TransitionError> {
        let commit = Commit {
            orders: self.orders.clone(),
            hub: self.hub.clone(),
            policy: self.policy,
            order_locks: self.order_locks.clone(),
        };
        let lock = self.lock_for(&cmd.order_id);

        tokio::spawn(async move {
            let _guard = lock.lock_owned().await;
            commit.run(cmd).await
        })
        .await
        .map_err(|err| {
            TransitionError::Storage(DomainError::new(
                ErrorCode::InternalError,
                format!("transition task failed: {}", err),
            ))
        })?
    }

    fn lock_for(&self, order_id: &OrderId) -> Arc<Mutex<()>> {
        self.order_locks
            .entry(order_id.clone())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }
}

/// Everything one transition needs, owned so it can run detached.
struct Commit {
    orders: Arc<dyn OrderRepository>,
    hub: Arc<Hub>,
    policy: TransitionPolicy,
    order_locks: Arc<DashMap<OrderId, Arc<Mutex<()>>>>,
}

impl Commit {
    async fn run(self, cmd: TransitionOrderCommand) -> Result<TransitionOrderResult, TransitionError> {
        // 1. Load order
        let record = self
            .orders
            .find(&cmd.order_id)
            .await?
            .ok_or_else(|| TransitionError::OrderNotFound(cmd.order_id.clone()))?;

        // 2. Validate
        if let Err(err) = self.policy.check(&cmd.order_id, record.status, cmd.requested) {
            warn!(
                order_id = %cmd.order_id,
                from = %record.status,
                to = %cmd.requested,
                "Transition rejected"
            );
            return Err(err);
        }

        // 3. Record on the order timeline
        let event = OrderStatusEvent {
            order_id: cmd.order_id.clone(),
            prior_status: record.status,
            new_status: cmd.requested,
            actor: cmd.actor,
            note: cmd.note.filter(|note| !note.trim().is_empty()),
            occurred_at: Timestamp::now(),
        };
        self.orders.record_transition(&event).await?;

        // 4. Fan out to the order room
        let hub_event = self.hub.publish_order_status(event.clone()).await;

        info!(
            order_id = %event.order_id,
            from = %event.prior_status,
            to = %event.new_status,
            actor = %event.actor.name,
            "Order transitioned"
        );

        if event.new_status.is_final() {
            self.order_locks.remove(&event.order_id);
        }

        Ok(TransitionOrderResult { event, hub_event })
    }
}
