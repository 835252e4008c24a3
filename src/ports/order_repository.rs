//! OrderRepository port - The hub's view of the order service.
//!
//! The state machine is the source of truth for a transition; the order
//! record is a projection of the accepted events. This port supplies
//! existence checks and current status, and receives each accepted
//! [`OrderStatusEvent`] to update its timeline and status field.

use async_trait::async_trait;

use crate::domain::foundation::{DomainError, OrderId};
use crate::domain::message::OrderStatusEvent;
use crate::domain::order::OrderRecord;

#[async_trait]
pub trait OrderRepository: Send + Sync {
    /// Look up an order. `Ok(None)` when it does not exist.
    async fn find(&self, order_id: &OrderId) -> Result<Option<OrderRecord>, DomainError>;

    /// Append an accepted event to the order timeline and update the
    /// status projection. Must be atomic per order.
    async fn record_transition(&self, event: &OrderStatusEvent) -> Result<(), DomainError>;

    /// Every accepted event for the order, oldest first.
    async fn timeline(&self, order_id: &OrderId) -> Result<Vec<OrderStatusEvent>, DomainError>;
}
