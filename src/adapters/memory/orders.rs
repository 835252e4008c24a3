//! In-memory order repository.

use async_trait::async_trait;
use dashmap::DashMap;

use crate::domain::foundation::{DomainError, ErrorCode, OrderId};
use crate::domain::message::OrderStatusEvent;
use crate::domain::order::OrderRecord;
use crate::ports::OrderRepository;

struct OrderEntry {
    record: OrderRecord,
    timeline: Vec<OrderStatusEvent>,
}

/// Order projection and timeline kept in memory.
///
/// Each order's entry is updated under its map shard lock, so a timeline
/// append and the status projection change together.
#[derive(Default)]
pub struct InMemoryOrderRepository {
    orders: DashMap<OrderId, OrderEntry>,
}

impl InMemoryOrderRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces an order, clearing its timeline.
    pub fn insert(&self, record: OrderRecord) {
        self.orders.insert(
            record.order_id.clone(),
            OrderEntry {
                record,
                timeline: Vec::new(),
            },
        );
    }

    pub fn len(&self) -> usize {
        self.orders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.orders.is_empty()
    }
}

#[async_trait]
impl OrderRepository for InMemoryOrderRepository {
    async fn find(&self, order_id: &OrderId) -> Result<Option<OrderRecord>, DomainError> {
        Ok(self.orders.get(order_id).map(|entry| entry.record.clone()))
    }

    async fn record_transition(&self, event: &OrderStatusEvent) -> Result<(), DomainError> {
        let mut entry = self.orders.get_mut(&event.order_id).ok_or_else(|| {
            DomainError::new(
                ErrorCode::OrderNotFound,
                format!("Order {} not found", event.order_id),
            )
        })?;
        entry.record.apply(event);
        entry.timeline.push(event.clone());
        Ok(())
    }

    async fn timeline(&self, order_id: &OrderId) -> Result<Vec<OrderStatusEvent>, DomainError> {
        Ok(self
            .orders
            .get(order_id)
            .map(|entry| entry.timeline.clone())
            .unwrap_or_default())
    }
}
