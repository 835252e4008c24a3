//! The slice of an order the hub cares about.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::OrderId;
use crate::domain::message::OrderStatusEvent;
use crate::domain::room::RoomId;

use super::OrderStatus;

/// Projection of an externally owned order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderRecord {
    pub order_id: OrderId,
    /// Last normal-path status. Annotations never land here.
    pub status: OrderStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub customer_name: Option<String>,
}

impl OrderRecord {
    pub fn new(order_id: OrderId, status: OrderStatus) -> Self {
        Self {
            order_id,
            status,
            customer_name: None,
        }
    }

    pub fn with_customer_name(mut self, name: impl Into<String>) -> Self {
        self.customer_name = Some(name.into());
        self
    }

    pub fn room_id(&self) -> RoomId {
        RoomId::for_order(self.order_id.clone())
    }

    /// Applies an accepted event to the projection.
    pub fn apply(&mut self, event: &OrderStatusEvent) {
        if !event.new_status.is_annotation() {
            self.status = event.new_status;
        }
    }
}
