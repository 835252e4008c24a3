//! Room identifiers.
//!
//! Three room families share one string namespace:
//!
//! ```text
//! order:<orderId>      lifecycle + chat for one order
//! guest:<customerId>   support conversation with one customer
//! support              broadcast room for operators
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::domain::foundation::{CustomerId, OrderId, ValidationError};

const ORDER_PREFIX: &str = "order:";
const GUEST_PREFIX: &str = "guest:";
const SUPPORT: &str = "support";

/// Identifies a conversation or order channel.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum RoomId {
    Order(OrderId),
    Guest(CustomerId),
    Support,
}

/// Room family without the identifying payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RoomKind {
    Order,
    Guest,
    Support,
}

impl RoomId {
    /// Room carrying the events of one order.
    pub fn for_order(order_id: OrderId) -> Self {
        RoomId::Order(order_id)
    }

    /// Room carrying the support conversation of one customer.
    pub fn for_guest(customer_id: CustomerId) -> Self {
        RoomId::Guest(customer_id)
    }

    pub fn kind(&self) -> RoomKind {
        match self {
            RoomId::Order(_) => RoomKind::Order,
            RoomId::Guest(_) => RoomKind::Guest,
            RoomId::Support => RoomKind::Support,
        }
    }

    /// The order id, if this is an order room.
    pub fn order_id(&self) -> Option<&OrderId> {
        match self {
            RoomId::Order(id) => Some(id),
            _ => None,
        }
    }

    /// Whether activity in this room should refresh the operator inbox.
    pub fn feeds_inbox(&self) -> bool {
        !matches!(self, RoomId::Support)
    }
}

impl fmt::Display for RoomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RoomId::Order(id) => write!(f, "{}{}", ORDER_PREFIX, id),
            RoomId::Guest(id) => write!(f, "{}{}", GUEST_PREFIX, id),
            RoomId::Support => f.write_str(SUPPORT),
        }
    }
}

impl FromStr for RoomId {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s == SUPPORT {
            return Ok(RoomId::Support);
        }
        if let Some(rest) = s.strip_prefix(ORDER_PREFIX) {
            return Ok(RoomId::Order(OrderId::new(rest)?));
        }
        if let Some(rest) = s.strip_prefix(GUEST_PREFIX) {
            return Ok(RoomId::Guest(CustomerId::new(rest)?));
        }
        Err(ValidationError::invalid_format(
            "room_id",
            format!("'{}' is not an order, guest or support room", s),
        ))
    }
}

impl TryFrom<String> for RoomId {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<RoomId> for String {
    fn from(id: RoomId) -> Self {
        id.to_string()
    }
}
