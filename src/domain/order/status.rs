//! OrderStatus enum and its transition rules.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::domain::foundation::{StateMachine, ValidationError};

/// Lifecycle status of an order.
///
/// Normal path:
///
/// ```text
/// PENDING → CONFIRMED → AVAILABLE → ASSIGNED → ACCEPTED → ON_THE_WAY
///         → ARRIVED → DELIVERED → COMPLETED
/// ```
///
/// `DECLINED` and `CANCELLED` branch off the normal path and, like
/// `COMPLETED`, are terminal. `INCIDENT`, `PAUSED` and `NOTE` annotate the
/// timeline without moving the order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    #[default]
    Pending,
    Confirmed,
    Available,
    Assigned,
    Accepted,
    OnTheWay,
    Arrived,
    Delivered,
    Completed,
    Declined,
    Cancelled,
    Incident,
    Paused,
    Note,
}

impl OrderStatus {
    pub const ALL: [OrderStatus; 14] = [
        OrderStatus::Pending,
        OrderStatus::Confirmed,
        OrderStatus::Available,
        OrderStatus::Assigned,
        OrderStatus::Accepted,
        OrderStatus::OnTheWay,
        OrderStatus::Arrived,
        OrderStatus::Delivered,
        OrderStatus::Completed,
        OrderStatus::Declined,
        OrderStatus::Cancelled,
        OrderStatus::Incident,
        OrderStatus::Paused,
        OrderStatus::Note,
    ];

    /// No further transition is accepted once an order reaches one of these.
    pub fn is_final(&self) -> bool {
        matches!(
            self,
            OrderStatus::Completed | OrderStatus::Cancelled | OrderStatus::Declined
        )
    }

    /// Timeline annotation that does not move the order.
    pub fn is_annotation(&self) -> bool {
        matches!(
            self,
            OrderStatus::Incident | OrderStatus::Paused | OrderStatus::Note
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "PENDING",
            OrderStatus::Confirmed => "CONFIRMED",
            OrderStatus::Available => "AVAILABLE",
            OrderStatus::Assigned => "ASSIGNED",
            OrderStatus::Accepted => "ACCEPTED",
            OrderStatus::OnTheWay => "ON_THE_WAY",
            OrderStatus::Arrived => "ARRIVED",
            OrderStatus::Delivered => "DELIVERED",
            OrderStatus::Completed => "COMPLETED",
            OrderStatus::Declined => "DECLINED",
            OrderStatus::Cancelled => "CANCELLED",
            OrderStatus::Incident => "INCIDENT",
            OrderStatus::Paused => "PAUSED",
            OrderStatus::Note => "NOTE",
        }
    }

    /// Normal-path and branch targets reachable in one step.
    fn forward_targets(&self) -> &'static [OrderStatus] {
        use OrderStatus::*;
        match self {
            Pending => &[Confirmed, Available, Declined, Cancelled],
            Confirmed => &[Available, Assigned, Cancelled],
            Available => &[Assigned, Cancelled],
            Assigned => &[Accepted, Available, Declined, Cancelled],
            Accepted => &[OnTheWay, Cancelled],
            OnTheWay => &[Arrived],
            Arrived => &[Delivered],
            Delivered => &[Completed],
            Completed | Declined | Cancelled => &[],
            // Annotations never become the effective status of an order.
            Incident | Paused | Note => &[],
        }
    }
}

/// Strict adjacency table. Used when strict transitions are enabled.
impl StateMachine for OrderStatus {
    fn valid_transitions(&self) -> Vec<Self> {
        if self.is_final() {
            return Vec::new();
        }
        let mut targets = self.forward_targets().to_vec();
        targets.extend([OrderStatus::Incident, OrderStatus::Paused, OrderStatus::Note]);
        targets
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrderStatus {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_uppercase().replace(['-', ' '], "_");
        OrderStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == wanted)
            .ok_or_else(|| {
                ValidationError::invalid_format("status", format!("unknown order status '{}'", s))
            })
    }
}
