//! Transition validation policy.

use serde::Deserialize;

use crate::domain::foundation::{OrderId, StateMachine};

use super::{OrderStatus, TransitionError};

/// How strictly requested transitions are checked.
///
/// Order call sites historically set any status from any open status, so
/// `Permissive` only rejects transitions out of a final status. `Strict`
/// additionally enforces the adjacency table of [`OrderStatus`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransitionPolicy {
    #[default]
    Permissive,
    Strict,
}

impl TransitionPolicy {
    /// Validates `from → to` for `order_id`. Performs no side effects.
    pub fn check(
        &self,
        order_id: &OrderId,
        from: OrderStatus,
        to: OrderStatus,
    ) -> Result<(), TransitionError> {
        let allowed = match self {
            TransitionPolicy::Permissive => !from.is_final(),
            TransitionPolicy::Strict => from.can_transition_to(&to),
        };
        if allowed {
            Ok(())
        } else {
            Err(TransitionError::InvalidTransition {
                order_id: order_id.clone(),
                from,
                to,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn order() -> OrderId {
        OrderId::new("42").unwrap()
    }

    #[test]
    fn permissive_allows_jumps_from_open_status() {
        let policy = TransitionPolicy::Permissive;
        assert!(policy
            .check(&order(), OrderStatus::Pending, OrderStatus::Completed)
            .is_ok());
    }

    #[test]
    fn permissive_rejects_from_final_status() {
        let policy = TransitionPolicy::Permissive;
        for from in [OrderStatus::Completed, OrderStatus::Cancelled, OrderStatus::Declined] {
            let result = policy.check(&order(), from, OrderStatus::Arrived);
            assert!(matches!(
                result,
                Err(TransitionError::InvalidTransition { .. })
            ));
        }
    }

    #[test]
    fn strict_rejects_jumps() {
        let policy = TransitionPolicy::Strict;
        assert!(policy
            .check(&order(), OrderStatus::Pending, OrderStatus::Completed)
            .is_err());
        assert!(policy
            .check(&order(), OrderStatus::Accepted, OrderStatus::OnTheWay)
            .is_ok());
    }

    #[test]
    fn deserializes_lowercase() {
        let policy: TransitionPolicy = serde_json::from_str("\"strict\"").unwrap();
        assert_eq!(policy, TransitionPolicy::Strict);
    }
}
