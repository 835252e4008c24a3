//! Order transition errors.

use thiserror::Error;

use crate::domain::foundation::{DomainError, ErrorCode, OrderId};

use super::OrderStatus;

/// Why a requested transition was refused.
///
/// Returned synchronously to the caller that requested the transition.
/// None of these leave a timeline entry or a fanned-out event behind.
#[derive(Debug, Clone, Error)]
pub enum TransitionError {
    #[error("Order {0} not found")]
    OrderNotFound(OrderId),

    #[error("Order {order_id} cannot move from {from} to {to}")]
    InvalidTransition {
        order_id: OrderId,
        from: OrderStatus,
        to: OrderStatus,
    },

    #[error("Order storage failed: {0}")]
    Storage(#[from] DomainError),
}

impl TransitionError {
    pub fn code(&self) -> ErrorCode {
        match self {
            TransitionError::OrderNotFound(_) => ErrorCode::OrderNotFound,
            TransitionError::InvalidTransition { .. } => ErrorCode::InvalidTransition,
            TransitionError::Storage(_) => ErrorCode::StorageError,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_transition_message_names_both_statuses() {
        let err = TransitionError::InvalidTransition {
            order_id: OrderId::new("42").unwrap(),
            from: OrderStatus::Completed,
            to: OrderStatus::Arrived,
        };
        assert_eq!(err.to_string(), "Order 42 cannot move from COMPLETED to ARRIVED");
        assert_eq!(err.code(), ErrorCode::InvalidTransition);
    }

    #[test]
    fn storage_errors_convert() {
        let err: TransitionError = DomainError::storage("down").into();
        assert_eq!(err.code(), ErrorCode::StorageError);
    }
}
