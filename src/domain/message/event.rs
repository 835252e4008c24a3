//! Events carried through rooms.
//!
//! Two kinds of facts flow through the hub and they are distinguished by
//! an explicit discriminant rather than by which fields happen to be set:
//!
//! - [`ChatMessage`] - free text from a guest, an operator or the bot
//! - [`OrderStatusEvent`] - an accepted order status transition

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{
    CorrelationId, EventId, OrderId, PrincipalId, Timestamp, ValidationError,
};
use crate::domain::order::OrderStatus;
use crate::domain::room::RoomId;

use super::SenderRole;

/// Longest accepted chat message, in characters.
pub const MAX_TEXT_CHARS: usize = 4_000;

/// Free-text chat message. Immutable once published.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    pub sender_role: SenderRole,
    pub sender_name: String,
    pub text: String,
    pub created_at: Timestamp,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub correlation_id: Option<CorrelationId>,
}

impl ChatMessage {
    /// Builds a message, validating the text payload.
    pub fn new(
        sender_role: SenderRole,
        sender_name: impl Into<String>,
        text: impl Into<String>,
        correlation_id: Option<CorrelationId>,
    ) -> Result<Self, ValidationError> {
        let text = text.into();
        if text.trim().is_empty() {
            return Err(ValidationError::empty_field("text"));
        }
        if text.chars().count() > MAX_TEXT_CHARS {
            return Err(ValidationError::invalid_format(
                "text",
                format!("longer than {} characters", MAX_TEXT_CHARS),
            ));
        }

        let sender_name = sender_name.into();
        let sender_name = if sender_name.trim().is_empty() {
            sender_role.default_display_name().to_string()
        } else {
            sender_name.trim().to_string()
        };

        Ok(Self {
            sender_role,
            sender_name,
            text,
            created_at: Timestamp::now(),
            correlation_id,
        })
    }
}

/// Who triggered an order status transition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Actor {
    pub role: SenderRole,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub principal: Option<PrincipalId>,
}

impl Actor {
    pub fn new(role: SenderRole, name: impl Into<String>) -> Self {
        Self {
            role,
            name: name.into(),
            principal: None,
        }
    }

    pub fn with_principal(mut self, principal: PrincipalId) -> Self {
        self.principal = Some(principal);
        self
    }
}

/// An accepted order status transition.
///
/// Produced only by the order status state machine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderStatusEvent {
    pub order_id: OrderId,
    pub prior_status: OrderStatus,
    pub new_status: OrderStatus,
    pub actor: Actor,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    pub occurred_at: Timestamp,
}

/// Body of a hub event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum HubPayload {
    Message(ChatMessage),
    OrderStatus(OrderStatusEvent),
}

/// Envelope for everything fanned out through a room.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HubEvent {
    pub event_id: EventId,
    pub room_id: RoomId,
    pub payload: HubPayload,
}

impl HubEvent {
    /// Wraps a payload for a room, assigning a fresh event id.
    pub fn new(room_id: RoomId, payload: HubPayload) -> Self {
        Self {
            event_id: EventId::new(),
            room_id,
            payload,
        }
    }

    pub fn sender_role(&self) -> SenderRole {
        match &self.payload {
            HubPayload::Message(message) => message.sender_role,
            HubPayload::OrderStatus(event) => event.actor.role,
        }
    }

    pub fn sender_name(&self) -> &str {
        match &self.payload {
            HubPayload::Message(message) => &message.sender_name,
            HubPayload::OrderStatus(event) => &event.actor.name,
        }
    }

    pub fn created_at(&self) -> Timestamp {
        match &self.payload {
            HubPayload::Message(message) => message.created_at,
            HubPayload::OrderStatus(event) => event.occurred_at,
        }
    }

    pub fn correlation_id(&self) -> Option<&CorrelationId> {
        match &self.payload {
            HubPayload::Message(message) => message.correlation_id.as_ref(),
            HubPayload::OrderStatus(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn order_event() -> OrderStatusEvent {
        OrderStatusEvent {
            order_id: OrderId::new("42").unwrap(),
            prior_status: OrderStatus::Accepted,
            new_status: OrderStatus::OnTheWay,
            actor: Actor::new(SenderRole::Operator, "Dispatch"),
            note: None,
            occurred_at: Timestamp::from_unix_millis(1_000),
        }
    }

    #[test]
    fn chat_message_rejects_blank_text() {
        let result = ChatMessage::new(SenderRole::Guest, "Ana", "   ", None);
        assert!(matches!(result, Err(ValidationError::EmptyField { .. })));
    }

    #[test]
    fn chat_message_rejects_oversized_text() {
        let text = "x".repeat(MAX_TEXT_CHARS + 1);
        assert!(ChatMessage::new(SenderRole::Guest, "Ana", text, None).is_err());
    }

    #[test]
    fn chat_message_falls_back_to_role_name() {
        let message = ChatMessage::new(SenderRole::Bot, "", "Hello!", None).unwrap();
        assert_eq!(message.sender_name, "Assistant");
    }

    #[test]
    fn accessors_cover_both_payloads() {
        let message = ChatMessage::new(
            SenderRole::Guest,
            "Ana",
            "hi",
            Some(CorrelationId::new("c-1")),
        )
        .unwrap();
        let chat = HubEvent::new("guest:u1".parse().unwrap(), HubPayload::Message(message));
        assert_eq!(chat.sender_role(), SenderRole::Guest);
        assert_eq!(chat.correlation_id().map(|c| c.as_str()), Some("c-1"));

        let status = HubEvent::new(
            "order:42".parse().unwrap(),
            HubPayload::OrderStatus(order_event()),
        );
        assert_eq!(status.sender_role(), SenderRole::Operator);
        assert_eq!(status.sender_name(), "Dispatch");
        assert!(status.correlation_id().is_none());
        assert_eq!(status.created_at(), Timestamp::from_unix_millis(1_000));
    }

    #[test]
    fn payload_serializes_with_kind_tag() {
        let event = HubEvent::new(
            "order:42".parse().unwrap(),
            HubPayload::OrderStatus(order_event()),
        );
        let json = serde_json::to_string(&event).unwrap();

        assert!(json.contains(r#""kind":"order_status""#));
        assert!(json.contains(r#""priorStatus":"ACCEPTED""#));
        assert!(json.contains(r#""newStatus":"ON_THE_WAY""#));
        assert!(json.contains(r#""roomId":"order:42""#));
    }
}
