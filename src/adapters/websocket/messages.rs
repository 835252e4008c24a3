//! WebSocket message types for the realtime room protocol.
//!
//! Defines the protocol between server and connected clients:
//! - Server → Client: connection status, room events, inbox, errors, pongs
//! - Client → Server: join/leave, send, order transitions, mark read, pings
//!
//! Every frame is a JSON object tagged by `type`.

use serde::{Deserialize, Serialize};

use crate::application::hub::Outbound;
use crate::domain::foundation::{ErrorCode, Timestamp};
use crate::domain::inbox::RoomSummary;
use crate::domain::message::{HubEvent, HubPayload, SenderRole};
use crate::domain::order::OrderStatus;

// ============================================
// Server → Client Messages
// ============================================

/// All message types that can be sent from server to client.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Connection established successfully.
    Connected(ConnectedMessage),

    /// Join acknowledged; history (if any) follows before live events.
    Joined(JoinedMessage),

    /// Chat message in a room.
    Message(MessageFrame),

    /// Order status transition in an order room.
    OrderStatus(OrderStatusFrame),

    /// Operator inbox snapshot.
    Inbox(InboxMessage),

    /// History could not be loaded; live events still flow.
    HistoryUnavailable(HistoryUnavailableMessage),

    /// Error occurred.
    Error(ErrorMessage),

    /// Heartbeat response.
    Pong(PongMessage),
}

/// Sent when the client is registered with the hub.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectedMessage {
    pub connection_id: String,
    pub role: SenderRole,
    pub display_name: String,
    pub timestamp: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinedMessage {
    pub room: String,
    pub replayed: usize,
    pub history_available: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageFrame {
    pub event_id: String,
    pub room: String,
    pub sender_role: SenderRole,
    pub sender_name: String,
    pub text: String,
    pub created_at: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub correlation_id: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderStatusFrame {
    pub event_id: String,
    pub room: String,
    pub order_id: String,
    pub prior: OrderStatus,
    pub status: OrderStatus,
    pub actor_role: SenderRole,
    pub actor_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    pub occurred_at: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InboxMessage {
    pub rooms: Vec<RoomSummary>,
    pub timestamp: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryUnavailableMessage {
    pub room: String,
    pub timestamp: String,
}

/// Error message sent to client.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorMessage {
    pub code: String,
    pub message: String,
    pub timestamp: String,
}

/// Heartbeat response.
#[derive(Debug, Clone, Serialize)]
pub struct PongMessage {
    pub timestamp: String,
}

impl ServerMessage {
    pub fn error(code: ErrorCode, message: impl Into<String>) -> Self {
        ServerMessage::Error(ErrorMessage {
            code: code.to_string(),
            message: message.into(),
            timestamp: Timestamp::now().to_rfc3339(),
        })
    }

    pub fn pong() -> Self {
        ServerMessage::Pong(PongMessage {
            timestamp: Timestamp::now().to_rfc3339(),
        })
    }

    pub fn from_event(event: HubEvent) -> Self {
        let room = event.room_id.to_string();
        let event_id = event.event_id.to_string();
        match event.payload {
            HubPayload::Message(message) => ServerMessage::Message(MessageFrame {
                event_id,
                room,
                sender_role: message.sender_role,
                sender_name: message.sender_name,
                text: message.text,
                created_at: message.created_at.to_rfc3339(),
                correlation_id: message.correlation_id.map(|id| id.as_str().to_string()),
            }),
            HubPayload::OrderStatus(status) => ServerMessage::OrderStatus(OrderStatusFrame {
                event_id,
                room,
                order_id: status.order_id.to_string(),
                prior: status.prior_status,
                status: status.new_status,
                actor_role: status.actor.role,
                actor_name: status.actor.name,
                note: status.note,
                occurred_at: status.occurred_at.to_rfc3339(),
            }),
        }
    }
}

impl From<Outbound> for ServerMessage {
    fn from(item: Outbound) -> Self {
        match item {
            Outbound::Event(event) => ServerMessage::from_event(event),
            Outbound::Inbox(rooms) => ServerMessage::Inbox(InboxMessage {
                rooms,
                timestamp: Timestamp::now().to_rfc3339(),
            }),
            Outbound::HistoryUnavailable(room_id) => {
                ServerMessage::HistoryUnavailable(HistoryUnavailableMessage {
                    room: room_id.to_string(),
                    timestamp: Timestamp::now().to_rfc3339(),
                })
            }
        }
    }
}

// ============================================
// Client → Server Messages
// ============================================

/// All message types that can be received from client.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    Join(RoomRequest),
    Leave(RoomRequest),
    Send(SendRequest),
    Transition(TransitionRequest),
    MarkRead(RoomRequest),

    /// Heartbeat request.
    Ping,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RoomRequest {
    pub room: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendRequest {
    pub room: String,
    pub text: String,
    #[serde(default)]
    pub correlation_id: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransitionRequest {
    pub order_id: String,
    pub status: String,
    #[serde(default)]
    pub note: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::foundation::{CorrelationId, OrderId};
    use crate::domain::message::{Actor, ChatMessage, OrderStatusEvent};

    #[test]
    fn server_message_serializes_with_type_tag() {
        let msg = ServerMessage::Connected(ConnectedMessage {
            connection_id: "conn-1".to_string(),
            role: SenderRole::Operator,
            display_name: "Support".to_string(),
            timestamp: "2025-01-10T00:00:00Z".to_string(),
        });

        let json = serde_json::to_string(&msg).unwrap();
        assert!(json.contains(r#""type":"connected""#));
        assert!(json.contains(r#""connectionId":"conn-1""#));
        assert!(json.contains(r#""role":"operator""#));
    }

    #[test]
    fn chat_event_becomes_message_frame() {
        let message = ChatMessage::new(
            SenderRole::Guest,
            "Ana",
            "hi",
            Some(CorrelationId::new("c-1")),
        )
        .unwrap();
        let event = HubEvent::new("guest:u1".parse().unwrap(), HubPayload::Message(message));

        let json = serde_json::to_string(&ServerMessage::from_event(event)).unwrap();
        assert!(json.contains(r#""type":"message""#));
        assert!(json.contains(r#""room":"guest:u1""#));
        assert!(json.contains(r#""correlationId":"c-1""#));
    }

    #[test]
    fn status_event_becomes_order_status_frame() {
        let status = OrderStatusEvent {
            order_id: OrderId::new("42").unwrap(),
            prior_status: OrderStatus::Accepted,
            new_status: OrderStatus::OnTheWay,
            actor: Actor::new(SenderRole::Operator, "Dispatch"),
            note: None,
            occurred_at: Timestamp::now(),
        };
        let event = HubEvent::new("order:42".parse().unwrap(), HubPayload::OrderStatus(status));

        let json = serde_json::to_string(&ServerMessage::from_event(event)).unwrap();
        assert!(json.contains(r#""type":"order_status""#));
        assert!(json.contains(r#""prior":"ACCEPTED""#));
        assert!(json.contains(r#""status":"ON_THE_WAY""#));
        assert!(!json.contains("note"));
    }

    #[test]
    fn history_unavailable_frame() {
        let msg: ServerMessage = Outbound::HistoryUnavailable("order:42".parse().unwrap()).into();
        let json = serde_json::to_string(&msg).unwrap();
        assert!(json.contains(r#""type":"history_unavailable""#));
        assert!(json.contains(r#""room":"order:42""#));
    }

    #[test]
    fn client_message_deserializes_ping() {
        let msg: ClientMessage = serde_json::from_str(r#"{"type": "ping"}"#).unwrap();
        assert!(matches!(msg, ClientMessage::Ping));
    }

    #[test]
    fn client_message_deserializes_send() {
        let json = r#"{"type": "send", "room": "guest:u1", "text": "hi", "correlationId": "c-1"}"#;
        match serde_json::from_str::<ClientMessage>(json).unwrap() {
            ClientMessage::Send(req) => {
                assert_eq!(req.room, "guest:u1");
                assert_eq!(req.correlation_id.as_deref(), Some("c-1"));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn client_message_deserializes_transition_and_mark_read() {
        let json = r#"{"type": "transition", "orderId": "42", "status": "ON_THE_WAY"}"#;
        assert!(matches!(
            serde_json::from_str::<ClientMessage>(json).unwrap(),
            ClientMessage::Transition(TransitionRequest { note: None, .. })
        ));

        let json = r#"{"type": "mark_read", "room": "guest:u1"}"#;
        assert!(matches!(
            serde_json::from_str::<ClientMessage>(json).unwrap(),
            ClientMessage::MarkRead(_)
        ));
    }

    #[test]
    fn error_message_serializes_correctly() {
        let json = serde_json::to_string(&ServerMessage::error(
            ErrorCode::InvalidTransition,
            "Order 42 cannot move from COMPLETED to ARRIVED",
        ))
        .unwrap();
        assert!(json.contains(r#""type":"error""#));
        assert!(json.contains(r#""code":"INVALID_TRANSITION""#));
    }
}
