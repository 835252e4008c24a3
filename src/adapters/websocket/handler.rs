//! WebSocket upgrade handler for realtime room connections.
//!
//! Handles the HTTP → WebSocket upgrade and manages the connection lifecycle:
//! 1. Parse the participant role and display name from the query string
//! 2. Upgrade to WebSocket and register with the hub
//! 3. Writer task drains the hub's outbound queue and local replies
//! 4. Reader task dispatches client frames to the hub
//! 5. On disconnect, remove the connection from every room

use std::sync::Arc;

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Query, State,
    },
    http::StatusCode,
    response::{IntoResponse, Response},
};
use futures::{stream::SplitSink, SinkExt, StreamExt};
use serde::Deserialize;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::application::handlers::{TransitionOrderCommand, TransitionOrderHandler};
use crate::application::hub::{ConnectionHandle, ConnectionSpec, Hub, Registration};
use crate::domain::foundation::{
    CorrelationId, ErrorCode, OrderId, PrincipalId, Timestamp, ValidationError,
};
use crate::domain::message::{Actor, SenderRole};
use crate::domain::order::OrderStatus;
use crate::domain::room::RoomId;

use super::messages::{ClientMessage, ConnectedMessage, JoinedMessage, ServerMessage};

/// Replies queued by the reader task ahead of the writer.
const REPLY_CAPACITY: usize = 32;

/// State required for WebSocket handling.
#[derive(Clone)]
pub struct WebSocketState {
    pub hub: Arc<Hub>,
    pub transitions: Arc<TransitionOrderHandler>,
}

impl WebSocketState {
    pub fn new(hub: Arc<Hub>, transitions: Arc<TransitionOrderHandler>) -> Self {
        Self { hub, transitions }
    }
}

/// Query parameters accepted on upgrade.
#[derive(Debug, Default, Deserialize)]
pub struct ConnectParams {
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub principal: Option<String>,
}

impl ConnectParams {
    fn into_spec(self) -> Result<ConnectionSpec, String> {
        let role = match self.role.as_deref() {
            Some(raw) => raw.parse::<SenderRole>().map_err(|e| e.to_string())?,
            None => SenderRole::Guest,
        };
        let mut spec = ConnectionSpec::new(role);
        if let Some(name) = self.name {
            spec = spec.with_display_name(name);
        }
        if let Some(principal) = self.principal {
            let principal = PrincipalId::new(principal).map_err(|e| e.to_string())?;
            spec = spec.with_principal(principal);
        }
        Ok(spec)
    }
}

/// Handle WebSocket upgrade requests.
///
/// Route: `GET /ws?role=<guest|operator|bot>&name=<display name>&principal=<id>`
///
/// Authentication is expected to happen in front of the hub; the principal
/// is taken as given.
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    Query(params): Query<ConnectParams>,
    State(state): State<WebSocketState>,
) -> Response {
    let spec = match params.into_spec() {
        Ok(spec) => spec,
        Err(reason) => return (StatusCode::BAD_REQUEST, reason).into_response(),
    };

    ws.on_upgrade(move |socket| handle_socket(socket, spec, state))
}

/// Handle an established WebSocket connection.
async fn handle_socket(socket: WebSocket, spec: ConnectionSpec, state: WebSocketState) {
    let (mut sender, mut receiver) = socket.split();

    let Registration {
        handle,
        mut outbound,
    } = state.hub.register(spec);
    let connection_id = handle.id();

    let connected = ServerMessage::Connected(ConnectedMessage {
        connection_id: connection_id.to_string(),
        role: handle.role(),
        display_name: handle.display_name().to_string(),
        timestamp: Timestamp::now().to_rfc3339(),
    });
    if let Err(e) = send_message(&mut sender, &connected).await {
        debug!(connection_id = %connection_id, "Failed to send connected message: {}", e);
        state.hub.unregister_all(&connection_id).await;
        return;
    }

    let (reply_tx, mut reply_rx) = mpsc::channel::<ServerMessage>(REPLY_CAPACITY);

    // Writer: hub close signal, then hub deliveries, then local replies
    let closer = handle.clone();
    let mut send_task = tokio::spawn(async move {
        loop {
            let msg = tokio::select! {
                biased;
                _ = closer.closed() => {
                    debug!(connection_id = %connection_id, "Hub dropped connection, closing socket");
                    let _ = sender.send(Message::Close(None)).await;
                    break;
                }
                Some(item) = outbound.recv() => ServerMessage::from(item),
                Some(reply) = reply_rx.recv() => reply,
                else => break,
            };
            if let Err(e) = send_message(&mut sender, &msg).await {
                debug!(connection_id = %connection_id, "Send error, closing connection: {}", e);
                break;
            }
        }
    });

    // Reader: each frame is applied in its own task, which outlives an abort
    let reader_state = state.clone();
    let mut recv_task = tokio::spawn(async move {
        while let Some(result) = receiver.next().await {
            let reply = match result {
                Ok(Message::Text(text)) => {
                    let frame_state = reader_state.clone();
                    let frame_handle = handle.clone();
                    let applied =
                        tokio::spawn(async move { dispatch(&frame_state, &frame_handle, &text).await });
                    match applied.await {
                        Ok(reply) => reply,
                        Err(e) => {
                            warn!(connection_id = %connection_id, "Frame handler failed: {}", e);
                            Some(ServerMessage::error(
                                ErrorCode::InternalError,
                                "Frame could not be processed",
                            ))
                        }
                    }
                }
                Ok(Message::Binary(_)) => {
                    warn!(connection_id = %connection_id, "Received unsupported binary message");
                    Some(ServerMessage::error(
                        ErrorCode::MalformedFrame,
                        "Binary frames are not supported",
                    ))
                }
                // Protocol-level ping/pong is handled by axum
                Ok(Message::Ping(_)) | Ok(Message::Pong(_)) => None,
                Ok(Message::Close(_)) => {
                    debug!(connection_id = %connection_id, "Client sent close frame");
                    break;
                }
                Err(e) => {
                    debug!(connection_id = %connection_id, "Receive error: {}", e);
                    break;
                }
            };

            if let Some(reply) = reply {
                if reply_tx.send(reply).await.is_err() {
                    break;
                }
            }
        }
    });

    tokio::select! {
        _ = &mut send_task => recv_task.abort(),
        _ = &mut recv_task => send_task.abort(),
    }

    state.hub.unregister_all(&connection_id).await;
}

/// Applies one client frame, returning the direct reply if any.
async fn dispatch(state: &WebSocketState, handle: &ConnectionHandle, text: &str) -> Option<ServerMessage> {
    match apply(state, handle, text).await {
        Ok(reply) => reply,
        Err(error) => Some(error),
    }
}

async fn apply(
    state: &WebSocketState,
    handle: &ConnectionHandle,
    text: &str,
) -> Result<Option<ServerMessage>, ServerMessage> {
    let frame: ClientMessage = serde_json::from_str(text)
        .map_err(|e| ServerMessage::error(ErrorCode::MalformedFrame, e.to_string()))?;
    let id = handle.id();
    let hub = &state.hub;

    match frame {
        ClientMessage::Join(req) => {
            let room_id = parse_room(&req.room)?;
            let outcome = hub
                .join(&id, room_id)
                .await
                .map_err(|e| ServerMessage::error(e.code(), e.to_string()))?;
            Ok(Some(ServerMessage::Joined(JoinedMessage {
                room: req.room,
                replayed: outcome.replayed,
                history_available: outcome.history_available,
            })))
        }
        ClientMessage::Leave(req) => {
            let room_id = parse_room(&req.room)?;
            hub.leave(&id, &room_id)
                .await
                .map_err(|e| ServerMessage::error(e.code(), e.to_string()))?;
            Ok(None)
        }
        ClientMessage::Send(req) => {
            let room_id = parse_room(&req.room)?;
            let correlation_id = req
                .correlation_id
                .filter(|c| !c.trim().is_empty())
                .map(CorrelationId::new);
            hub.send_message(&id, room_id, req.text, correlation_id)
                .await
                .map_err(|e| ServerMessage::error(e.code(), e.to_string()))?;
            Ok(None)
        }
        ClientMessage::Transition(req) => {
            let order_id = OrderId::new(req.order_id)
                .map_err(|e| ServerMessage::error(ErrorCode::ValidationFailed, e.to_string()))?;
            let requested: OrderStatus = req
                .status
                .parse()
                .map_err(|e: ValidationError| {
                    ServerMessage::error(ErrorCode::ValidationFailed, e.to_string())
                })?;
            let mut actor = Actor::new(handle.role(), handle.display_name());
            if let Some(principal) = handle.principal() {
                actor = actor.with_principal(principal.clone());
            }

            state
                .transitions
                .handle(TransitionOrderCommand {
                    order_id,
                    requested,
                    actor,
                    note: req.note,
                })
                .await
                .map_err(|e| ServerMessage::error(e.code(), e.to_string()))?;
            Ok(None)
        }
        ClientMessage::MarkRead(req) => {
            let room_id = parse_room(&req.room)?;
            hub.mark_read(&id, &room_id)
                .await
                .map_err(|e| ServerMessage::error(e.code(), e.to_string()))?;
            Ok(None)
        }
        ClientMessage::Ping => Ok(Some(ServerMessage::pong())),
    }
}

fn parse_room(raw: &str) -> Result<RoomId, ServerMessage> {
    raw.parse()
        .map_err(|e: ValidationError| ServerMessage::error(ErrorCode::ValidationFailed, e.to_string()))
}

/// Send a JSON message over the WebSocket.
async fn send_message(
    sender: &mut SplitSink<WebSocket, Message>,
    msg: &ServerMessage,
) -> Result<(), axum::Error> {
    let json = serde_json::to_string(msg).map_err(axum::Error::new)?;
    sender.send(Message::Text(json)).await
}

/// Create axum router for the WebSocket endpoint.
pub fn websocket_router() -> axum::Router<WebSocketState> {
    use axum::routing::get;

    axum::Router::new().route("/ws", get(ws_handler))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::{InMemoryHistoryStore, InMemoryOrderRepository};
    use crate::application::hub::{HubOptions, Outbound};
    use crate::domain::order::{OrderRecord, TransitionPolicy};

    fn state() -> WebSocketState {
        let orders = Arc::new(InMemoryOrderRepository::new());
        orders.insert(OrderRecord::new(OrderId::new("42").unwrap(), OrderStatus::Completed));
        let hub = Arc::new(Hub::new(
            HubOptions::default(),
            Arc::new(InMemoryHistoryStore::new()),
            orders.clone(),
        ));
        let transitions = Arc::new(TransitionOrderHandler::new(
            orders,
            hub.clone(),
            TransitionPolicy::Permissive,
        ));
        WebSocketState::new(hub, transitions)
    }

    fn error_code(msg: Option<ServerMessage>) -> Option<String> {
        match msg {
            Some(ServerMessage::Error(err)) => Some(err.code),
            _ => None,
        }
    }

    #[test]
    fn connect_params_default_to_guest() {
        let spec = ConnectParams::default().into_spec().unwrap();
        assert_eq!(spec.role, SenderRole::Guest);
    }

    #[test]
    fn connect_params_reject_unknown_role() {
        let params = ConnectParams {
            role: Some("courier".to_string()),
            ..ConnectParams::default()
        };
        assert!(params.into_spec().is_err());
    }

    #[tokio::test]
    async fn malformed_frame_is_reported() {
        let state = state();
        let registration = state.hub.register(ConnectionSpec::new(SenderRole::Guest));

        let reply = dispatch(&state, &registration.handle, "{not json").await;
        assert_eq!(error_code(reply).as_deref(), Some("MALFORMED_FRAME"));
    }

    #[tokio::test]
    async fn join_replies_with_ack() {
        let state = state();
        let registration = state.hub.register(ConnectionSpec::new(SenderRole::Guest));

        let reply = dispatch(
            &state,
            &registration.handle,
            r#"{"type":"join","room":"order:42"}"#,
        )
        .await;
        assert!(matches!(reply, Some(ServerMessage::Joined(JoinedMessage { replayed: 0, .. }))));
    }

    #[tokio::test]
    async fn transition_on_completed_order_is_rejected() {
        let state = state();
        let mut registration = state.hub.register(ConnectionSpec::new(SenderRole::Operator));
        dispatch(&state, &registration.handle, r#"{"type":"join","room":"order:42"}"#).await;

        let reply = dispatch(
            &state,
            &registration.handle,
            r#"{"type":"transition","orderId":"42","status":"ARRIVED"}"#,
        )
        .await;

        assert_eq!(error_code(reply).as_deref(), Some("INVALID_TRANSITION"));
        assert!(!matches!(registration.outbound.try_recv(), Ok(Outbound::Event(_))));
    }

    #[tokio::test]
    async fn unknown_room_prefix_is_a_validation_error() {
        let state = state();
        let registration = state.hub.register(ConnectionSpec::new(SenderRole::Guest));

        let reply = dispatch(&state, &registration.handle, r#"{"type":"join","room":"lobby"}"#).await;
        assert_eq!(error_code(reply).as_deref(), Some("VALIDATION_FAILED"));
    }

    #[tokio::test]
    async fn ping_gets_pong() {
        let state = state();
        let registration = state.hub.register(ConnectionSpec::new(SenderRole::Guest));
        let reply = dispatch(&state, &registration.handle, r#"{"type":"ping"}"#).await;
        assert!(matches!(reply, Some(ServerMessage::Pong(_))));
    }
}
