//! HTTP handlers for hub read endpoints.

use std::sync::Arc;

use axum::extract::{Json, Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde::Serialize;

use crate::application::handlers::InboxAggregator;
use crate::application::hub::Hub;
use crate::domain::foundation::{DomainError, OrderId, Timestamp};
use crate::domain::inbox::RoomSummary;
use crate::domain::message::OrderStatusEvent;
use crate::domain::order::OrderStatus;
use crate::ports::OrderRepository;

// ════════════════════════════════════════════════════════════════════════════════
// Error Type
// ════════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub code: String,
    pub message: String,
}

/// Hub API error that implements IntoResponse.
pub enum HubApiError {
    BadRequest(String),
    NotFound(String),
    Unavailable(DomainError),
}

impl IntoResponse for HubApiError {
    fn into_response(self) -> axum::response::Response {
        let (status, code, message) = match self {
            HubApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "VALIDATION_FAILED".to_string(), msg),
            HubApiError::NotFound(msg) => (StatusCode::NOT_FOUND, "ORDER_NOT_FOUND".to_string(), msg),
            HubApiError::Unavailable(err) => {
                (StatusCode::SERVICE_UNAVAILABLE, err.code.to_string(), err.message)
            }
        };
        (status, Json(ErrorResponse { code, message })).into_response()
    }
}

impl From<DomainError> for HubApiError {
    fn from(err: DomainError) -> Self {
        HubApiError::Unavailable(err)
    }
}

// ════════════════════════════════════════════════════════════════════════════════
// Application State
// ════════════════════════════════════════════════════════════════════════════════

#[derive(Clone)]
pub struct HttpState {
    pub hub: Arc<Hub>,
    pub inbox: Arc<InboxAggregator>,
    pub orders: Arc<dyn OrderRepository>,
}

// ════════════════════════════════════════════════════════════════════════════════
// Handlers
// ════════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: &'static str,
    pub connections: usize,
    pub rooms: usize,
    pub timestamp: String,
}

/// GET /health
pub async fn health(State(state): State<HttpState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        connections: state.hub.connection_count(),
        rooms: state.hub.directory().len(),
        timestamp: Timestamp::now().to_rfc3339(),
    })
}

/// GET /api/inbox
pub async fn list_inbox(State(state): State<HttpState>) -> Result<Json<Vec<RoomSummary>>, HubApiError> {
    Ok(Json(state.inbox.list_rooms().await?))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TimelineResponse {
    pub order_id: OrderId,
    pub status: OrderStatus,
    pub entries: Vec<OrderStatusEvent>,
}

/// GET /api/orders/:order_id/timeline
pub async fn order_timeline(
    State(state): State<HttpState>,
    Path(order_id): Path<String>,
) -> Result<Json<TimelineResponse>, HubApiError> {
    let order_id = OrderId::new(order_id).map_err(|e| HubApiError::BadRequest(e.to_string()))?;
    let record = state
        .orders
        .find(&order_id)
        .await?
        .ok_or_else(|| HubApiError::NotFound(format!("Order {} not found", order_id)))?;
    let entries = state.orders.timeline(&order_id).await?;

    Ok(Json(TimelineResponse {
        order_id,
        status: record.status,
        entries,
    }))
}
