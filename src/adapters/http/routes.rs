//! HTTP routes for hub read endpoints.

use axum::routing::get;
use axum::Router;

use super::handlers::{health, list_inbox, order_timeline, HttpState};

/// Creates the HTTP router with all read routes.
pub fn hub_routes(state: HttpState) -> Router {
    Router::new()
        .route("/health", get(health))
        // GET /api/inbox
        .route("/api/inbox", get(list_inbox))
        // GET /api/orders/:order_id/timeline
        .route("/api/orders/:order_id/timeline", get(order_timeline))
        .with_state(state)
}
