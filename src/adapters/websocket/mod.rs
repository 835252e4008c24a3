//! WebSocket adapter for realtime room traffic.
//!
//! ```text
//!  client ──frames──▶ reader task ──▶ Hub / TransitionOrderHandler
//!                                        │
//!                                        │ Outbound (bounded queue)
//!                                        ▼
//!  client ◀──frames── writer task ◀── replies
//! ```
//!
//! # Components
//!
//! - [`messages`] - WebSocket message protocol types
//! - [`handler`] - Axum WebSocket upgrade handler and frame dispatch

pub mod handler;
pub mod messages;

pub use handler::{websocket_router, ws_handler, ConnectParams, WebSocketState};
pub use messages::{ClientMessage, ServerMessage};
