//! HTTP adapter module.
//!
//! Read-only REST endpoints next to the WebSocket transport.

pub mod handlers;
pub mod routes;

pub use handlers::{ErrorResponse, HttpState};
pub use routes::hub_routes;
