//! Adapters - Implementations of port interfaces and transports.
//!
//! - `memory` - In-memory history, roster and order repository
//! - `websocket` - Realtime room protocol over axum WebSockets
//! - `http` - Health, inbox and order timeline endpoints

pub mod http;
pub mod memory;
pub mod websocket;

pub use http::{hub_routes, HttpState};
pub use memory::{InMemoryCustomerRoster, InMemoryHistoryStore, InMemoryOrderRepository, SeedData};
pub use websocket::{websocket_router, WebSocketState};
