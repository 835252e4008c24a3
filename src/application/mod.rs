//! Application layer - the hub and the handlers that drive it.
//!
//! This layer orchestrates domain operations and coordinates between ports.

pub mod handlers;
pub mod hub;

pub use handlers::{
    InboxAggregator, InboxAggregatorConfig, TransitionOrderCommand, TransitionOrderHandler,
    TransitionOrderResult,
};
pub use hub::{ConnectionSpec, Hub, HubError, HubOptions, Outbound, Registration, RoomActivity};
